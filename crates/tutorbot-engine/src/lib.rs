//! Generation engine for TutorBot: prompts, the completion gateway, the
//! generation service and the practice timer.

pub mod generation;
pub mod llm;
pub mod timer;

pub use generation::{
    ExamQuestionRequest, GenerationError, GenerationService, RequestToken, RequestTracker, Tracked,
};
pub use timer::PracticeTimer;
