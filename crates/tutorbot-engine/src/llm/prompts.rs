//! Prompt text for every generation task.
//!
//! The OUTPUT blocks describe exactly the fields `tutorbot_core::normalize`
//! validates; change them together.

use tutorbot_core::catalog;
use tutorbot_core::model::{ChatMessage, Difficulty, EXAM_OPTION_COUNT, QUIZ_OPTION_COUNT};
use tutorbot_core::text::truncate_with_ellipsis;

/// Character budgets for study material embedded in a prompt.
pub const SUMMARY_CONTENT_BUDGET: usize = 12_000;
pub const ARTIFACT_CONTENT_BUDGET: usize = 6_000;
pub const CHAT_CONTENT_BUDGET: usize = 500;

/// Most recent chat messages included as context.
pub const CHAT_HISTORY_WINDOW: usize = 6;

/// Records requested per batch.
pub const FLASHCARD_COUNT: usize = 10;
pub const QUIZ_QUESTION_COUNT: usize = 8;
pub const DEFAULT_EXAM_QUESTION_COUNT: usize = 10;

/// System instruction (and persona) for every request.
pub const TUTOR_SYSTEM: &str = "You are TutorBot, an AI study coach designed to help students learn effectively. Provide clear, educational responses that help students understand their study material better.";

/// System instruction + user prompt for one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    fn tutor(user: String) -> Self {
        Self {
            system: TUTOR_SYSTEM.to_string(),
            user,
        }
    }
}

const JSON_ONLY_RULE: &str = "Respond with the JSON array only: no markdown, no commentary.";

pub fn summary_prompt(content: &str) -> PromptPair {
    PromptPair::tutor(format!(
        r#"Summarize the following study material for a student. Make it:
- Clear and easy to understand
- Well-organized with bullet points
- Include key concepts and important details
- Add a TL;DR section at the end
- Focus on what's most important to remember

Study Material:
{}"#,
        truncate_with_ellipsis(content, SUMMARY_CONTENT_BUDGET)
    ))
}

pub fn flashcards_prompt(content: &str) -> PromptPair {
    PromptPair::tutor(format!(
        r#"Generate {count} flashcards from the following study material.

OUTPUT (JSON array):
[
  {{
    "id": "1",
    "question": "Question here",
    "answer": "Answer here",
    "difficulty": "medium"
  }}
]

RULES:
- Exactly {count} flashcards, each with a unique id.
- `difficulty` is one of easy, medium, hard; vary it across cards.
- Questions are clear, specific, and cover the most important concepts.
- Answers are complete and accurate.
- {json_only}

Study Material:
{material}"#,
        count = FLASHCARD_COUNT,
        json_only = JSON_ONLY_RULE,
        material = truncate_with_ellipsis(content, ARTIFACT_CONTENT_BUDGET)
    ))
}

pub fn quiz_prompt(content: &str) -> PromptPair {
    PromptPair::tutor(format!(
        r#"Generate {count} quiz questions from the following study material.

OUTPUT (JSON array):
[
  {{
    "id": "1",
    "question": "Question here",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "correctAnswer": 0,
    "type": "multiple-choice",
    "difficulty": "medium"
  }}
]

RULES:
- Exactly {count} questions, each with exactly {options} options.
- Options are plausible but only one is correct.
- `correctAnswer` is the 0-based index of the correct option (0 to {last}).
- `type` is multiple-choice.
- `difficulty` is one of easy, medium, hard; mix all three.
- Cover different aspects of the material.
- {json_only}

Study Material:
{material}"#,
        count = QUIZ_QUESTION_COUNT,
        options = QUIZ_OPTION_COUNT,
        last = QUIZ_OPTION_COUNT - 1,
        json_only = JSON_ONLY_RULE,
        material = truncate_with_ellipsis(content, ARTIFACT_CONTENT_BUDGET)
    ))
}

pub fn study_plan_prompt(content: &str, days: usize) -> PromptPair {
    PromptPair::tutor(format!(
        r#"Create a {days}-day study plan for the following material.

OUTPUT (JSON array, one entry per day):
[
  {{
    "day": 1,
    "topics": ["Topic 1", "Topic 2"],
    "duration": 60,
    "activities": ["Read chapter 1", "Create notes", "Practice questions"]
  }}
]

RULES:
- Exactly {days} entries, day 1 through day {days}.
- `duration` is the study time in minutes, between 30 and 90.
- Topics are broken down logically and progress from basic to advanced.
- Activities are specific and actionable; include review sessions.
- {json_only}

Study Material:
{material}"#,
        days = days,
        json_only = JSON_ONLY_RULE,
        material = truncate_with_ellipsis(content, ARTIFACT_CONTENT_BUDGET)
    ))
}

/// Render the last few messages as `speaker: content` lines.
pub fn render_chat_history(history: &[ChatMessage]) -> String {
    let start = history.len().saturating_sub(CHAT_HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|msg| format!("{}: {}", msg.role.label(), msg.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn chat_prompt(content: &str, history: &[ChatMessage], message: &str) -> PromptPair {
    PromptPair::tutor(format!(
        r#"The student is studying: "{material}"

Chat History:
{history}

Student's message: {message}

Respond as a helpful tutor who:
- Answers questions about the study material
- Provides explanations and examples
- Asks follow-up questions to test understanding
- Offers encouragement and study tips
- Identifies areas that need more practice
- Keeps responses conversational and supportive

Keep your response focused, helpful, and encouraging."#,
        material = truncate_with_ellipsis(content, CHAT_CONTENT_BUDGET),
        history = render_chat_history(history),
        message = message
    ))
}

/// Practice questions for a licensing exam in one jurisdiction.
pub fn exam_questions_prompt(
    exam_type: &str,
    state: &str,
    difficulty: Difficulty,
    count: usize,
) -> PromptPair {
    let exam_label = catalog::exam_type(exam_type)
        .map(|exam| format!("{} ({})", exam.name, exam.description))
        .unwrap_or_else(|| exam_type.to_string());
    let state_label = catalog::jurisdiction(state)
        .map(|j| format!("{} ({})", j.name, j.code))
        .unwrap_or_else(|| state.to_string());

    PromptPair::tutor(format!(
        r#"Write {count} {difficulty} practice questions for the {exam} as administered in {state}.

OUTPUT (JSON array):
[
  {{
    "id": "1",
    "examType": "{exam_id}",
    "state": "{state_code}",
    "question": "Question here",
    "options": ["Option A", "Option B", "Option C", "Option D", "Option E"],
    "correctAnswer": 0,
    "explanation": "Why the correct option is right",
    "difficulty": "{difficulty}",
    "timeAllowed": 120,
    "category": "Topic area"
  }}
]

RULES:
- Exactly {count} questions, each with exactly {options} options.
- `correctAnswer` is the 0-based index of the correct option (0 to {last}).
- `difficulty` is {difficulty} for every question.
- `timeAllowed` is the seconds a candidate should need, between 30 and 300.
- Reflect the style, scope and any jurisdiction-specific rules of the real exam.
- {json_only}"#,
        count = count,
        difficulty = difficulty.as_str(),
        exam = exam_label,
        state = state_label,
        exam_id = exam_type,
        state_code = state,
        options = EXAM_OPTION_COUNT,
        last = EXAM_OPTION_COUNT - 1,
        json_only = JSON_ONLY_RULE,
    ))
}
