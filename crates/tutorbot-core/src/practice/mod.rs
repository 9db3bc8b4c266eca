//! Timed practice runs over a fixed question set.
//!
//! `Idle → Active ⇄ Paused → Complete`. The session is a plain value driven
//! by explicit calls; wall-clock scheduling lives with whoever owns it.

use crate::model::{Answer, AnswerValue, Question};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds a flashcard is shown before its answer is revealed.
pub const FLASHCARD_PROMPT_WINDOW_SECS: u32 = 10;

/// Seconds a revealed flashcard answer stays up before moving on.
pub const FLASHCARD_ANSWER_WINDOW_SECS: u32 = 5;

/// Minimum score (percent) labelled as a pass.
pub const PASS_THRESHOLD: u32 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Flashcards,
    MultipleChoice,
    TypedAnswer,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::Flashcards,
        Strategy::MultipleChoice,
        Strategy::TypedAnswer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Flashcards => "flashcards",
            Strategy::MultipleChoice => "multiple-choice",
            Strategy::TypedAnswer => "typed-answer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Strategy::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value.trim()))
    }

    fn accepts(&self, value: &AnswerValue) -> bool {
        matches!(
            (self, value),
            (Strategy::Flashcards, AnswerValue::Mastery(_))
                | (Strategy::MultipleChoice, AnswerValue::Choice(_))
                | (Strategy::TypedAnswer, AnswerValue::Text(_))
        )
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Active,
    Paused,
    Complete,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Complete => "complete",
        };
        f.write_str(label)
    }
}

/// Caller defects: the engine never recovers from these on its own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PracticeError {
    #[error("cannot start a practice session without questions")]
    EmptyQuestionSet,
    #[error("`{operation}` is not valid while the session is {status}")]
    IllegalTransition {
        operation: &'static str,
        status: SessionStatus,
    },
    #[error("`{operation}` does not apply to the {strategy} strategy")]
    NotApplicable {
        operation: &'static str,
        strategy: Strategy,
    },
}

/// Final score of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub correct: usize,
    pub total: usize,
    /// `round(100 * correct / total)`.
    pub score: u32,
    pub passed: bool,
}

impl SessionOutcome {
    pub fn from_counts(correct: usize, total: usize) -> Self {
        let score = percent(correct, total);
        Self {
            correct,
            total,
            score,
            passed: score >= PASS_THRESHOLD,
        }
    }
}

/// `round(100 * part / whole)` with halves rounded up; 0 when `whole` is 0.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((200 * part as u64 + whole as u64) / (2 * whole as u64)) as u32
}

/// Where the run went after an answer was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Advanced { index: usize },
    Completed(SessionOutcome),
}

/// Result of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEvent {
    /// Countdown moved; nothing else changed.
    Ticked { remaining: u32 },
    /// Session is paused; countdown untouched.
    Paused,
    /// Flashcard answer is now showing for `remaining` seconds.
    AnswerRevealed { remaining: u32 },
    /// Time ran out and the run moved on.
    Moved(Progress),
}

#[derive(Debug, Clone)]
pub struct PracticeSession {
    strategy: Option<Strategy>,
    questions: Vec<Question>,
    current_index: usize,
    answers: Vec<Answer>,
    status: SessionStatus,
    time_remaining: u32,
    answer_shown: bool,
    elapsed_on_current: u32,
    outcome: Option<SessionOutcome>,
}

impl Default for PracticeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PracticeSession {
    pub fn new() -> Self {
        Self {
            strategy: None,
            questions: Vec::new(),
            current_index: 0,
            answers: Vec::new(),
            status: SessionStatus::Idle,
            time_remaining: 0,
            answer_shown: false,
            elapsed_on_current: 0,
            outcome: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn strategy(&self) -> Option<Strategy> {
        self.strategy
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.status {
            SessionStatus::Active | SessionStatus::Paused => self.questions.get(self.current_index),
            _ => None,
        }
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn answer_shown(&self) -> bool {
        self.answer_shown
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    /// Discard this run; the replacement is a fresh `Idle` session.
    pub fn reset(self) -> Self {
        Self::new()
    }

    pub fn start(&mut self, strategy: Strategy, questions: Vec<Question>) -> Result<(), PracticeError> {
        self.require(&[SessionStatus::Idle], "start")?;
        if questions.is_empty() {
            return Err(PracticeError::EmptyQuestionSet);
        }

        self.strategy = Some(strategy);
        self.questions = questions;
        self.current_index = 0;
        self.answers.clear();
        self.outcome = None;
        self.status = SessionStatus::Active;
        self.enter_question();
        Ok(())
    }

    /// One second of countdown.
    pub fn tick(&mut self) -> Result<TickEvent, PracticeError> {
        self.require(&[SessionStatus::Active, SessionStatus::Paused], "tick")?;
        if self.status == SessionStatus::Paused {
            return Ok(TickEvent::Paused);
        }

        self.time_remaining = self.time_remaining.saturating_sub(1);
        self.elapsed_on_current = self.elapsed_on_current.saturating_add(1);
        if self.time_remaining > 0 {
            return Ok(TickEvent::Ticked {
                remaining: self.time_remaining,
            });
        }

        let strategy = self.active_strategy();
        if strategy == Strategy::Flashcards && !self.answer_shown {
            self.show_answer();
            return Ok(TickEvent::AnswerRevealed {
                remaining: self.time_remaining,
            });
        }

        if strategy != Strategy::Flashcards {
            let allotted = self.allotted_secs();
            self.record(AnswerValue::NoAnswer, allotted);
        }
        self.advance().map(TickEvent::Moved)
    }

    pub fn pause(&mut self) -> Result<(), PracticeError> {
        self.require(&[SessionStatus::Active], "pause")?;
        self.status = SessionStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), PracticeError> {
        self.require(&[SessionStatus::Paused], "resume")?;
        self.status = SessionStatus::Active;
        Ok(())
    }

    /// Show the current flashcard's answer before its prompt window runs out.
    pub fn reveal_answer(&mut self) -> Result<(), PracticeError> {
        self.require(&[SessionStatus::Active], "reveal_answer")?;
        let strategy = self.active_strategy();
        if strategy != Strategy::Flashcards {
            return Err(PracticeError::NotApplicable {
                operation: "reveal_answer",
                strategy,
            });
        }
        if !self.answer_shown {
            self.show_answer();
        }
        Ok(())
    }

    /// Record a response for the current question and move on.
    ///
    /// Correctness is fixed here and never recomputed. Multiple-choice
    /// callers that want to linger on the result do so before their next
    /// call, not by delaying this transition.
    pub fn submit_answer(&mut self, value: AnswerValue) -> Result<(Answer, Progress), PracticeError> {
        self.require(&[SessionStatus::Active], "submit_answer")?;
        let strategy = self.active_strategy();
        if !strategy.accepts(&value) {
            return Err(PracticeError::NotApplicable {
                operation: "submit_answer",
                strategy,
            });
        }

        let spent = self.elapsed_on_current.min(self.allotted_secs());
        let answer = self.record(value, spent);
        let progress = self.advance()?;
        Ok((answer, progress))
    }

    /// Move past the current question, recording it as unanswered if needed.
    pub fn advance(&mut self) -> Result<Progress, PracticeError> {
        self.require(&[SessionStatus::Active], "advance")?;

        if self.answers.len() <= self.current_index {
            let spent = self.elapsed_on_current.min(self.allotted_secs());
            self.record(AnswerValue::NoAnswer, spent);
        }

        if self.current_index + 1 >= self.questions.len() {
            let correct = self.answers.iter().filter(|a| a.is_correct).count();
            let outcome = SessionOutcome::from_counts(correct, self.questions.len());
            self.status = SessionStatus::Complete;
            self.time_remaining = 0;
            self.answer_shown = false;
            self.outcome = Some(outcome);
            return Ok(Progress::Completed(outcome));
        }

        self.current_index += 1;
        self.enter_question();
        Ok(Progress::Advanced {
            index: self.current_index,
        })
    }

    fn require(&self, allowed: &[SessionStatus], operation: &'static str) -> Result<(), PracticeError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(PracticeError::IllegalTransition {
                operation,
                status: self.status,
            })
        }
    }

    /// Only called once `start` has fixed the strategy.
    fn active_strategy(&self) -> Strategy {
        self.strategy.unwrap_or(Strategy::MultipleChoice)
    }

    /// Total seconds the current question may consume.
    fn allotted_secs(&self) -> u32 {
        match self.active_strategy() {
            Strategy::Flashcards => FLASHCARD_PROMPT_WINDOW_SECS + FLASHCARD_ANSWER_WINDOW_SECS,
            _ => self
                .questions
                .get(self.current_index)
                .map(|q| q.time_allowed_secs.max(1))
                .unwrap_or(1),
        }
    }

    fn enter_question(&mut self) {
        self.answer_shown = false;
        self.elapsed_on_current = 0;
        self.time_remaining = match self.active_strategy() {
            Strategy::Flashcards => FLASHCARD_PROMPT_WINDOW_SECS,
            _ => self.allotted_secs(),
        };
    }

    fn show_answer(&mut self) {
        self.answer_shown = true;
        self.time_remaining = FLASHCARD_ANSWER_WINDOW_SECS;
    }

    fn record(&mut self, value: AnswerValue, time_spent_secs: u32) -> Answer {
        let question = &self.questions[self.current_index];
        let answer = Answer {
            question_id: question.id.clone(),
            is_correct: value.matches(question),
            value,
            time_spent_secs,
            submitted_at: Utc::now(),
        };
        self.answers.push(answer.clone());
        answer
    }
}

#[cfg(test)]
mod tests;
