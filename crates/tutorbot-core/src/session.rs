//! The persisted study-session record: source material, generated artifacts
//! and progress counters.

use crate::model::{ChatMessage, Flashcard, QuizQuestion, StudyPlanDay};
use crate::practice::percent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StudyProgress {
    pub flashcards_completed: u32,
    pub quiz_score: u32,
    pub study_days_completed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub flashcards: Vec<Flashcard>,
    #[serde(default)]
    pub quiz: Vec<QuizQuestion>,
    #[serde(default)]
    pub study_plan: Vec<StudyPlanDay>,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    #[serde(default)]
    pub progress: StudyProgress,
}

/// Returned when a progress update names a record the session does not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    #[error("no flashcard with id '{0}'")]
    UnknownFlashcard(String),
    #[error("no quiz question with id '{0}'")]
    UnknownQuestion(String),
    #[error("quiz question '{0}' was already answered")]
    AlreadyAnswered(String),
    #[error("no study-plan day {0}")]
    UnknownDay(u32),
}

impl StudySession {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            summary: None,
            flashcards: Vec::new(),
            quiz: Vec::new(),
            study_plan: Vec::new(),
            chat_history: Vec::new(),
            created_at: now,
            last_accessed: now,
            progress: StudyProgress::default(),
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }

    pub fn set_summary(&mut self, summary: String) {
        self.summary = Some(summary);
    }

    /// Replace the flashcard set wholesale; mastery starts over.
    pub fn replace_flashcards(&mut self, cards: Vec<Flashcard>) {
        self.flashcards = cards;
        self.progress.flashcards_completed = 0;
    }

    pub fn replace_quiz(&mut self, questions: Vec<QuizQuestion>) {
        self.quiz = questions;
        self.progress.quiz_score = 0;
    }

    pub fn replace_study_plan(&mut self, plan: Vec<StudyPlanDay>) {
        self.study_plan = plan;
        self.progress.study_days_completed = 0;
    }

    pub fn review_flashcard(&mut self, id: &str, mastered: bool) -> Result<(), ProgressError> {
        let card = self
            .flashcards
            .iter_mut()
            .find(|card| card.id == id)
            .ok_or_else(|| ProgressError::UnknownFlashcard(id.to_string()))?;
        card.mastered = mastered;
        card.review_count += 1;
        card.last_reviewed = Some(Utc::now());

        self.progress.flashcards_completed =
            self.flashcards.iter().filter(|c| c.mastered).count() as u32;
        Ok(())
    }

    /// Record the one permitted answer to a quiz question and rescore the quiz.
    pub fn answer_quiz_question(&mut self, id: &str, choice: usize) -> Result<bool, ProgressError> {
        let question = self
            .quiz
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| ProgressError::UnknownQuestion(id.to_string()))?;
        if question.answered {
            return Err(ProgressError::AlreadyAnswered(id.to_string()));
        }
        let correct = choice == question.correct_answer;
        question.answered = true;
        question.user_answer = Some(choice);
        question.is_correct = Some(correct);

        let right = self
            .quiz
            .iter()
            .filter(|q| q.is_correct == Some(true))
            .count();
        self.progress.quiz_score = percent(right, self.quiz.len());
        Ok(correct)
    }

    /// Flip one plan day. Returns its new completion state.
    pub fn toggle_plan_day(&mut self, day: u32) -> Result<bool, ProgressError> {
        let entry = self
            .study_plan
            .iter_mut()
            .find(|d| d.day == day)
            .ok_or(ProgressError::UnknownDay(day))?;
        entry.completed = !entry.completed;
        let now_completed = entry.completed;

        self.progress.study_days_completed =
            self.study_plan.iter().filter(|d| d.completed).count() as u32;
        Ok(now_completed)
    }

    pub fn push_chat(&mut self, message: ChatMessage) {
        self.chat_history.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, QuizKind};
    use crate::normalize::fallback_plan_day;
    use chrono::NaiveDate;

    fn card(id: &str) -> Flashcard {
        Flashcard {
            id: id.to_string(),
            question: "Q".to_string(),
            answer: "A".to_string(),
            difficulty: Difficulty::Medium,
            mastered: false,
            review_count: 0,
            last_reviewed: None,
        }
    }

    fn quiz(id: &str, correct: usize) -> QuizQuestion {
        QuizQuestion {
            id: id.to_string(),
            question: "Q".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: correct,
            kind: QuizKind::MultipleChoice,
            difficulty: Difficulty::Medium,
            answered: false,
            user_answer: None,
            is_correct: None,
        }
    }

    #[test]
    fn test_review_flashcard_counts_mastered() {
        let mut session = StudySession::new("Bio", "cells");
        session.replace_flashcards(vec![card("a"), card("b")]);
        session.review_flashcard("a", true).unwrap();
        session.review_flashcard("b", false).unwrap();
        session.review_flashcard("b", true).unwrap();

        assert_eq!(session.progress.flashcards_completed, 2);
        assert_eq!(session.flashcards[1].review_count, 2);
        assert!(session.flashcards[1].last_reviewed.is_some());
        assert!(session.review_flashcard("zzz", true).is_err());
    }

    #[test]
    fn test_replacing_artifacts_resets_progress() {
        let mut session = StudySession::new("Bio", "cells");
        session.replace_flashcards(vec![card("a")]);
        session.review_flashcard("a", true).unwrap();
        session.replace_flashcards(vec![card("c")]);
        assert_eq!(session.progress.flashcards_completed, 0);
        assert_eq!(session.flashcards.len(), 1);
    }

    #[test]
    fn test_quiz_answers_once_and_rescores() {
        let mut session = StudySession::new("Bio", "cells");
        session.replace_quiz(vec![quiz("1", 0), quiz("2", 1), quiz("3", 2)]);
        assert!(session.answer_quiz_question("1", 0).unwrap());
        assert!(!session.answer_quiz_question("2", 3).unwrap());
        assert_eq!(session.progress.quiz_score, 33);
        assert_eq!(
            session.answer_quiz_question("1", 1),
            Err(ProgressError::AlreadyAnswered("1".to_string()))
        );
    }

    #[test]
    fn test_toggle_plan_day_is_independent() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let mut session = StudySession::new("Bio", "cells");
        session.replace_study_plan((1..=3).map(|d| fallback_plan_day(d, today)).collect());

        assert!(session.toggle_plan_day(2).unwrap());
        assert_eq!(session.progress.study_days_completed, 1);
        assert!(!session.study_plan[0].completed);
        assert!(!session.toggle_plan_day(2).unwrap());
        assert_eq!(session.progress.study_days_completed, 0);
        assert_eq!(session.toggle_plan_day(9), Err(ProgressError::UnknownDay(9)));
    }
}
