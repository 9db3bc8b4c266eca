//! Exam registrations, their payment activation, and reported results.

use crate::catalog;
use crate::model::{Difficulty, ExamQuestion, DEFAULT_QUESTION_TIME_SECS};
use crate::practice::SessionOutcome;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamOutcome {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: String,
    pub registration_id: String,
    pub outcome: ExamOutcome,
    #[serde(default)]
    pub contributed_questions: Vec<ExamQuestion>,
    pub agreed_to_share: bool,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamRegistration {
    pub id: String,
    pub user_id: String,
    pub exam_type: String,
    pub state: String,
    pub exam_date: NaiveDate,
    pub payment_status: PaymentStatus,
    /// Only a completed payment activates a registration.
    pub is_active: bool,
    #[serde(default)]
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub result: Option<ExamResult>,
}

impl ExamRegistration {
    /// A new, inactive registration awaiting payment.
    pub fn new(user_id: &str, exam_type: &str, state: &str, exam_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            exam_type: exam_type.to_string(),
            state: state.to_ascii_uppercase(),
            exam_date,
            payment_status: PaymentStatus::Pending,
            is_active: false,
            payment_reference: None,
            created_at: now,
            updated_at: now,
            result: None,
        }
    }

    /// Apply the payment processor's verdict.
    pub fn apply_payment(&mut self, status: PaymentStatus, reference: Option<String>) {
        self.payment_status = status;
        self.is_active = status == PaymentStatus::Completed;
        if reference.is_some() {
            self.payment_reference = reference;
        }
        self.updated_at = Utc::now();
    }

    /// Record the real exam outcome. Contributed questions are kept only
    /// for a pass with consent, one per non-blank line.
    pub fn submit_result(
        &mut self,
        outcome: ExamOutcome,
        agreed_to_share: bool,
        contributed_text: &str,
    ) -> &ExamResult {
        let now = Utc::now();
        let contributed_questions = if outcome == ExamOutcome::Pass && agreed_to_share {
            contributed_questions(&self.exam_type, &self.state, contributed_text, now)
        } else {
            Vec::new()
        };
        self.updated_at = now;
        self.result.insert(ExamResult {
            id: uuid::Uuid::new_v4().to_string(),
            registration_id: self.id.clone(),
            outcome,
            contributed_questions,
            agreed_to_share,
            submitted_at: now,
        })
    }
}

fn contributed_questions(
    exam_type: &str,
    state: &str,
    text: &str,
    now: DateTime<Utc>,
) -> Vec<ExamQuestion> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| ExamQuestion {
            id: format!("contributed_{}_{}", now.timestamp_millis(), index),
            exam_type: exam_type.to_string(),
            state: state.to_string(),
            question: line.to_string(),
            options: Vec::new(),
            correct_answer: 0,
            explanation: String::new(),
            difficulty: Difficulty::Medium,
            time_allowed_secs: DEFAULT_QUESTION_TIME_SECS,
            category: "general".to_string(),
            verified: false,
            created_at: now,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationProblem {
    #[error("Valid exam type is required")]
    UnknownExamType,
    #[error("Valid state is required")]
    UnknownState,
    #[error("Exam date must be in the future")]
    DateNotInFuture,
}

/// Every problem with a registration request; empty means valid.
pub fn validate_registration(
    exam_type_id: &str,
    state_code: &str,
    exam_date: NaiveDate,
    today: NaiveDate,
) -> Vec<RegistrationProblem> {
    let mut problems = Vec::new();
    if catalog::exam_type(exam_type_id).is_none() {
        problems.push(RegistrationProblem::UnknownExamType);
    }
    if catalog::jurisdiction(state_code).is_none() {
        problems.push(RegistrationProblem::UnknownState);
    }
    if exam_date <= today {
        problems.push(RegistrationProblem::DateNotInFuture);
    }
    problems
}

/// Rolling practice record for one exam in one jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExamProgress {
    pub sessions_completed: u32,
    pub questions_answered: u32,
    pub questions_correct: u32,
    #[serde(default)]
    pub best_score: u32,
    #[serde(default)]
    pub last_score: Option<u32>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl ExamProgress {
    /// Storage key for one exam/state pair.
    pub fn storage_key(exam_type: &str, state: &str) -> String {
        format!("progress_{}_{}", exam_type, state)
    }

    pub fn record(&mut self, outcome: &SessionOutcome) {
        self.sessions_completed += 1;
        self.questions_answered += outcome.total as u32;
        self.questions_correct += outcome.correct as u32;
        self.best_score = self.best_score.max(outcome.score);
        self.last_score = Some(outcome.score);
        self.last_updated = Some(Utc::now());
    }
}
