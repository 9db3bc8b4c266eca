use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds a question stays open when the source gives no usable limit.
pub const DEFAULT_QUESTION_TIME_SECS: u32 = 120;

/// Number of options every quiz question carries.
pub const QUIZ_OPTION_COUNT: usize = 4;

/// Number of options every licensing-exam question carries.
pub const EXAM_OPTION_COUNT: usize = 5;

/// Allowed study minutes per plan day.
pub const PLAN_MIN_MINUTES: u32 = 30;
pub const PLAN_MAX_MINUTES: u32 = 90;
pub const PLAN_DEFAULT_MINUTES: u32 = 60;

/// Kinds of generated study aids. Also keys request tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Summary,
    Flashcards,
    Quiz,
    StudyPlan,
    Chat,
    ExamQuestions,
}

impl ArtifactKind {
    /// Short prefix used for synthesized record ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Summary => "summary",
            ArtifactKind::Flashcards => "card",
            ArtifactKind::Quiz => "quiz",
            ArtifactKind::StudyPlan => "day",
            ArtifactKind::Chat => "msg",
            ArtifactKind::ExamQuestions => "exam",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Summary => "summary",
            ArtifactKind::Flashcards => "flashcards",
            ArtifactKind::Quiz => "quiz",
            ArtifactKind::StudyPlan => "study plan",
            ArtifactKind::Chat => "chat reply",
            ArtifactKind::ExamQuestions => "exam questions",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Exact, case-insensitive match against the three known labels.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRACTICE QUESTIONS AND ANSWERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Reference answer of a practice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum CorrectAnswer {
    /// Index into the question's options.
    Index(usize),
    /// Free-text reference answer for open-response questions.
    Text(String),
}

/// A practice question, the common shape of flashcards, quiz and exam questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    /// Empty for open-response questions.
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: CorrectAnswer,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub time_allowed_secs: u32,
}

impl Question {
    /// The reference answer rendered as text, resolving an option index.
    pub fn reference_text(&self) -> String {
        match &self.correct_answer {
            CorrectAnswer::Index(idx) => self
                .options
                .get(*idx)
                .cloned()
                .unwrap_or_else(|| idx.to_string()),
            CorrectAnswer::Text(text) => text.clone(),
        }
    }
}

/// What the user submitted for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum AnswerValue {
    /// Option index picked in multiple-choice mode.
    Choice(usize),
    /// Typed answer.
    Text(String),
    /// Flashcard self-report: `true` when the card was mastered.
    Mastery(bool),
    /// Time ran out or the question was skipped.
    NoAnswer,
}

impl AnswerValue {
    /// Strict comparison against a reference answer.
    ///
    /// Index answers compare by index; text answers compare exactly (case
    /// sensitive) against the reference text or the referenced option.
    pub fn matches(&self, question: &Question) -> bool {
        match (self, &question.correct_answer) {
            (AnswerValue::Choice(picked), CorrectAnswer::Index(expected)) => picked == expected,
            (AnswerValue::Choice(picked), CorrectAnswer::Text(expected)) => question
                .options
                .get(*picked)
                .is_some_and(|option| option == expected),
            (AnswerValue::Text(text), CorrectAnswer::Index(expected)) => question
                .options
                .get(*expected)
                .is_some_and(|option| option == text),
            (AnswerValue::Text(text), CorrectAnswer::Text(expected)) => text == expected,
            (AnswerValue::Mastery(mastered), _) => *mastered,
            (AnswerValue::NoAnswer, _) => false,
        }
    }
}

/// One recorded response. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub value: AnswerValue,
    pub is_correct: bool,
    pub time_spent_secs: u32,
    pub submitted_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATED ARTIFACTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub mastered: bool,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub last_reviewed: Option<DateTime<Utc>>,
}

impl Flashcard {
    /// Flashcards time their own reveal windows, so the question limit is nominal.
    pub fn to_question(&self) -> Question {
        Question {
            id: self.id.clone(),
            prompt: self.question.clone(),
            options: Vec::new(),
            correct_answer: CorrectAnswer::Text(self.answer.clone()),
            explanation: String::new(),
            difficulty: self.difficulty,
            time_allowed_secs: DEFAULT_QUESTION_TIME_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuizKind {
    #[default]
    MultipleChoice,
    TrueFalse,
}

impl QuizKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "multiple-choice" | "multiple_choice" => Some(QuizKind::MultipleChoice),
            "true-false" | "true_false" => Some(QuizKind::TrueFalse),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default)]
    pub kind: QuizKind,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub answered: bool,
    #[serde(default)]
    pub user_answer: Option<usize>,
    #[serde(default)]
    pub is_correct: Option<bool>,
}

impl QuizQuestion {
    pub fn to_question(&self) -> Question {
        Question {
            id: self.id.clone(),
            prompt: self.question.clone(),
            options: self.options.clone(),
            correct_answer: CorrectAnswer::Index(self.correct_answer),
            explanation: String::new(),
            difficulty: self.difficulty,
            time_allowed_secs: DEFAULT_QUESTION_TIME_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub id: String,
    pub exam_type: String,
    pub state: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub time_allowed_secs: u32,
    pub category: String,
    #[serde(default)]
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl ExamQuestion {
    /// `None` for contributed questions, which carry no options and no
    /// answer key to grade against.
    pub fn to_question(&self) -> Option<Question> {
        if self.options.is_empty() {
            return None;
        }
        Some(Question {
            id: self.id.clone(),
            prompt: self.question.clone(),
            options: self.options.clone(),
            correct_answer: CorrectAnswer::Index(self.correct_answer),
            explanation: self.explanation.clone(),
            difficulty: self.difficulty,
            time_allowed_secs: self.time_allowed_secs,
        })
    }
}

/// One day of a generated study plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyPlanDay {
    /// 1-based, contiguous across the plan.
    pub day: u32,
    pub date: NaiveDate,
    pub topics: Vec<String>,
    pub duration_minutes: u32,
    pub activities: Vec<String>,
    #[serde(default)]
    pub completed: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
}

impl ChatRole {
    /// Speaker label used when history is rendered into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Bot => "bot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatQuestionType {
    Review,
    Encouragement,
    Weakness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<ChatQuestionType>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            question_type: None,
        }
    }
}
