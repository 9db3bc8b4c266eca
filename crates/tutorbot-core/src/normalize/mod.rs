//! Validation of raw model output into typed study artifacts.
//!
//! The model is asked for a JSON array but routinely wraps it in prose or
//! markdown fences, adds trailing commas, invents field values, or returns
//! the wrong number of records. Everything past this module is fully typed:
//! each element is checked field by field, repaired where a safe default
//! exists, and dropped (with a recorded issue) where it cannot be repaired.

use crate::model::{
    ArtifactKind, Difficulty, ExamQuestion, Flashcard, QuizKind, QuizQuestion, StudyPlanDay,
    DEFAULT_QUESTION_TIME_SECS, EXAM_OPTION_COUNT, PLAN_DEFAULT_MINUTES, PLAN_MAX_MINUTES,
    PLAN_MIN_MINUTES, QUIZ_OPTION_COUNT,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Exam question time limits above this are treated as invalid.
const MAX_QUESTION_TIME_SECS: u64 = 3600;

const DEFAULT_EXAM_CATEGORY: &str = "general";

/// Activities given to a plan day that arrives without any.
pub const FALLBACK_ACTIVITIES: [&str; 3] = ["Review material", "Take notes", "Practice questions"];

/// A repair or drop applied to one element of the model's array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Position of the element in the model's array (0-based).
    pub index: usize,
    pub field: &'static str,
    pub problem: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "record {} `{}`: {}", self.index, self.field, self.problem)
    }
}

/// Schema-valid records plus every repair made to get them there.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    #[error("The model returned unusable {kind}: {reason}")]
    MalformedResponse {
        kind: ArtifactKind,
        reason: String,
        issues: Vec<ValidationIssue>,
    },
}

impl NormalizeError {
    fn malformed(kind: ArtifactKind, reason: impl Into<String>) -> Self {
        NormalizeError::MalformedResponse {
            kind,
            reason: reason.into(),
            issues: Vec::new(),
        }
    }
}

/// Parameters bound into a batch of exam questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamBatch<'a> {
    pub exam_type: &'a str,
    pub state: &'a str,
    pub count: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Strip markdown code fences from a response
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    clean.strip_suffix("```").unwrap_or(clean).trim()
}

fn trailing_comma_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r",\s*([\]}])").ok())
        .as_ref()
}

/// Try to fix common JSON issues from LLM responses
fn fix_json_issues(json: &str) -> String {
    let mut fixed = match trailing_comma_pattern() {
        Some(re) => re.replace_all(json, "$1").into_owned(),
        None => json.replace(",]", "]").replace(",}", "}"),
    };

    // Smart quotes to regular quotes
    fixed = fixed.replace(['\u{201C}', '\u{201D}'], "\"");
    fixed = fixed.replace(['\u{2018}', '\u{2019}'], "'");

    fixed
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Locate the span from the first `[` to the last `]` and parse it as an array.
fn extract_array(kind: ArtifactKind, raw: &str) -> Result<Vec<Value>, NormalizeError> {
    let text = strip_markdown_fences(raw);
    let (start, end) = match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Err(NormalizeError::malformed(kind, "no JSON array in response")),
    };
    let candidate = &text[start..=end];

    match serde_json::from_str::<Vec<Value>>(candidate) {
        Ok(values) => Ok(values),
        Err(first_err) => {
            log::debug!("{} array needed repair: {}", kind, first_err);
            serde_json::from_str::<Vec<Value>>(&fix_json_issues(candidate)).map_err(|_| {
                NormalizeError::malformed(kind, format!("JSON array did not parse: {}", first_err))
            })
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FIELD ACCESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-batch bookkeeping: issue log and id allocation.
struct Batch {
    kind: ArtifactKind,
    stamp: i64,
    seen_ids: HashSet<String>,
    issues: Vec<ValidationIssue>,
}

impl Batch {
    fn new(kind: ArtifactKind, now: DateTime<Utc>) -> Self {
        Self {
            kind,
            stamp: now.timestamp_millis(),
            seen_ids: HashSet::new(),
            issues: Vec::new(),
        }
    }

    fn issue(&mut self, index: usize, field: &'static str, problem: impl Into<String>) {
        self.issues.push(ValidationIssue {
            index,
            field,
            problem: problem.into(),
        });
    }

    /// Keep a usable model id, otherwise synthesize `{kind}_{timestamp}_{index}`.
    fn id(&mut self, index: usize, record: &Map<String, Value>) -> String {
        let provided = text_field(record, &["id"]);
        if let Some(id) = provided.as_ref() {
            if self.seen_ids.insert(id.clone()) {
                return id.clone();
            }
            self.issue(index, "id", "duplicate id replaced");
        } else {
            self.issue(index, "id", "missing id synthesized");
        }

        let base = format!("{}_{}_{}", self.kind.id_prefix(), self.stamp, index);
        let mut candidate = base.clone();
        let mut suffix = 1;
        while !self.seen_ids.insert(candidate.clone()) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        candidate
    }

    fn difficulty(&mut self, index: usize, record: &Map<String, Value>) -> Difficulty {
        match record.get("difficulty") {
            Some(Value::String(label)) => Difficulty::parse(label).unwrap_or_else(|| {
                self.issue(index, "difficulty", format!("unknown '{}'", label));
                Difficulty::Medium
            }),
            Some(_) => {
                self.issue(index, "difficulty", "not a string");
                Difficulty::Medium
            }
            None => Difficulty::Medium,
        }
    }

    /// Exactly `count` non-blank options, or a placeholder set of that size.
    fn options(&mut self, index: usize, record: &Map<String, Value>, count: usize) -> Vec<String> {
        let parsed = record.get("options").and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(scalar_text)
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
        });
        match parsed {
            Some(options) if options.len() == count => options,
            Some(options) => {
                self.issue(
                    index,
                    "options",
                    format!("expected {} options, got {}", count, options.len()),
                );
                placeholder_options(count)
            }
            None => {
                self.issue(index, "options", "missing or not a list");
                placeholder_options(count)
            }
        }
    }

    /// Index into an option set of `len` entries; anything else becomes 0.
    fn correct_index(&mut self, index: usize, record: &Map<String, Value>, len: usize) -> usize {
        let value = field(record, &["correctAnswer", "correct_answer"]);
        match value.and_then(Value::as_u64) {
            Some(idx) if (idx as usize) < len => idx as usize,
            Some(idx) => {
                self.issue(index, "correctAnswer", format!("index {} out of bounds", idx));
                0
            }
            None => {
                self.issue(index, "correctAnswer", "missing or not an index");
                0
            }
        }
    }

    /// Required text; `None` means the record cannot be repaired.
    fn required_text(
        &mut self,
        index: usize,
        record: &Map<String, Value>,
        field: &'static str,
        names: &[&str],
    ) -> Option<String> {
        let text = text_field(record, names);
        if text.is_none() {
            self.issue(index, field, "missing or blank; record dropped");
        }
        text
    }

    fn finish<T>(self, records: Vec<T>) -> Result<Normalized<T>, NormalizeError> {
        log::debug!(
            "normalized {}: {} records kept, {} issues",
            self.kind,
            records.len(),
            self.issues.len()
        );
        for issue in &self.issues {
            log::trace!("{} record {}: {} {}", self.kind, issue.index, issue.field, issue.problem);
        }
        if records.is_empty() {
            return Err(NormalizeError::MalformedResponse {
                kind: self.kind,
                reason: "no usable records".to_string(),
                issues: self.issues,
            });
        }
        Ok(Normalized {
            records,
            issues: self.issues,
        })
    }
}

fn field<'a>(record: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| record.get(*name))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Non-blank string field under any of `names`.
fn text_field(record: &Map<String, Value>, names: &[&str]) -> Option<String> {
    field(record, names)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn text_list(record: &Map<String, Value>, name: &str) -> Vec<String> {
    record
        .get(name)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(scalar_text)
                .filter(|text| !text.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn whole_number(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })
}

fn placeholder_options(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("Option {}", char::from(b'A' + (i % 26) as u8)))
        .collect()
}

/// Iterate the elements that are JSON objects, logging the ones that are not.
fn objects(values: &[Value], batch: &mut Batch) -> Vec<(usize, Map<String, Value>)> {
    values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| match value {
            Value::Object(map) => Some((index, map.clone())),
            _ => {
                batch.issue(index, "record", "not an object; record dropped");
                None
            }
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// ARTIFACT KINDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Summaries have no structure to validate and pass through verbatim.
pub fn normalize_summary(raw: &str) -> String {
    raw.to_string()
}

/// At most `count` flashcards, every one unstarted.
pub fn normalize_flashcards(raw: &str, count: usize) -> Result<Normalized<Flashcard>, NormalizeError> {
    normalize_flashcards_at(raw, count, Utc::now())
}

pub fn normalize_flashcards_at(
    raw: &str,
    count: usize,
    now: DateTime<Utc>,
) -> Result<Normalized<Flashcard>, NormalizeError> {
    let kind = ArtifactKind::Flashcards;
    let values = extract_array(kind, raw)?;
    let mut batch = Batch::new(kind, now);
    let mut cards = Vec::new();

    for (index, record) in objects(&values, &mut batch) {
        if cards.len() == count {
            break;
        }
        let Some(question) = batch.required_text(index, &record, "question", &["question", "front"])
        else {
            continue;
        };
        let Some(answer) = batch.required_text(index, &record, "answer", &["answer", "back"]) else {
            continue;
        };
        cards.push(Flashcard {
            id: batch.id(index, &record),
            question,
            answer,
            difficulty: batch.difficulty(index, &record),
            mastered: false,
            review_count: 0,
            last_reviewed: None,
        });
    }

    batch.finish(cards)
}

/// At most `count` quiz questions with exactly four options each.
pub fn normalize_quiz(raw: &str, count: usize) -> Result<Normalized<QuizQuestion>, NormalizeError> {
    normalize_quiz_at(raw, count, Utc::now())
}

pub fn normalize_quiz_at(
    raw: &str,
    count: usize,
    now: DateTime<Utc>,
) -> Result<Normalized<QuizQuestion>, NormalizeError> {
    let kind = ArtifactKind::Quiz;
    let values = extract_array(kind, raw)?;
    let mut batch = Batch::new(kind, now);
    let mut questions = Vec::new();

    for (index, record) in objects(&values, &mut batch) {
        if questions.len() == count {
            break;
        }
        let Some(question) = batch.required_text(index, &record, "question", &["question"]) else {
            continue;
        };
        let options = batch.options(index, &record, QUIZ_OPTION_COUNT);
        let correct_answer = batch.correct_index(index, &record, options.len());
        let quiz_kind = match record.get("type").and_then(Value::as_str) {
            Some(label) => QuizKind::parse(label).unwrap_or_else(|| {
                batch.issue(index, "type", format!("unknown '{}'", label));
                QuizKind::MultipleChoice
            }),
            None => QuizKind::MultipleChoice,
        };
        questions.push(QuizQuestion {
            id: batch.id(index, &record),
            question,
            options,
            correct_answer,
            kind: quiz_kind,
            difficulty: batch.difficulty(index, &record),
            answered: false,
            user_answer: None,
            is_correct: None,
        });
    }

    batch.finish(questions)
}

/// At most `batch.count` exam questions with exactly five options each.
pub fn normalize_exam_questions(
    raw: &str,
    request: &ExamBatch<'_>,
) -> Result<Normalized<ExamQuestion>, NormalizeError> {
    normalize_exam_questions_at(raw, request, Utc::now())
}

pub fn normalize_exam_questions_at(
    raw: &str,
    request: &ExamBatch<'_>,
    now: DateTime<Utc>,
) -> Result<Normalized<ExamQuestion>, NormalizeError> {
    let kind = ArtifactKind::ExamQuestions;
    let values = extract_array(kind, raw)?;
    let mut batch = Batch::new(kind, now);
    let mut questions = Vec::new();

    for (index, record) in objects(&values, &mut batch) {
        if questions.len() == request.count {
            break;
        }
        let Some(question) = batch.required_text(index, &record, "question", &["question"]) else {
            continue;
        };
        let options = batch.options(index, &record, EXAM_OPTION_COUNT);
        let correct_answer = batch.correct_index(index, &record, options.len());

        let time_allowed_secs = match field(
            &record,
            &["timeAllowed", "timeAllowedSeconds", "time_allowed_secs"],
        )
        .and_then(whole_number)
        {
            Some(secs) if (1..=MAX_QUESTION_TIME_SECS).contains(&secs) => secs as u32,
            Some(secs) => {
                batch.issue(index, "timeAllowed", format!("{} seconds out of range", secs));
                DEFAULT_QUESTION_TIME_SECS
            }
            None => DEFAULT_QUESTION_TIME_SECS,
        };

        questions.push(ExamQuestion {
            id: batch.id(index, &record),
            exam_type: request.exam_type.to_string(),
            state: request.state.to_string(),
            question,
            options,
            correct_answer,
            explanation: text_field(&record, &["explanation"]).unwrap_or_default(),
            difficulty: batch.difficulty(index, &record),
            time_allowed_secs,
            category: text_field(&record, &["category"])
                .unwrap_or_else(|| DEFAULT_EXAM_CATEGORY.to_string()),
            verified: false,
            created_at: now,
        });
    }

    batch.finish(questions)
}

/// The placeholder day used to pad a short plan.
pub fn fallback_plan_day(day: u32, date: NaiveDate) -> StudyPlanDay {
    StudyPlanDay {
        day,
        date,
        topics: vec![format!("Day {} Topics", day)],
        duration_minutes: PLAN_DEFAULT_MINUTES,
        activities: FALLBACK_ACTIVITIES.iter().map(|s| s.to_string()).collect(),
        completed: false,
    }
}

/// Exactly `days` plan days numbered `1..=days`, dated from `today`.
pub fn normalize_study_plan(
    raw: &str,
    days: usize,
    today: NaiveDate,
) -> Result<Normalized<StudyPlanDay>, NormalizeError> {
    let kind = ArtifactKind::StudyPlan;
    let values = extract_array(kind, raw)?;
    let mut batch = Batch::new(kind, Utc::now());

    let mut plan = Vec::with_capacity(days);
    for (index, record) in objects(&values, &mut batch) {
        if plan.len() == days {
            break;
        }
        let position = plan.len() as u32 + 1;

        let mut topics = text_list(&record, "topics");
        if topics.is_empty() {
            batch.issue(index, "topics", "empty; placeholder used");
            topics = vec![format!("Day {} Topics", position)];
        }

        let mut activities = text_list(&record, "activities");
        if activities.is_empty() {
            batch.issue(index, "activities", "empty; defaults used");
            activities = FALLBACK_ACTIVITIES.iter().map(|s| s.to_string()).collect();
        }

        let duration_minutes = match field(
            &record,
            &["duration", "durationMinutes", "duration_minutes"],
        )
        .and_then(whole_number)
        {
            Some(minutes)
                if (PLAN_MIN_MINUTES as u64..=PLAN_MAX_MINUTES as u64).contains(&minutes) =>
            {
                minutes as u32
            }
            Some(minutes) => {
                batch.issue(index, "duration", format!("{} minutes out of range", minutes));
                PLAN_DEFAULT_MINUTES
            }
            None => {
                batch.issue(index, "duration", "missing");
                PLAN_DEFAULT_MINUTES
            }
        };

        plan.push(StudyPlanDay {
            day: position,
            date: today,
            topics,
            duration_minutes,
            activities,
            completed: false,
        });
    }

    if plan.is_empty() {
        return batch.finish(plan);
    }

    while plan.len() < days {
        let position = plan.len() as u32 + 1;
        batch.issue(plan.len(), "record", "missing day padded");
        plan.push(fallback_plan_day(position, today));
    }

    for (offset, day) in plan.iter_mut().enumerate() {
        day.day = offset as u32 + 1;
        day.date = today
            .checked_add_days(Days::new(offset as u64))
            .unwrap_or(today);
    }

    batch.finish(plan)
}
