//! Prompt → completion → validation, one operation per artifact kind.

use crate::llm::client::{CompletionGateway, GatewayError};
use crate::llm::prompts::{self, PromptPair, FLASHCARD_COUNT, QUIZ_QUESTION_COUNT};
use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tutorbot_core::model::{
    ArtifactKind, ChatMessage, Difficulty, ExamQuestion, Flashcard, QuizQuestion, StudyPlanDay,
};
use tutorbot_core::normalize::{self, ExamBatch, NormalizeError, Normalized};

/// Longest study plan that can be requested.
pub const MAX_PLAN_DAYS: usize = 30;

/// Largest exam-question batch per request.
pub const MAX_EXAM_QUESTIONS: usize = 25;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl GenerationError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, GenerationError::Gateway(err) if err.is_auth_failure())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REQUEST TOKENS
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifies one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken {
    pub kind: ArtifactKind,
    seq: u64,
}

/// A generation result tagged with the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<T> {
    pub token: RequestToken,
    pub value: T,
}

/// Latest-request-wins bookkeeping per artifact kind.
///
/// Results from a request that has since been superseded by a newer one of
/// the same kind are refused by [`RequestTracker::accept`].
#[derive(Debug, Default)]
pub struct RequestTracker {
    next_seq: AtomicU64,
    latest: Mutex<HashMap<ArtifactKind, u64>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, kind: ArtifactKind) -> RequestToken {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind, seq);
        RequestToken { kind, seq }
    }

    pub fn is_current(&self, token: &RequestToken) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&token.kind)
            .is_some_and(|latest| *latest == token.seq)
    }

    /// The value if it answers the newest request of its kind; stale results are dropped.
    pub fn accept<T>(&self, tracked: Tracked<T>) -> Option<T> {
        if self.is_current(&tracked.token) {
            Some(tracked.value)
        } else {
            log::debug!(
                "discarding stale {} result (request {})",
                tracked.token.kind,
                tracked.token.seq
            );
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE
// ═══════════════════════════════════════════════════════════════════════════════

/// Parameters of an exam-question batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamQuestionRequest {
    pub exam_type: String,
    pub state: String,
    pub difficulty: Difficulty,
    pub count: usize,
}

pub struct GenerationService {
    gateway: Arc<dyn CompletionGateway>,
    tracker: Arc<RequestTracker>,
}

impl GenerationService {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self {
            gateway,
            tracker: Arc::new(RequestTracker::new()),
        }
    }

    pub fn tracker(&self) -> &Arc<RequestTracker> {
        &self.tracker
    }

    pub async fn check_credential(&self) -> bool {
        self.gateway.check_credential().await
    }

    async fn call(&self, kind: ArtifactKind, prompt: &PromptPair) -> Result<String, GatewayError> {
        log::info!("requesting {}", kind);
        let raw = self.gateway.complete(&prompt.system, &prompt.user).await;
        match &raw {
            Ok(text) => log::debug!("{} response: {} chars", kind, text.len()),
            Err(err) => log::warn!("{} request failed: {}", kind, err),
        }
        raw
    }

    fn report<T>(kind: ArtifactKind, result: &Result<Normalized<T>, NormalizeError>) {
        match result {
            Ok(out) if !out.issues.is_empty() => log::debug!(
                "{}: {} records kept, {} repairs",
                kind,
                out.records.len(),
                out.issues.len()
            ),
            Ok(out) => log::debug!("{}: {} records kept", kind, out.records.len()),
            Err(err) => log::warn!("{}", err),
        }
    }

    pub async fn summarize(&self, content: &str) -> Result<Tracked<String>, GenerationError> {
        let kind = ArtifactKind::Summary;
        let token = self.tracker.issue(kind);
        let raw = self.call(kind, &prompts::summary_prompt(content)).await?;
        Ok(Tracked {
            token,
            value: normalize::normalize_summary(&raw),
        })
    }

    pub async fn make_flashcards(
        &self,
        content: &str,
    ) -> Result<Tracked<Normalized<Flashcard>>, GenerationError> {
        let kind = ArtifactKind::Flashcards;
        let token = self.tracker.issue(kind);
        let raw = self.call(kind, &prompts::flashcards_prompt(content)).await?;
        let result = normalize::normalize_flashcards(&raw, FLASHCARD_COUNT);
        Self::report(kind, &result);
        Ok(Tracked {
            token,
            value: result?,
        })
    }

    pub async fn make_quiz(
        &self,
        content: &str,
    ) -> Result<Tracked<Normalized<QuizQuestion>>, GenerationError> {
        let kind = ArtifactKind::Quiz;
        let token = self.tracker.issue(kind);
        let raw = self.call(kind, &prompts::quiz_prompt(content)).await?;
        let result = normalize::normalize_quiz(&raw, QUIZ_QUESTION_COUNT);
        Self::report(kind, &result);
        Ok(Tracked {
            token,
            value: result?,
        })
    }

    /// A plan of `days` days (clamped to 1..=30) starting today.
    pub async fn make_plan(
        &self,
        content: &str,
        days: usize,
    ) -> Result<Tracked<Normalized<StudyPlanDay>>, GenerationError> {
        self.make_plan_from(content, days, Local::now().date_naive())
            .await
    }

    pub async fn make_plan_from(
        &self,
        content: &str,
        days: usize,
        today: NaiveDate,
    ) -> Result<Tracked<Normalized<StudyPlanDay>>, GenerationError> {
        let kind = ArtifactKind::StudyPlan;
        let days = days.clamp(1, MAX_PLAN_DAYS);
        let token = self.tracker.issue(kind);
        let raw = self
            .call(kind, &prompts::study_plan_prompt(content, days))
            .await?;
        let result = normalize::normalize_study_plan(&raw, days, today);
        Self::report(kind, &result);
        Ok(Tracked {
            token,
            value: result?,
        })
    }

    pub async fn chat_reply(
        &self,
        content: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<Tracked<String>, GenerationError> {
        let kind = ArtifactKind::Chat;
        let token = self.tracker.issue(kind);
        let raw = self
            .call(kind, &prompts::chat_prompt(content, history, message))
            .await?;
        Ok(Tracked { token, value: raw })
    }

    pub async fn make_exam_questions(
        &self,
        request: &ExamQuestionRequest,
    ) -> Result<Tracked<Normalized<ExamQuestion>>, GenerationError> {
        let kind = ArtifactKind::ExamQuestions;
        let count = request.count.clamp(1, MAX_EXAM_QUESTIONS);
        let token = self.tracker.issue(kind);
        let prompt = prompts::exam_questions_prompt(
            &request.exam_type,
            &request.state,
            request.difficulty,
            count,
        );
        let raw = self.call(kind, &prompt).await?;
        let batch = ExamBatch {
            exam_type: &request.exam_type,
            state: &request.state,
            count,
        };
        let result = normalize::normalize_exam_questions(&raw, &batch);
        Self::report(kind, &result);
        Ok(Tracked {
            token,
            value: result?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;

    /// Replays canned completions in order and records the prompts it saw.
    #[derive(Default)]
    struct ScriptedGateway {
        replies: Mutex<VecDeque<Result<String, GatewayError>>>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGateway {
        fn with(replies: Vec<Result<String, GatewayError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<(String, String)> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl CompletionGateway for ScriptedGateway {
        fn complete<'a>(
            &'a self,
            system: &'a str,
            user: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::Transport("script exhausted".into())));
            async move { reply }.boxed()
        }

        fn check_credential(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
            async { true }.boxed()
        }
    }

    fn service(replies: Vec<Result<String, GatewayError>>) -> (GenerationService, Arc<ScriptedGateway>) {
        let gateway = ScriptedGateway::with(replies);
        (GenerationService::new(gateway.clone()), gateway)
    }

    #[tokio::test]
    async fn flashcards_flow_builds_prompt_and_normalizes() {
        let (svc, gateway) = service(vec![Ok(
            r#"[{"question": "What is ATP?", "answer": "Energy currency", "difficulty": "easy"}]"#
                .to_string(),
        )]);
        let tracked = svc.make_flashcards("Cells make ATP.").await.unwrap();
        assert_eq!(tracked.value.records.len(), 1);
        assert_eq!(tracked.token.kind, ArtifactKind::Flashcards);

        let seen = gateway.seen();
        assert_eq!(seen[0].0, prompts::TUTOR_SYSTEM);
        assert!(seen[0].1.contains("Generate 10 flashcards"));
        assert!(seen[0].1.contains("Cells make ATP."));
    }

    #[tokio::test]
    async fn malformed_output_is_a_typed_failure() {
        let (svc, _) = service(vec![Ok("I'd love to help!".to_string())]);
        let err = svc.make_quiz("material").await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Normalize(NormalizeError::MalformedResponse {
                kind: ArtifactKind::Quiz,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn gateway_failures_propagate_unchanged() {
        let (svc, _) = service(vec![
            Err(GatewayError::AuthConfig),
            Err(GatewayError::Upstream {
                status: 503,
                message: "busy".into(),
            }),
        ]);
        let first = svc.summarize("x").await.unwrap_err();
        assert!(first.is_auth_failure());
        let second = svc.chat_reply("x", &[], "hi").await.unwrap_err();
        assert_eq!(
            second,
            GenerationError::Gateway(GatewayError::Upstream {
                status: 503,
                message: "busy".into()
            })
        );
        assert!(!second.is_auth_failure());
    }

    #[tokio::test]
    async fn plan_days_are_clamped_and_dated_from_today() {
        let today = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let (svc, gateway) = service(vec![Ok(
            r#"[{"day": 1, "topics": ["Intro"], "duration": 45, "activities": ["Read"]}]"#
                .to_string(),
        )]);
        let plan = svc.make_plan_from("m", 90, today).await.unwrap().value;
        assert_eq!(plan.records.len(), MAX_PLAN_DAYS);
        assert_eq!(plan.records[0].date, today);
        assert!(gateway.seen()[0].1.contains("Create a 30-day study plan"));
    }

    #[tokio::test]
    async fn exam_questions_carry_request_binding() {
        let (svc, gateway) = service(vec![Ok(r#"[{"question": "Q?", "options": ["a","b","c","d","e"], "correctAnswer": 3}]"#.to_string())]);
        let request = ExamQuestionRequest {
            exam_type: "series-7".to_string(),
            state: "NY".to_string(),
            difficulty: Difficulty::Hard,
            count: 5,
        };
        let out = svc.make_exam_questions(&request).await.unwrap().value;
        assert_eq!(out.records[0].exam_type, "series-7");
        assert_eq!(out.records[0].correct_answer, 3);
        assert!(gateway.seen()[0].1.contains("Write 5 hard practice questions"));
    }

    #[tokio::test]
    async fn only_latest_request_per_kind_is_accepted() {
        let (svc, _) = service(vec![
            Ok("first summary".to_string()),
            Ok("second summary".to_string()),
            Ok("reply".to_string()),
        ]);
        let older = svc.summarize("m").await.unwrap();
        let newer = svc.summarize("m").await.unwrap();
        let chat = svc.chat_reply("m", &[], "hi").await.unwrap();

        let tracker = svc.tracker();
        assert_eq!(tracker.accept(older), None);
        assert_eq!(tracker.accept(newer), Some("second summary".to_string()));
        assert_eq!(tracker.accept(chat), Some("reply".to_string()));
    }

    #[test]
    fn tracker_tokens_are_per_kind() {
        let tracker = RequestTracker::new();
        let quiz = tracker.issue(ArtifactKind::Quiz);
        let cards = tracker.issue(ArtifactKind::Flashcards);
        assert!(tracker.is_current(&quiz));
        assert!(tracker.is_current(&cards));
        let quiz_again = tracker.issue(ArtifactKind::Quiz);
        assert!(!tracker.is_current(&quiz));
        assert!(tracker.is_current(&quiz_again));
    }
}
