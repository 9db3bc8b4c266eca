use super::models::{ModelSettings, Usage, PROBE_MAX_TOKENS};
use super::prompts::TUTOR_SYSTEM;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Maximum length for error content in error messages
const MAX_ERROR_CONTENT_LEN: usize = 200;

/// Failure of a single completion call. Never retried here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("No API key configured. Run 'tutorbot setup' to add one.")]
    AuthConfig,
    #[error("The AI service rejected the request ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
}

impl GatewayError {
    /// Missing credential, or one the service refused.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            GatewayError::AuthConfig => true,
            GatewayError::Upstream { status, .. } => matches!(status, 401 | 403),
            GatewayError::Transport(_) => false,
        }
    }
}

/// The only way out of the process to the language model.
pub trait CompletionGateway: Send + Sync {
    /// Send one system + user prompt pair and return the completion text.
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>>;

    /// Minimal paid call; `true` only when the service answered successfully.
    fn check_credential(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// Sanitize API response content for error messages to prevent credential leakage.
pub fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "api_key",
        "apikey",
        "secret",
        "password",
        "credential",
        "bearer",
        "gsk_", // Groq key prefix
        "sk-",
    ];

    let truncated = truncate_str(content, MAX_ERROR_CONTENT_LEN);

    // Check if the content might contain secrets
    let lower = truncated.to_lowercase();
    for pattern in SECRET_PATTERNS {
        if lower.contains(pattern) {
            return "(response details redacted - may contain sensitive data)".to_string();
        }
    }

    truncated.to_string()
}

/// Truncate a string for display (Unicode-safe)
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    tutorbot_core::text::truncate_str(s, max_chars)
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    /// Content can be null in some API responses (e.g., when refusal or error occurs)
    #[serde(default)]
    content: Option<String>,
    /// Refusal reason - set when content is blocked by content moderation
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Message for a non-success status: the body's `error.message` when present.
fn upstream_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let message = envelope.error.message.trim();
        if !message.is_empty() {
            return sanitize_api_response(message);
        }
    }
    match status.as_u16() {
        401 | 403 => "Invalid API key. Run 'tutorbot setup' to update it.".to_string(),
        429 => "Rate limited. Wait a moment and try again.".to_string(),
        500..=599 => "The AI service is temporarily unavailable.".to_string(),
        code => format!("Request failed with status {}", code),
    }
}

fn map_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Transport("The AI service timed out. Please try again.".to_string())
    } else if err.is_connect() {
        GatewayError::Transport(
            "Could not reach the AI service. Check your connection and try again.".to_string(),
        )
    } else {
        GatewayError::Transport(format!("Request failed: {}", err))
    }
}

/// Create a configured HTTP client for completion requests
pub(crate) fn create_http_client(timeout_secs: u64) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))
}

/// OpenAI-compatible chat completions over HTTPS with a bearer key.
pub struct HttpGateway {
    client: reqwest::Client,
    settings: ModelSettings,
    api_key: Option<String>,
}

impl HttpGateway {
    pub fn new(settings: ModelSettings, api_key: Option<String>) -> Result<Self, GatewayError> {
        let client = create_http_client(settings.timeout_secs)?;
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        Ok(Self {
            client,
            settings,
            api_key,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(&self, system: &str, user: &str, max_tokens: u32) -> Result<String, GatewayError> {
        let api_key = self.api_key.as_deref().ok_or(GatewayError::AuthConfig)?;

        let request = ChatRequest {
            model: &self.settings.model,
            messages: [
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            log::warn!("completion request failed with status {}", status.as_u16());
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message: upstream_message(status, &text),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|_| GatewayError::Upstream {
                status: status.as_u16(),
                message: format!(
                    "Unexpected response shape: {}",
                    sanitize_api_response(&text)
                ),
            })?;

        if let Some(usage) = &parsed.usage {
            log::debug!(
                "completion usage: prompt={} completion={} total={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }

        let choice = parsed.choices.into_iter().next();
        if let Some(refusal) = choice.as_ref().and_then(|c| c.message.refusal.as_deref()) {
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message: format!("Request was refused: {}", truncate_str(refusal, 200)),
            });
        }

        Ok(choice
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

impl CompletionGateway for HttpGateway {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>> {
        self.send(system, user, self.settings.max_tokens).boxed()
    }

    fn check_credential(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        async move {
            match self.send(TUTOR_SYSTEM, "Test", PROBE_MAX_TOKENS).await {
                Ok(_) => true,
                Err(err) => {
                    log::warn!("credential probe failed: {}", err);
                    false
                }
            }
        }
        .boxed()
    }
}
