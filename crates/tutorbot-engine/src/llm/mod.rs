pub mod client;
pub mod models;
pub mod prompts;

pub use client::{sanitize_api_response, CompletionGateway, GatewayError, HttpGateway};
pub use models::{ModelSettings, Usage};
pub use prompts::PromptPair;
