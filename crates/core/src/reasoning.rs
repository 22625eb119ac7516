//! ReasoningClient trait — the abstraction over the external reasoning model.
//!
//! The thought generator, planner confidence inputs, and context compactor
//! all consume this one interface. Transport implementations (OpenAI-style
//! HTTP, local inference, mocks) live outside the core.

use crate::error::ReasoningError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chat-completion request to the reasoning model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model selector (e.g., "gpt-4o", "claude-sonnet-4")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// One completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    /// The generated message
    pub message: Message,

    /// Why generation stopped ("stop", "length", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A complete response from the reasoning model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Completion choices (at least one on success)
    pub choices: Vec<ChatChoice>,

    /// Token usage, when the transport reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

impl ChatResponse {
    /// The content of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .filter(|c| !c.trim().is_empty())
    }
}

/// The core reasoning-client trait.
///
/// A transport error and an empty-choices response are both mapped to
/// [`ReasoningError`] by callers; the loop treats either as "reasoning
/// unavailable" and retries under the per-turn budget.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// A human-readable name for this client (e.g., "openai", "mock").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ReasoningError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_content_skips_blank() {
        let resp = ChatResponse {
            choices: vec![ChatChoice {
                message: Message::assistant("   "),
                finish_reason: Some("stop".into()),
            }],
            usage: None,
            model: "m".into(),
        };
        assert!(resp.first_content().is_none());
    }

    #[test]
    fn first_content_returns_text() {
        let resp = ChatResponse {
            choices: vec![ChatChoice {
                message: Message::assistant("hello"),
                finish_reason: None,
            }],
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 2,
                total_tokens: 12,
            }),
            model: "m".into(),
        };
        assert_eq!(resp.first_content(), Some("hello"));
    }

    #[test]
    fn empty_choices_has_no_content() {
        let resp = ChatResponse {
            choices: vec![],
            usage: None,
            model: "m".into(),
        };
        assert!(resp.first_content().is_none());
    }
}
