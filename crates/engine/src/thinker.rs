//! Thought generator — one reasoning record per turn.
//!
//! Calls the external reasoning model once per invocation with the
//! current transcript, requesting structured output. A transport error or
//! empty content surfaces as [`ReasoningError`] ("reasoning unavailable");
//! the session controller retries it under the per-turn retry budget. A
//! response that is not parseable as the structured JSON degrades to a
//! raw-text thought instead of failing the turn.

use reactor_core::error::ReasoningError;
use reactor_core::message::{Message, Transcript};
use reactor_core::reasoning::{ChatRequest, ReasoningClient};
use reactor_core::thought::Thought;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// System prompt requesting the structured thought contract.
///
/// Actionable reasoning steps use the planner's directive grammar so the
/// plan can be derived deterministically from the thought.
const THOUGHT_PROMPT: &str = r#"You are the reasoning engine of an autonomous coding agent.
Given the task goal and the transcript so far, produce ONE reasoning step as a JSON object:

{
  "analysis": "what you know and what to do next",
  "strategy": "short strategy tag",
  "reasoning_steps": ["..."],
  "confidence": 0.0,
  "alternatives": ["other strategies considered"]
}

Each actionable reasoning step must be a directive of the form:
  use <tool> {"arg": "value"} [parallel] [optional] [after s1,s2] [fallback <tool> {"arg": "value"}]
Steps are numbered s1, s2, ... in order; refer to earlier steps by those ids in `after`.
Steps that are narration rather than directives are kept for the record but not executed.
When the task goal is fully met, include the phrase TASK COMPLETE in the analysis and plan no further actions."#;

/// Produces one [`Thought`] per invocation from the reasoning model.
pub struct ThoughtGenerator {
    client: Arc<dyn ReasoningClient>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ThoughtGenerator {
    pub fn new(client: Arc<dyn ReasoningClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Generate one reasoning record for the current transcript.
    pub async fn generate(&self, transcript: &Transcript) -> Result<Thought, ReasoningError> {
        let mut messages = vec![Message::system(THOUGHT_PROMPT)];
        messages.extend(transcript.messages().iter().cloned());

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self.client.chat(request).await?;
        let tokens_used = response.usage.map(|u| u.total_tokens).unwrap_or(0);
        let content = response
            .first_content()
            .ok_or(ReasoningError::EmptyResponse)?
            .to_string();

        debug!(model = %self.model, tokens = tokens_used, "thought generated");
        Ok(parse_thought(&content, tokens_used))
    }
}

#[derive(Debug, Deserialize)]
struct RawThought {
    #[serde(default)]
    analysis: String,
    #[serde(default)]
    strategy: String,
    #[serde(default)]
    reasoning_steps: Vec<String>,
    #[serde(default = "default_confidence")]
    confidence: f32,
    #[serde(default)]
    alternatives: Vec<String>,
}

fn default_confidence() -> f32 {
    0.5
}

/// Parse the structured thought contract, degrading to a raw-text thought
/// when the model did not honor it.
fn parse_thought(content: &str, tokens_used: u32) -> Thought {
    let parsed = extract_json_object(content)
        .and_then(|json| serde_json::from_str::<RawThought>(json).ok());

    match parsed {
        Some(raw) if !raw.analysis.trim().is_empty() || !raw.reasoning_steps.is_empty() => {
            let mut thought = Thought::new(raw.analysis)
                .with_steps(raw.reasoning_steps)
                .with_confidence(raw.confidence);
            if !raw.strategy.trim().is_empty() {
                thought.strategy = raw.strategy;
            }
            thought.alternatives = raw.alternatives;
            thought.tokens_used = tokens_used;
            thought
        }
        _ => {
            warn!("thought output was not structured JSON, using raw text");
            let mut thought = Thought::new(content.trim());
            thought.tokens_used = tokens_used;
            thought
        }
    }
}

/// Find the outermost JSON object in a blob of model output.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start { Some(&text[start..=end]) } else { None }
}
