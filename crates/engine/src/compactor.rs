//! Context compactor — keeps the transcript inside a token budget.
//!
//! When the estimated transcript size crosses the budget, all but the
//! most recent messages are summarized through the reasoning model and
//! replaced with one tagged system message. Compaction is strictly
//! best-effort: a client error leaves the transcript untouched, and a
//! response that is not the structured summary contract is used as plain
//! text rather than discarded.

use crate::thinker::extract_json_object;
use crate::token::estimate_messages_tokens;
use reactor_core::message::{Message, Role, Transcript};
use reactor_core::reasoning::{ChatRequest, ReasoningClient};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

const SUMMARY_PROMPT: &str = r#"Summarize the following agent transcript for use as compressed context.
Respond with a JSON object:

{
  "summary": "2-3 sentence overview",
  "key_points": ["important facts and findings"],
  "topics": ["main topics discussed"],
  "action_items": ["outstanding work"],
  "decisions": ["decisions made and their rationale"],
  "code_changes": [{"file": "path", "description": "what changed", "type": "created|modified|deleted"}],
  "context": {"label": "anything else the agent must not lose"}
}

Be specific: keep file paths, error messages, and commands verbatim where they matter."#;

const BRIEF_PROMPT: &str =
    "Condense the following text to at most three sentences. Keep concrete identifiers verbatim.";

/// Default transcript budget before compaction kicks in.
pub const DEFAULT_TOKEN_BUDGET: usize = 8_000;

/// Default number of most-recent messages kept verbatim.
pub const DEFAULT_RETAIN_TAIL: usize = 6;

#[derive(Debug, Clone, Default, Deserialize)]
struct TranscriptSummary {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    action_items: Vec<String>,
    #[serde(default)]
    decisions: Vec<String>,
    #[serde(default)]
    code_changes: Vec<CodeChange>,
    #[serde(default)]
    context: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CodeChange {
    file: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type", default)]
    kind: ChangeKind,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ChangeKind {
    Created,
    #[default]
    Modified,
    Deleted,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

impl TranscriptSummary {
    fn render(&self) -> String {
        let mut out = String::from("[Conversation summary]\n");
        if !self.summary.trim().is_empty() {
            out.push_str(self.summary.trim());
            out.push('\n');
        }
        push_section(&mut out, "Key points", &self.key_points);
        push_section(&mut out, "Topics", &self.topics);
        push_section(&mut out, "Decisions", &self.decisions);
        push_section(&mut out, "Outstanding", &self.action_items);
        if !self.code_changes.is_empty() {
            out.push_str("Code changes:\n");
            for change in &self.code_changes {
                out.push_str(&format!(
                    "- {} ({}): {}\n",
                    change.file, change.kind, change.description
                ));
            }
        }
        if !self.context.is_empty() {
            out.push_str("Context:\n");
            for (key, value) in &self.context {
                out.push_str(&format!("- {key}: {value}\n"));
            }
        }
        out.trim_end().to_string()
    }
}

fn push_section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(title);
    out.push_str(":\n");
    for item in items {
        out.push_str("- ");
        out.push_str(item);
        out.push('\n');
    }
}

/// Best-effort transcript compaction against a token budget.
pub struct ContextCompactor {
    client: Arc<dyn ReasoningClient>,
    model: String,
    token_budget: usize,
    retain_tail: usize,
}

impl ContextCompactor {
    pub fn new(client: Arc<dyn ReasoningClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            token_budget: DEFAULT_TOKEN_BUDGET,
            retain_tail: DEFAULT_RETAIN_TAIL,
        }
    }

    pub fn with_token_budget(mut self, budget: usize) -> Self {
        self.token_budget = budget;
        self
    }

    pub fn with_retain_tail(mut self, tail: usize) -> Self {
        self.retain_tail = tail;
        self
    }

    /// Estimated token size of a transcript under this compactor's model.
    pub fn estimate(&self, transcript: &Transcript) -> usize {
        estimate_messages_tokens(transcript.messages())
    }

    /// Compact the transcript if it exceeds the token budget.
    ///
    /// Returns whether a compaction took place. Never fails: a reasoning
    /// client error skips compaction for this turn and the transcript is
    /// left as-is.
    pub async fn maybe_compact(&self, transcript: &mut Transcript) -> bool {
        let before = self.estimate(transcript);
        if before <= self.token_budget {
            return false;
        }
        let head_count = transcript.len().saturating_sub(self.retain_tail);
        if head_count == 0 {
            debug!(tokens = before, "over budget but the retained tail is the whole transcript");
            return false;
        }

        let head = &transcript.messages()[..head_count];
        let rendered = render_for_summary(head);

        let content = match self.summarize(SUMMARY_PROMPT, &rendered).await {
            Some(content) => content,
            None => return false,
        };

        let summary_text = match extract_json_object(&content)
            .and_then(|json| serde_json::from_str::<TranscriptSummary>(json).ok())
        {
            Some(summary) => summary.render(),
            None => {
                warn!("summary output was not structured JSON, using raw text");
                format!("[Conversation summary]\n{}", content.trim())
            }
        };

        transcript.replace_head(head_count, Message::context_summary(summary_text));
        let after = self.estimate(transcript);
        debug!(before, after, compacted = head_count, "transcript compacted");
        true
    }

    /// One-shot condensation of arbitrary text. Empty string on any error.
    pub async fn compact_brief(&self, text: &str) -> String {
        self.summarize(BRIEF_PROMPT, text).await.unwrap_or_default()
    }

    async fn summarize(&self, prompt: &str, input: &str) -> Option<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::system(prompt), Message::user(input)],
            temperature: 0.3,
            max_tokens: None,
        };
        match self.client.chat(request).await {
            Ok(response) => response.first_content().map(str::to_string),
            Err(err) => {
                warn!(error = %err, "summarization unavailable, skipping compaction");
                None
            }
        }
    }
}

fn render_for_summary(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        out.push_str(&format!("[{role}] {}\n", message.content));
    }
    out
}
