//! Message and Transcript domain types.
//!
//! The transcript is the running conversation handed to the reasoning
//! model each turn: the task goal, per-turn thought summaries, and
//! observations. The context compactor replaces a prefix of it with a
//! single summary message when the token budget is crossed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata key used to tag compaction summary messages.
pub const METADATA_TYPE: &str = "type";

/// Metadata value marking a message as a compaction summary.
pub const CONTEXT_SUMMARY_TYPE: &str = "context_summary";

/// The role of a message sender in a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user / task goal
    User,
    /// The reasoning model
    Assistant,
    /// System instructions and compaction summaries
    System,
}

/// A single message in a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Optional metadata (summary tagging, provenance)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a system message tagged as a compaction summary.
    pub fn context_summary(content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::System, content);
        msg.metadata.insert(
            METADATA_TYPE.to_string(),
            serde_json::Value::String(CONTEXT_SUMMARY_TYPE.to_string()),
        );
        msg
    }

    /// Whether this message is a compaction summary.
    pub fn is_context_summary(&self) -> bool {
        self.metadata
            .get(METADATA_TYPE)
            .and_then(|v| v.as_str())
            .is_some_and(|t| t == CONTEXT_SUMMARY_TYPE)
    }
}

/// The ordered message history fed to the reasoning model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Replace the first `count` messages with a single summary message.
    ///
    /// Used by the context compactor; the retained tail keeps its order.
    pub fn replace_head(&mut self, count: usize, summary: Message) {
        let count = count.min(self.messages.len());
        let tail = self.messages.split_off(count);
        self.messages = std::iter::once(summary).chain(tail).collect();
    }
}
