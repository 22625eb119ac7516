//! Error types for the Reactor domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Reactor operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Reasoning-model errors ---
    #[error("Reasoning error: {0}")]
    Reasoning(#[from] ReasoningError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Plan construction errors ---
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    // --- Session state errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the external reasoning model.
///
/// Both a transport failure and an empty-choices response surface as
/// "reasoning unavailable" to the session controller, which retries them
/// under the per-turn retry budget.
#[derive(Debug, Clone, Error)]
pub enum ReasoningError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Reasoning model returned no usable content")]
    EmptyResponse,

    #[error("Rate limited by reasoning model, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Reasoning call timed out: {0}")]
    Timeout(String),

    #[error("Reasoning client not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_ms}ms")]
    Timeout { tool_name: String, timeout_ms: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

impl ToolError {
    /// Whether a retry of the same call could plausibly succeed.
    ///
    /// Timeouts and execution failures are transient; a missing tool or
    /// malformed arguments will fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ToolError::Timeout { .. } | ToolError::ExecutionFailed { .. }
        )
    }
}

/// Construction-time violations of the action-plan contract.
///
/// These are programming-contract errors: a plan that fails validation is
/// never handed to the executor.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("Duplicate step id: {0}")]
    DuplicateStepId(String),

    #[error("Step {step} depends on unknown step {dependency}")]
    UnknownDependency { step: String, dependency: String },

    #[error("Dependency cycle involving step {0}")]
    DependencyCycle(String),

    #[error("Step {0} has an empty tool name")]
    EmptyToolName(String),
}

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Turn {got} breaks contiguity, expected {expected}")]
    NonContiguousTurn { expected: u32, got: u32 },

    #[error("Turn limit exceeded: {max_turns}")]
    TurnLimitExceeded { max_turns: u32 },

    #[error("Session is terminal, no further turns may be appended")]
    SessionTerminal,
}
