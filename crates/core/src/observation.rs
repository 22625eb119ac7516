//! ObservationResult — the synthesized outcome of one turn's execution.

use crate::tool::ToolResult;
use serde::{Deserialize, Serialize};

/// What the controller should do after this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NextAction {
    /// More turns are needed
    Continue,
    /// Failure looks transient and the retry budget allows another attempt
    Retry,
    /// A non-optional call failed with no fallback remaining
    FallbackExhausted,
    /// The goal is met; accept this turn as final
    Terminate,
}

impl std::fmt::Display for NextAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NextAction::Continue => "continue",
            NextAction::Retry => "retry",
            NextAction::FallbackExhausted => "fallback-exhausted",
            NextAction::Terminate => "terminate",
        };
        write!(f, "{s}")
    }
}

/// The resolved outcome of one plan step, after any fallback substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    /// The originating step id
    pub step_id: String,

    /// The tool that actually produced the result (the fallback's name
    /// when a fallback was substituted)
    pub tool: String,

    /// The final result for this step
    pub result: ToolResult,

    /// Whether a fallback was invoked to produce this result
    pub fallback_used: bool,

    /// Whether the step was marked optional
    pub optional: bool,

    /// Whether a failure here looked transient (eligible for plan retry)
    pub retryable: bool,
}

impl StepOutcome {
    /// A failed step counts against the plan unless it is optional.
    pub fn counts_as_failure(&self) -> bool {
        !self.result.success && !self.optional
    }
}

/// Aggregate of one turn's tool results plus the continuation decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationResult {
    /// Per-step resolved results
    pub outcomes: Vec<StepOutcome>,

    /// True iff every non-optional step (after fallback resolution) succeeded
    pub success: bool,

    /// Synthesized confidence in [0,1]
    pub confidence: f32,

    /// Free-text analysis of the execution
    pub analysis: String,

    /// Useful signals extracted from the results
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<String>,

    /// Problems worth surfacing to the next thought
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<String>,

    /// Recommended continuation
    pub next_action: NextAction,
}
