//! Thought — one reasoning record per turn.

use serde::{Deserialize, Serialize};

/// Marker the reasoning model emits in its analysis when it judges the
/// task goal to be met. The observation synthesizer uses it as one of the
/// terminate signals.
pub const COMPLETION_MARKER: &str = "TASK COMPLETE";

/// A single reasoning record produced by the thought generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thought {
    /// Free-form analysis text
    pub analysis: String,

    /// Chosen strategy tag (e.g., "investigate", "direct")
    pub strategy: String,

    /// Ordered reasoning steps; actionable steps use the planner's
    /// directive grammar
    pub steps: Vec<String>,

    /// Confidence in [0,1]
    pub confidence: f32,

    /// Alternative strategies considered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,

    /// Token cost of producing this thought
    #[serde(default)]
    pub tokens_used: u32,
}

impl Thought {
    pub fn new(analysis: impl Into<String>) -> Self {
        Self {
            analysis: analysis.into(),
            strategy: "direct".to_string(),
            steps: Vec::new(),
            confidence: 0.5,
            alternatives: Vec::new(),
            tokens_used: 0,
        }
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    /// Set confidence, clamped to [0,1].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Whether the analysis declares the task goal met.
    pub fn signals_completion(&self) -> bool {
        self.analysis.contains(COMPLETION_MARKER)
    }

    /// The analysis with the completion marker stripped, for presentation.
    pub fn final_answer(&self) -> String {
        self.analysis.replace(COMPLETION_MARKER, "").trim().to_string()
    }
}
