//! Loop configuration.
//!
//! Plain serde struct with defaults; file loading and CLI parsing are the
//! embedding application's concern.

use crate::error::Error;
use crate::plan::PlanStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the think → plan → execute → observe loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactConfig {
    /// Maximum turns per session (must be > 0)
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Per-turn deadline for the thought-generation call, in milliseconds
    #[serde(default = "default_thinking_ms")]
    pub max_thinking_time_ms: u64,

    /// Per-turn deadline for the whole tool-execution phase, in milliseconds
    #[serde(default = "default_execution_ms")]
    pub max_execution_time_ms: u64,

    /// Minimum observation confidence to accept a turn, in [0,1]
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Whether low-confidence / failed turns are retried automatically
    #[serde(default = "default_true")]
    pub auto_retry: bool,

    /// Retry budget per turn (>= 0)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Whether the planner must attach fallbacks to non-optional calls
    #[serde(default = "default_true")]
    pub enable_fallback: bool,

    /// Default scheduling strategy for generated plans
    #[serde(default)]
    pub strategy: PlanStrategy,

    /// Concurrency limit for the tool executor's fan-out (must be > 0)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_turns() -> u32 {
    10
}
fn default_thinking_ms() -> u64 {
    30_000
}
fn default_execution_ms() -> u64 {
    60_000
}
fn default_confidence_threshold() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}
fn default_max_retries() -> u32 {
    2
}
fn default_max_concurrency() -> usize {
    4
}

impl Default for ReactConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_thinking_time_ms: default_thinking_ms(),
            max_execution_time_ms: default_execution_ms(),
            confidence_threshold: default_confidence_threshold(),
            auto_retry: true,
            max_retries: default_max_retries(),
            enable_fallback: true,
            strategy: PlanStrategy::default(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl ReactConfig {
    pub fn max_thinking_time(&self) -> Duration {
        Duration::from_millis(self.max_thinking_time_ms)
    }

    pub fn max_execution_time(&self) -> Duration {
        Duration::from_millis(self.max_execution_time_ms)
    }

    /// Wall-clock deadline for one whole turn.
    pub fn turn_deadline(&self) -> Duration {
        self.max_thinking_time() + self.max_execution_time()
    }

    /// Reject out-of-range values before a session starts.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_turns == 0 {
            return Err(Error::Config {
                message: "max_turns must be greater than zero".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Config {
                message: format!(
                    "confidence_threshold must be in [0,1], got {}",
                    self.confidence_threshold
                ),
            });
        }
        if self.max_concurrency == 0 {
            return Err(Error::Config {
                message: "max_concurrency must be greater than zero".into(),
            });
        }
        if self.max_thinking_time_ms == 0 || self.max_execution_time_ms == 0 {
            return Err(Error::Config {
                message: "per-turn deadlines must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ReactConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_turns, 10);
        assert!(config.auto_retry);
        assert!(config.enable_fallback);
    }

    #[test]
    fn zero_max_turns_rejected() {
        let config = ReactConfig {
            max_turns: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let config = ReactConfig {
            confidence_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn turn_deadline_is_sum() {
        let config = ReactConfig {
            max_thinking_time_ms: 100,
            max_execution_time_ms: 250,
            ..Default::default()
        };
        assert_eq!(config.turn_deadline(), Duration::from_millis(350));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ReactConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_concurrency, 4);
    }
}
