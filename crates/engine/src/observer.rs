//! Observation synthesizer — folds one turn's execution into a decision.
//!
//! Produces the turn's [`ObservationResult`]: per-step outcomes, a
//! synthesized confidence score, and a recommended continuation. The
//! controller owns final termination; in particular a below-threshold
//! turn with no retry budget left comes back as `Continue` and the
//! controller decides whether that fails the session.

use crate::executor::PlanExecution;
use reactor_core::config::ReactConfig;
use reactor_core::observation::{NextAction, ObservationResult};
use reactor_core::plan::ActionPlan;
use reactor_core::thought::Thought;
use tracing::debug;

const SUCCESS_WEIGHT: f32 = 0.6;
const THOUGHT_WEIGHT: f32 = 0.4;
const FALLBACK_PENALTY: f32 = 0.1;

/// Maximum characters of tool output carried into an insight.
const INSIGHT_LIMIT: usize = 200;

pub struct ObservationSynthesizer {
    confidence_threshold: f32,
    auto_retry: bool,
}

impl ObservationSynthesizer {
    pub fn new(config: &ReactConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            auto_retry: config.auto_retry,
        }
    }

    /// Synthesize the observation for one executed turn.
    ///
    /// Confidence blends the step success fraction with the thought's own
    /// confidence, minus a penalty per fallback taken: a turn that only
    /// survived through its fallbacks is treated as weaker evidence than
    /// one that ran clean.
    pub fn synthesize(
        &self,
        thought: &Thought,
        plan: &ActionPlan,
        execution: &PlanExecution,
        retries_remaining: u32,
    ) -> ObservationResult {
        let outcomes = execution.outcomes.clone();
        let success = execution.succeeded() && !execution.cancelled;

        let success_fraction = if outcomes.is_empty() {
            if execution.plan_failed { 0.0 } else { 1.0 }
        } else {
            execution.successes() as f32 / outcomes.len() as f32
        };
        let confidence = (SUCCESS_WEIGHT * success_fraction + THOUGHT_WEIGHT * thought.confidence
            - FALLBACK_PENALTY * execution.fallbacks_used() as f32)
            .clamp(0.0, 1.0);

        let mut insights = Vec::new();
        let mut problems = Vec::new();
        for outcome in &outcomes {
            if outcome.result.success {
                let output = outcome.result.output.trim();
                if !output.is_empty() {
                    let mut line = output.lines().next().unwrap_or_default().to_string();
                    line.truncate(INSIGHT_LIMIT);
                    insights.push(format!("{}: {line}", outcome.tool));
                }
            } else {
                let error = outcome.result.error.as_deref().unwrap_or("unknown error");
                problems.push(format!("{}: {error}", outcome.tool));
            }
        }
        if execution.cancelled {
            problems.push("execution cancelled before the plan completed".into());
        } else if execution.deadline_exceeded {
            problems.push("execution budget exhausted before the plan completed".into());
        }

        let goal_met = plan.is_empty() || thought.signals_completion();
        let retry_allowed = self.auto_retry && retries_remaining > 0;
        let failure_retryable = outcomes
            .iter()
            .any(|o| o.counts_as_failure() && o.retryable)
            || execution.deadline_exceeded;

        let next_action = if execution.cancelled {
            NextAction::Continue
        } else if success && goal_met && confidence >= self.confidence_threshold {
            NextAction::Terminate
        } else if !success {
            if failure_retryable && retry_allowed {
                NextAction::Retry
            } else {
                NextAction::FallbackExhausted
            }
        } else if confidence < self.confidence_threshold && retry_allowed {
            NextAction::Retry
        } else {
            NextAction::Continue
        };

        let analysis = format!(
            "{}/{} steps succeeded (confidence {confidence:.2}); next: {next_action}",
            execution.successes(),
            outcomes.len(),
        );
        debug!(%next_action, confidence, success, "observation synthesized");

        ObservationResult {
            outcomes,
            success,
            confidence,
            analysis,
            insights,
            problems,
            next_action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactor_core::observation::StepOutcome;
    use reactor_core::plan::{PlanStrategy, PlannedToolCall};
    use reactor_core::thought::{COMPLETION_MARKER, Thought};
    use reactor_core::tool::ToolResult;

    fn synthesizer() -> ObservationSynthesizer {
        ObservationSynthesizer::new(&ReactConfig::default())
    }

    fn outcome(step_id: &str, success: bool) -> StepOutcome {
        StepOutcome {
            step_id: step_id.into(),
            tool: "tool".into(),
            result: if success {
                ToolResult::ok("done")
            } else {
                ToolResult::failure("boom")
            },
            fallback_used: false,
            optional: false,
            retryable: !success,
        }
    }

    fn execution(outcomes: Vec<StepOutcome>, plan_failed: bool) -> PlanExecution {
        PlanExecution {
            outcomes,
            plan_failed,
            cancelled: false,
            deadline_exceeded: false,
            duration_ms: 12,
        }
    }

    fn plan_with_steps(count: usize) -> ActionPlan {
        let mut plan = ActionPlan::new(PlanStrategy::Adaptive);
        for i in 0..count {
            plan.push_step(PlannedToolCall::new(format!("s{}", i + 1), "tool"));
        }
        plan
    }

    fn completing_thought(confidence: f32) -> Thought {
        Thought::new(format!("All done. {COMPLETION_MARKER}")).with_confidence(confidence)
    }

    #[test]
    fn clean_completion_terminates() {
        let obs = synthesizer().synthesize(
            &completing_thought(0.9),
            &plan_with_steps(2),
            &execution(vec![outcome("s1", true), outcome("s2", true)], false),
            2,
        );
        assert_eq!(obs.next_action, NextAction::Terminate);
        assert!(obs.success);
        // 0.6 * 1.0 + 0.4 * 0.9
        assert!((obs.confidence - 0.96).abs() < 1e-5);
    }

    #[test]
    fn empty_plan_counts_as_goal_met() {
        let thought = Thought::new("nothing left to do").with_confidence(0.9);
        let obs = synthesizer().synthesize(
            &thought,
            &ActionPlan::new(PlanStrategy::Adaptive),
            &execution(vec![], false),
            2,
        );
        assert_eq!(obs.next_action, NextAction::Terminate);
    }

    #[test]
    fn success_without_completion_signal_continues() {
        let thought = Thought::new("progress made").with_confidence(0.9);
        let obs = synthesizer().synthesize(
            &thought,
            &plan_with_steps(1),
            &execution(vec![outcome("s1", true)], false),
            2,
        );
        assert_eq!(obs.next_action, NextAction::Continue);
    }

    #[test]
    fn fallback_use_lowers_confidence() {
        let mut with_fallback = outcome("s1", true);
        with_fallback.fallback_used = true;

        let thought = completing_thought(0.9);
        let clean = synthesizer().synthesize(
            &thought,
            &plan_with_steps(1),
            &execution(vec![outcome("s1", true)], false),
            2,
        );
        let degraded = synthesizer().synthesize(
            &thought,
            &plan_with_steps(1),
            &execution(vec![with_fallback], false),
            2,
        );
        assert!((clean.confidence - degraded.confidence - 0.1).abs() < 1e-5);
    }

    #[test]
    fn retryable_failure_with_budget_retries() {
        let obs = synthesizer().synthesize(
            &Thought::new("try it").with_confidence(0.8),
            &plan_with_steps(1),
            &execution(vec![outcome("s1", false)], true),
            1,
        );
        assert_eq!(obs.next_action, NextAction::Retry);
        assert!(!obs.success);
        assert_eq!(obs.problems.len(), 1);
    }

    #[test]
    fn retryable_failure_without_budget_is_exhausted() {
        let obs = synthesizer().synthesize(
            &Thought::new("try it").with_confidence(0.8),
            &plan_with_steps(1),
            &execution(vec![outcome("s1", false)], true),
            0,
        );
        assert_eq!(obs.next_action, NextAction::FallbackExhausted);
    }

    #[test]
    fn non_retryable_failure_skips_the_retry_budget() {
        let mut missing = outcome("s1", false);
        missing.retryable = false;
        let obs = synthesizer().synthesize(
            &Thought::new("try it").with_confidence(0.8),
            &plan_with_steps(1),
            &execution(vec![missing], true),
            2,
        );
        assert_eq!(obs.next_action, NextAction::FallbackExhausted);
    }

    #[test]
    fn low_confidence_success_retries_while_budget_lasts() {
        let thought = Thought::new("unsure").with_confidence(0.1);
        let exec = execution(vec![outcome("s1", true)], false);

        let with_budget =
            synthesizer().synthesize(&thought, &plan_with_steps(1), &exec, 2);
        assert_eq!(with_budget.next_action, NextAction::Retry);

        // Without budget the controller decides; the observer just reports.
        let without_budget =
            synthesizer().synthesize(&thought, &plan_with_steps(1), &exec, 0);
        assert_eq!(without_budget.next_action, NextAction::Continue);
        assert!(without_budget.confidence < 0.7);
    }

    #[test]
    fn cancelled_execution_reports_a_problem() {
        let exec = PlanExecution {
            outcomes: vec![outcome("s1", true)],
            plan_failed: true,
            cancelled: true,
            deadline_exceeded: false,
            duration_ms: 5,
        };
        let obs = synthesizer().synthesize(
            &completing_thought(0.9),
            &plan_with_steps(2),
            &exec,
            2,
        );
        assert!(!obs.success);
        assert!(obs.problems.iter().any(|p| p.contains("cancelled")));
    }
}
