//! Tool executor — dependency-ordered, bounded-concurrency plan execution.
//!
//! Steps run in ready groups: a step is ready once every step it depends
//! on has resolved. Within a group, parallel-flagged steps fan out onto a
//! `JoinSet` bounded by a shared semaphore; a non-parallel step runs
//! alone. Cancellation is observed only between groups, so an in-flight
//! group always runs to completion before the executor yields.
//!
//! Each call gets an equal share of the remaining execution budget for
//! its group; a lone outstanding call gets the full remainder. A call's
//! fallback chain consumes the same share, so a slow primary starves its
//! own fallback rather than the rest of the plan.

use reactor_core::observation::StepOutcome;
use reactor_core::plan::{ActionPlan, PlannedToolCall};
use reactor_core::tool::{CapabilityMap, ToolResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How the executor reacts to a non-optional step failing after its
/// fallback chain is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop scheduling new groups on the first required failure (default).
    #[default]
    FailFast,
    /// Keep executing independent steps; dependents of the failed step are
    /// skipped with a synthetic outcome.
    BestEffort,
}

/// The outcome of executing one plan.
#[derive(Debug, Clone)]
pub struct PlanExecution {
    /// Resolved outcomes in declared step order per group
    pub outcomes: Vec<StepOutcome>,

    /// True when a required step failed, the budget ran out, or the plan
    /// was cancelled before completing
    pub plan_failed: bool,

    /// True when the plan stopped because of cancellation
    pub cancelled: bool,

    /// True when the execution budget ran out with steps still pending
    pub deadline_exceeded: bool,

    /// Wall-clock duration of the execution phase
    pub duration_ms: u64,
}

impl PlanExecution {
    /// True iff the plan ran to completion and every required step succeeded.
    pub fn succeeded(&self) -> bool {
        !self.plan_failed && !self.outcomes.iter().any(StepOutcome::counts_as_failure)
    }

    /// Number of steps whose final result was successful.
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.success).count()
    }

    /// Number of steps resolved through a fallback.
    pub fn fallbacks_used(&self) -> usize {
        self.outcomes.iter().filter(|o| o.fallback_used).count()
    }
}

/// Executes validated [`ActionPlan`]s against a [`CapabilityMap`].
pub struct ToolExecutor {
    capabilities: Arc<CapabilityMap>,
    semaphore: Arc<Semaphore>,
    policy: FailurePolicy,
}

impl ToolExecutor {
    pub fn new(capabilities: Arc<CapabilityMap>, max_concurrency: usize) -> Self {
        Self {
            capabilities,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Execute a plan within `budget`, observing `cancel` at group
    /// boundaries.
    ///
    /// The caller is responsible for validating the plan first; an
    /// unvalidated plan with unsatisfiable dependencies resolves as a
    /// failed execution rather than a hang.
    pub async fn execute(
        &self,
        plan: &ActionPlan,
        budget: Duration,
        cancel: &CancellationToken,
    ) -> PlanExecution {
        let started = Instant::now();
        let deadline = started + budget;

        let mut outcomes: Vec<StepOutcome> = Vec::new();
        let mut resolved: BTreeSet<String> = BTreeSet::new();
        let mut failed: BTreeSet<String> = BTreeSet::new();
        let mut plan_failed = false;
        let mut cancelled = false;
        let mut deadline_exceeded = false;

        'groups: while resolved.len() < plan.steps.len() {
            if cancel.is_cancelled() {
                debug!("cancellation observed at group boundary");
                cancelled = true;
                plan_failed = true;
                break;
            }

            if self.policy == FailurePolicy::BestEffort {
                skip_blocked_steps(plan, &mut resolved, &mut failed, &mut outcomes);
                if resolved.len() == plan.steps.len() {
                    break;
                }
            }

            let mut ready: Vec<(usize, &PlannedToolCall)> = plan
                .steps
                .iter()
                .enumerate()
                .filter(|(_, s)| !resolved.contains(&s.id))
                .filter(|(_, s)| plan.deps_of(&s.id).iter().all(|d| resolved.contains(d)))
                .collect();

            if ready.is_empty() {
                warn!("no runnable steps remain with the plan incomplete");
                plan_failed = true;
                break;
            }
            ready.sort_by(|a, b| b.1.priority.cmp(&a.1.priority).then(a.0.cmp(&b.0)));

            // A parallel-flagged head pulls every other ready parallel step
            // into its group; a sequential head runs alone.
            let group: Vec<(usize, PlannedToolCall)> = if ready[0].1.parallel {
                ready
                    .iter()
                    .filter(|(_, s)| s.parallel)
                    .map(|(i, s)| (*i, (*s).clone()))
                    .collect()
            } else {
                vec![(ready[0].0, ready[0].1.clone())]
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(pending = plan.steps.len() - resolved.len(), "execution budget exhausted");
                plan_failed = true;
                deadline_exceeded = true;
                break;
            }
            let share = remaining / group.len() as u32;

            let mut join_set = JoinSet::new();
            for (index, call) in group {
                let capabilities = Arc::clone(&self.capabilities);
                let semaphore = Arc::clone(&self.semaphore);
                join_set.spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    let call_deadline = Instant::now() + share;
                    (index, run_call(capabilities, call, call_deadline).await)
                });
            }

            let mut group_outcomes = Vec::new();
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok(pair) => group_outcomes.push(pair),
                    Err(err) => {
                        warn!(error = %err, "tool task aborted");
                        plan_failed = true;
                    }
                }
            }
            group_outcomes.sort_by_key(|(index, _)| *index);

            // Record the whole group before reacting to failures, so a
            // sibling that did run never vanishes from the outcomes.
            let mut group_failed = false;
            for (_, outcome) in group_outcomes {
                resolved.insert(outcome.step_id.clone());
                group_failed |= outcome.counts_as_failure();
                if !outcome.result.success {
                    failed.insert(outcome.step_id.clone());
                }
                outcomes.push(outcome);
            }
            if group_failed && self.policy == FailurePolicy::FailFast {
                plan_failed = true;
                break 'groups;
            }
        }

        PlanExecution {
            outcomes,
            plan_failed,
            cancelled,
            deadline_exceeded,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Resolve pending steps whose dependencies failed with a synthetic
/// outcome, cascading down the dependency graph.
fn skip_blocked_steps(
    plan: &ActionPlan,
    resolved: &mut BTreeSet<String>,
    failed: &mut BTreeSet<String>,
    outcomes: &mut Vec<StepOutcome>,
) {
    loop {
        let blocked: Vec<&PlannedToolCall> = plan
            .steps
            .iter()
            .filter(|s| !resolved.contains(&s.id))
            .filter(|s| plan.deps_of(&s.id).iter().any(|d| failed.contains(d)))
            .collect();
        if blocked.is_empty() {
            return;
        }
        for step in blocked {
            debug!(step = %step.id, "skipping step with failed dependency");
            resolved.insert(step.id.clone());
            failed.insert(step.id.clone());
            outcomes.push(StepOutcome {
                step_id: step.id.clone(),
                tool: step.tool.clone(),
                result: ToolResult::failure("dependency failed"),
                fallback_used: false,
                optional: step.optional,
                retryable: false,
            });
        }
    }
}

/// Run one call and walk its fallback chain on failure.
///
/// The chain shares the call's deadline, so every link sees only what the
/// earlier links left. An optional call never falls back; its first
/// failure is final and does not count against the plan.
async fn run_call(
    capabilities: Arc<CapabilityMap>,
    call: PlannedToolCall,
    deadline: Instant,
) -> StepOutcome {
    let step_id = call.id.clone();
    let optional = call.optional;
    let mut current = call;
    let mut fallback_used = false;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let (result, retryable) = match capabilities
            .execute(&current.tool, current.arguments.clone(), remaining)
            .await
        {
            Ok(result) => {
                let retryable = !result.success;
                (result, retryable)
            }
            Err(err) => {
                let retryable = err.is_transient();
                (ToolResult::failure(err.to_string()), retryable)
            }
        };

        if result.success {
            return StepOutcome {
                step_id,
                tool: current.tool.clone(),
                result,
                fallback_used,
                optional,
                retryable: false,
            };
        }
        if optional {
            return StepOutcome {
                step_id,
                tool: current.tool.clone(),
                result,
                fallback_used,
                optional,
                retryable,
            };
        }

        match current.fallback.take() {
            Some(next) => {
                debug!(step = %step_id, from = %current.tool, to = %next.tool, "falling back");
                fallback_used = true;
                current = *next;
            }
            None => {
                return StepOutcome {
                    step_id,
                    tool: current.tool.clone(),
                    result,
                    fallback_used,
                    optional,
                    retryable,
                };
            }
        }
    }
}
