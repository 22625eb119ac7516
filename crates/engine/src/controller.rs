//! Session controller — drives think → plan → execute → observe to a
//! terminal state.
//!
//! One controller invocation owns one [`Session`] exclusively. Turn
//! numbers are contiguous; a failed attempt re-runs the same turn number
//! under the per-turn retry budget, discarding the discarded attempt's
//! thought and plan. Reasoning unavailability, unusable plans, and
//! low-confidence turns all draw on that one budget.
//!
//! Cancellation is observed at turn boundaries here and at ready-group
//! boundaries inside the executor, so aborting never interrupts an
//! in-flight tool call.

use crate::compactor::ContextCompactor;
use crate::executor::{FailurePolicy, ToolExecutor};
use crate::observer::ObservationSynthesizer;
use crate::planner::ActionPlanner;
use crate::thinker::ThoughtGenerator;
use reactor_core::config::ReactConfig;
use reactor_core::error::Error;
use reactor_core::message::{Message, Transcript};
use reactor_core::observation::{NextAction, ObservationResult};
use reactor_core::reasoning::ReasoningClient;
use reactor_core::session::{Session, SessionStatus, Turn};
use reactor_core::tool::CapabilityMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct SessionController {
    client: Arc<dyn ReasoningClient>,
    capabilities: Arc<CapabilityMap>,
    model: String,
    thinker: ThoughtGenerator,
    planner: ActionPlanner,
    executor: ToolExecutor,
    observer: ObservationSynthesizer,
    compactor: ContextCompactor,
    config: ReactConfig,
}

impl SessionController {
    /// Build a controller, rejecting an invalid configuration up front.
    pub fn new(
        client: Arc<dyn ReasoningClient>,
        capabilities: Arc<CapabilityMap>,
        model: impl Into<String>,
        config: ReactConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        let model = model.into();
        Ok(Self {
            thinker: ThoughtGenerator::new(Arc::clone(&client), &model),
            planner: ActionPlanner::new(&config),
            executor: ToolExecutor::new(Arc::clone(&capabilities), config.max_concurrency),
            observer: ObservationSynthesizer::new(&config),
            compactor: ContextCompactor::new(Arc::clone(&client), &model),
            client,
            capabilities,
            model,
            config,
        })
    }

    /// Replace the executor's failure policy. The default is fail-fast:
    /// the first required failure stops scheduling new groups.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.executor = ToolExecutor::new(Arc::clone(&self.capabilities), self.config.max_concurrency)
            .with_policy(policy);
        self
    }

    /// Tune the transcript compaction trigger. Compaction summarizes with
    /// the same model the thinker uses.
    pub fn with_compaction(mut self, token_budget: usize, retain_tail: usize) -> Self {
        self.compactor = ContextCompactor::new(Arc::clone(&self.client), &self.model)
            .with_token_budget(token_budget)
            .with_retain_tail(retain_tail);
        self
    }

    /// Run one task to a terminal session.
    ///
    /// Never returns an `Active` session: every exit path transitions to
    /// exactly one of Completed, Failed, Timeout, or Aborted.
    ///
    /// A thinking or execution deadline breach draws on the per-turn retry
    /// budget before the session ends as `Timeout`, so one turn's wall
    /// clock may span several attempts of that turn number.
    pub async fn run(
        &self,
        task_id: impl Into<String>,
        goal: impl Into<String>,
        cancel: CancellationToken,
    ) -> Session {
        let goal = goal.into();
        let mut session = Session::new(task_id, &goal, self.config.max_turns);
        info!(session = %session.id, %goal, "session started");

        let mut transcript = Transcript::new();
        transcript.push(Message::user(&goal));

        'session: loop {
            if cancel.is_cancelled() {
                finish(&mut session, SessionStatus::Aborted, Some("cancelled".into()));
                break;
            }
            if session.next_turn_number() > self.config.max_turns {
                finish(
                    &mut session,
                    SessionStatus::Failed,
                    Some("max turns exceeded".into()),
                );
                break;
            }

            let turn_number = session.next_turn_number();
            let mut retries: u32 = 0;

            // Attempts of this turn number; each retry starts the turn over.
            loop {
                self.compactor.maybe_compact(&mut transcript).await;

                let retries_remaining = if self.config.auto_retry {
                    self.config.max_retries.saturating_sub(retries)
                } else {
                    0
                };
                let mut turn = Turn::new(turn_number);
                turn.retries = retries;

                let thought = match tokio::time::timeout(
                    self.config.max_thinking_time(),
                    self.thinker.generate(&transcript),
                )
                .await
                {
                    Ok(Ok(thought)) => thought,
                    Ok(Err(err)) => {
                        warn!(turn = turn_number, error = %err, "reasoning unavailable");
                        if retries_remaining > 0 {
                            retries += 1;
                            backoff(retries).await;
                            continue;
                        }
                        let reason = format!("reasoning unavailable: {err}");
                        turn.fail(reason.clone());
                        record_turn(&mut session, turn);
                        finish(&mut session, SessionStatus::Failed, Some(reason));
                        break 'session;
                    }
                    Err(_) => {
                        warn!(turn = turn_number, "thinking deadline exceeded");
                        if retries_remaining > 0 {
                            retries += 1;
                            backoff(retries).await;
                            continue;
                        }
                        let reason = "thinking deadline exceeded".to_string();
                        turn.fail(reason.clone());
                        record_turn(&mut session, turn);
                        finish(&mut session, SessionStatus::Timeout, Some(reason));
                        break 'session;
                    }
                };

                let plan = match self.planner.plan(&thought) {
                    Ok(plan) => plan,
                    Err(err) => {
                        warn!(turn = turn_number, error = %err, "unusable plan");
                        if retries_remaining > 0 {
                            retries += 1;
                            backoff(retries).await;
                            continue;
                        }
                        let reason = format!("unusable plan: {err}");
                        turn.thought = Some(thought);
                        turn.fail(reason.clone());
                        record_turn(&mut session, turn);
                        finish(&mut session, SessionStatus::Failed, Some(reason));
                        break 'session;
                    }
                };

                let execution = self
                    .executor
                    .execute(&plan, self.config.max_execution_time(), &cancel)
                    .await;
                if execution.cancelled {
                    turn.thought = Some(thought);
                    turn.plan = Some(plan);
                    turn.fail("cancelled");
                    record_turn(&mut session, turn);
                    finish(&mut session, SessionStatus::Aborted, Some("cancelled".into()));
                    break 'session;
                }
                if execution.deadline_exceeded {
                    warn!(turn = turn_number, "execution deadline exceeded");
                    if retries_remaining > 0 {
                        retries += 1;
                        backoff(retries).await;
                        continue;
                    }
                    let reason = "execution deadline exceeded".to_string();
                    turn.thought = Some(thought);
                    turn.plan = Some(plan);
                    turn.fail(reason.clone());
                    record_turn(&mut session, turn);
                    finish(&mut session, SessionStatus::Timeout, Some(reason));
                    break 'session;
                }

                let observation =
                    self.observer
                        .synthesize(&thought, &plan, &execution, retries_remaining);
                debug!(
                    turn = turn_number,
                    action = %observation.next_action,
                    confidence = observation.confidence,
                    "turn observed"
                );
                turn.thought = Some(thought.clone());
                turn.plan = Some(plan);
                turn.observation = Some(observation.clone());

                match observation.next_action {
                    NextAction::Retry => {
                        // The synthesizer only recommends a retry inside
                        // the remaining budget.
                        retries += 1;
                        backoff(retries).await;
                        continue;
                    }
                    NextAction::Terminate => {
                        let answer = thought.final_answer();
                        let result = if answer.is_empty() {
                            observation.analysis.clone()
                        } else {
                            answer
                        };
                        turn.complete();
                        record_turn(&mut session, turn);
                        session.result = Some(result);
                        finish(&mut session, SessionStatus::Completed, None);
                        break 'session;
                    }
                    NextAction::FallbackExhausted => {
                        let reason = if observation.problems.is_empty() {
                            "tool execution failed".to_string()
                        } else {
                            format!("tool execution failed: {}", observation.problems.join("; "))
                        };
                        turn.fail(reason.clone());
                        record_turn(&mut session, turn);
                        finish(&mut session, SessionStatus::Failed, Some(reason));
                        break 'session;
                    }
                    NextAction::Continue => {
                        if observation.confidence < self.config.confidence_threshold {
                            let reason = "confidence below threshold".to_string();
                            turn.fail(reason.clone());
                            record_turn(&mut session, turn);
                            finish(&mut session, SessionStatus::Failed, Some(reason));
                            break 'session;
                        }
                        transcript.push(Message::assistant(&thought.analysis));
                        transcript.push(Message::user(render_observation(&observation)));
                        turn.complete();
                        record_turn(&mut session, turn);
                        break;
                    }
                }
            }
        }

        // On a non-completed exit, carry the best partial result forward.
        if session.result.is_none() {
            session.result = session
                .turns
                .iter()
                .rev()
                .find_map(|t| t.observation.as_ref().filter(|o| o.success))
                .map(|o| o.analysis.clone());
        }

        info!(
            session = %session.id,
            status = %session.status,
            turns = session.turns.len(),
            "session ended"
        );
        session
    }
}

fn record_turn(session: &mut Session, turn: Turn) {
    if let Err(err) = session.push_turn(turn) {
        warn!(session = %session.id, error = %err, "dropping unappendable turn");
    }
}

fn finish(session: &mut Session, status: SessionStatus, reason: Option<String>) {
    if let Err(err) = session.transition(status, reason) {
        warn!(session = %session.id, error = %err, "invalid session transition");
    }
}

/// Exponential backoff between attempts of the same turn, capped at 1s.
async fn backoff(attempt: u32) {
    let millis = (50u64 << attempt.min(5)).min(1_000);
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

fn render_observation(observation: &ObservationResult) -> String {
    let mut out = format!("Observation: {}", observation.analysis);
    if !observation.insights.is_empty() {
        out.push_str("\nInsights:");
        for insight in &observation.insights {
            out.push_str("\n- ");
            out.push_str(insight);
        }
    }
    if !observation.problems.is_empty() {
        out.push_str("\nProblems:");
        for problem in &observation.problems {
            out.push_str("\n- ");
            out.push_str(problem);
        }
    }
    out
}
