//! Session and Turn — the loop's state model.
//!
//! A session is owned and mutated by exactly one session controller. Turn
//! numbers are contiguous starting at 1, a session never exceeds its
//! max-turn limit, and a session's status is terminal if and only if no
//! further turns will be appended. Transitions outside the table below
//! are rejected, not silently accepted.

use crate::error::SessionError;
use crate::observation::ObservationResult;
use crate::plan::ActionPlan;
use crate::thought::Thought;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session lifecycle states. `Active -> {Completed, Failed, Timeout, Aborted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
    Timeout,
    Aborted,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }

    /// The transition table: Active may move to any terminal state;
    /// terminal states accept nothing.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(self, SessionStatus::Active) && next.is_terminal()
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Timeout => "timeout",
            SessionStatus::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

/// Turn lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Running,
    Completed,
    Failed,
}

impl TurnStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TurnStatus::Running)
    }
}

/// One iteration of think → plan → execute → observe.
///
/// Appended to its session's turn list and never removed; immutable once
/// its status is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// 1-based, contiguous turn number
    pub number: u32,

    /// The reasoning record, once produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<Thought>,

    /// The action plan, once produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<ActionPlan>,

    /// The synthesized observation, once produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<ObservationResult>,

    pub status: TurnStatus,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    /// Wall-clock duration, set when the turn ends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// How many times this turn number was re-attempted
    #[serde(default)]
    pub retries: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Turn {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            thought: None,
            plan: None,
            observation: None,
            status: TurnStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            retries: 0,
            error: None,
        }
    }

    fn end(&mut self, status: TurnStatus) {
        let now = Utc::now();
        self.duration_ms = Some(
            (now - self.started_at)
                .num_milliseconds()
                .max(0) as u64,
        );
        self.ended_at = Some(now);
        self.status = status;
    }

    pub fn complete(&mut self) {
        self.end(TurnStatus::Completed);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.end(TurnStatus::Failed);
    }
}

/// The full lifecycle of turns for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    /// The task this session works on
    pub task_id: String,

    /// The task goal text
    pub goal: String,

    pub status: SessionStatus,

    /// Ordered, contiguous turns
    pub turns: Vec<Turn>,

    pub max_turns: u32,

    pub started_at: DateTime<Utc>,

    /// Set exactly when the status becomes terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    /// Final (or best partial) result text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// Human-readable reason for Failed / Timeout / Aborted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Session {
    pub fn new(task_id: impl Into<String>, goal: impl Into<String>, max_turns: u32) -> Self {
        Self {
            id: SessionId::new(),
            task_id: task_id.into(),
            goal: goal.into(),
            status: SessionStatus::Active,
            turns: Vec::new(),
            max_turns,
            started_at: Utc::now(),
            ended_at: None,
            result: None,
            reason: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The number the next appended turn must carry.
    pub fn next_turn_number(&self) -> u32 {
        self.turns.len() as u32 + 1
    }

    /// Append a finished or running turn, enforcing contiguity and limits.
    pub fn push_turn(&mut self, turn: Turn) -> Result<(), SessionError> {
        if self.is_terminal() {
            return Err(SessionError::SessionTerminal);
        }
        let expected = self.next_turn_number();
        if turn.number != expected {
            return Err(SessionError::NonContiguousTurn {
                expected,
                got: turn.number,
            });
        }
        if turn.number > self.max_turns {
            return Err(SessionError::TurnLimitExceeded {
                max_turns: self.max_turns,
            });
        }
        self.turns.push(turn);
        Ok(())
    }

    /// Move to a terminal state, recording the reason and end time.
    pub fn transition(
        &mut self,
        status: SessionStatus,
        reason: Option<String>,
    ) -> Result<(), SessionError> {
        if !self.status.can_transition_to(status) {
            return Err(SessionError::InvalidTransition {
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.status = status;
        self.reason = reason;
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    /// The last turn, if any.
    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }
}
