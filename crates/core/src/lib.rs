//! # Reactor Core
//!
//! Domain types, traits, and error definitions for the Reactor agent loop.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The two external collaborators — the reasoning model and the tool
//! providers — are defined as traits here. Implementations live outside
//! the core. This enables:
//! - Swapping transports without touching the loop
//! - Easy testing with scripted mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod config;
pub mod error;
pub mod message;
pub mod observation;
pub mod plan;
pub mod reasoning;
pub mod session;
pub mod thought;
pub mod tool;
pub mod value;

// Re-export key types at crate root for ergonomics
pub use config::ReactConfig;
pub use error::{Error, PlanError, ReasoningError, Result, SessionError, ToolError};
pub use message::{Message, Role, Transcript};
pub use observation::{NextAction, ObservationResult, StepOutcome};
pub use plan::{ActionPlan, PlanStrategy, PlannedToolCall};
pub use reasoning::{ChatChoice, ChatRequest, ChatResponse, ReasoningClient, Usage};
pub use session::{Session, SessionId, SessionStatus, Turn, TurnStatus};
pub use thought::Thought;
pub use tool::{CapabilityMap, ToolProvider, ToolResult};
pub use value::{ArgMap, ArgValue};
