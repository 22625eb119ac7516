//! # Reactor Engine
//!
//! The think → plan → execute → observe loop built on the domain model in
//! `reactor-core`. Each phase is its own component with a narrow seam:
//!
//! - [`thinker::ThoughtGenerator`] produces one reasoning record per turn
//! - [`planner::ActionPlanner`] derives a validated action plan from it
//! - [`executor::ToolExecutor`] runs the plan with dependency ordering,
//!   bounded parallelism, and fallback chains
//! - [`observer::ObservationSynthesizer`] folds the results into a
//!   continuation decision
//! - [`controller::SessionController`] drives the loop to a terminal
//!   session state
//! - [`compactor::ContextCompactor`] keeps the transcript inside its
//!   token budget along the way
//!
//! The engine is transport-agnostic: it talks to the reasoning model
//! through `ReasoningClient` and to capabilities through `ToolProvider`,
//! both defined in `reactor-core`.

pub mod compactor;
pub mod controller;
pub mod executor;
pub mod observer;
pub mod planner;
pub mod thinker;
pub mod token;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use compactor::ContextCompactor;
pub use controller::SessionController;
pub use executor::{FailurePolicy, PlanExecution, ToolExecutor};
pub use observer::ObservationSynthesizer;
pub use planner::ActionPlanner;
pub use thinker::ThoughtGenerator;
