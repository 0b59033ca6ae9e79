//! Routing state machine
//!
//! A two-node graph sequencing the `reason` and `execute` steps of a turn.
//! Routing itself is pure; the nodes do the I/O and never fail past their
//! boundary, so every turn ends in exactly one terminal condition.

mod execute;
mod graph;
mod reason;
pub mod state;
pub mod transition;

#[cfg(test)]
mod proptests;

pub use execute::execute;
pub use graph::{TurnGraph, DEFAULT_EVENT_BUFFER};
pub use reason::{build_request, reason, ReasonOptions, DEFAULT_SYSTEM_PROMPT};
pub use state::{
    AgentState, ChatMessage, ExecuteOutcome, ReasonOutcome, Role, ToolCall, TurnInput,
    TurnOutcome,
};
pub use transition::{route, Node, Route, RoutingError};

/// Error recorded when a turn is cancelled through its handle
pub const CANCELLED: &str = "turn cancelled";
