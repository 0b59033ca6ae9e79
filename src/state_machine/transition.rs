//! Pure routing between graph nodes
//!
//! The graph is `START -> reason -> (execute | done)`, `execute -> done`.
//! Routing decisions only read [`AgentState`]; they never perform I/O.

use super::AgentState;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Nodes of the routing graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Reason,
    Execute,
}

impl Node {
    pub fn as_str(self) -> &'static str {
        match self {
            Node::Reason => "reason",
            Node::Execute => "execute",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to go after a node finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Next(Node),
    Done,
}

/// The graph was wired or fed in a way it cannot route
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("neither a tool call nor a result was produced")]
    NoDecision,
    #[error("execute was reached without a tool call")]
    MissingToolCall,
}

/// Conditional edge evaluated after `reason`
pub fn route_after_reason(state: &AgentState) -> Result<Route, RoutingError> {
    if state.error.is_some() {
        Ok(Route::Done)
    } else if state.tool_call.is_some() {
        Ok(Route::Next(Node::Execute))
    } else if state.result.is_some() {
        Ok(Route::Done)
    } else {
        Err(RoutingError::NoDecision)
    }
}

/// Unconditional edge after `execute`; there is no loop back to `reason`
pub fn route_after_execute(_state: &AgentState) -> Route {
    Route::Done
}

/// Route from `node` given the state it left behind
pub fn route(node: Node, state: &AgentState) -> Result<Route, RoutingError> {
    match node {
        Node::Reason => route_after_reason(state),
        Node::Execute => Ok(route_after_execute(state)),
    }
}
