//! Agent turn orchestration with incremental UI streaming
//!
//! A turn runs a two-node graph (`reason`, then optionally `execute`) whose
//! events are multiplexed into an ordered sequence of UI patches plus a
//! single final result.

pub mod api;
pub mod config;
pub mod events;
pub mod llm;
pub mod multiplexer;
pub mod present;
pub mod runtime;
pub mod state_machine;
pub mod tools;
pub mod ui;
