//! UI output model
//!
//! The engine never renders anything itself. It publishes an append-only,
//! closeable sequence of [`UiPatch`]es describing top-level entries; a
//! renderer folds them into a [`UiDocument`].

mod document;
mod fragment;
mod streamable;

pub use document::UiDocument;
pub use fragment::{CardField, Fragment};
pub use streamable::{StreamKey, StreamRegistry, StreamableValue};

use crate::events::RunId;
use serde::{Deserialize, Serialize};

/// One top-level entry of the UI Output Sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEntry {
    /// A finished, self-contained fragment
    Fragment { fragment: Fragment },
    /// Text that is still arriving token by token
    Stream { value: StreamableValue },
}

impl UiEntry {
    pub fn fragment(fragment: Fragment) -> Self {
        UiEntry::Fragment { fragment }
    }

    /// Text visible in this entry, if it carries any
    pub fn text(&self) -> Option<String> {
        match self {
            UiEntry::Fragment { fragment } => fragment.text().map(str::to_string),
            UiEntry::Stream { value } => Some(value.text()),
        }
    }

    /// Whether the entry still shows a placeholder or an unfinished stream
    pub fn is_pending(&self) -> bool {
        match self {
            UiEntry::Fragment { fragment } => fragment.is_pending(),
            UiEntry::Stream { value } => !value.is_closed(),
        }
    }
}

/// An incremental change to the UI Output Sequence
///
/// Indexes address top-level entries in append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UiPatch {
    Append { index: usize, entry: UiEntry },
    Replace { index: usize, entry: UiEntry },
    StreamDelta { index: usize, run_id: RunId, text: String },
    StreamClosed { index: usize, run_id: RunId },
}

impl UiPatch {
    pub fn index(&self) -> usize {
        match self {
            UiPatch::Append { index, .. }
            | UiPatch::Replace { index, .. }
            | UiPatch::StreamDelta { index, .. }
            | UiPatch::StreamClosed { index, .. } => *index,
        }
    }

    /// Name used when the patch crosses a transport boundary
    pub fn op_name(&self) -> &'static str {
        match self {
            UiPatch::Append { .. } => "append",
            UiPatch::Replace { .. } => "replace",
            UiPatch::StreamDelta { .. } => "stream_delta",
            UiPatch::StreamClosed { .. } => "stream_closed",
        }
    }
}
