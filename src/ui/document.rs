//! Renderer-side view of the UI Output Sequence

use super::{UiEntry, UiPatch};
use crate::multiplexer::{StreamFault, UiOutputSequence};
use futures::StreamExt;

/// The entries produced so far by applying patches in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiDocument {
    entries: Vec<UiEntry>,
}

impl UiDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain a whole sequence into a document.
    ///
    /// Returns the fault if the sequence broke before closing.
    pub async fn collect(mut sequence: UiOutputSequence) -> Result<Self, StreamFault> {
        let mut document = Self::new();
        while let Some(item) = sequence.next().await {
            document.apply(item?);
        }
        Ok(document)
    }

    pub fn apply(&mut self, patch: UiPatch) {
        match patch {
            UiPatch::Append { index, entry } => {
                if index != self.entries.len() {
                    tracing::warn!(index, len = self.entries.len(), "Out-of-order append");
                }
                self.entries.push(entry);
            }
            UiPatch::Replace { index, entry } => match self.entries.get_mut(index) {
                Some(slot) => *slot = entry,
                None => tracing::warn!(index, "Replace for unknown entry ignored"),
            },
            UiPatch::StreamDelta {
                index,
                run_id,
                text,
            } => match self.entries.get_mut(index) {
                Some(UiEntry::Stream { value }) if value.run_id == run_id => {
                    value.append(text);
                }
                _ => tracing::warn!(index, %run_id, "Delta for unknown stream ignored"),
            },
            UiPatch::StreamClosed { index, run_id } => {
                if let Some(UiEntry::Stream { value }) = self.entries.get_mut(index) {
                    if value.run_id == run_id {
                        value.close();
                    }
                }
            }
        }
    }

    pub fn entries(&self) -> &[UiEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&UiEntry> {
        self.entries.last()
    }

    /// Visible text of every entry that has some
    pub fn texts(&self) -> Vec<String> {
        self.entries.iter().filter_map(UiEntry::text).collect()
    }

    /// Whether anything is still showing a placeholder or an open stream
    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(UiEntry::is_pending)
    }
}
