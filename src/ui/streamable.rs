//! Per-run streamable text values and the registry that owns them for a turn

use crate::events::RunId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Append-only, closeable sequence of text chunks belonging to one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamableValue {
    pub run_id: RunId,
    chunks: Vec<String>,
    closed: bool,
}

impl StreamableValue {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            chunks: Vec::new(),
            closed: false,
        }
    }

    /// Append a chunk. Returns false (and drops the chunk) once closed.
    pub fn append(&mut self, text: impl Into<String>) -> bool {
        if self.closed {
            return false;
        }
        self.chunks.push(text.into());
        true
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn text(&self) -> String {
        self.chunks.concat()
    }
}

/// Arena key of a registered stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey(usize);

#[derive(Debug)]
struct OpenRun {
    value: StreamableValue,
    /// Top-level UI entry currently showing this value
    slot: Option<usize>,
}

/// Registry of the streamable values opened during one turn
///
/// Values live in an arena indexed by [`StreamKey`], in registration order.
/// The whole registry is dropped at end of turn.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    runs: Vec<OpenRun>,
    keys: HashMap<RunId, StreamKey>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn key(&self, run_id: &RunId) -> Option<StreamKey> {
        self.keys.get(run_id).copied()
    }

    /// Register a new value for `run_id`, shown at top-level entry `slot`
    pub fn open(&mut self, run_id: RunId, slot: usize) -> StreamKey {
        let key = StreamKey(self.runs.len());
        self.keys.insert(run_id.clone(), key);
        self.runs.push(OpenRun {
            value: StreamableValue::new(run_id),
            slot: Some(slot),
        });
        key
    }

    /// Append text to a registered value, returning the slot still showing it
    pub fn push(&mut self, key: StreamKey, text: &str) -> Option<usize> {
        let run = self.runs.get_mut(key.0)?;
        if run.value.append(text) {
            run.slot
        } else {
            None
        }
    }

    pub fn get(&self, key: StreamKey) -> Option<&StreamableValue> {
        self.runs.get(key.0).map(|run| &run.value)
    }

    /// Forget which value is shown at `slot` (its entry was replaced)
    pub fn detach_slot(&mut self, slot: usize) -> Option<RunId> {
        let run = self.runs.iter_mut().find(|run| run.slot == Some(slot))?;
        run.slot = None;
        Some(run.value.run_id.clone())
    }

    /// Close every value in registration order.
    ///
    /// Returns `(slot, run_id)` for the values still attached to an entry.
    pub fn close_all(&mut self) -> Vec<(usize, RunId)> {
        let mut attached = Vec::new();
        for run in &mut self.runs {
            if run.value.is_closed() {
                continue;
            }
            run.value.close();
            if let Some(slot) = run.slot {
                attached.push((slot, run.value.run_id.clone()));
            }
        }
        attached
    }
}
