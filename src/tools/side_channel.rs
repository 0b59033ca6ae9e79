//! Per-invocation channel tools use to push UI fragments

use crate::events::EventSink;
use crate::ui::Fragment;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Emissions {
    appends: AtomicUsize,
    updates: AtomicUsize,
    /// Last append not yet followed by an update
    open: AtomicBool,
}

/// Append/update handle given to one tool invocation
///
/// Clones share the emission record, so the dispatcher can inspect what the
/// tool did after it returns.
#[derive(Debug, Clone)]
pub struct SideChannel {
    sink: EventSink,
    tool: Arc<str>,
    emissions: Arc<Emissions>,
}

impl SideChannel {
    pub fn new(sink: EventSink, tool: &str) -> Self {
        Self {
            sink,
            tool: Arc::from(tool),
            emissions: Arc::default(),
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Add a new top-level entry, typically a loading placeholder
    pub async fn append(&self, fragment: Fragment) {
        let count = self.emissions.appends.fetch_add(1, Ordering::SeqCst) + 1;
        if count > 1 {
            tracing::warn!(
                tool = %self.tool,
                appends = count,
                "Tool appended more than once; each append becomes its own entry"
            );
        }
        self.emissions.open.store(true, Ordering::SeqCst);
        self.sink.append(fragment).await;
    }

    /// Replace the most recent top-level entry
    pub async fn update(&self, fragment: Fragment) {
        self.emissions.updates.fetch_add(1, Ordering::SeqCst);
        self.emissions.open.store(false, Ordering::SeqCst);
        self.sink.update(fragment).await;
    }

    /// Whether the tool emitted anything at all
    pub fn emitted(&self) -> bool {
        self.appends() > 0 || self.emissions.updates.load(Ordering::SeqCst) > 0
    }

    /// Whether an append is still waiting for its update
    pub fn has_open_append(&self) -> bool {
        self.emissions.open.load(Ordering::SeqCst)
    }

    pub fn appends(&self) -> usize {
        self.emissions.appends.load(Ordering::SeqCst)
    }
}
