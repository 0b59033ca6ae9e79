//! Event multiplexer
//!
//! Consumes the event sequence of one running turn and splits it into:
//! - a [`UiOutputSequence`] of patches a renderer can consume incrementally
//! - a [`FinalResult`] resolved exactly once, after the sequence has closed

use crate::events::{FragmentMode, RunId, StreamEvent};
use crate::state_machine::RoutingError;
use crate::ui::{Fragment, StreamRegistry, StreamableValue, UiEntry, UiPatch};
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// A fault in the event source itself, as opposed to an in-band error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamFault {
    #[error("routing failed: {0}")]
    Routing(String),
    #[error("event source failed: {0}")]
    Source(String),
    #[error("turn was interrupted before producing a result")]
    Interrupted,
}

impl StreamFault {
    pub fn broken(message: impl Into<String>) -> Self {
        StreamFault::Source(message.into())
    }

    pub fn interrupted() -> Self {
        StreamFault::Interrupted
    }
}

impl From<RoutingError> for StreamFault {
    fn from(err: RoutingError) -> Self {
        StreamFault::Routing(err.to_string())
    }
}

/// Incrementally consumable UI output of one turn
///
/// Yields patches in arrival order and ends when the turn's event source is
/// exhausted. A broken source yields one `Err` before ending.
pub struct UiOutputSequence {
    inner: UnboundedReceiverStream<Result<UiPatch, StreamFault>>,
}

impl Stream for UiOutputSequence {
    type Item = Result<UiPatch, StreamFault>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Single-assignment result of a turn
///
/// Resolves to the structured payload of the last observed event (`None` if
/// the source produced no events), or to the fault that broke the source.
pub struct FinalResult {
    rx: oneshot::Receiver<Result<Option<Value>, StreamFault>>,
}

impl Future for FinalResult {
    type Output = Result<Option<Value>, StreamFault>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(StreamFault::Interrupted)))
    }
}

/// Start multiplexing `source` on a background task.
///
/// The task drains the source to its end even if the returned sequence is
/// dropped, so an abandoned consumer never stalls the turn.
pub fn multiplex<S>(source: S) -> (UiOutputSequence, FinalResult)
where
    S: Stream<Item = Result<StreamEvent, StreamFault>> + Send + 'static,
{
    let (patch_tx, patch_rx) = mpsc::unbounded_channel();
    let (result_tx, result_rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut mux = Multiplexer::new(patch_tx);
        let outcome = mux.drive(source).await;
        // Closing the UI sequence strictly precedes resolving the result
        drop(mux);
        if result_tx.send(outcome).is_err() {
            tracing::debug!("Final result receiver dropped");
        }
    });

    (
        UiOutputSequence {
            inner: UnboundedReceiverStream::new(patch_rx),
        },
        FinalResult { rx: result_rx },
    )
}

/// Owns the UI Output Sequence and the open streamable values of one turn
struct Multiplexer {
    tx: mpsc::UnboundedSender<Result<UiPatch, StreamFault>>,
    runs: StreamRegistry,
    /// Number of top-level entries appended so far
    entries: usize,
}

impl Multiplexer {
    fn new(tx: mpsc::UnboundedSender<Result<UiPatch, StreamFault>>) -> Self {
        Self {
            tx,
            runs: StreamRegistry::new(),
            entries: 0,
        }
    }

    async fn drive<S>(&mut self, source: S) -> Result<Option<Value>, StreamFault>
    where
        S: Stream<Item = Result<StreamEvent, StreamFault>>,
    {
        let mut source = std::pin::pin!(source);
        let mut last: Option<StreamEvent> = None;

        while let Some(item) = source.next().await {
            match item {
                Ok(event) => {
                    self.apply(&event);
                    last = Some(event);
                }
                Err(fault) => {
                    tracing::warn!(error = %fault, "Event source faulted, aborting UI sequence");
                    self.publish_fault(fault.clone());
                    return Err(fault);
                }
            }
        }

        for (index, run_id) in self.runs.close_all() {
            self.publish(UiPatch::StreamClosed { index, run_id });
        }
        tracing::debug!(
            entries = self.entries,
            streams = self.runs.len(),
            "Event source exhausted"
        );
        Ok(last.map(|event| event.payload()))
    }

    fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::UiFragment {
                mode: FragmentMode::Append,
                fragment,
            } => {
                self.append(UiEntry::fragment(fragment.clone()));
            }
            StreamEvent::UiFragment {
                mode: FragmentMode::Update,
                fragment,
            } => self.update(fragment.clone()),
            StreamEvent::TokenDelta { run_id, text } => self.token(run_id, text),
            StreamEvent::Trace(_) => {}
        }
    }

    fn append(&mut self, entry: UiEntry) -> usize {
        let index = self.entries;
        self.entries += 1;
        self.publish(UiPatch::Append { index, entry });
        index
    }

    fn update(&mut self, fragment: Fragment) {
        let Some(index) = self.entries.checked_sub(1) else {
            tracing::warn!("Update before any append, treating as append");
            self.append(UiEntry::fragment(fragment));
            return;
        };
        if let Some(run_id) = self.runs.detach_slot(index) {
            tracing::debug!(%run_id, index, "Update replaced a streaming entry");
        }
        self.publish(UiPatch::Replace {
            index,
            entry: UiEntry::fragment(fragment),
        });
    }

    fn token(&mut self, run_id: &RunId, text: &str) {
        let key = match self.runs.key(run_id) {
            Some(key) => key,
            None => {
                let index = self.append(UiEntry::Stream {
                    value: StreamableValue::new(run_id.clone()),
                });
                self.runs.open(run_id.clone(), index)
            }
        };
        if let Some(index) = self.runs.push(key, text) {
            self.publish(UiPatch::StreamDelta {
                index,
                run_id: run_id.clone(),
                text: text.to_string(),
            });
        }
    }

    fn publish(&self, patch: UiPatch) {
        // A dropped consumer is fine; the turn keeps running
        let _ = self.tx.send(Ok(patch));
    }

    fn publish_fault(&self, fault: StreamFault) {
        let _ = self.tx.send(Err(fault));
    }
}
