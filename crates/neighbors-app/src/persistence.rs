// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use crate::ids::NeighborId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub neighbor_id: NeighborId,
    pub ignored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Succeeded { ignored_since: String },
    Failed { reason: String },
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleCompletion {
    pub neighbor_id: NeighborId,
    pub attempt: u64,
    pub outcome: ToggleOutcome,
}

#[derive(Clone)]
pub struct CompletionSink(Arc<dyn Fn(ToggleCompletion) + Send + Sync>);

impl CompletionSink {
    pub fn new(deliver: impl Fn(ToggleCompletion) + Send + Sync + 'static) -> Self {
        Self(Arc::new(deliver))
    }

    pub fn channel(tx: Sender<ToggleCompletion>) -> Self {
        Self::new(move |completion| {
            if tx.send(completion).is_err() {
                tracing::debug!("completion receiver dropped");
            }
        })
    }

    fn deliver(&self, completion: ToggleCompletion) {
        (self.0)(completion);
    }
}

impl fmt::Debug for CompletionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompletionSink")
    }
}

// Settles one toggle request exactly once. Dropping an unsettled handle
// reports `Abandoned`, so the row is always released.
pub struct CompletionHandle {
    neighbor_id: NeighborId,
    attempt: u64,
    sink: Option<CompletionSink>,
}

impl CompletionHandle {
    pub fn new(neighbor_id: NeighborId, attempt: u64, sink: CompletionSink) -> Self {
        Self {
            neighbor_id,
            attempt,
            sink: Some(sink),
        }
    }

    pub fn neighbor_id(&self) -> NeighborId {
        self.neighbor_id
    }

    pub fn succeed(mut self, ignored_since: impl Into<String>) {
        self.settle(ToggleOutcome::Succeeded {
            ignored_since: ignored_since.into(),
        });
    }

    pub fn fail(mut self, reason: impl Into<String>) {
        self.settle(ToggleOutcome::Failed {
            reason: reason.into(),
        });
    }

    fn settle(&mut self, outcome: ToggleOutcome) {
        if let Some(sink) = self.sink.take() {
            sink.deliver(ToggleCompletion {
                neighbor_id: self.neighbor_id,
                attempt: self.attempt,
                outcome,
            });
        }
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        self.settle(ToggleOutcome::Abandoned);
    }
}

impl fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("neighbor_id", &self.neighbor_id)
            .field("attempt", &self.attempt)
            .field("settled", &self.sink.is_none())
            .finish()
    }
}

pub trait Persistence {
    // Starts persisting `request`. Must not block the caller; the outcome
    // is reported later through `completion`.
    fn submit(&mut self, request: ToggleRequest, completion: CompletionHandle);
}

#[cfg(test)]
mod tests {
    use super::{CompletionHandle, CompletionSink, ToggleCompletion, ToggleOutcome, ToggleRequest};
    use crate::NeighborId;
    use std::sync::mpsc;

    #[test]
    fn request_serializes_with_wire_field_names() -> anyhow::Result<()> {
        let request = ToggleRequest {
            neighbor_id: NeighborId::new(42),
            ignored: true,
        };
        assert_eq!(
            serde_json::to_string(&request)?,
            r#"{"neighborId":42,"ignored":true}"#
        );
        Ok(())
    }

    #[test]
    fn succeed_delivers_exactly_one_completion() {
        let (tx, rx) = mpsc::channel();
        let handle = CompletionHandle::new(NeighborId::new(1), 3, CompletionSink::channel(tx));
        handle.succeed("2024-01-01 10:00");

        assert_eq!(
            rx.try_recv().ok(),
            Some(ToggleCompletion {
                neighbor_id: NeighborId::new(1),
                attempt: 3,
                outcome: ToggleOutcome::Succeeded {
                    ignored_since: "2024-01-01 10:00".to_owned(),
                },
            })
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn fail_carries_reason() {
        let (tx, rx) = mpsc::channel();
        CompletionHandle::new(NeighborId::new(2), 1, CompletionSink::channel(tx))
            .fail("HTTP 500");

        let completion = rx.try_recv().expect("completion expected");
        assert_eq!(
            completion.outcome,
            ToggleOutcome::Failed {
                reason: "HTTP 500".to_owned(),
            }
        );
    }

    #[test]
    fn dropping_unsettled_handle_reports_abandoned() {
        let (tx, rx) = mpsc::channel();
        let handle = CompletionHandle::new(NeighborId::new(5), 1, CompletionSink::channel(tx));
        drop(handle);

        let completion = rx.try_recv().expect("completion expected");
        assert_eq!(completion.outcome, ToggleOutcome::Abandoned);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn sink_tolerates_closed_receiver() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        CompletionHandle::new(NeighborId::new(6), 1, CompletionSink::channel(tx)).succeed("");
    }
}
