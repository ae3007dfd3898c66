// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ids::NeighborId;
use crate::model::{ControlLabel, NeighborDetails, NeighborRow, NeighborState};
use crate::persistence::{ToggleOutcome, ToggleRequest};
use crate::row::{PendingTransition, current_label, is_valid_trigger, request_toggle};

pub const STATE_CHANGE_FAILED: &str = "could not alter neighbor state";

// What the row shows. Only the row's controller writes these fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDisplay {
    pub label: ControlLabel,
    pub enabled: bool,
    pub ignored_since: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleTicket {
    pub request: ToggleRequest,
    pub attempt: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionEffect {
    Committed(NeighborState),
    Failed,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowActionController {
    id: NeighborId,
    details: NeighborDetails,
    state: NeighborState,
    pending: Option<PendingTransition>,
    display: RowDisplay,
    last_attempt: u64,
    initialized: bool,
}

impl RowActionController {
    pub fn new(row: NeighborRow) -> Self {
        Self {
            id: row.id,
            details: row.details,
            state: row.state,
            pending: None,
            display: RowDisplay {
                label: current_label(row.state),
                enabled: false,
                ignored_since: row.ignored_since.unwrap_or_default(),
                error: None,
            },
            last_attempt: 0,
            initialized: false,
        }
    }

    pub fn id(&self) -> NeighborId {
        self.id
    }

    pub fn details(&self) -> &NeighborDetails {
        &self.details
    }

    pub fn state(&self) -> NeighborState {
        self.state
    }

    pub fn pending(&self) -> Option<PendingTransition> {
        self.pending
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn display(&self) -> &RowDisplay {
        &self.display
    }

    pub fn initialize(&mut self) {
        self.display.label = current_label(self.state);
        self.display.enabled = self.pending.is_none();
        self.initialized = true;
    }

    pub fn on_trigger(&mut self) -> Option<ToggleTicket> {
        if !self.initialized {
            tracing::debug!(neighbor_id = self.id.get(), "trigger before initialize ignored");
            return None;
        }
        if !is_valid_trigger(self.state, self.pending.is_some()) {
            tracing::debug!(neighbor_id = self.id.get(), "trigger while pending ignored");
            return None;
        }

        let to = request_toggle(self.state);
        self.last_attempt += 1;
        self.pending = Some(PendingTransition {
            from: self.state,
            to,
            attempt: self.last_attempt,
        });
        self.display.enabled = false;
        self.display.error = None;

        tracing::info!(
            neighbor_id = self.id.get(),
            from = self.state.as_str(),
            to = to.as_str(),
            attempt = self.last_attempt,
            "toggle requested"
        );
        Some(ToggleTicket {
            request: ToggleRequest {
                neighbor_id: self.id,
                ignored: to.is_ignored(),
            },
            attempt: self.last_attempt,
        })
    }

    pub fn complete(&mut self, attempt: u64, outcome: ToggleOutcome) -> CompletionEffect {
        let Some(pending) = self.pending.filter(|pending| pending.attempt == attempt) else {
            tracing::warn!(
                neighbor_id = self.id.get(),
                attempt,
                "completion does not match an outstanding request"
            );
            return CompletionEffect::Stale;
        };

        let effect = match outcome {
            ToggleOutcome::Succeeded { ignored_since } => {
                self.display.ignored_since = ignored_since;
                self.state = pending.to;
                self.display.label = current_label(self.state);
                self.pending = None;
                tracing::info!(
                    neighbor_id = self.id.get(),
                    state = self.state.as_str(),
                    "toggle committed"
                );
                CompletionEffect::Committed(self.state)
            }
            ToggleOutcome::Failed { reason } => {
                tracing::warn!(neighbor_id = self.id.get(), error = %reason, "toggle failed");
                self.reject()
            }
            ToggleOutcome::Abandoned => {
                tracing::warn!(
                    neighbor_id = self.id.get(),
                    "toggle request was dropped without a result"
                );
                self.reject()
            }
        };

        self.display.enabled = true;
        effect
    }

    fn reject(&mut self) -> CompletionEffect {
        self.display.error = Some(STATE_CHANGE_FAILED.to_owned());
        self.pending = None;
        CompletionEffect::Failed
    }
}
