// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::{ControlLabel, LabelStyle, NeighborState};

// An outstanding transition. `attempt` ties a completion back to the
// trigger that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransition {
    pub from: NeighborState,
    pub to: NeighborState,
    pub attempt: u64,
}

pub const fn current_label(state: NeighborState) -> ControlLabel {
    match state {
        NeighborState::Active => ControlLabel {
            text: "Ignore",
            style: LabelStyle::Normal,
        },
        NeighborState::Ignored => ControlLabel {
            text: "Unignore",
            style: LabelStyle::Secondary,
        },
    }
}

pub const fn request_toggle(current: NeighborState) -> NeighborState {
    match current {
        NeighborState::Active => NeighborState::Ignored,
        NeighborState::Ignored => NeighborState::Active,
    }
}

// Either state may be toggled; only an outstanding request blocks a trigger.
pub const fn is_valid_trigger(_state: NeighborState, pending: bool) -> bool {
    !pending
}
