// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ids::NeighborId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighborState {
    Active,
    Ignored,
}

impl NeighborState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ignored => "ignored",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "ignored" => Some(Self::Ignored),
            _ => None,
        }
    }

    pub const fn is_ignored(self) -> bool {
        matches!(self, Self::Ignored)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighborSource {
    Cdp,
    Lldp,
}

impl NeighborSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cdp => "cdp",
            Self::Lldp => "lldp",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Cdp => "CDP",
            Self::Lldp => "LLDP",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cdp" => Some(Self::Cdp),
            "lldp" => Some(Self::Lldp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    Normal,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlLabel {
    pub text: &'static str,
    pub style: LabelStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNeighborRow {
    pub id: i64,
    pub netbox: String,
    pub interface: String,
    #[serde(default)]
    pub remote_id: String,
    #[serde(default)]
    pub remote_name: String,
    pub source: String,
    #[serde(default)]
    pub since: String,
    pub state: String,
    #[serde(default)]
    pub ignored_since: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborDetails {
    pub netbox: String,
    pub interface: String,
    pub remote_id: String,
    pub remote_name: String,
    pub source: NeighborSource,
    pub since: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRow {
    pub id: NeighborId,
    pub details: NeighborDetails,
    pub state: NeighborState,
    pub ignored_since: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowValidationError {
    UnknownState { neighbor_id: NeighborId, value: String },
    UnknownSource { neighbor_id: NeighborId, value: String },
    DuplicateId(NeighborId),
}

impl std::fmt::Display for RowValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownState { neighbor_id, value } => write!(
                f,
                "neighbor {neighbor_id} has state {value:?}; expected \"active\" or \"ignored\""
            ),
            Self::UnknownSource { neighbor_id, value } => write!(
                f,
                "neighbor {neighbor_id} has source {value:?}; expected \"cdp\" or \"lldp\""
            ),
            Self::DuplicateId(neighbor_id) => {
                write!(f, "neighbor {neighbor_id} appears more than once in the listing")
            }
        }
    }
}

impl std::error::Error for RowValidationError {}

impl RawNeighborRow {
    pub fn validate(&self) -> Result<NeighborRow, RowValidationError> {
        let neighbor_id = NeighborId::new(self.id);
        let state =
            NeighborState::parse(&self.state).ok_or_else(|| RowValidationError::UnknownState {
                neighbor_id,
                value: self.state.clone(),
            })?;
        let source =
            NeighborSource::parse(&self.source).ok_or_else(|| RowValidationError::UnknownSource {
                neighbor_id,
                value: self.source.clone(),
            })?;

        Ok(NeighborRow {
            id: neighbor_id,
            details: NeighborDetails {
                netbox: self.netbox.clone(),
                interface: self.interface.clone(),
                remote_id: self.remote_id.clone(),
                remote_name: self.remote_name.clone(),
                source,
                since: self.since.clone(),
            },
            state,
            ignored_since: self.ignored_since.clone().filter(|value| !value.is_empty()),
        })
    }
}

pub fn validate_listing(rows: &[RawNeighborRow]) -> Result<Vec<NeighborRow>, RowValidationError> {
    let mut seen = BTreeSet::new();
    let mut validated = Vec::with_capacity(rows.len());
    for raw in rows {
        let row = raw.validate()?;
        if !seen.insert(row.id) {
            return Err(RowValidationError::DuplicateId(row.id));
        }
        validated.push(row);
    }
    Ok(validated)
}
