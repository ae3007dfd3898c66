// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use crate::controller::{CompletionEffect, RowActionController};
use crate::ids::NeighborId;
use crate::model::{RawNeighborRow, RowValidationError, validate_listing};
use crate::persistence::{
    CompletionHandle, CompletionSink, Persistence, ToggleCompletion, ToggleRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    UnknownNeighbor(NeighborId),
    NotInitialized,
    AlreadyInitialized,
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownNeighbor(id) => write!(f, "no neighbor row with id {id}"),
            Self::NotInitialized => f.write_str("neighbor table is not initialized yet"),
            Self::AlreadyInitialized => f.write_str("neighbor table was already initialized"),
        }
    }
}

impl std::error::Error for TableError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Submitted(ToggleRequest),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NeighborTable {
    order: Vec<NeighborId>,
    rows: BTreeMap<NeighborId, RowActionController>,
    initialized: bool,
}

impl NeighborTable {
    pub fn from_rows(rows: &[RawNeighborRow]) -> Result<Self, RowValidationError> {
        let validated = validate_listing(rows)?;
        let mut table = Self::default();
        for row in validated {
            table.order.push(row.id);
            table.rows.insert(row.id, RowActionController::new(row));
        }
        Ok(table)
    }

    pub fn initialize(&mut self) -> Result<(), TableError> {
        if self.initialized {
            return Err(TableError::AlreadyInitialized);
        }
        for row in self.rows.values_mut() {
            row.initialize();
        }
        self.initialized = true;
        tracing::debug!(rows = self.rows.len(), "neighbor table initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn trigger<P>(
        &mut self,
        id: NeighborId,
        persistence: &mut P,
        sink: &CompletionSink,
    ) -> Result<TriggerOutcome, TableError>
    where
        P: Persistence + ?Sized,
    {
        if !self.initialized {
            return Err(TableError::NotInitialized);
        }
        let row = self
            .rows
            .get_mut(&id)
            .ok_or(TableError::UnknownNeighbor(id))?;

        let Some(ticket) = row.on_trigger() else {
            return Ok(TriggerOutcome::Ignored);
        };
        persistence.submit(
            ticket.request,
            CompletionHandle::new(id, ticket.attempt, sink.clone()),
        );
        Ok(TriggerOutcome::Submitted(ticket.request))
    }

    pub fn complete(&mut self, completion: ToggleCompletion) -> Result<CompletionEffect, TableError> {
        let row = self
            .rows
            .get_mut(&completion.neighbor_id)
            .ok_or(TableError::UnknownNeighbor(completion.neighbor_id))?;
        Ok(row.complete(completion.attempt, completion.outcome))
    }

    pub fn row(&self, id: NeighborId) -> Option<&RowActionController> {
        self.rows.get(&id)
    }

    pub fn rows(&self) -> impl Iterator<Item = &RowActionController> {
        self.order.iter().filter_map(|id| self.rows.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.rows.values().filter(|row| row.is_pending()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::{NeighborTable, TableError, TriggerOutcome};
    use crate::{
        CompletionHandle, CompletionSink, NeighborId, NeighborState, Persistence,
        RawNeighborRow, ToggleCompletion, ToggleRequest,
    };
    use std::sync::mpsc;

    #[derive(Default)]
    struct HeldPersistence {
        submitted: Vec<(ToggleRequest, CompletionHandle)>,
    }

    impl Persistence for HeldPersistence {
        fn submit(&mut self, request: ToggleRequest, completion: CompletionHandle) {
            self.submitted.push((request, completion));
        }
    }

    fn raw(id: i64, state: &str) -> RawNeighborRow {
        RawNeighborRow {
            id,
            netbox: format!("sw-{id}"),
            interface: "Gi1/0/1".to_owned(),
            remote_id: String::new(),
            remote_name: String::new(),
            source: "lldp".to_owned(),
            since: String::new(),
            state: state.to_owned(),
            ignored_since: None,
        }
    }

    fn table(rows: &[RawNeighborRow]) -> NeighborTable {
        let mut table = NeighborTable::from_rows(rows).expect("rows should validate");
        table.initialize().expect("first initialize");
        table
    }

    #[test]
    fn initialize_runs_once() {
        let mut table = table(&[raw(1, "active")]);
        assert_eq!(table.initialize(), Err(TableError::AlreadyInitialized));
        assert_eq!(
            table.row(NeighborId::new(1)).map(|row| row.state()),
            Some(NeighborState::Active)
        );
    }

    #[test]
    fn trigger_before_initialize_is_rejected() {
        let mut table = NeighborTable::from_rows(&[raw(1, "active")]).expect("valid rows");
        let (tx, _rx) = mpsc::channel();
        let mut persistence = HeldPersistence::default();

        let error = table
            .trigger(NeighborId::new(1), &mut persistence, &CompletionSink::channel(tx))
            .expect_err("uninitialized table should reject triggers");
        assert_eq!(error, TableError::NotInitialized);
        assert!(persistence.submitted.is_empty());
    }

    #[test]
    fn unknown_row_is_an_error() {
        let mut table = table(&[raw(1, "active")]);
        let (tx, _rx) = mpsc::channel();
        let mut persistence = HeldPersistence::default();

        let error = table
            .trigger(NeighborId::new(99), &mut persistence, &CompletionSink::channel(tx))
            .expect_err("unknown row should fail");
        assert_eq!(error, TableError::UnknownNeighbor(NeighborId::new(99)));
    }

    #[test]
    fn rows_keep_listing_order() {
        let table = table(&[raw(30, "active"), raw(10, "ignored"), raw(20, "active")]);
        let ids: Vec<i64> = table.rows().map(|row| row.id().get()).collect();
        assert_eq!(ids, vec![30, 10, 20]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn rows_on_different_neighbors_are_independent() {
        let mut table = table(&[raw(1, "active"), raw(2, "ignored")]);
        let (tx, rx) = mpsc::channel();
        let sink = CompletionSink::channel(tx);
        let mut persistence = HeldPersistence::default();

        table
            .trigger(NeighborId::new(1), &mut persistence, &sink)
            .expect("row 1");
        table
            .trigger(NeighborId::new(2), &mut persistence, &sink)
            .expect("row 2");
        assert_eq!(table.pending_count(), 2);

        let (_, second) = persistence.submitted.pop().expect("second request");
        second.succeed("");
        let (_, first) = persistence.submitted.pop().expect("first request");
        first.fail("timeout");

        let completions: Vec<ToggleCompletion> = rx.try_iter().collect();
        assert_eq!(completions.len(), 2);
        for completion in completions {
            table.complete(completion).expect("known row");
        }

        assert_eq!(table.pending_count(), 0);
        assert_eq!(
            table.row(NeighborId::new(1)).map(|row| row.state()),
            Some(NeighborState::Active)
        );
        assert_eq!(
            table.row(NeighborId::new(2)).map(|row| row.state()),
            Some(NeighborState::Active)
        );
    }

    #[test]
    fn pending_row_trigger_reports_ignored() {
        let mut table = table(&[raw(3, "active")]);
        let (tx, _rx) = mpsc::channel();
        let sink = CompletionSink::channel(tx);
        let mut persistence = HeldPersistence::default();

        let first = table
            .trigger(NeighborId::new(3), &mut persistence, &sink)
            .expect("first trigger");
        assert!(matches!(first, TriggerOutcome::Submitted(_)));
        let second = table
            .trigger(NeighborId::new(3), &mut persistence, &sink)
            .expect("second trigger");
        assert_eq!(second, TriggerOutcome::Ignored);
        assert_eq!(persistence.submitted.len(), 1);
    }
}
