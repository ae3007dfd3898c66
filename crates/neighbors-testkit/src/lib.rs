// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use neighbors_app::{
    CompletionHandle, NeighborId, NeighborTable, Persistence, RawNeighborRow, ToggleRequest,
};
use std::collections::VecDeque;
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime, Time};

const SWITCH_ROLES: [&str; 6] = ["core", "dist", "edge", "access", "lab", "dmz"];
const SITES: [&str; 8] = ["oslo", "bergen", "tromso", "trondheim", "bodo", "alta", "molde", "hamar"];
const INTERFACE_PREFIXES: [&str; 4] = ["Gi1/0/", "Gi2/0/", "Te1/1/", "xe-0/0/"];
const REMOTE_KINDS: [&str; 8] = [
    "ap", "phone", "printer", "cam", "hypervisor", "nas", "badge-reader", "ups",
];

const REFERENCE_YEAR: i32 = 2026;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

#[derive(Debug, Clone)]
pub struct NeighborFaker {
    rng: DeterministicRng,
}

impl NeighborFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn raw_row(&mut self, id: i64) -> RawNeighborRow {
        let lldp = self.rng.bool();
        let remote_name = format!(
            "{}-{:03}",
            self.pick(&REMOTE_KINDS),
            self.rng.int_n(1000)
        );
        let remote_id = if lldp {
            self.mac_address()
        } else {
            format!("SEP{}", self.mac_address().replace(':', "").to_uppercase())
        };
        let since = self.timestamp_before(reference_now(), 120);
        let ignored = self.rng.int_n(4) == 0;
        let ignored_since = ignored.then(|| self.timestamp_before(reference_now(), 30));

        RawNeighborRow {
            id,
            netbox: format!(
                "sw-{}-{}-{}",
                self.pick(&SITES),
                self.pick(&SWITCH_ROLES),
                self.rng.int_n(9) + 1
            ),
            interface: format!(
                "{}{}",
                self.pick(&INTERFACE_PREFIXES),
                self.rng.int_n(48) + 1
            ),
            remote_id,
            remote_name,
            source: if lldp { "lldp" } else { "cdp" }.to_owned(),
            since,
            state: if ignored { "ignored" } else { "active" }.to_owned(),
            ignored_since,
        }
    }

    pub fn listing(&mut self, count: usize) -> Vec<RawNeighborRow> {
        (1..=count as i64).map(|id| self.raw_row(id)).collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn mac_address(&mut self) -> String {
        (0..6)
            .map(|_| format!("{:02x}", self.rng.int_n(256)))
            .collect::<Vec<_>>()
            .join(":")
    }

    fn timestamp_before(&mut self, end: OffsetDateTime, max_days: usize) -> String {
        let minutes = self.rng.int_n(max_days * 24 * 60) as i64;
        format_display_timestamp(end - Duration::minutes(minutes))
    }
}

pub fn format_display_timestamp(value: OffsetDateTime) -> String {
    value
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_default()
}

pub fn demo_listing() -> Vec<RawNeighborRow> {
    NeighborFaker::new(7).listing(24)
}

pub fn initialized_table(rows: &[RawNeighborRow]) -> NeighborTable {
    let mut table = match NeighborTable::from_rows(rows) {
        Ok(table) => table,
        Err(error) => panic!("fixture rows should validate: {error}"),
    };
    if let Err(error) = table.initialize() {
        panic!("fixture table should initialize: {error}");
    }
    table
}

pub fn fixture_row(id: i64, state: &str) -> RawNeighborRow {
    RawNeighborRow {
        id,
        netbox: format!("sw-fixture-{id}"),
        interface: format!("Gi1/0/{id}"),
        remote_id: format!("00:00:00:00:00:{:02x}", id.rem_euclid(256)),
        remote_name: format!("device-{id}"),
        source: "lldp".to_owned(),
        since: "2023-12-01 08:00".to_owned(),
        state: state.to_owned(),
        ignored_since: (state == "ignored").then(|| "2023-12-15 12:00".to_owned()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    Succeed(String),
    Fail(String),
    Drop,
}

#[derive(Debug, Default)]
pub struct ScriptedPersistence {
    auto_reply: Option<ScriptedReply>,
    requests: Vec<ToggleRequest>,
    outstanding: VecDeque<CompletionHandle>,
}

impl ScriptedPersistence {
    pub fn holding() -> Self {
        Self::default()
    }

    pub fn answering(reply: ScriptedReply) -> Self {
        Self {
            auto_reply: Some(reply),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> &[ToggleRequest] {
        &self.requests
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    pub fn resolve_next(&mut self, reply: ScriptedReply) -> Option<NeighborId> {
        let handle = self.outstanding.pop_front()?;
        let id = handle.neighbor_id();
        settle(handle, reply);
        Some(id)
    }

    pub fn resolve(&mut self, id: NeighborId, reply: ScriptedReply) -> bool {
        let Some(index) = self
            .outstanding
            .iter()
            .position(|handle| handle.neighbor_id() == id)
        else {
            return false;
        };
        match self.outstanding.remove(index) {
            Some(handle) => {
                settle(handle, reply);
                true
            }
            None => false,
        }
    }
}

impl Persistence for ScriptedPersistence {
    fn submit(&mut self, request: ToggleRequest, completion: CompletionHandle) {
        self.requests.push(request);
        match self.auto_reply.clone() {
            Some(reply) => settle(completion, reply),
            None => self.outstanding.push_back(completion),
        }
    }
}

fn settle(handle: CompletionHandle, reply: ScriptedReply) {
    match reply {
        ScriptedReply::Succeed(ignored_since) => handle.succeed(ignored_since),
        ScriptedReply::Fail(reason) => handle.fail(reason),
        ScriptedReply::Drop => drop(handle),
    }
}

fn reference_now() -> OffsetDateTime {
    let date = Date::from_calendar_date(REFERENCE_YEAR, Month::January, 1)
        .unwrap_or(Date::MIN);
    date.with_time(Time::MIDNIGHT).assume_utc()
}

#[cfg(test)]
mod tests {
    use super::{
        NeighborFaker, ScriptedPersistence, ScriptedReply, demo_listing, fixture_row,
        format_display_timestamp,
    };
    use neighbors_app::{
        CompletionHandle, CompletionSink, NeighborId, Persistence, ToggleOutcome, ToggleRequest,
        validate_listing,
    };
    use std::collections::BTreeSet;
    use std::sync::mpsc;
    use time::macros::datetime;

    fn request(id: i64) -> ToggleRequest {
        ToggleRequest {
            neighbor_id: NeighborId::new(id),
            ignored: true,
        }
    }

    #[test]
    fn same_seed_same_listing() {
        let left = NeighborFaker::new(42).listing(5);
        let right = NeighborFaker::new(42).listing(5);
        assert_eq!(left, right);
    }

    #[test]
    fn demo_listing_validates() -> anyhow::Result<()> {
        let rows = validate_listing(&demo_listing())?;
        assert_eq!(rows.len(), 24);
        let states: BTreeSet<_> = rows.iter().map(|row| row.state.as_str()).collect();
        assert!(states.contains("active"));
        Ok(())
    }

    #[test]
    fn ignored_rows_carry_ignored_since() {
        for row in NeighborFaker::new(3).listing(50) {
            assert_eq!(row.state == "ignored", row.ignored_since.is_some(), "row {}", row.id);
        }
    }

    #[test]
    fn fixture_row_is_valid() -> anyhow::Result<()> {
        fixture_row(7, "ignored").validate()?;
        fixture_row(8, "active").validate()?;
        Ok(())
    }

    #[test]
    fn display_timestamp_has_minute_precision() {
        assert_eq!(
            format_display_timestamp(datetime!(2024-01-01 10:00:59 UTC)),
            "2024-01-01 10:00"
        );
    }

    #[test]
    fn holding_persistence_resolves_in_order() {
        let (tx, rx) = mpsc::channel();
        let sink = CompletionSink::channel(tx);
        let mut persistence = ScriptedPersistence::holding();
        persistence.submit(request(1), CompletionHandle::new(NeighborId::new(1), 1, sink.clone()));
        persistence.submit(request(2), CompletionHandle::new(NeighborId::new(2), 1, sink));
        assert_eq!(persistence.outstanding(), 2);
        assert!(rx.try_recv().is_err());

        assert_eq!(
            persistence.resolve_next(ScriptedReply::Succeed("now".to_owned())),
            Some(NeighborId::new(1))
        );
        assert!(persistence.resolve(NeighborId::new(2), ScriptedReply::Drop));
        assert!(!persistence.resolve(NeighborId::new(2), ScriptedReply::Drop));

        let outcomes: Vec<ToggleOutcome> = rx.try_iter().map(|c| c.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                ToggleOutcome::Succeeded {
                    ignored_since: "now".to_owned(),
                },
                ToggleOutcome::Abandoned,
            ]
        );
        assert_eq!(persistence.requests().len(), 2);
    }

    #[test]
    fn answering_persistence_settles_immediately() {
        let (tx, rx) = mpsc::channel();
        let mut persistence = ScriptedPersistence::answering(ScriptedReply::Fail("500".to_owned()));
        persistence.submit(
            request(4),
            CompletionHandle::new(NeighborId::new(4), 1, CompletionSink::channel(tx)),
        );

        assert_eq!(persistence.outstanding(), 0);
        let completion = rx.try_recv().expect("completion expected");
        assert_eq!(
            completion.outcome,
            ToggleOutcome::Failed {
                reason: "500".to_owned(),
            }
        );
    }
}
