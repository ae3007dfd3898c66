// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use neighbors_app::{CompletionHandle, NeighborTable, Persistence, ToggleRequest};
use neighbors_http::Client;
use neighbors_testkit::format_display_timestamp;
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;

const DEMO_DELAY: Duration = Duration::from_millis(700);
const DEMO_FAIL_EVERY: u64 = 4;
pub const DEMO_FAILURE_REASON: &str = "demo backend rejected the change";

pub fn fetch_table(client: &Client) -> Result<NeighborTable> {
    let rows = client
        .list_neighbors()
        .context("fetch unrecognized neighbors")?;
    tracing::info!(rows = rows.len(), base_url = %client.base_url(), "listing fetched");
    NeighborTable::from_rows(&rows)
        .with_context(|| format!("validate neighbor listing from {}", client.base_url()))
}

// In-process stand-in for the server used by `--demo`. Answers each request
// on a worker thread after `delay` and rejects every `fail_every`th one.
#[derive(Debug, Clone)]
pub struct DemoPersistence {
    delay: Duration,
    fail_every: u64,
    submitted: u64,
}

impl Default for DemoPersistence {
    fn default() -> Self {
        Self::new(DEMO_DELAY, DEMO_FAIL_EVERY)
    }
}

impl DemoPersistence {
    pub fn new(delay: Duration, fail_every: u64) -> Self {
        Self {
            delay,
            fail_every,
            submitted: 0,
        }
    }
}

impl Persistence for DemoPersistence {
    fn submit(&mut self, request: ToggleRequest, completion: CompletionHandle) {
        self.submitted = self.submitted.saturating_add(1);
        let fail = self.fail_every > 0 && self.submitted % self.fail_every == 0;
        let delay = self.delay;

        let spawned = thread::Builder::new()
            .name(format!("demo-toggle-{}", request.neighbor_id))
            .spawn(move || {
                thread::sleep(delay);
                if fail {
                    completion.fail(DEMO_FAILURE_REASON);
                } else if request.ignored {
                    completion.succeed(local_stamp());
                } else {
                    completion.succeed(String::new());
                }
            });
        if let Err(error) = spawned {
            tracing::error!(
                neighbor_id = request.neighbor_id.get(),
                error = %error,
                "spawn demo toggle worker"
            );
        }
    }
}

fn local_stamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format_display_timestamp(now)
}

#[cfg(test)]
mod tests {
    use super::{DEMO_FAILURE_REASON, DemoPersistence, fetch_table};
    use anyhow::{Result, anyhow};
    use neighbors_app::{
        CompletionHandle, CompletionSink, NeighborId, Persistence, ToggleCompletion, ToggleOutcome,
        ToggleRequest,
    };
    use neighbors_http::Client;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tiny_http::{Response, Server};

    fn submit(
        persistence: &mut DemoPersistence,
        id: i64,
        ignored: bool,
        tx: &mpsc::Sender<ToggleCompletion>,
    ) {
        persistence.submit(
            ToggleRequest {
                neighbor_id: NeighborId::new(id),
                ignored,
            },
            CompletionHandle::new(NeighborId::new(id), 1, CompletionSink::channel(tx.clone())),
        );
    }

    #[test]
    fn demo_persistence_stamps_ignores_and_clears_unignores() -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let mut persistence = DemoPersistence::new(Duration::ZERO, 0);

        submit(&mut persistence, 1, true, &tx);
        let ignored = rx.recv_timeout(Duration::from_secs(5))?;
        match ignored.outcome {
            ToggleOutcome::Succeeded { ignored_since } => {
                assert_eq!(ignored_since.len(), "2024-01-01 10:00".len());
            }
            other => return Err(anyhow!("expected success, got {other:?}")),
        }

        submit(&mut persistence, 1, false, &tx);
        let unignored = rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(
            unignored.outcome,
            ToggleOutcome::Succeeded {
                ignored_since: String::new(),
            }
        );
        Ok(())
    }

    #[test]
    fn demo_persistence_fails_every_nth_request() -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let mut persistence = DemoPersistence::new(Duration::ZERO, 2);

        submit(&mut persistence, 1, true, &tx);
        let first = rx.recv_timeout(Duration::from_secs(5))?;
        submit(&mut persistence, 2, true, &tx);
        let second = rx.recv_timeout(Duration::from_secs(5))?;

        assert!(matches!(first.outcome, ToggleOutcome::Succeeded { .. }));
        assert_eq!(
            second.outcome,
            ToggleOutcome::Failed {
                reason: DEMO_FAILURE_REASON.to_owned(),
            }
        );
        Ok(())
    }

    #[test]
    fn fetch_table_rejects_unknown_state_from_server() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}/", server.server_addr());

        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            let body = r#"[{"id":1,"netbox":"sw-a","interface":"Gi1/0/1","source":"lldp","state":"pending"}]"#;
            request
                .respond(Response::from_string(body).with_status_code(200))
                .expect("response should succeed");
        });

        let client = Client::new(&addr, Duration::from_secs(2))?;
        let error = fetch_table(&client).expect_err("unknown state should fail");
        assert!(format!("{error:#}").contains("\"pending\""));

        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn fetch_table_builds_uninitialized_table() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}/", server.server_addr());

        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            let body = r#"[
                {"id":4,"netbox":"sw-a","interface":"Gi1/0/4","source":"cdp","state":"active"},
                {"id":5,"netbox":"sw-a","interface":"Gi1/0/5","source":"lldp","state":"ignored","ignored_since":"2024-02-02 02:02"}
            ]"#;
            request
                .respond(Response::from_string(body).with_status_code(200))
                .expect("response should succeed");
        });

        let client = Client::new(&addr, Duration::from_secs(2))?;
        let table = fetch_table(&client)?;
        assert_eq!(table.len(), 2);
        assert!(!table.is_initialized());

        handle.join().expect("server thread should join");
        Ok(())
    }
}
