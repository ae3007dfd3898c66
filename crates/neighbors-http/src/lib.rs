// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use neighbors_app::{CompletionHandle, Persistence, RawNeighborRow, ToggleRequest};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use std::thread;
use std::time::Duration;
use url::Url;

pub const LIST_PATH: &str = "neighbors/unrecognized/";
pub const SET_IGNORED_PATH: &str = "neighbors/set-ignored-state/";

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn list_neighbors(&self) -> Result<Vec<RawNeighborRow>> {
        let url = self.endpoint(LIST_PATH)?;
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        response.json().context("decode neighbor listing")
    }

    // Body is the backend's "ignored since" display content.
    pub fn set_ignored_state(&self, request: &ToggleRequest) -> Result<String> {
        let url = self.endpoint(SET_IGNORED_PATH)?;
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        let body = response
            .text()
            .context("read set-ignored-state response")?;
        Ok(body.trim().to_owned())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("build endpoint URL for {path}"))
    }
}

#[derive(Debug, Clone)]
pub struct HttpPersistence {
    client: Client,
}

impl HttpPersistence {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Persistence for HttpPersistence {
    fn submit(&mut self, request: ToggleRequest, completion: CompletionHandle) {
        let client = self.client.clone();
        let spawned = thread::Builder::new()
            .name(format!("toggle-{}", request.neighbor_id))
            .spawn(move || match client.set_ignored_state(&request) {
                Ok(ignored_since) => completion.succeed(ignored_since),
                Err(error) => completion.fail(format!("{error:#}")),
            });
        // A failed spawn drops the closure, and with it the handle, which
        // reports the request as abandoned.
        if let Err(error) = spawned {
            tracing::error!(
                neighbor_id = request.neighbor_id.get(),
                error = %error,
                "spawn toggle worker"
            );
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("server.base_url must not be empty");
    }
    let mut url =
        Url::parse(trimmed).with_context(|| format!("server.base_url {trimmed:?} is not a URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!(
            "server.base_url {trimmed:?} must use http or https, got {}",
            url.scheme()
        );
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn connection_error(base_url: &Url, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("request to {base_url} timed out -- raise [server].timeout or check the server");
    }
    anyhow!(
        "cannot reach {base_url} -- check [server].base_url and that the server is running ({error})"
    )
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), error);
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('<') {
        return anyhow!("server error ({}): {}", status.as_u16(), trimmed);
    }

    anyhow!("server returned {}", status.as_u16())
}
