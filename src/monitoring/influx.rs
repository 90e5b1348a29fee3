//! InfluxDB 1.x HTTP backend

use super::backend::MetricsBackend;
use super::config::BackendConfig;
use super::point::MeasurementPoint;
use crate::core::{Result, TelemetryError};
use reqwest::blocking::{Client, RequestBuilder, Response};
use std::time::{Duration, Instant};
use url::Url;

/// Writes line protocol to `/write` and checks reachability with `/ping`.
/// The underlying client pools connections and is safe to share.
#[derive(Debug, Clone)]
pub struct InfluxHttpBackend {
    client: Client,
    endpoint: Url,
    username: Option<String>,
    password: Option<String>,
}

impl InfluxHttpBackend {
    pub fn new(config: &BackendConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let username = Some(config.username())
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            username,
            password: config.password().map(str::to_string),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn write_url(&self, database: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.set_path("write");
        url.query_pairs_mut()
            .append_pair("db", database)
            .append_pair("precision", "ns");
        url
    }

    fn ping_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.set_path("ping");
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.username {
            Some(ref user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        }
    }
}

fn check_status(operation: &str, response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().unwrap_or_default();
    Err(TelemetryError::backend(
        operation,
        format!("{}: {}", status, body.trim()),
    ))
}

impl MetricsBackend for InfluxHttpBackend {
    fn write(&self, database: &str, points: &[MeasurementPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let body = points
            .iter()
            .map(MeasurementPoint::to_line_protocol)
            .collect::<Vec<_>>()
            .join("\n");

        let response = self
            .authorized(self.client.post(self.write_url(database)))
            .body(body)
            .send()?;
        check_status("write", response)
    }

    fn ping(&self) -> Result<Duration> {
        let started = Instant::now();
        let response = self.authorized(self.client.get(self.ping_url())).send()?;
        check_status("ping", response)?;
        Ok(started.elapsed())
    }
}
