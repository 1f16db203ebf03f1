//! reqwest-backed [`Transport`] implementation.
//!
//! One client is built per transport and reused for every request, taking
//! advantage of connection pooling. Page fetches that ask for bypass go
//! through an external FlareSolverr-compatible service when one is configured.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_LENGTH};
use reqwest::{Client, ClientBuilder, Proxy};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::download::parse_size_hint;
use crate::user_agent;

use super::{ProgressCallback, Transport, TransportError};

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// HTTP transport for index pages, mirror pages, and file bodies.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    bypasser_url: Option<String>,
    bypasser_timeout_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BypassRequest<'a> {
    cmd: &'static str,
    url: &'a str,
    max_timeout: u64,
}

#[derive(Debug, Deserialize)]
struct BypassResponse {
    status: String,
    #[serde(default)]
    message: String,
    solution: Option<BypassSolution>,
}

#[derive(Debug, Deserialize)]
struct BypassSolution {
    #[serde(default)]
    status: u16,
    #[serde(default)]
    response: String,
}

impl HttpTransport {
    /// Creates a transport using the timeouts, proxies, and bypasser from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the HTTP client cannot be built,
    /// or [`TransportError::InvalidUrl`] for an unparseable proxy.
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let client = apply_proxies(base_client_builder(config), config)?
            .build()
            .map_err(|source| TransportError::Client { source })?;
        Ok(Self {
            client,
            bypasser_url: config.bypasser_url.clone(),
            bypasser_timeout_ms: config.bypasser_timeout_ms,
        })
    }

    async fn get_text(&self, url: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, HTML_ACCEPT)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(url, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;
        if body.trim().is_empty() {
            return Err(TransportError::empty_body(url));
        }
        Ok(body)
    }

    async fn get_text_via_bypasser(
        &self,
        bypasser_url: &str,
        url: &str,
    ) -> Result<String, TransportError> {
        let request = BypassRequest {
            cmd: "request.get",
            url,
            max_timeout: self.bypasser_timeout_ms,
        };
        // The bypasser may take longer than the regular read timeout.
        let response = self
            .client
            .post(bypasser_url)
            .json(&request)
            .timeout(Duration::from_millis(self.bypasser_timeout_ms.saturating_add(5_000)))
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;

        if !response.status().is_success() {
            return Err(TransportError::bypass(
                url,
                format!("bypasser returned HTTP {}", response.status().as_u16()),
            ));
        }

        let payload: BypassResponse = response
            .json()
            .await
            .map_err(|e| TransportError::bypass(url, format!("malformed bypasser reply: {e}")))?;
        if payload.status != "ok" {
            return Err(TransportError::bypass(url, payload.message));
        }

        let solution = payload
            .solution
            .ok_or_else(|| TransportError::bypass(url, "bypasser reply has no solution"))?;
        if solution.status >= 400 {
            return Err(TransportError::http_status(url, solution.status));
        }
        if solution.response.trim().is_empty() {
            return Err(TransportError::empty_body(url));
        }
        Ok(solution.response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    async fn fetch_page(&self, url: &str, use_bypass: bool) -> Result<String, TransportError> {
        match (use_bypass, self.bypasser_url.as_deref()) {
            (true, Some(bypasser_url)) => {
                debug!(bypasser = %bypasser_url, "fetching page through bypasser");
                self.get_text_via_bypasser(bypasser_url, url).await
            }
            (true, None) => {
                debug!("bypass requested but no bypasser configured; fetching directly");
                self.get_text(url).await
            }
            (false, _) => self.get_text(url).await,
        }
    }

    #[instrument(skip(self, progress, cancel), fields(url = %url))]
    async fn fetch_bytes(
        &self,
        url: &str,
        size_hint: Option<&str>,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, TransportError> {
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransportError::cancelled(url)),
            response = self.client.get(url).send() => {
                response.map_err(|e| TransportError::from_reqwest(url, e))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(url, status.as_u16()));
        }

        let expected = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|len| *len > 0)
            .or_else(|| size_hint.and_then(parse_size_hint));
        debug!(expected_bytes = ?expected, "starting transfer");

        let capacity = expected.map_or(0, |len| usize::try_from(len.min(64 * 1024 * 1024)).unwrap_or(0));
        let mut buffer = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(received = buffer.len(), "transfer cancelled");
                    return Err(TransportError::cancelled(url));
                }
                next = stream.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|e| TransportError::from_reqwest(url, e))?;
            buffer.extend_from_slice(&chunk);

            if let (Some(callback), Some(total)) = (progress.as_ref(), expected) {
                callback(completed_fraction(buffer.len() as u64, total));
            }
        }

        if buffer.is_empty() {
            warn!("transfer finished without data");
            return Err(TransportError::empty_body(url));
        }
        if let Some(callback) = progress.as_ref() {
            callback(1.0);
        }
        Ok(buffer)
    }
}

#[allow(clippy::cast_precision_loss)]
fn completed_fraction(received: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (received as f64 / total as f64).min(1.0)
}

fn base_client_builder(config: &Config) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.read_timeout_secs))
        .gzip(true)
        .cookie_store(true)
        .user_agent(user_agent::default_user_agent())
}

fn apply_proxies(mut builder: ClientBuilder, config: &Config) -> Result<ClientBuilder, TransportError> {
    if let Some(proxy) = config.https_proxy.as_deref() {
        builder = builder.proxy(Proxy::https(proxy).map_err(|_| TransportError::invalid_url(proxy))?);
    }
    if let Some(proxy) = config.http_proxy.as_deref() {
        builder = builder.proxy(Proxy::http(proxy).map_err(|_| TransportError::invalid_url(proxy))?);
    }
    Ok(builder)
}
