//! HTTP transport used by probes.
//!
//! Probes talk to the network through [`HttpTransport`] so a scan can share
//! one connection pool across every site, and so tests can swap in a
//! deterministic implementation.

use crate::error::{ProbeFailure, UsernameCheckError};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::redirect::Policy;
use std::time::Duration;

/// Maximum redirects followed before a probe gives up.
const MAX_REDIRECTS: usize = 10;

/// Idle keep-alive connections retained per host.
const MAX_IDLE_PER_HOST: usize = 20;

/// Upper bound on body bytes read for marker matching; the rest is discarded.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// One outbound GET issued by a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    /// Fully resolved URL
    pub url: String,
    /// User-Agent header value
    pub user_agent: &'static str,
    /// Upper bound for the whole request
    pub timeout: Duration,
    /// Whether the body of a 200 response is needed for classification
    pub read_body: bool,
}

/// Final response after redirects have been followed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Empty unless the request asked for the body and the status was 200
    pub body: String,
}

impl HttpResponse {
    pub fn new<B: Into<String>>(status: u16, body: B) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Shared transport for every probe in a scan.
///
/// Implementations must be safe to call concurrently.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a single GET, following redirects.
    async fn get(&self, request: &ProbeRequest) -> Result<HttpResponse, ProbeFailure>;
}

/// [`HttpTransport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose client enforces `timeout` per request.
    pub fn new(timeout: Duration) -> Result<Self, UsernameCheckError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .build()
            .map_err(|e| {
                UsernameCheckError::network(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: &ProbeRequest) -> Result<HttpResponse, ProbeFailure> {
        let response = self
            .client
            .get(&request.url)
            .header(USER_AGENT, request.user_agent)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(url = %request.url, error = %e, "HTTP request failed");
                ProbeFailure::from_reqwest(&e)
            })?;

        let status = response.status().as_u16();
        tracing::trace!(url = %request.url, final_url = %response.url(), status, "HTTP response");

        let body = if request.read_body && status == 200 {
            read_capped_body(response, MAX_BODY_BYTES).await?
        } else {
            String::new()
        };

        Ok(HttpResponse { status, body })
    }
}

/// Read at most `limit` bytes of the body, decoding lossily as UTF-8.
async fn read_capped_body(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<String, ProbeFailure> {
    let mut buf = Vec::new();

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ProbeFailure::from_reqwest(&e))?
    {
        if !append_capped(&mut buf, &chunk, limit) {
            tracing::debug!(url = %response.url(), limit, "Body truncated");
            break;
        }
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Append as much of `chunk` as fits under `limit`. Returns false once full.
fn append_capped(buf: &mut Vec<u8>, chunk: &[u8], limit: usize) -> bool {
    let room = limit.saturating_sub(buf.len());
    buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
    buf.len() < limit
}
