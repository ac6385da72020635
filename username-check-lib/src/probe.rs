//! Probe executor.
//!
//! A probe checks one site for one identifier: resolve the URL, issue a single
//! GET through the shared transport, classify the response, then wait out the
//! rate-limit delay. Every failure is folded into the returned [`Verdict`];
//! nothing propagates past [`probe`].

use crate::agent::{pick_user_agent, USER_AGENTS};
use crate::detection::classify;
use crate::error::ProbeFailure;
use crate::transport::{HttpTransport, ProbeRequest};
use crate::types::{DetectionType, ProbeStatus, SiteDescriptor, Verdict};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Probe `site` for `identifier`.
///
/// Returns exactly one verdict. The rate-limit delay is applied after the
/// request completes, whether it succeeded or failed.
///
/// # Example
///
/// ```rust,no_run
/// use username_check_lib::{probe, ReqwestTransport, SiteDescriptor};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let transport = ReqwestTransport::new(Duration::from_secs(10))?;
///     let site = SiteDescriptor::status_code("GitHub", "https://github.com/{username}");
///     let verdict = probe(&site, "octocat", &transport, Duration::from_secs(10), Duration::ZERO).await;
///     println!("{}: {}", verdict.site, verdict.status);
///     Ok(())
/// }
/// ```
pub async fn probe(
    site: &SiteDescriptor,
    identifier: &str,
    transport: &dyn HttpTransport,
    timeout: Duration,
    rate_limit: Duration,
) -> Verdict {
    run_probe(site, identifier, transport, timeout, rate_limit, None).await
}

/// Like [`probe`], but gives up with a `Cancelled` error verdict once
/// `cancel` fires.
///
/// A probe whose request already finished keeps its verdict; only the
/// remaining rate-limit delay is cut short.
pub async fn probe_cancellable(
    site: &SiteDescriptor,
    identifier: &str,
    transport: &dyn HttpTransport,
    timeout: Duration,
    rate_limit: Duration,
    cancel: &CancellationToken,
) -> Verdict {
    run_probe(site, identifier, transport, timeout, rate_limit, Some(cancel)).await
}

pub(crate) async fn run_probe(
    site: &SiteDescriptor,
    identifier: &str,
    transport: &dyn HttpTransport,
    timeout: Duration,
    rate_limit: Duration,
    cancel: Option<&CancellationToken>,
) -> Verdict {
    let url = site.resolve_url(identifier);
    let request = AssertUnwindSafe(request_and_classify(site, url.clone(), transport, timeout))
        .catch_unwind()
        .map(|outcome| outcome.unwrap_or_else(|panic| Err(panic_failure(panic))));

    let outcome = match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(ProbeFailure::Cancelled),
                outcome = request => outcome,
            }
        }
        None => request.await,
    };

    let verdict = match outcome {
        Ok(verdict) => verdict,
        Err(ProbeFailure::Cancelled) => {
            tracing::debug!(site = %site.name, "Probe cancelled");
            let cancelled = ProbeFailure::Cancelled.to_string();
            return Verdict::failed(site, url, ProbeStatus::Error, cancelled);
        }
        Err(failure) => {
            tracing::debug!(site = %site.name, url = %url, error = %failure, "Probe failed");
            Verdict::failed(site, url, ProbeStatus::Error, failure.to_string())
        }
    };

    if !rate_limit.is_zero() {
        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(rate_limit) => {}
                }
            }
            None => tokio::time::sleep(rate_limit).await,
        }
    }

    verdict
}

/// Request and classify, without the rate-limit delay.
async fn request_and_classify(
    site: &SiteDescriptor,
    url: String,
    transport: &dyn HttpTransport,
    timeout: Duration,
) -> Result<Verdict, ProbeFailure> {
    validate_url(&url)?;

    // The RNG is dropped before the first await.
    let user_agent = pick_user_agent(USER_AGENTS, &mut rand::thread_rng());
    let request = ProbeRequest {
        url,
        user_agent,
        timeout,
        read_body: site.detection_type == DetectionType::MessageBody,
    };

    tracing::debug!(site = %site.name, url = %request.url, "Probing site");

    let response = tokio::time::timeout(timeout, transport.get(&request))
        .await
        .map_err(|_| ProbeFailure::Timeout)??;

    let classification = classify(
        site.detection_type,
        response.status,
        &response.body,
        site.error_message.as_deref(),
    );
    tracing::trace!(
        site = %site.name,
        status_code = response.status,
        verdict = %classification.status,
        "Classified response"
    );

    let ProbeRequest { url, .. } = request;
    Ok(match classification.detail {
        Some(detail) => Verdict::failed(site, url, classification.status, detail),
        None => Verdict::new(site, url, classification.status),
    })
}

/// Check that a resolved URL is absolute and uses a scheme we can fetch.
pub(crate) fn validate_url(url: &str) -> Result<(), ProbeFailure> {
    let parsed = url::Url::parse(url).map_err(|e| ProbeFailure::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        _ => return Err(ProbeFailure::ProtocolFailure),
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(ProbeFailure::InvalidUrl("missing host".to_string())),
    }
}

fn panic_failure(panic: Box<dyn Any + Send>) -> ProbeFailure {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    ProbeFailure::Other(format!("Probe panicked: {}", message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed outcome and records what it was asked.
    struct FixedTransport {
        outcome: Result<HttpResponse, ProbeFailure>,
        delay: Duration,
        seen: Mutex<Vec<ProbeRequest>>,
    }

    impl FixedTransport {
        fn reply(status: u16, body: &str) -> Self {
            Self {
                outcome: Ok(HttpResponse::new(status, body)),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn fail(failure: ProbeFailure) -> Self {
            Self {
                outcome: Err(failure),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl HttpTransport for FixedTransport {
        async fn get(&self, request: &ProbeRequest) -> Result<HttpResponse, ProbeFailure> {
            self.seen.lock().unwrap().push(request.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome.clone()
        }
    }

    struct PanickingTransport;

    #[async_trait]
    impl HttpTransport for PanickingTransport {
        async fn get(&self, _request: &ProbeRequest) -> Result<HttpResponse, ProbeFailure> {
            panic!("transport exploded");
        }
    }

    fn github() -> SiteDescriptor {
        SiteDescriptor::status_code("GitHub", "https://github.test/{username}")
    }

    fn forum() -> SiteDescriptor {
        SiteDescriptor::message_body("Forum", "https://forum.test/u/{username}", "user not found")
    }

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn test_probe_found_sets_resolved_url() {
        let transport = FixedTransport::reply(200, "");
        let verdict = probe(&github(), "alice", &transport, TIMEOUT, Duration::ZERO).await;

        assert_eq!(verdict.site, "GitHub");
        assert_eq!(verdict.url, "https://github.test/alice");
        assert_eq!(verdict.status, ProbeStatus::Found);
        assert_eq!(verdict.error, None);
    }

    #[tokio::test]
    async fn test_probe_sends_pooled_user_agent() {
        let transport = FixedTransport::reply(404, "");
        probe(&github(), "alice", &transport, TIMEOUT, Duration::ZERO).await;

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(USER_AGENTS.contains(&seen[0].user_agent));
        assert_eq!(seen[0].timeout, TIMEOUT);
        assert!(!seen[0].read_body);
    }

    #[tokio::test]
    async fn test_message_body_site_requests_body() {
        let transport = FixedTransport::reply(200, "Oops: User Not Found");
        let verdict = probe(&forum(), "ghost", &transport, TIMEOUT, Duration::ZERO).await;

        assert_eq!(verdict.status, ProbeStatus::NotFound);
        assert!(transport.seen.lock().unwrap()[0].read_body);
    }

    #[tokio::test]
    async fn test_unexpected_status_is_unknown() {
        let transport = FixedTransport::reply(500, "");
        let verdict = probe(&github(), "alice", &transport, TIMEOUT, Duration::ZERO).await;

        assert_eq!(verdict.status, ProbeStatus::Unknown);
        assert_eq!(verdict.error.as_deref(), Some("Unexpected status: 500"));
    }

    #[tokio::test]
    async fn test_transport_failures_become_error_verdicts() {
        let cases = [
            (ProbeFailure::ConnectionFailure, "Connection failed"),
            (ProbeFailure::ProtocolFailure, "SSL/TLS error"),
            (ProbeFailure::Timeout, "Timeout"),
            (ProbeFailure::Other("reset by peer".into()), "reset by peer"),
        ];

        for (failure, expected) in cases {
            let transport = FixedTransport::fail(failure);
            let verdict = probe(&github(), "alice", &transport, TIMEOUT, Duration::ZERO).await;
            assert_eq!(verdict.status, ProbeStatus::Error);
            assert_eq!(verdict.error.as_deref(), Some(expected));
            assert_eq!(verdict.url, "https://github.test/alice");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_times_out() {
        let transport = FixedTransport::reply(200, "").delayed(Duration::from_secs(60));
        let start = tokio::time::Instant::now();
        let verdict = probe(&github(), "alice", &transport, Duration::from_secs(1), Duration::ZERO).await;

        assert_eq!(verdict.status, ProbeStatus::Error);
        assert_eq!(verdict.error.as_deref(), Some("Timeout"));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_applies_after_success_and_failure() {
        let rate_limit = Duration::from_millis(500);

        let ok = FixedTransport::reply(200, "");
        let start = tokio::time::Instant::now();
        probe(&github(), "alice", &ok, TIMEOUT, rate_limit).await;
        assert!(start.elapsed() >= rate_limit);

        let failing = FixedTransport::fail(ProbeFailure::ConnectionFailure);
        let start = tokio::time::Instant::now();
        probe(&github(), "alice", &failing, TIMEOUT, rate_limit).await;
        assert!(start.elapsed() >= rate_limit);
    }

    #[tokio::test]
    async fn test_malformed_template_is_per_site_error() {
        let transport = FixedTransport::reply(200, "");
        let site = SiteDescriptor::status_code("Broken", "not a url/{username}");
        let verdict = probe(&site, "alice", &transport, TIMEOUT, Duration::ZERO).await;

        assert_eq!(verdict.status, ProbeStatus::Error);
        assert!(verdict.error.unwrap().starts_with("Invalid URL"));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_protocol_error() {
        let transport = FixedTransport::reply(200, "");
        let site = SiteDescriptor::status_code("Ftp", "ftp://files.test/{username}");
        let verdict = probe(&site, "alice", &transport, TIMEOUT, Duration::ZERO).await;

        assert_eq!(verdict.error.as_deref(), Some("SSL/TLS error"));
    }

    #[tokio::test]
    async fn test_panicking_transport_is_contained() {
        let verdict = probe(&github(), "alice", &PanickingTransport, TIMEOUT, Duration::ZERO).await;

        assert_eq!(verdict.status, ProbeStatus::Error);
        assert_eq!(
            verdict.error.as_deref(),
            Some("Probe panicked: transport exploded")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_probe_reports_cancellation() {
        let transport = FixedTransport::reply(200, "").delayed(Duration::from_secs(60));
        let token = CancellationToken::new();
        let canceller = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let verdict = probe_cancellable(
            &github(),
            "alice",
            &transport,
            TIMEOUT,
            Duration::from_secs(1),
            &token,
        )
        .await;

        assert_eq!(verdict.status, ProbeStatus::Error);
        assert_eq!(verdict.error.as_deref(), Some("Cancelled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay_keeps_verdict() {
        let transport = FixedTransport::reply(200, "");
        let token = CancellationToken::new();
        let canceller = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let start = tokio::time::Instant::now();
        let verdict = probe_cancellable(
            &github(),
            "alice",
            &transport,
            TIMEOUT,
            Duration::from_secs(30),
            &token,
        )
        .await;

        assert_eq!(verdict.status, ProbeStatus::Found);
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://x.test/alice").is_ok());
        assert!(validate_url("http://127.0.0.1:8080/alice").is_ok());
        assert!(matches!(
            validate_url("/relative/alice"),
            Err(ProbeFailure::InvalidUrl(_))
        ));
        assert_eq!(
            validate_url("mailto:alice@x.test"),
            Err(ProbeFailure::ProtocolFailure)
        );
    }
}
