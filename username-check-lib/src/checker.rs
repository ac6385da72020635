//! Main username checker implementation.
//!
//! This module provides the `UsernameChecker` struct that fans one identifier
//! out to every configured site, drains the probes as they complete and
//! partitions their verdicts into a [`ResultSet`].

use crate::error::UsernameCheckError;
use crate::probe::run_probe;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{ResultSet, ScanConfig, ScanProgress, SiteDescriptor, Verdict};
use futures::stream::{self, Stream, StreamExt};
use std::pin::pin;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Scan coordinator.
///
/// A scan always runs to completion: individual probe failures become error
/// verdicts, so every site yields exactly one verdict.
///
/// # Example
///
/// ```rust,no_run
/// use username_check_lib::{ScanConfig, SiteDescriptor, UsernameChecker};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let checker = UsernameChecker::with_config(
///         ScanConfig::default().with_timeout(Duration::from_secs(5)),
///     );
///     let sites = vec![SiteDescriptor::status_code("GitHub", "https://github.com/{username}")];
///     let results = checker.scan("octocat", &sites).await?;
///     println!("found on {} sites", results.found.len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct UsernameChecker {
    /// Configuration settings for this checker instance
    config: ScanConfig,
}

impl UsernameChecker {
    /// Create a new checker with default configuration.
    ///
    /// Default settings:
    /// - Timeout: 10 seconds
    /// - Rate limit: 0.5 seconds after each probe
    /// - Concurrency: every site at once
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new checker with custom configuration.
    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scan `sites` for `identifier`.
    ///
    /// A fresh connection pool is created for the scan and released when it
    /// returns.
    ///
    /// # Errors
    ///
    /// Only fails if the HTTP client cannot be constructed. Probe failures are
    /// reported inside the result set.
    pub async fn scan(
        &self,
        identifier: &str,
        sites: &[SiteDescriptor],
    ) -> Result<ResultSet, UsernameCheckError> {
        self.scan_with_progress(identifier, sites, |_| {}).await
    }

    /// Scan and report `(completed, total)` after every probe.
    pub async fn scan_with_progress<F>(
        &self,
        identifier: &str,
        sites: &[SiteDescriptor],
        on_progress: F,
    ) -> Result<ResultSet, UsernameCheckError>
    where
        F: FnMut(ScanProgress),
    {
        let transport = ReqwestTransport::new(self.config.timeout)?;
        Ok(self
            .scan_with_transport(identifier, sites, &transport, None, on_progress)
            .await)
    }

    /// Scan with a cancellation token.
    ///
    /// Once `cancel` fires, probes still in flight (and any not yet started)
    /// resolve to `Cancelled` error verdicts; the scan still returns one
    /// verdict per site.
    pub async fn scan_with_cancel<F>(
        &self,
        identifier: &str,
        sites: &[SiteDescriptor],
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<ResultSet, UsernameCheckError>
    where
        F: FnMut(ScanProgress),
    {
        let transport = ReqwestTransport::new(self.config.timeout)?;
        Ok(self
            .scan_with_transport(identifier, sites, &transport, Some(cancel), on_progress)
            .await)
    }

    /// Scan through a caller-supplied transport.
    ///
    /// This is the coordinator proper; the other `scan*` methods build a
    /// [`ReqwestTransport`] and delegate here.
    pub async fn scan_with_transport<F>(
        &self,
        identifier: &str,
        sites: &[SiteDescriptor],
        transport: &dyn HttpTransport,
        cancel: Option<&CancellationToken>,
        mut on_progress: F,
    ) -> ResultSet
    where
        F: FnMut(ScanProgress),
    {
        let total = sites.len();
        let start_time = Instant::now();
        tracing::info!(identifier, sites = total, "Starting scan");

        let mut results = ResultSet::default();
        let mut completed = 0usize;
        let mut verdicts = pin!(self.verdict_stream(identifier, sites, transport, cancel));

        while let Some(verdict) = verdicts.next().await {
            completed += 1;
            tracing::debug!(
                site = %verdict.site,
                status = %verdict.status,
                completed,
                total,
                "Probe completed"
            );
            results.push(verdict);
            on_progress(ScanProgress { completed, total });
        }

        tracing::info!(
            identifier,
            found = results.found.len(),
            not_found = results.not_found.len(),
            errors = results.errors.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Scan completed"
        );

        results
    }

    /// Stream of verdicts in completion order.
    ///
    /// Yields exactly `sites.len()` items. At most `config.concurrency`
    /// probes are in flight; by default all of them are.
    pub fn verdict_stream<'a>(
        &'a self,
        identifier: &'a str,
        sites: &'a [SiteDescriptor],
        transport: &'a dyn HttpTransport,
        cancel: Option<&'a CancellationToken>,
    ) -> impl Stream<Item = Verdict> + 'a {
        let timeout = self.config.timeout;
        let rate_limit = self.config.rate_limit;
        let in_flight = self.config.concurrency.unwrap_or(sites.len()).max(1);

        stream::iter(sites)
            .map(move |site| run_probe(site, identifier, transport, timeout, rate_limit, cancel))
            .buffer_unordered(in_flight)
    }

    /// Get the current configuration for this checker.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Update the configuration for this checker.
    pub fn set_config(&mut self, config: ScanConfig) {
        self.config = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeFailure;
    use crate::transport::{HttpResponse, ProbeRequest};
    use crate::types::ProbeStatus;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Routes on the host: "slow*" sleeps, "down*" refuses, "gone*" is a 404,
    /// "bug*" panics, everything else is a 200.
    struct RoutedTransport;

    #[async_trait]
    impl HttpTransport for RoutedTransport {
        async fn get(&self, request: &ProbeRequest) -> Result<HttpResponse, ProbeFailure> {
            let host = request.url.split('/').nth(2).unwrap_or_default();
            if host.starts_with("slow") {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            match host {
                h if h.starts_with("down") => Err(ProbeFailure::ConnectionFailure),
                h if h.starts_with("gone") => Ok(HttpResponse::new(404, "")),
                h if h.starts_with("bug") => panic!("transport bug on {}", h),
                _ => Ok(HttpResponse::new(200, "")),
            }
        }
    }

    fn site(host: &str) -> SiteDescriptor {
        SiteDescriptor::status_code(host, format!("https://{}.test/{{username}}", host))
    }

    fn checker() -> UsernameChecker {
        UsernameChecker::with_config(ScanConfig::default().with_rate_limit(Duration::ZERO))
    }

    #[tokio::test]
    async fn test_empty_site_list() {
        let mut calls = 0;
        let results = checker()
            .scan_with_transport("alice", &[], &RoutedTransport, None, |_| calls += 1)
            .await;

        assert!(results.is_empty());
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_partitions_every_site_once() {
        let sites = vec![site("up"), site("gone"), site("down"), site("up2")];
        let results = checker()
            .scan_with_transport("alice", &sites, &RoutedTransport, None, |_| {})
            .await;

        assert_eq!(results.total(), sites.len());
        assert_eq!(results.found.len(), 2);
        assert_eq!(results.not_found.len(), 1);
        assert_eq!(results.errors.len(), 1);
        assert_eq!(results.errors[0].error.as_deref(), Some("Connection failed"));
    }

    #[tokio::test]
    async fn test_progress_counts_up_to_total() {
        let sites = vec![site("up"), site("gone"), site("down")];
        let mut events = Vec::new();
        checker()
            .scan_with_transport("alice", &sites, &RoutedTransport, None, |p| events.push(p))
            .await;

        let completed: Vec<_> = events.iter().map(|p| p.completed).collect();
        assert_eq!(completed, vec![1, 2, 3]);
        assert!(events.iter().all(|p| p.total == 3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_order_not_input_order() {
        let sites = vec![site("slow"), site("fast")];
        let results = checker()
            .scan_with_transport("alice", &sites, &RoutedTransport, None, |_| {})
            .await;

        let order: Vec<_> = results.found.iter().map(|v| v.site.as_str()).collect();
        assert_eq!(order, vec!["fast", "slow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap_serializes_probes() {
        let sites = vec![site("slow1"), site("slow2"), site("slow3")];
        let capped = UsernameChecker::with_config(
            ScanConfig::default()
                .with_rate_limit(Duration::ZERO)
                .with_concurrency(1),
        );

        let start = tokio::time::Instant::now();
        let results = capped
            .scan_with_transport("alice", &sites, &RoutedTransport, None, |_| {})
            .await;

        assert_eq!(results.found.len(), 3);
        assert!(start.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_reports_outstanding_probes() {
        let sites = vec![site("fast"), site("slow1"), site("slow2")];
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let results = checker()
            .scan_with_transport("alice", &sites, &RoutedTransport, Some(&token), |_| {})
            .await;

        assert_eq!(results.total(), 3);
        assert_eq!(results.found.len(), 1);
        assert_eq!(results.errors.len(), 2);
        assert!(results
            .errors
            .iter()
            .all(|v| v.status == ProbeStatus::Error && v.error.as_deref() == Some("Cancelled")));
    }

    #[tokio::test]
    async fn test_panicking_site_does_not_fail_scan() {
        let sites = vec![site("up"), site("bug"), site("gone")];
        let results = checker()
            .scan_with_transport("alice", &sites, &RoutedTransport, None, |_| {})
            .await;

        assert_eq!(results.total(), 3);
        assert_eq!(results.found.len(), 1);
        assert_eq!(results.not_found.len(), 1);
        assert_eq!(results.errors.len(), 1);
        assert_eq!(results.errors[0].site, "bug");
        assert!(results.errors[0]
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("Probe panicked")));
    }

    #[test]
    fn test_checker_config_roundtrip() {
        let mut checker = UsernameChecker::new();
        assert_eq!(checker.config(), &ScanConfig::default());

        let config = ScanConfig::default().with_timeout(Duration::from_secs(3));
        checker.set_config(config.clone());
        assert_eq!(checker.config(), &config);
    }
}
