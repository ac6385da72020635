//! Core data types for username probing.
//!
//! This module defines the site descriptors read from the site list, the
//! verdict produced for every probe, the three-way result set a scan builds,
//! and the configuration accepted by the scan coordinator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder substituted with the identifier in every URL template.
pub const USERNAME_PLACEHOLDER: &str = "{username}";

/// Static configuration for one target service.
///
/// Loaded once per run and never modified afterwards. Duplicated names are
/// allowed and simply produce two verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDescriptor {
    /// Display name of the service (e.g., "GitHub")
    pub name: String,

    /// URL with a `{username}` placeholder (e.g., "https://github.com/{username}")
    pub url_template: String,

    /// How account existence is detected for this service
    pub detection_type: DetectionType,

    /// Case-insensitive marker whose presence in a 200 body means "no such user".
    /// Required when `detection_type` is `MessageBody`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SiteDescriptor {
    /// Create a descriptor that relies on HTTP status codes only.
    pub fn status_code<N: Into<String>, T: Into<String>>(name: N, url_template: T) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            detection_type: DetectionType::StatusCode,
            error_message: None,
        }
    }

    /// Create a descriptor that also inspects 200 bodies for a not-found marker.
    pub fn message_body<N: Into<String>, T: Into<String>, M: Into<String>>(
        name: N,
        url_template: T,
        error_message: M,
    ) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            detection_type: DetectionType::MessageBody,
            error_message: Some(error_message.into()),
        }
    }

    /// Substitute the identifier into the URL template.
    ///
    /// The identifier is passed through verbatim; no encoding is applied.
    pub fn resolve_url(&self, identifier: &str) -> String {
        self.url_template.replace(USERNAME_PLACEHOLDER, identifier)
    }
}

/// Existence-detection rule for a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionType {
    /// 200 means the account exists, 404 means it does not
    #[serde(rename = "status_code")]
    StatusCode,

    /// Like `StatusCode`, but a 200 page containing the site's error marker
    /// counts as not found ("soft-404")
    #[serde(rename = "message_body")]
    MessageBody,
}

/// Outcome status of probing one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// The account exists
    Found,
    /// The account does not exist
    NotFound,
    /// The site answered with a status the detection rule does not cover
    Unknown,
    /// The probe failed before a response could be classified
    Error,
}

/// Outcome of probing one site for one identifier.
///
/// Created exactly once by the probe executor and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Name of the probed site
    pub site: String,

    /// Fully resolved URL used for the request
    pub url: String,

    /// Classification of the probe
    pub status: ProbeStatus,

    /// Diagnostic, present iff status is `Unknown` or `Error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    pub(crate) fn new(site: &SiteDescriptor, url: String, status: ProbeStatus) -> Self {
        Self {
            site: site.name.clone(),
            url,
            status,
            error: None,
        }
    }

    pub(crate) fn failed<E: Into<String>>(
        site: &SiteDescriptor,
        url: String,
        status: ProbeStatus,
        error: E,
    ) -> Self {
        Self {
            site: site.name.clone(),
            url,
            status,
            error: Some(error.into()),
        }
    }
}

/// Three-way partition of all verdicts for one scan.
///
/// Order within each bucket is completion order, which varies between runs.
/// Use [`ResultSet::sorted`] when a deterministic order is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Sites where the account exists
    pub found: Vec<Verdict>,
    /// Sites where the account does not exist
    pub not_found: Vec<Verdict>,
    /// Sites that could not be classified (`Unknown` and `Error`)
    pub errors: Vec<Verdict>,
}

impl ResultSet {
    /// Append a verdict to the bucket matching its status.
    pub(crate) fn push(&mut self, verdict: Verdict) {
        match verdict.status {
            ProbeStatus::Found => self.found.push(verdict),
            ProbeStatus::NotFound => self.not_found.push(verdict),
            ProbeStatus::Unknown | ProbeStatus::Error => self.errors.push(verdict),
        }
    }

    /// Total number of verdicts across all buckets.
    pub fn total(&self) -> usize {
        self.found.len() + self.not_found.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Iterate over every verdict, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = &Verdict> {
        self.found
            .iter()
            .chain(self.not_found.iter())
            .chain(self.errors.iter())
    }

    /// Copy of this result set with each bucket ordered by site name, then URL.
    pub fn sorted(&self) -> Self {
        let sort = |bucket: &[Verdict]| {
            let mut bucket = bucket.to_vec();
            bucket.sort_by(|a, b| a.site.cmp(&b.site).then_with(|| a.url.cmp(&b.url)));
            bucket
        };

        Self {
            found: sort(&self.found),
            not_found: sort(&self.not_found),
            errors: sort(&self.errors),
        }
    }
}

/// Progress signal emitted each time a probe completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    /// Probes completed so far
    pub completed: usize,
    /// Probes in this scan
    pub total: usize,
}

/// Configuration for a scan.
///
/// Passed in by the caller; the scan coordinator never reads files or
/// environment variables itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Timeout for each individual request
    /// Default: 10 seconds
    pub timeout: Duration,

    /// Delay applied after each probe completes
    /// Default: 500 milliseconds
    pub rate_limit: Duration,

    /// Maximum number of probes in flight at once.
    /// Default: None (every site is probed concurrently)
    pub concurrency: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            rate_limit: Duration::from_millis(500),
            concurrency: None,
        }
    }
}

impl ScanConfig {
    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the post-probe delay.
    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Cap the number of in-flight probes. Zero is raised to one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency.max(1));
        self
    }
}

impl std::fmt::Display for DetectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionType::StatusCode => write!(f, "status_code"),
            DetectionType::MessageBody => write!(f, "message_body"),
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Found => write!(f, "found"),
            ProbeStatus::NotFound => write!(f, "not_found"),
            ProbeStatus::Unknown => write!(f, "unknown"),
            ProbeStatus::Error => write!(f, "error"),
        }
    }
}
