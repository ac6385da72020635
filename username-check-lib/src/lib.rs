//! # Username Check Library
//!
//! A fast, concurrent library for checking whether a username is registered
//! on a list of websites.
//!
//! Each site is described by a URL template containing `{username}` and a
//! detection strategy. The library fans a single identifier out to every site
//! at once, classifies each response, and partitions the verdicts into found,
//! not-found and error groups.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use username_check_lib::{load_sites, UsernameChecker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sites = load_sites("sites.json")?;
//!     let checker = UsernameChecker::new();
//!     let results = checker.scan("octocat", &sites).await?;
//!
//!     for verdict in &results.found {
//!         println!("{}: {}", verdict.site, verdict.url);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Two detection strategies**: status-code and soft-404 body matching
//! - **Concurrent scanning**: every probe in flight at once, optionally capped
//! - **Fault isolation**: a failing site becomes an error verdict, never a failed scan
//! - **Cancellation**: outstanding probes resolve to `Cancelled` verdicts
//! - **Configurable**: TOML defaults and `UC_*` environment variables

// Re-export main public API types and functions
// This makes them available as username_check_lib::TypeName
pub use agent::{pick_user_agent, USER_AGENTS};
pub use checker::UsernameChecker;
pub use config::{
    env_config_from, load_env_config, load_sites, parse_duration_string, parse_sites,
    validate_sites, ConfigManager, DefaultsConfig, EnvConfig, FileConfig, SitesFile,
    EXPORT_FORMATS, MAX_CONCURRENCY,
};
pub use detection::{classify, Classification};
pub use error::{ProbeFailure, UsernameCheckError};
pub use probe::{probe, probe_cancellable};
pub use transport::{HttpResponse, HttpTransport, ProbeRequest, ReqwestTransport, MAX_BODY_BYTES};
pub use types::{
    DetectionType, ProbeStatus, ResultSet, ScanConfig, ScanProgress, SiteDescriptor, Verdict,
    USERNAME_PLACEHOLDER,
};

// Callers need the token type to cancel a scan
pub use tokio_util::sync::CancellationToken;

// Internal modules - these are not part of the public API
mod agent;
mod checker;
mod config;
mod detection;
mod error;
mod probe;
mod transport;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, UsernameCheckError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        user_agents: USER_AGENTS.len(),
    }
}

/// Information about the library build
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    /// Size of the built-in User-Agent pool
    pub user_agents: usize,
}
