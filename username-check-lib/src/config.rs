//! Site list loading and configuration file management.
//!
//! This module reads the JSON site list consumed by the scanner, and handles
//! the optional TOML defaults file and `UC_*` environment variables with
//! proper precedence rules. The scanner itself never calls into this module;
//! callers resolve configuration first and pass plain values in.

use crate::error::UsernameCheckError;
use crate::types::{DetectionType, SiteDescriptor, USERNAME_PLACEHOLDER};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound accepted for the in-flight probe cap.
pub const MAX_CONCURRENCY: usize = 500;

/// Export formats understood by the CLI.
pub const EXPORT_FORMATS: &[&str] = &["txt", "json"];

/// On-disk shape of the site list: `{"sites": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SitesFile {
    pub sites: Vec<SiteDescriptor>,
}

/// Load and validate a site list from a JSON file.
///
/// # Errors
///
/// Returns `UsernameCheckError` if the file is missing or unreadable, is not
/// valid JSON, lacks a `sites` key, or contains an invalid descriptor.
pub fn load_sites<P: AsRef<Path>>(path: P) -> Result<Vec<SiteDescriptor>, UsernameCheckError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(UsernameCheckError::file_error(
            path.to_string_lossy(),
            "Site list not found",
        ));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        UsernameCheckError::file_error(
            path.to_string_lossy(),
            format!("Failed to read site list: {}", e),
        )
    })?;

    let sites = parse_sites(&content)?;
    tracing::info!(path = %path.display(), count = sites.len(), "Loaded site list");
    Ok(sites)
}

/// Parse and validate a site list from JSON text.
pub fn parse_sites(content: &str) -> Result<Vec<SiteDescriptor>, UsernameCheckError> {
    let file: SitesFile = serde_json::from_str(content)?;
    validate_sites(&file.sites)?;
    Ok(file.sites)
}

/// Validate every descriptor in a site list.
///
/// Duplicate names are allowed.
pub fn validate_sites(sites: &[SiteDescriptor]) -> Result<(), UsernameCheckError> {
    for (index, site) in sites.iter().enumerate() {
        let label = if site.name.trim().is_empty() {
            format!("#{}", index + 1)
        } else {
            site.name.clone()
        };

        if site.name.trim().is_empty() {
            return Err(UsernameCheckError::invalid_site(label, "name cannot be empty"));
        }

        if !site.url_template.contains(USERNAME_PLACEHOLDER) {
            return Err(UsernameCheckError::invalid_site(
                label,
                format!("url_template must contain {}", USERNAME_PLACEHOLDER),
            ));
        }

        if site.detection_type == DetectionType::MessageBody
            && site
                .error_message
                .as_deref()
                .map_or(true, |marker| marker.trim().is_empty())
        {
            return Err(UsernameCheckError::invalid_site(
                label,
                "message_body detection requires a non-empty error_message",
            ));
        }
    }

    Ok(())
}

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Per-request timeout (e.g., "10s", "1500ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Delay after each probe (e.g., "0.5", "250ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<String>,

    /// Path to the site list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sites: Option<String>,

    /// Maximum probes in flight
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Export format applied when the CLI is not given one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<String>,
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Clone, Default)]
pub struct ConfigManager;

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, UsernameCheckError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(UsernameCheckError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            UsernameCheckError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory file, then the
    /// working directory file.
    pub fn discover_and_load(&self) -> Result<FileConfig, UsernameCheckError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping config file"),
            }
        }

        if loaded_files.len() > 1 {
            tracing::info!(files = ?loaded_files, "Merged multiple config files, last wins");
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./username-check.toml", "./.username-check.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Get the global configuration file path.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let candidates = [".username-check.toml", "username-check.toml"];

        candidates
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("username-check").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations; values from `higher` win.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower), Some(higher)) => Some(DefaultsConfig {
                    timeout: higher.timeout.or(lower.timeout),
                    rate_limit: higher.rate_limit.or(lower.rate_limit),
                    sites: higher.sites.or(lower.sites),
                    concurrency: higher.concurrency.or(lower.concurrency),
                    export: higher.export.or(lower.export),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), UsernameCheckError> {
        let Some(defaults) = &config.defaults else {
            return Ok(());
        };

        if let Some(timeout) = &defaults.timeout {
            match parse_duration_string(timeout) {
                Some(d) if !d.is_zero() => {}
                _ => {
                    return Err(UsernameCheckError::config(format!(
                        "Invalid timeout '{}'. Use a positive value like '10', '10s', '1500ms'",
                        timeout
                    )))
                }
            }
        }

        if let Some(rate_limit) = &defaults.rate_limit {
            if parse_duration_string(rate_limit).is_none() {
                return Err(UsernameCheckError::config(format!(
                    "Invalid rate_limit '{}'. Use a value like '0.5', '500ms', '1s'",
                    rate_limit
                )));
            }
        }

        if let Some(concurrency) = defaults.concurrency {
            if concurrency == 0 || concurrency > MAX_CONCURRENCY {
                return Err(UsernameCheckError::config(format!(
                    "Concurrency must be between 1 and {}",
                    MAX_CONCURRENCY
                )));
            }
        }

        if let Some(export) = &defaults.export {
            if !EXPORT_FORMATS.contains(&export.as_str()) {
                return Err(UsernameCheckError::config(format!(
                    "Invalid export format '{}'. Use one of: {}",
                    export,
                    EXPORT_FORMATS.join(", ")
                )));
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub timeout: Option<Duration>,
    pub rate_limit: Option<Duration>,
    pub sites: Option<String>,
    pub concurrency: Option<usize>,
    pub config: Option<String>,
}

/// Load configuration from `UC_*` environment variables.
///
/// Invalid values are logged and ignored.
pub fn load_env_config() -> EnvConfig {
    env_config_from(|key| env::var(key).ok())
}

/// Build an [`EnvConfig`] from an arbitrary variable lookup.
pub fn env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("UC_TIMEOUT") {
        match parse_duration_string(&val) {
            Some(timeout) if !timeout.is_zero() => env_config.timeout = Some(timeout),
            _ => tracing::warn!(value = %val, "Ignoring invalid UC_TIMEOUT"),
        }
    }

    if let Some(val) = lookup("UC_RATE_LIMIT") {
        match parse_duration_string(&val) {
            Some(rate_limit) => env_config.rate_limit = Some(rate_limit),
            None => tracing::warn!(value = %val, "Ignoring invalid UC_RATE_LIMIT"),
        }
    }

    if let Some(val) = lookup("UC_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(n) if (1..=MAX_CONCURRENCY).contains(&n) => env_config.concurrency = Some(n),
            _ => tracing::warn!(value = %val, "Ignoring invalid UC_CONCURRENCY"),
        }
    }

    env_config.sites = lookup("UC_SITES").filter(|s| !s.trim().is_empty());
    env_config.config = lookup("UC_CONFIG").filter(|s| !s.trim().is_empty());

    env_config
}

/// Parse a duration like `"10"`, `"0.5"`, `"10s"`, `"500ms"` or `"2m"`.
///
/// Bare numbers are seconds. Returns `None` for negative or malformed input.
pub fn parse_duration_string(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();

    let (number, scale) = if let Some(ms) = input.strip_suffix("ms") {
        (ms, 0.001)
    } else if let Some(s) = input.strip_suffix('s') {
        (s, 1.0)
    } else if let Some(m) = input.strip_suffix('m') {
        (m, 60.0)
    } else {
        (input.as_str(), 1.0)
    };

    let value: f64 = number.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    Duration::try_from_secs_f64(value * scale).ok()
}
