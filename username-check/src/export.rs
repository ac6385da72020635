//! Result export for the username-check CLI.
//!
//! Writes the accounts found by a scan to `<username>_<YYYYMMDD_HHMMSS>.<ext>`
//! in the chosen directory.

use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use username_check_lib::{ResultSet, Verdict};

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Txt,
    Json,
}

impl ExportFormat {
    /// Parse a format name as written in a config file.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "txt" => Some(Self::Txt),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Json => "json",
        }
    }
}

#[derive(Serialize)]
struct ExportSummary {
    found: usize,
    not_found: usize,
    errors: usize,
}

#[derive(Serialize)]
struct JsonExport<'a> {
    username: &'a str,
    scan_date: String,
    summary: ExportSummary,
    results: &'a [Verdict],
}

/// File name for an export taken at `now`.
///
/// Characters outside `[A-Za-z0-9._@-]` become `_`, so the name is always a
/// single path component inside the export directory.
pub fn export_filename(username: &str, format: ExportFormat, now: &DateTime<Local>) -> String {
    format!(
        "{}_{}.{}",
        sanitize_component(username),
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

fn sanitize_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Plain-text report listing every found account.
pub fn render_txt(username: &str, results: &ResultSet, now: &DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str(&format!("Username Check Results: {}\n", username));
    out.push_str(&format!("Scan Date: {}\n", now.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("{}\n\n", "=".repeat(60)));

    if results.found.is_empty() {
        out.push_str("No accounts found.\n");
    } else {
        out.push_str(&format!("FOUND ON {} PLATFORMS:\n\n", results.found.len()));
        for verdict in &results.found {
            out.push_str(&format!("  • {}\n", verdict.site));
            out.push_str(&format!("    {}\n\n", verdict.url));
        }
    }

    out
}

/// JSON report with per-bucket counts and the found verdicts.
pub fn render_json(
    username: &str,
    results: &ResultSet,
    now: &DateTime<Local>,
) -> Result<String, serde_json::Error> {
    let export = JsonExport {
        username,
        scan_date: now.to_rfc3339(),
        summary: ExportSummary {
            found: results.found.len(),
            not_found: results.not_found.len(),
            errors: results.errors.len(),
        },
        results: &results.found,
    };
    serde_json::to_string_pretty(&export)
}

/// Write `results` to a new file in `dir` and return its path.
pub fn export_results(
    username: &str,
    results: &ResultSet,
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let now = Local::now();
    let path = dir.join(export_filename(username, format, &now));

    let contents = match format {
        ExportFormat::Txt => render_txt(username, results, &now),
        ExportFormat::Json => render_json(username, results, &now)?,
    };

    fs::write(&path, contents)
        .map_err(|e| format!("Failed to write export '{}': {}", path.display(), e))?;
    tracing::info!(path = %path.display(), "Exported results");

    Ok(path)
}
