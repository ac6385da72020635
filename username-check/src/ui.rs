//! Terminal display logic for the username-check CLI.
//!
//! This module handles the human-readable output: banner, scan header,
//! progress line, found-accounts table, error list and summary. Uses only the
//! `console` crate. Progress goes to stderr so stdout stays clean.

use console::{pad_str, style, Alignment, Term};
use std::time::Duration;
use username_check_lib::{ProbeStatus, ResultSet, ScanConfig, ScanProgress, Verdict};

/// Column width for site names in the found table.
const SITE_WIDTH: usize = 20;

// ── Banner ───────────────────────────────────────────────────────────────────

/// Print the startup banner.
pub fn print_banner() {
    let title = format!("username-check v{}", env!("CARGO_PKG_VERSION"));
    let line = "═".repeat(47);
    println!("{}", style(format!("╔{}╗", line)).cyan());
    println!(
        "{}   {}{}",
        style("║").cyan(),
        style(pad_str(&title, 44, Alignment::Left, None)).bold(),
        style("║").cyan()
    );
    println!(
        "{}",
        style(format!("║   {}║", pad_str("Username enumeration across web services", 44, Alignment::Left, None))).cyan()
    );
    println!("{}", style(format!("╚{}╝", line)).cyan());
    println!();
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print the "Scanning username" header with the effective settings.
pub fn print_scan_header(username: &str, site_count: usize, config: &ScanConfig) {
    println!(
        "{} {}",
        style("Scanning username:").cyan().bold(),
        style(username).yellow()
    );

    let concurrency = config
        .concurrency
        .map(|n| n.to_string())
        .unwrap_or_else(|| "all".to_string());
    let meta = [
        format!("{} site{}", site_count, if site_count == 1 { "" } else { "s" }),
        format!("Timeout: {:.1}s", config.timeout.as_secs_f64()),
        format!("Rate limit: {:.1}s", config.rate_limit.as_secs_f64()),
        format!("Concurrency: {}", concurrency),
    ];
    println!("{}", style(meta.join(" | ")).dim());
    println!();
}

// ── Progress ─────────────────────────────────────────────────────────────────

/// Single-line `[completed/total]` counter redrawn on stderr.
///
/// Silent unless stderr is a terminal.
pub struct ProgressLine {
    term: Term,
    enabled: bool,
}

impl ProgressLine {
    pub fn new(enabled: bool) -> Self {
        let term = Term::stderr();
        let enabled = enabled && term.is_term();
        Self { term, enabled }
    }

    pub fn update(&self, progress: ScanProgress) {
        if !self.enabled {
            return;
        }
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&format_progress(progress));
    }

    pub fn finish(&self) {
        if self.enabled {
            let _ = self.term.clear_line();
        }
    }
}

fn format_progress(progress: ScanProgress) -> String {
    let percent = if progress.total == 0 {
        100
    } else {
        progress.completed * 100 / progress.total
    };
    format!(
        "{} Checking sites... {}%",
        style(format!("[{}/{}]", progress.completed, progress.total)).cyan(),
        percent
    )
}

// ── Results ──────────────────────────────────────────────────────────────────

/// Print found accounts as an aligned table, or "No accounts found.".
pub fn print_found(results: &ResultSet) {
    if results.found.is_empty() {
        println!("{}", style("No accounts found.").yellow());
        return;
    }

    println!(
        "  {} {}",
        style(format!("── Found ({} platforms) ", results.found.len()))
            .green()
            .bold(),
        style("─".repeat(36)).green().dim(),
    );
    for line in found_table_lines(&results.found) {
        println!("{}", line);
    }
}

fn found_table_lines(found: &[Verdict]) -> Vec<String> {
    let mut lines = vec![format!(
        "    {}  {}",
        style(pad_str("Platform", SITE_WIDTH, Alignment::Left, None)).bold(),
        style("URL").bold()
    )];

    lines.extend(found.iter().map(|verdict| {
        format!(
            "    {}  {}",
            style(pad_str(&verdict.site, SITE_WIDTH, Alignment::Left, Some(".."))).cyan(),
            style(&verdict.url).blue()
        )
    }));

    lines
}

/// Print the error count, and with `debug` every error with its diagnostic.
pub fn print_errors(results: &ResultSet, debug: bool) {
    if results.errors.is_empty() {
        return;
    }

    println!();
    println!(
        "{}",
        style(format!(
            "⚠ {} error{}/timeout{} occurred",
            results.errors.len(),
            if results.errors.len() == 1 { "" } else { "s" },
            if results.errors.len() == 1 { "" } else { "s" },
        ))
        .dim()
    );

    if debug {
        for verdict in &results.errors {
            println!(
                "  {} {}  {}",
                style("•").dim(),
                pad_str(&verdict.site, SITE_WIDTH, Alignment::Left, Some("..")),
                style(brief_error(verdict)).dim()
            );
        }
    }
}

/// Diagnostic for an error verdict.
fn brief_error(verdict: &Verdict) -> String {
    match (&verdict.error, verdict.status) {
        (Some(msg), _) => msg.clone(),
        (None, ProbeStatus::Unknown) => "(unknown status)".to_string(),
        (None, _) => "(error)".to_string(),
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final counts and elapsed time.
pub fn print_summary(results: &ResultSet, duration: Duration) {
    println!();
    println!(
        "{} {}",
        style("Scan Complete!").bold(),
        style(format!("({:.1}s)", duration.as_secs_f64())).dim()
    );
    println!("  Found: {}", style(results.found.len()).green());
    println!("  Not Found: {}", style(results.not_found.len()).dim());
    println!("  Errors: {}", style(results.errors.len()).yellow());
    println!();
}

// ── Tests ────────────────────────────────────────────────────────────────────
