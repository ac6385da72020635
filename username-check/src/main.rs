//! Username Check CLI Application
//!
//! A command-line interface for checking whether a username is registered
//! across many web services. This CLI application provides a user-friendly
//! interface to the username-check-lib library.

mod export;
mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use export::ExportFormat;
use std::path::Path;
use std::process;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use username_check_lib::{
    load_env_config, load_sites, parse_duration_string, CancellationToken, ConfigManager,
    EnvConfig, FileConfig, ResultSet, ScanConfig, UsernameChecker, MAX_CONCURRENCY,
};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Site list used when nothing else is configured.
const DEFAULT_SITES_FILE: &str = "sites.json";

/// CLI arguments for username-check
#[derive(Parser, Debug)]
#[command(name = "username-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check whether a username exists across many web services")]
#[command(
    long_about = "Check whether a username exists across many web services.\n\nEvery site in the site list is probed concurrently and classified by HTTP status or by a not-found marker in the page body.",
    after_help = "Examples:\n  username-check johndoe\n  username-check johndoe --export json\n  username-check johndoe --timeout 15 --rate-limit 1.0"
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Username to search for
    #[arg(value_name = "USERNAME")]
    pub username: String,

    /// Path to the sites JSON file [default: sites.json]
    #[arg(long = "sites", value_name = "FILE", help_heading = "Scan")]
    pub sites: Option<String>,

    /// Request timeout, e.g. 10, 10s, 1500ms [default: 10s]
    #[arg(long = "timeout", value_name = "SECS", value_parser = parse_timeout_arg, help_heading = "Scan")]
    pub timeout: Option<Duration>,

    /// Delay after each request, e.g. 0.5, 250ms [default: 0.5s]
    #[arg(long = "rate-limit", value_name = "SECS", value_parser = parse_rate_limit_arg, help_heading = "Scan")]
    pub rate_limit: Option<Duration>,

    /// Maximum requests in flight [default: all sites]
    #[arg(short = 'c', long = "concurrency", value_name = "N", help_heading = "Scan")]
    pub concurrency: Option<usize>,

    /// Export found accounts to a file in the current directory
    #[arg(long = "export", value_enum, value_name = "FORMAT", help_heading = "Output Format")]
    pub export: Option<ExportFormat>,

    /// Print all verdicts as JSON
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Print all verdicts as CSV
    #[arg(long = "csv", help_heading = "Output Format")]
    pub csv: bool,

    /// Disable colored output
    #[arg(long = "no-color", help_heading = "Output Format")]
    pub no_color: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show detailed debug information and error messages
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Effective settings after merging config file, environment and CLI.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    scan: ScanConfig,
    sites: String,
    export: Option<ExportFormat>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            sites: DEFAULT_SITES_FILE.to_string(),
            export: None,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if args.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    init_logging(&args);

    // Run the scan
    if let Err(e) = run_username_check(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr tracing subscriber. `RUST_LOG` overrides the flags.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_directive(args)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_log_directive(args: &Args) -> &'static str {
    if args.debug {
        "warn,username_check=debug,username_check_lib=debug"
    } else if args.verbose {
        "warn,username_check=info,username_check_lib=info"
    } else {
        "warn"
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.username.trim().is_empty() {
        return Err("Username cannot be empty".to_string());
    }

    if args.json && args.csv {
        return Err("Cannot specify both --json and --csv".to_string());
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(format!(
                "Concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            ));
        }
    }

    Ok(())
}

fn parse_timeout_arg(value: &str) -> Result<Duration, String> {
    match parse_duration_string(value) {
        Some(timeout) if !timeout.is_zero() => Ok(timeout),
        _ => Err(format!(
            "invalid timeout '{}', use a positive value like 10, 10s or 1500ms",
            value
        )),
    }
}

fn parse_rate_limit_arg(value: &str) -> Result<Duration, String> {
    parse_duration_string(value).ok_or_else(|| {
        format!(
            "invalid rate limit '{}', use a value like 0.5, 250ms or 1s",
            value
        )
    })
}

async fn run_username_check(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = build_settings(&args)?;
    let human = !args.json && !args.csv;
    let username = args.username.trim();

    if human {
        ui::print_banner();
    }

    let sites = load_sites(&settings.sites)?;
    if human {
        println!(
            "{} Loaded {} sites from {}",
            console::style("✓").green(),
            sites.len(),
            console::style(&settings.sites).cyan()
        );
        ui::print_scan_header(username, sites.len(), &settings.scan);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling outstanding probes");
            ctrl_c.cancel();
        }
    });

    let checker = UsernameChecker::with_config(settings.scan.clone());
    let progress = ui::ProgressLine::new(human);
    let start_time = Instant::now();

    let results = checker
        .scan_with_cancel(username, &sites, &cancel, |p| progress.update(p))
        .await?;

    progress.finish();
    let duration = start_time.elapsed();
    let results = results.sorted();

    if cancel.is_cancelled() {
        eprintln!(
            "{} Scan cancelled; unfinished sites are reported as errors",
            console::style("⚠").yellow()
        );
    }

    display_results(&results, &args, duration)?;

    if let Some(format) = settings.export {
        let path = export::export_results(username, &results, format, Path::new("."))?;
        if human {
            println!(
                "{} Results exported to {}",
                console::style("✓").green(),
                console::style(path.display()).cyan()
            );
        }
    }

    if human {
        ui::print_summary(&results, duration);
    }

    Ok(())
}

/// Build settings with precedence: CLI > environment > config file > defaults.
fn build_settings(args: &Args) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = Settings::default();
    let env_config = load_env_config();
    let config_manager = ConfigManager::new();

    // Step 1: Determine config file path and load config files
    let explicit_config = args.config.as_ref().or(env_config.config.as_ref());
    if let Some(config_path) = explicit_config {
        tracing::info!(path = %config_path, "Using explicit config file");

        let file_config = config_manager
            .load_file(config_path)
            .map_err(|e| format!("Failed to load config file '{}': {}", config_path, e))?;

        settings = merge_file_config(settings, file_config);
    } else {
        match config_manager.discover_and_load() {
            Ok(file_config) => settings = merge_file_config(settings, file_config),
            Err(e) => tracing::warn!(error = %e, "Config discovery failed"),
        }
    }

    // Step 2: Apply environment variables (UC_*)
    settings = apply_environment_config(settings, &env_config);

    // Step 3: Apply CLI arguments (highest precedence)
    Ok(apply_cli_args(settings, args))
}

/// Merge FileConfig into Settings
fn merge_file_config(mut settings: Settings, file_config: FileConfig) -> Settings {
    let Some(defaults) = file_config.defaults else {
        return settings;
    };

    if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_duration_string) {
        settings.scan.timeout = timeout;
    }
    if let Some(rate_limit) = defaults.rate_limit.as_deref().and_then(parse_duration_string) {
        settings.scan.rate_limit = rate_limit;
    }
    if let Some(concurrency) = defaults.concurrency {
        settings.scan = settings.scan.with_concurrency(concurrency);
    }
    if let Some(sites) = defaults.sites {
        settings.sites = sites;
    }
    if let Some(export) = defaults.export.as_deref().and_then(ExportFormat::from_name) {
        settings.export = Some(export);
    }

    settings
}

/// Apply UC_* environment values to settings.
fn apply_environment_config(mut settings: Settings, env_config: &EnvConfig) -> Settings {
    if let Some(timeout) = env_config.timeout {
        settings.scan.timeout = timeout;
    }
    if let Some(rate_limit) = env_config.rate_limit {
        settings.scan.rate_limit = rate_limit;
    }
    if let Some(concurrency) = env_config.concurrency {
        settings.scan = settings.scan.with_concurrency(concurrency);
    }
    if let Some(sites) = &env_config.sites {
        settings.sites = sites.clone();
    }

    settings
}

/// Apply CLI arguments to settings (highest precedence).
fn apply_cli_args(mut settings: Settings, args: &Args) -> Settings {
    if let Some(timeout) = args.timeout {
        settings.scan.timeout = timeout;
    }
    if let Some(rate_limit) = args.rate_limit {
        settings.scan.rate_limit = rate_limit;
    }
    if let Some(concurrency) = args.concurrency {
        settings.scan = settings.scan.with_concurrency(concurrency);
    }
    if let Some(sites) = &args.sites {
        settings.sites = sites.clone();
    }
    if args.export.is_some() {
        settings.export = args.export;
    }

    settings
}

fn display_results(
    results: &ResultSet,
    args: &Args,
    duration: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(results)?);
    } else if args.csv {
        print!("{}", format_csv(results));
    } else {
        tracing::debug!(elapsed_ms = duration.as_millis() as u64, "Rendering results");
        println!();
        ui::print_found(results);
        ui::print_errors(results, args.debug);
    }

    Ok(())
}

/// Render every verdict as `site,url,status,error` rows.
fn format_csv(results: &ResultSet) -> String {
    let mut out = String::from("site,url,status,error\n");
    for verdict in results.iter() {
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(&verdict.site),
            csv_field(&verdict.url),
            verdict.status,
            csv_field(verdict.error.as_deref().unwrap_or(""))
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
