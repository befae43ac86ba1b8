//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use enricher_core::{BatchScheduler, ImportRequest, ProgressReporter, RunOptions, search_company};
use enricher_shared::{
    AppConfig, BatchConfig, BatchProgress, BatchReport, FetchConfig, init_config, load_config,
    validate_config,
};
use enricher_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Enricher: resolve company metadata from domain homepages.
#[derive(Parser)]
#[command(
    name = "enricher",
    version,
    about = "Resolve company names and metadata from lists of domains.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enrich a list of domains and store the results.
    Import {
        /// Domain list: one per line, or `{"domains": [...]}` JSON. `-` reads stdin.
        input: String,

        /// Treat the input as a JSON request body.
        #[arg(long)]
        json: bool,

        /// Concurrent fetches within one sub-batch.
        #[arg(long)]
        target_size: Option<usize>,

        /// Per-request timeout in seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Database path (overrides config).
        #[arg(long, env = "ENRICHER_DB")]
        db: Option<PathBuf>,

        /// Write the full JSON report to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Look up a stored company by name or domain.
    Search {
        /// Free-text query.
        query: String,

        /// Database path (overrides config).
        #[arg(long, env = "ENRICHER_DB")]
        db: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "enricher=info",
        1 => "enricher=debug",
        _ => "enricher=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Import {
            input,
            json,
            target_size,
            timeout_secs,
            db,
            report,
        } => {
            let overrides = ImportOverrides {
                target_size,
                timeout_secs,
                db,
            };
            cmd_import(&input, json, overrides, report.as_deref()).await
        }
        Command::Search { query, db } => cmd_search(&query, db).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

/// Flags that take precedence over the config file.
#[derive(Debug, Default)]
struct ImportOverrides {
    target_size: Option<usize>,
    timeout_secs: Option<u64>,
    db: Option<PathBuf>,
}

impl ImportOverrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(size) = self.target_size {
            config.batch.target_size = size;
        }
        if let Some(secs) = self.timeout_secs {
            config.fetch.timeout_secs = secs;
        }
        if let Some(db) = &self.db {
            config.storage.db_path = db.to_string_lossy().into_owned();
        }
    }
}

async fn cmd_import(
    input: &str,
    json: bool,
    overrides: ImportOverrides,
    report_path: Option<&Path>,
) -> Result<()> {
    let mut config = load_config()?;
    overrides.apply(&mut config);
    validate_config(&config)?;

    let raw = read_input(input).await?;
    let domains = parse_domain_list(&raw, json)?;

    let db_path = config.storage.resolved_db_path()?;
    let storage = Storage::open(&db_path).await?;
    let scheduler = BatchScheduler::new(
        &FetchConfig::from(&config),
        &BatchConfig::from(&config),
    )?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current batch");
            ctrl_c.cancel();
        }
    });

    let options = RunOptions {
        job_id: None,
        target_batch_size: config.batch.target_size,
        cancel,
    };

    info!(
        domains = domains.len(),
        db = %db_path.display(),
        "importing domains"
    );

    let started = Instant::now();
    let reporter = CliProgress::new();
    let report = scheduler.run(&domains, &storage, &options, &reporter).await;
    reporter.finish();
    let report = report?;

    if let Some(path) = report_path {
        let body = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, body)
            .wrap_err_with(|| format!("failed to write report to {}", path.display()))?;
    }

    print_summary(&report, started.elapsed(), &db_path, report_path);
    Ok(())
}

async fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .wrap_err("failed to read domains from stdin")?;
        return Ok(buf);
    }

    tokio::fs::read_to_string(input)
        .await
        .wrap_err_with(|| format!("failed to read domain list '{input}'"))
}

/// Parse a domain list from a JSON request body or one-domain-per-line text.
///
/// Text input skips blank lines and `#` comments. Input whose first
/// non-whitespace character is `{` is treated as JSON.
fn parse_domain_list(raw: &str, json: bool) -> Result<Vec<String>> {
    if json || raw.trim_start().starts_with('{') {
        let domains = ImportRequest::from_json(raw)?.into_domains()?;
        return Ok(domains);
    }

    let domains: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect();

    if domains.is_empty() {
        return Err(eyre!("No domains provided"));
    }
    Ok(domains)
}

fn print_summary(report: &BatchReport, elapsed: Duration, db_path: &Path, report_path: Option<&Path>) {
    let counts = &report.counts;
    println!();
    println!("  Import complete!");
    println!("  Domains:  {}", counts.total);
    println!("  Success:  {}", counts.success);
    println!("  Fallback: {}", counts.fallback);
    println!("  Error:    {}", counts.error);
    println!("  Batches:  {}", report.total_batches);
    println!("  Database: {}", db_path.display());
    if let Some(path) = report_path {
        println!("  Report:   {}", path.display());
    }
    println!("  Time:     {:.1}s", elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Batch-level progress bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn started(&self, total_batches: usize, total_domains: usize) {
        self.bar.set_length(total_batches as u64);
        self.bar.set_message(format!("{total_domains} domains"));
    }

    fn batch_completed(&self, progress: &BatchProgress) {
        self.bar.set_position(progress.completed_batches as u64);
        self.bar.set_message(progress.message.clone());
    }

    fn done(&self, _report: &BatchReport) {
        self.bar.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// search / config
// ---------------------------------------------------------------------------

async fn cmd_search(query: &str, db: Option<PathBuf>) -> Result<()> {
    let db_path = match db {
        Some(path) => path,
        None => load_config()?.storage.resolved_db_path()?,
    };
    let storage = Storage::open(&db_path).await?;

    match search_company(&storage, query).await? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("null"),
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
