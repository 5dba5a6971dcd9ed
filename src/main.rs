//! # Phone Sentinel CLI
//!
//! Command-line interface for the Phone Sentinel library (`phone_sentinel_core`).
//! This binary parses arguments, sets up configuration, and then either runs
//! the long-lived validation worker, checks a single number, or prints leads
//! that were already checked.

use phone_sentinel_core::{
    check_single_number, connect_oracle, initialize_inspection_store, initialize_store,
    initialize_worker, inspect_checked_leads, Candidate, Config, ConfigBuilder, FallbackOutcome,
    OracleKind, SelectionMode, Verdict,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter, FmtSubscriber};

/// How eligible leads are picked from the table.
#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    /// Unchecked leads by the boolean marker column; each lead is visited once
    MarkerColumn,
    /// Leads whose phone starts with the country code and carries no marker yet
    Pattern,
}

impl std::fmt::Display for ModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeArg::MarkerColumn => write!(f, "marker-column"),
            ModeArg::Pattern => write!(f, "pattern"),
        }
    }
}

impl From<ModeArg> for SelectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::MarkerColumn => SelectionMode::MarkerColumn,
            ModeArg::Pattern => SelectionMode::Pattern,
        }
    }
}

/// Which lookup-page adapter drives the browser.
#[derive(Copy, Clone, Debug, ValueEnum)]
enum OracleArg {
    /// Element ids and an explicit challenge wait
    CheckNumber,
    /// Fixed viewport coordinates with retries
    Positional,
}

impl From<OracleArg> for OracleKind {
    fn from(kind: OracleArg) -> Self {
        match kind {
            OracleArg::CheckNumber => OracleKind::CheckNumber,
            OracleArg::Positional => OracleKind::Positional,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Validates lead phone numbers against a messaging-platform lookup page.",
    long_about = "Phone Sentinel polls a PostgREST lead table, checks every phone number through a browser-driven lookup page and writes the verdict back as an inline marker."
)]
struct AppArgs {
    /// Path to a configuration file (TOML format) to load settings from. CLI args override file settings.
    #[arg(long, env = "PHONE_SENTINEL_CONFIG")]
    config_file: Option<String>,

    /// Base URL of the PostgREST endpoint (e.g. https://xyz.supabase.co).
    #[arg(long, env = "PHONE_SENTINEL_STORE_URL")]
    store_url: Option<String>,

    /// API key sent as `apikey` and bearer token.
    #[arg(long, env = "PHONE_SENTINEL_STORE_API_KEY", hide_env_values = true)]
    store_api_key: Option<String>,

    /// Lead table name.
    #[arg(long, env = "PHONE_SENTINEL_TABLE")]
    table: Option<String>,

    /// Column holding the comma-separated phone numbers.
    #[arg(long, env = "PHONE_SENTINEL_PHONE_COLUMN")]
    phone_column: Option<String>,

    /// Boolean column marking processed leads (marker-column mode).
    #[arg(long, env = "PHONE_SENTINEL_CHECKED_COLUMN")]
    checked_column: Option<String>,

    /// Lead selection mode.
    #[arg(short, long, value_enum, env = "PHONE_SENTINEL_MODE")]
    mode: Option<ModeArg>,

    /// Lookup page adapter.
    #[arg(long, value_enum, env = "PHONE_SENTINEL_ORACLE")]
    oracle: Option<OracleArg>,

    /// Leads fetched per poll (1-10).
    #[arg(short, long, env = "PHONE_SENTINEL_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// URL of the running WebDriver instance.
    #[arg(long, env = "PHONE_SENTINEL_WEBDRIVER_URL")]
    webdriver_url: Option<String>,

    /// Lookup page URL.
    #[arg(long, env = "PHONE_SENTINEL_TARGET_URL")]
    target_url: Option<String>,

    /// Run the browser headless.
    #[arg(long, action = clap::ArgAction::SetTrue, env = "PHONE_SENTINEL_HEADLESS")]
    headless: Option<bool>,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "PHONE_SENTINEL_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// Check one number and print the verdict instead of running the worker.
    #[arg(long, conflicts_with = "inspect")]
    phone: Option<String>,

    /// Print up to N already-checked leads as JSON and exit.
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "5")]
    inspect: Option<usize>,

    /// Log updates instead of writing them.
    #[arg(long, default_value = "false", env = "PHONE_SENTINEL_DRY_RUN")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_thread_names(true)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Setting up tracing subscriber failed")?;

    tracing::info!(
        "Phone Sentinel CLI v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let args = AppArgs::parse();
    tracing::debug!("Parsed CLI arguments: {:?}", args);

    let config = Arc::new(build_config(&args)?);
    tracing::debug!("Effective configuration loaded: {:?}", *config);

    if let Some(limit) = args.inspect {
        return run_inspect(&config, limit).await;
    }
    if let Some(ref phone) = args.phone {
        return run_single_check(&config, phone).await;
    }
    run_worker(config, args.dry_run).await
}

fn build_config(args: &AppArgs) -> Result<Config> {
    let mut config_builder = ConfigBuilder::new();

    if let Some(ref path) = args.config_file {
        config_builder = config_builder.config_file(path);
    }
    if let Some(ref url) = args.store_url {
        config_builder = config_builder.store_url(url);
    }
    if let Some(ref key) = args.store_api_key {
        config_builder = config_builder.store_api_key(key);
    }
    if let Some(ref table) = args.table {
        config_builder = config_builder.table(table);
    }
    if let Some(ref column) = args.phone_column {
        config_builder = config_builder.phone_column(column);
    }
    if let Some(ref column) = args.checked_column {
        config_builder = config_builder.checked_column(column);
    }
    if let Some(mode) = args.mode {
        tracing::info!("Selection mode: {}", mode);
        config_builder = config_builder.selection_mode(mode.into());
    }
    if let Some(kind) = args.oracle {
        config_builder = config_builder.oracle_kind(kind.into());
    }
    if let Some(size) = args.batch_size {
        config_builder = config_builder.batch_size(size);
    }
    if let Some(ref url) = args.webdriver_url {
        config_builder = config_builder.webdriver_url(url);
    }
    if let Some(ref url) = args.target_url {
        config_builder = config_builder.target_url(url);
    }
    if args.headless == Some(true) {
        config_builder = config_builder.headless(true);
    }
    if let Some(t) = args.request_timeout {
        config_builder = config_builder.request_timeout(Duration::from_secs(t));
    }

    match config_builder.build() {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            Err(anyhow::anyhow!("Failed to build configuration: {}", e))
        }
    }
}

/// Runs the validation loop until Ctrl-C. The oracle session is closed on
/// the way out whichever way the loop ends.
async fn run_worker(config: Arc<Config>, dry_run: bool) -> Result<()> {
    tracing::info!(
        "Running in Worker mode. Table '{}' at {} (oracle: {:?})",
        config.table,
        config.store_url,
        config.oracle_kind
    );

    let store = initialize_store(&config, dry_run).context("Failed to initialize lead store")?;
    let worker = match initialize_worker(config.clone(), store).await {
        Ok(w) => w,
        Err(e) => {
            tracing::error!("Initialization error: {}", e);
            return Err(anyhow::anyhow!("Failed to start the oracle session: {}", e));
        }
    };

    let stats = worker
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    tracing::info!(
        "Worker stopped after {} poll(s) and {} lead(s).",
        stats.polls,
        stats.leads_processed
    );
    Ok(())
}

async fn run_single_check(config: &Config, phone: &str) -> Result<()> {
    tracing::info!("Running in Single Number mode.");
    let start_time = Instant::now();

    let mut oracle = connect_oracle(config)
        .await
        .context("Failed to start the oracle session")?;
    let result = check_single_number(config, oracle.as_mut(), phone).await;
    oracle.shutdown().await;

    match result {
        Some((candidate, outcome)) => print_cli_results(phone, &candidate, &outcome),
        None => {
            return Err(anyhow::anyhow!("'{}' contains no digits to check", phone));
        }
    }
    tracing::info!("Single check finished. Duration: {:.2?}", start_time.elapsed());
    Ok(())
}

async fn run_inspect(config: &Config, limit: usize) -> Result<()> {
    tracing::info!("Fetching up to {} checked lead(s)...", limit);
    let store = initialize_inspection_store(config).context("Failed to initialize lead store")?;
    let leads = inspect_checked_leads(config, &store, limit)
        .await
        .context("Failed to read checked leads")?;

    let json = serde_json::to_string_pretty(&leads).context("Failed to serialize leads")?;
    println!("{}", json);
    Ok(())
}

/// Prints the verdict for a single number to standard output.
fn print_cli_results(input: &str, candidate: &Candidate, outcome: &FallbackOutcome) {
    const BLUE: &str = "\x1b[34m";
    const GREEN: &str = "\x1b[32m";
    const YELLOW: &str = "\x1b[33m";
    const RED: &str = "\x1b[31m";
    const RESET: &str = "\x1b[0m";

    println!("\n{BLUE}===== Phone Sentinel Result ====={RESET}");
    println!("Input:     {}", input);
    println!("Checked:   {}", candidate);
    if let Some(ref alternative) = outcome.alternative {
        println!("Fallback:  {}", alternative);
    }

    match outcome.verdict {
        Verdict::Found => println!("\n{GREEN}Status: FOUND ✅{RESET}"),
        Verdict::NotFound => println!("\n{RED}Status: NOT FOUND ❌{RESET}"),
        Verdict::Indeterminate => {
            println!("\n{YELLOW}Status: INDETERMINATE{RESET}");
            println!("Reason: The lookup page gave no recognizable answer.");
        }
    }
    println!("{BLUE}================================={RESET}\n");
}
