//! Cadence CLI
//!
//! Runs the music recommender once, or scores it over a scenario table
//! with the five-KPI evaluation harness.

mod progress;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use cadence_core::{load_scenarios, BridgeInput, ParseResult};
use cadence_runtime::catalog::SpotifyCatalog;
use cadence_runtime::providers::CompletionConfig;
use cadence_runtime::tools::TavilySearch;
use cadence_runtime::{
    CachedCatalog, CatalogSearch, Evaluator, LlmProvider, Orchestrator, ProviderRegistry,
    RecommendationBridge, Recommender, RuntimeConfig, StructuredJudgment, TrackVerifier,
    UsageStage, UsageTracker,
};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use progress::{print_report, print_usage, ConsoleProgress};

const DEFAULT_EVALUATION_LOG: &str = "evaluation_log.log";

#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(about = "Context-aware music recommender and its KPI evaluation")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one recommendation and print the payload
    Recommend {
        #[arg(long, default_value = "library")]
        location: String,

        #[arg(long, default_value = "silent")]
        decibel: String,

        #[arg(long, default_value = "focus")]
        goal: String,

        /// Preferred genre, or "None"
        #[arg(long, default_value = "Heavy Metal")]
        pref: String,

        /// Preferred artist (repeatable)
        #[arg(long = "artist", default_value = "Metallica")]
        artists: Vec<String>,
    },

    /// Score the recommender over a scenario CSV
    Evaluate {
        /// Scenario table with ID, Location, Decibel, Goal, User Pref,
        /// User Artist and Evaluation Criteria columns
        #[arg(long, value_name = "CSV")]
        scenarios: PathBuf,

        /// Directory for the detail and summary reports
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Only evaluate the first N scenarios
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the effective configuration as YAML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_file = match (&cli.log_file, &cli.command) {
        (Some(path), _) => Some(path.clone()),
        (None, Command::Evaluate { .. }) => Some(PathBuf::from(DEFAULT_EVALUATION_LOG)),
        (None, _) => None,
    };
    init_logging(log_file.as_deref())?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Recommend {
            location,
            decibel,
            goal,
            pref,
            artists,
        } => {
            let mut input = BridgeInput::new()
                .location(location)
                .decibel(decibel)
                .goal(goal)
                .user_pref(pref);
            if !artists.is_empty() {
                input = input.user_artist(artists);
            }
            recommend(&config, input).await
        }
        Command::Evaluate {
            scenarios,
            out_dir,
            limit,
        } => evaluate(&config, &scenarios, &out_dir, limit).await,
        Command::Config => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,reqwest=warn,hyper=warn,hyper_util=warn,rustls=warn")
    });

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

fn build_provider(config: &RuntimeConfig) -> Result<Arc<dyn LlmProvider>> {
    ProviderRegistry::with_defaults()
        .create(&config.llm.provider, &config.llm.provider_config())
        .with_context(|| format!("Failed to create {} provider", config.llm.provider))
}

fn build_bridge(
    config: &RuntimeConfig,
    provider: Arc<dyn LlmProvider>,
    usage: Arc<UsageTracker>,
) -> Result<Arc<RecommendationBridge>> {
    let search = TavilySearch::from_env()
        .context("Web search is not configured")?
        .with_timeout(config.orchestrator.call_timeout);
    let orchestrator = Orchestrator::builder()
        .llm_agents(provider, Arc::new(search), config, usage)
        .build()?;
    Ok(Arc::new(RecommendationBridge::new(Arc::new(orchestrator))))
}

/// Catalog for search-success scoring. Missing credentials are not fatal.
fn build_verifier(config: &RuntimeConfig) -> TrackVerifier {
    let catalog: Option<Arc<dyn CatalogSearch>> = if !config.catalog.enabled {
        info!("Catalog disabled; every well-formed track counts as found");
        None
    } else {
        match SpotifyCatalog::from_env() {
            Ok(spotify) => {
                let spotify = spotify.with_market(config.catalog.market.clone());
                Some(Arc::new(CachedCatalog::new(
                    Arc::new(spotify),
                    config.catalog.cache_capacity,
                    config.catalog.cache_ttl,
                )))
            }
            Err(e) => {
                error!(error = %e, "Catalog unavailable; every well-formed track counts as found");
                None
            }
        }
    };

    TrackVerifier::new(catalog)
        .with_retry(config.retry.clone())
        .with_timeout(config.evaluation.call_timeout)
}

async fn recommend(config: &RuntimeConfig, input: BridgeInput) -> Result<()> {
    let usage = Arc::new(UsageTracker::new());
    let provider = build_provider(config)?;
    let bridge = build_bridge(config, provider, usage.clone())?;

    info!(input = ?input, "Running recommendation");
    let raw = bridge.recommend(&input).await;

    println!("--- raw output ---");
    println!("{raw}");
    println!();

    match ParseResult::parse(&raw) {
        ParseResult::Valid(list) => {
            println!("--- parsed ({} records) ---", list.len());
            println!("{}", serde_json::to_string_pretty(list.value())?);
            if let Some(first) = list.value().get(0).and_then(|v| v.as_object()) {
                let keys: Vec<&str> = first.keys().map(String::as_str).collect();
                println!("first record keys: {}", keys.join(", "));
            }
        }
        ParseResult::Malformed(payload) => {
            println!("--- parse failed: {} ---", payload.reason);
        }
    }

    print_usage(&usage.snapshot());
    Ok(())
}

async fn evaluate(
    config: &RuntimeConfig,
    scenarios_path: &Path,
    out_dir: &Path,
    limit: Option<usize>,
) -> Result<()> {
    let mut scenarios = load_scenarios(scenarios_path)
        .with_context(|| format!("Failed to load scenarios from {}", scenarios_path.display()))?;
    if let Some(limit) = limit {
        scenarios.truncate(limit);
    }

    let usage = Arc::new(UsageTracker::new());
    let provider = build_provider(config)?;
    let bridge = build_bridge(config, provider.clone(), usage.clone())?;

    let judge_config = CompletionConfig {
        model: config.llm.judge_model.clone(),
        max_tokens: config.llm.max_tokens,
        temperature: config.llm.temperature,
        timeout: config.evaluation.call_timeout,
        ..CompletionConfig::default()
    };
    let judge = StructuredJudgment::new(provider.clone(), judge_config)
        .with_usage(usage.clone(), UsageStage::Scoring)
        .with_retry(config.retry.clone());

    let evaluator = Evaluator::new(bridge, build_verifier(config), config.evaluation.clone())
        .with_judge(judge)
        .with_embedder(provider, config.llm.embedding_model.clone())
        .with_retry(config.retry.clone())
        .with_usage(usage)
        .with_progress(Arc::new(ConsoleProgress));

    println!("Starting 5-KPI evaluation ({} scenarios)", scenarios.len());
    println!("{}", "-".repeat(70));
    let outcome = evaluator.evaluate(&scenarios).await;
    print_report(&outcome.report);

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let detail_path = out_dir.join(&config.evaluation.detail_report);
    let summary_path = out_dir.join(&config.evaluation.summary_report);
    outcome.report.write_detail_csv(&detail_path)?;
    println!("Detail report saved: {}", detail_path.display());
    outcome.report.write_summary_csv(&summary_path)?;
    println!("Summary report saved: {}", summary_path.display());

    print_usage(&outcome.usage);
    Ok(())
}
