//! Campaign Optimizer — adaptive budget and content decisions from metrics
//! snapshots.
//!
//! Reads a JSON snapshot, runs bandit selection or one of the cadence
//! procedures, and prints the result as JSON on stdout. Logs go to stderr.

use campaign_analytics::{DecisionLogger, TracingDecisionLog};
use campaign_cadence::{CadenceIntervals, CadenceScheduler, SnapshotSource};
use campaign_core::config::AppConfig;
use campaign_core::types::{ArmSet, CadenceReport, ChannelMetrics, Variant, VentureMetrics};
use campaign_core::DecisionLogSink;
use campaign_rl_engine::{BanditSelector, VariateSampler};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "campaign-optimizer")]
#[command(about = "Adaptive budget and content optimizer for multi-venture marketing")]
#[command(version)]
struct Cli {
    /// Optional TOML config file; environment variables take precedence
    #[arg(long, env = "CAMPAIGN_OPTIMIZER_CONFIG")]
    config: Option<String>,

    /// Node identifier (overrides config)
    #[arg(long, env = "CAMPAIGN_OPTIMIZER__NODE_ID")]
    node_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pick variants with Thompson Sampling
    Select {
        /// JSON file with an arm set or a list of variants ("-" for stdin)
        input: String,
        /// Seed for reproducible draws
        #[arg(long)]
        seed: Option<u64>,
        /// Number of independent selections to draw
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Posterior summary per variant
    Stats {
        /// JSON file with a list of variants ("-" for stdin)
        input: String,
    },
    /// Budget reallocation across channels by ROI
    Hourly {
        /// JSON file with channel metrics ("-" for stdin)
        input: String,
        /// Append the optimization run to this NDJSON file
        #[arg(long)]
        log_file: Option<String>,
    },
    /// Champion/challenger promotion
    Daily {
        /// JSON file with variants, one flagged is_champion ("-" for stdin)
        input: String,
        #[arg(long)]
        log_file: Option<String>,
    },
    /// Cross-venture pattern recommendations
    Weekly {
        /// JSON file with venture pattern metrics ("-" for stdin)
        input: String,
        #[arg(long)]
        log_file: Option<String>,
    },
    /// Run all three cadences on their timers against a fixed snapshot until Ctrl-C
    Serve {
        /// JSON file with `channels`, `variants` and `ventures`
        input: String,
        #[arg(long)]
        log_file: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectInput {
    Arms(ArmSet),
    Variants(Vec<Variant>),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "campaign_optimizer=info,campaign_cadence=info,decision_log=info".into()
                }),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }

    info!(
        node_id = %config.node_id,
        min_impressions = config.bandit.min_impressions,
        exploration_floor = config.bandit.exploration_floor,
        roi_threshold = config.cadence.roi_threshold,
        "Configuration loaded"
    );

    match cli.command {
        Command::Select { input, seed, count } => {
            let selector = BanditSelector::from_config(&config.bandit);
            let mut sampler = match seed {
                Some(seed) => VariateSampler::seeded(seed),
                None => VariateSampler::from_entropy(),
            }
            .with_max_iterations(config.bandit.max_gamma_iterations);

            let arms = match read_json::<SelectInput>(&input)? {
                SelectInput::Arms(arms) => arms,
                SelectInput::Variants(variants) => ArmSet {
                    scope: Default::default(),
                    objective_metric: "conversion_rate".to_string(),
                    arms: variants,
                },
            };

            let selections = (0..count.max(1))
                .map(|_| selector.select_from(&arms, &mut sampler))
                .collect::<Result<Vec<_>, _>>()?;
            print_json(&selections)?;
        }
        Command::Stats { input } => {
            let selector = BanditSelector::from_config(&config.bandit);
            let variants: Vec<Variant> = read_json(&input)?;
            print_json(&selector.summarize(&variants))?;
        }
        Command::Hourly { input, log_file } => {
            let channels: Vec<ChannelMetrics> = read_json(&input)?;
            let (scheduler, logger) = build_scheduler(&config, log_file).await?;
            let report = scheduler.run_hourly(&channels).await;
            emit_report(&mut std::io::stdout().lock(), &report, scheduler, logger).await?;
        }
        Command::Daily { input, log_file } => {
            let variants: Vec<Variant> = read_json(&input)?;
            let (scheduler, logger) = build_scheduler(&config, log_file).await?;
            let report = scheduler.run_daily(&variants).await;
            emit_report(&mut std::io::stdout().lock(), &report, scheduler, logger).await?;
        }
        Command::Weekly { input, log_file } => {
            let ventures: Vec<VentureMetrics> = read_json(&input)?;
            let (scheduler, logger) = build_scheduler(&config, log_file).await?;
            let report = scheduler.run_weekly(&ventures).await;
            emit_report(&mut std::io::stdout().lock(), &report, scheduler, logger).await?;
        }
        Command::Serve { input, log_file } => {
            let source: SnapshotSource = read_json(&input)?;
            let (scheduler, logger) = build_scheduler(&config, log_file).await?;
            let intervals = CadenceIntervals::from_config(&config.cadence);
            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                    return;
                }
                info!("Shutdown requested");
                let _ = shutdown_tx.send(true);
            });

            info!("Campaign Optimizer is running cadence loops");
            scheduler.run_periodic(&source, intervals, shutdown_rx).await;
            close_logger(scheduler, logger).await;
        }
    }

    Ok(())
}

/// File-backed logger when `log_file` is given, structured log lines otherwise.
async fn build_scheduler(
    config: &AppConfig,
    log_file: Option<String>,
) -> anyhow::Result<(CadenceScheduler, Option<Arc<DecisionLogger>>)> {
    let logger = match log_file {
        Some(path) => {
            let mut log_config = config.decision_log.clone();
            log_config.path = path;
            Some(Arc::new(
                DecisionLogger::new(&log_config, config.node_id.clone()).await?,
            ))
        }
        None => None,
    };

    let sink: Arc<dyn DecisionLogSink> = match &logger {
        Some(logger) => logger.clone(),
        None => Arc::new(TracingDecisionLog::new(config.node_id.clone())),
    };

    Ok((CadenceScheduler::new(config, sink), logger))
}

async fn close_logger(scheduler: CadenceScheduler, logger: Option<Arc<DecisionLogger>>) {
    drop(scheduler);
    if let Some(logger) = logger {
        match Arc::try_unwrap(logger) {
            Ok(logger) => logger.shutdown().await,
            Err(_) => warn!("Decision logger still shared at exit; buffered runs may be lost"),
        }
    }
}

fn read_json<T: DeserializeOwned>(input: &str) -> anyhow::Result<T> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", input, e))?
    };
    Ok(serde_json::from_str(&raw)?)
}

/// Write the report, then drain the decision log whether or not the write
/// succeeded.
async fn emit_report<W: Write>(
    out: &mut W,
    report: &CadenceReport,
    scheduler: CadenceScheduler,
    logger: Option<Arc<DecisionLogger>>,
) -> anyhow::Result<()> {
    let written = write_json(out, report);
    close_logger(scheduler, logger).await;
    written
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    write_json(&mut std::io::stdout().lock(), value)
}

fn write_json<T: Serialize + ?Sized, W: Write>(out: &mut W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
