//! Evalsync - command-line entry point
//!
//! Captures product evaluations (queueing them when offline), runs sync
//! passes, prints manager reports, and hosts the long-running background
//! sync loop.

use clap::{Parser, Subcommand};
use evalsync_core::{
    error::{EvalSyncError, Result},
    reports::{EvaluationReport, DEFAULT_TOP_PRODUCTS},
    scoring::{self, ScoreBand},
    EvalSyncConfig, NewEvaluation, OfflineRuntime, ScoreEntry, SubmissionOutcome, SyncOutcome,
};
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "evalsync")]
#[command(about = "Offline capture and background sync of product evaluations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Config file (defaults to ~/.config/evalsync/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Offline database path (overrides config and EVALSYNC_DB_PATH)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Evaluation API base URL (overrides config and EVALSYNC_API_BASE_URL)
    #[arg(long)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record an evaluation, submitting directly when online
    Capture {
        /// Product identifier
        #[arg(long)]
        product: i64,

        /// Criterion score as CRITERION=SCORE[:COMMENT], repeatable
        #[arg(long = "score", required = true, value_parser = parse_score)]
        scores: Vec<ScoreEntry>,

        /// Store or site where the evaluation was made
        #[arg(long)]
        location: String,

        /// Overall comment
        #[arg(long)]
        comments: Option<String>,

        /// Queue locally without trying the network
        #[arg(long)]
        offline: bool,
    },

    /// Run one sync pass now
    Sync,

    /// Show pending count and connectivity
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List evaluations waiting to be synced
    Pending {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read the product catalog (cached)
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },

    /// Inspect the response cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Aggregate scores across submitted evaluations
    Report {
        /// Print as JSON
        #[arg(long)]
        json: bool,

        /// How many products to rank
        #[arg(long, default_value_t = DEFAULT_TOP_PRODUCTS)]
        top: usize,
    },

    /// Run auto-sync, status refresh and connectivity probing until Ctrl-C
    Run,

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
enum CatalogCommand {
    /// List products
    Products,
    /// List categories
    Categories,
    /// List criteria, optionally for one category
    Criteria {
        #[arg(long)]
        category: Option<i64>,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Print a cached payload if still fresh
    Get { key: String },
    /// Delete expired entries
    Purge,
}

/// Parse `CRITERION=SCORE[:COMMENT]`
fn parse_score(raw: &str) -> std::result::Result<ScoreEntry, String> {
    let (criterion, rest) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CRITERION=SCORE, got '{}'", raw))?;
    let (score, comment) = match rest.split_once(':') {
        Some((score, comment)) => (score, Some(comment.trim())),
        None => (rest, None),
    };

    let criterion_id = criterion
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid criterion id '{}': {}", criterion, e))?;
    let score = score
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid score '{}': {}", score, e))?;

    let entry = ScoreEntry::new(criterion_id, score);
    Ok(match comment.filter(|c| !c.is_empty()) {
        Some(comment) => entry.with_comment(comment),
        None => entry,
    })
}

fn load_config(cli: &Cli) -> Result<EvalSyncConfig> {
    let mut config = EvalSyncConfig::load(cli.config.as_deref())?;
    if let Some(db_path) = &cli.db_path {
        config.db_path = db_path.clone();
    }
    if let Some(api_url) = &cli.api_url {
        config.api_base_url = api_url.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Use specified level for evalsync, but WARN for noisy HTTP crates
    let filter = EnvFilter::new(format!(
        "evalsync={lvl},evalsync_core={lvl},reqwest=warn,hyper=warn",
        lvl = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Evalsync v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Config => {
            print!("{}", render_config(&config)?);
            Ok(())
        }
        command => {
            let runtime = OfflineRuntime::initialize(config).await?;
            execute(command, &runtime).await
        }
    }
}

/// Effective configuration as TOML, with the token masked
fn render_config(config: &EvalSyncConfig) -> Result<String> {
    let mut shown = config.clone();
    if shown.auth_token.is_some() {
        shown.auth_token = Some("********".to_string());
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| EvalSyncError::Other(format!("Failed to render config: {}", e)))
}

fn print_report(report: &EvaluationReport) {
    println!(
        "{} evaluation(s) by {} evaluator(s), average score {:.2}",
        report.total_evaluations, report.unique_evaluators, report.average_score
    );

    if !report.top_products.is_empty() {
        println!("\nTop products:");
        for (rank, product) in report.top_products.iter().enumerate() {
            println!(
                "  {:>2}. {:<30} {:.2}  ({} evaluation(s))",
                rank + 1,
                product.name,
                product.score,
                product.evaluations
            );
        }
    }

    if !report.categories.is_empty() {
        println!("\nBy category:");
        for category in &report.categories {
            println!(
                "  {:<30} {:.2}  ({} evaluation(s))",
                category.name, category.avg_score, category.count
            );
        }
    }

    println!("\nScore distribution:");
    for bucket in &report.distribution {
        println!("  {:<4} {}", bucket.range, bucket.count);
    }
}

async fn execute(command: Commands, runtime: &OfflineRuntime) -> Result<()> {
    match command {
        Commands::Capture {
            product,
            scores,
            location,
            comments,
            offline,
        } => {
            if offline {
                runtime.connectivity().set_online(false);
            } else {
                runtime.refresh_connectivity().await;
            }

            let evaluation = NewEvaluation {
                product_id: product,
                scores,
                comments,
                location,
            };
            let overall = scoring::overall_score(&evaluation.scores);

            // Catalog limits are checked when they can be had; the queue
            // accepts anything that passes the basic checks
            let mut weighted = None;
            if runtime.connectivity().is_online() {
                match runtime.catalog().criteria().await {
                    Ok(criteria) => {
                        scoring::validate_against(&evaluation, &criteria)?;
                        weighted = scoring::weighted_score(&evaluation.scores, &criteria);
                    }
                    Err(e) => debug!("Criteria unavailable, skipping max-score check: {}", e),
                }
            }

            match runtime.submitter().submit(evaluation).await? {
                SubmissionOutcome::Submitted => {
                    println!("Submitted evaluation for product {}", product)
                }
                SubmissionOutcome::Queued(id) => println!(
                    "Queued evaluation {} for product {} (will sync when online)",
                    id, product
                ),
            }
            if let Some(overall) = overall {
                println!("Overall score: {:.2} ({})", overall, ScoreBand::classify(overall));
            }
            if let Some(weighted) = weighted {
                println!("Weighted score: {:.2}", weighted);
            }
        }

        Commands::Sync => {
            runtime.refresh_connectivity().await;
            if !runtime.connectivity().is_online() {
                println!("Offline - nothing sent");
                return Ok(());
            }

            match runtime.sync_now().await {
                Some(SyncOutcome::Completed(report)) => println!(
                    "Synced {} of {} pending evaluation(s), {} still pending",
                    report.synced, report.attempted, report.failed
                ),
                Some(SyncOutcome::AlreadyRunning) => println!("A sync pass is already running"),
                None => println!("Offline capture is disabled; nothing to sync"),
            }
        }

        Commands::Status { json } => {
            runtime.refresh_connectivity().await;
            let status = runtime.sync_status().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{}", status);
            }
        }

        Commands::Pending { json } => {
            let pending = match runtime.store() {
                Some(store) => store.list_unsynced_evaluations().await,
                None => Vec::new(),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&pending)?);
            } else if pending.is_empty() {
                println!("No evaluations pending sync");
            } else {
                for record in &pending {
                    println!(
                        "#{}  product {}  {}  {} score(s)  captured {}",
                        record.id,
                        record.product_id,
                        record.location,
                        record.scores.len(),
                        record.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }

        Commands::Catalog { command } => {
            let catalog = runtime.catalog();
            let rendered = match command {
                CatalogCommand::Products => {
                    serde_json::to_string_pretty(&catalog.products().await?)?
                }
                CatalogCommand::Categories => {
                    serde_json::to_string_pretty(&catalog.categories().await?)?
                }
                CatalogCommand::Criteria { category: Some(id) } => {
                    serde_json::to_string_pretty(&catalog.criteria_for_category(id).await?)?
                }
                CatalogCommand::Criteria { category: None } => {
                    serde_json::to_string_pretty(&catalog.criteria().await?)?
                }
            };
            println!("{}", rendered);
        }

        Commands::Cache { command } => {
            let store = runtime.store().ok_or_else(|| {
                EvalSyncError::StorageUnavailable("offline store is not available".to_string())
            })?;

            match command {
                CacheCommand::Get { key } => match store.get_cache(&key).await? {
                    Some(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
                    None => println!("No fresh entry for '{}'", key),
                },
                CacheCommand::Purge => {
                    let purged = store.purge_expired_cache().await?;
                    let noun = if purged == 1 { "entry" } else { "entries" };
                    println!("Purged {} expired {}", purged, noun);
                }
            }
        }

        Commands::Run => {
            runtime.refresh_connectivity().await;
            runtime.start_background().await;
            info!("Running; press Ctrl-C to stop");

            tokio::signal::ctrl_c().await?;
            info!("Shutdown requested");
            runtime.shutdown().await;
        }

        Commands::Report { json, top } => {
            let catalog = runtime.catalog();
            let products = catalog.products().await?;
            let categories = catalog.categories().await?;
            let evaluations = catalog.evaluations().await?;
            let report = EvaluationReport::build(&products, &categories, &evaluations, top);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }

        Commands::Config => print!("{}", render_config(runtime.config())?),
    }

    Ok(())
}
