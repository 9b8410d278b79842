//! # vend-sync
//!
//! Command-line entry point: loads configuration, opens the database and
//! runs the importer against the Vend API.
//!
//! ```text
//! $ vend-sync import Outlet RegisterSale
//! Outlets..
//! RegisterSales.......
//! Outlet        2 resources  2 rows
//! RegisterSale  7 resources  31 rows
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vend_db::Database;
use vend_sync::{
    ConsoleProgress, ImportProgress, ImportSummary, Importer, NoOpProgress, ResourceClass,
    SyncConfig, VendClient,
};

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initializes logging on stderr so stdout stays free for progress and
/// summaries. `RUST_LOG` takes precedence over the verbosity flags.
fn init_tracing(verbose: u8, quiet: bool) {
    let fallback = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info,sqlx=warn",
        (false, 1) => "info,vend_core=debug,vend_db=debug,vend_sync=debug,sqlx=warn",
        _ => "debug,vend_core=trace,vend_db=trace,vend_sync=trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = SyncConfig::load(cli.config.clone()).context("loading configuration")?;
    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }
    if let Some(address) = &cli.address {
        config.vend.address = address.clone();
    }

    match cli.command.unwrap_or_default() {
        Commands::Import {
            classes,
            strategy,
            json,
        } => {
            if let Some(strategy) = strategy {
                config.import.upsert_strategy = strategy;
            }
            let classes = if classes.is_empty() {
                config.import.classes.clone()
            } else {
                classes
            };
            let show_progress = !(cli.quiet || json);
            import(&config, &classes, show_progress, json).await
        }
        Commands::Runs { limit } => {
            show_runs(&config, limit).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { save } => {
            let mut shown = config.clone();
            if shown.vend.token.is_some() {
                shown.vend.token = Some("********".to_string());
            }
            print!("{}", toml::to_string_pretty(&shown)?);

            if save {
                config.save(cli.config).context("saving configuration")?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Classes => {
            for class in ResourceClass::all() {
                println!(
                    "{:<14} {:<16} since={:<5} {}",
                    class.name(),
                    class.table_name(),
                    class.supports_since(),
                    class.state_filter().map(|s| format!("+{}", s)).unwrap_or_default()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn import(
    config: &SyncConfig,
    classes: &[ResourceClass],
    show_progress: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    config.validate().context("invalid configuration")?;

    let db = Arc::new(
        Database::new(config.database.db_config())
            .await
            .with_context(|| format!("opening {}", config.database.path.display()))?,
    );
    let client = Arc::new(VendClient::new(&config.vend)?);

    let progress: Arc<dyn ImportProgress> = if show_progress {
        Arc::new(ConsoleProgress::new())
    } else {
        Arc::new(NoOpProgress)
    };

    info!(store = %client.base(), classes = classes.len(), "Starting import");
    let importer = Importer::with_progress(client, db.clone(), &config.import, progress);
    let summary = importer.import(classes).await;
    db.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(summary: &ImportSummary) {
    for class in &summary.classes {
        match &class.error {
            None => println!(
                "{:<14} {:>6} resources {:>7} rows {}",
                class.class.name(),
                class.resources,
                class.rows_written(),
                if class.skipped > 0 {
                    format!("({} skipped)", class.skipped)
                } else {
                    String::new()
                }
            ),
            Some(err) => println!("{:<14} FAILED: {}", class.class.name(), err),
        }
    }
}

async fn show_runs(config: &SyncConfig, limit: u32) -> anyhow::Result<()> {
    let db = Database::new(config.database.db_config())
        .await
        .with_context(|| format!("opening {}", config.database.path.display()))?;

    for run in db.runs().recent(limit).await? {
        println!(
            "{}  {:<14} {:<9} {:>6} resources {:>7} rows {:>4} skipped  {}",
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.class,
            format!("{:?}", run.status).to_lowercase(),
            run.resources,
            run.rows_written,
            run.skipped,
            run.error.unwrap_or_default()
        );
    }

    db.close().await;
    Ok(())
}
