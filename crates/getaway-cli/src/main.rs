use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use getaway_pipeline::{
    build_scheduler, dry_run_pipeline_from_env, pipeline_from_env, Pipeline, PipelineConfig,
};
use getaway_store::PgVacationSpotStore;

#[derive(Debug, Parser)]
#[command(name = "getaway-cli")]
#[command(about = "Vacation-spot pipeline command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Refresh the store and send a recommendation, back to back.
    Run {
        /// Use the in-memory store and logging notifier instead of
        /// Postgres and the external collaborators.
        #[arg(long)]
        dry_run: bool,
    },
    /// Harmonize the source datasets and merge them into the store.
    Refresh {
        #[arg(long)]
        dry_run: bool,
    },
    /// Filter the stored spots and send one notification.
    Recommend,
    /// Apply database migrations.
    Migrate,
    /// Start the cron scheduler and park until ctrl-c.
    Schedule,
}

async fn pipeline(dry_run: bool) -> Result<Pipeline> {
    if dry_run {
        dry_run_pipeline_from_env()
    } else {
        pipeline_from_env().await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run { dry_run: false }) {
        Commands::Run { dry_run } => {
            let summary = pipeline(dry_run).await?.run_chained_once().await?;
            println!(
                "run complete: run_id={} origin={} harmonized={} merged={} recommendation={:?}",
                summary.refresh.run_id,
                summary.refresh.origin_airport,
                summary.refresh.harmonized_rows,
                summary.refresh.merged,
                summary.recommendation.state
            );
        }
        Commands::Refresh { dry_run } => {
            let summary = pipeline(dry_run).await?.run_refresh_once().await?;
            println!(
                "refresh complete: run_id={} harmonized={} merged={} purged={} reports={}",
                summary.run_id,
                summary.harmonized_rows,
                summary.merged,
                summary.purged,
                summary.reports_dir
            );
        }
        Commands::Recommend => {
            let outcome = pipeline(false).await?.run_recommendation_once().await?;
            println!(
                "recommendation complete: run_id={} state={:?} matched={} payload={}",
                outcome.run_id, outcome.state, outcome.matched, outcome.payload_size
            );
        }
        Commands::Migrate => {
            let config = PipelineConfig::from_env();
            let store = PgVacationSpotStore::connect(&config.database_url)
                .await
                .context("connecting to the vacation-spot database")?;
            store.migrate().await.context("applying migrations")?;
            println!("migrations applied");
        }
        Commands::Schedule => {
            let pipeline = Arc::new(pipeline_from_env().await?);
            match build_scheduler(pipeline).await? {
                Some(sched) => {
                    sched.start().await.context("starting scheduler")?;
                    println!("scheduler running; press ctrl-c to stop");
                    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
                }
                None => {
                    eprintln!("scheduler disabled; set GETAWAY_SCHEDULER_ENABLED=1 to enable it");
                }
            }
        }
    }

    Ok(())
}
