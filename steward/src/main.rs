// steward/src/main.rs

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=debug steward clean ... to see the generated SQL
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        // --- USE CASE: CLEAN DATASET ---
        Commands::Clean {
            config,
            rule,
            list_queries,
            resolve,
            notify,
        } => {
            let options = commands::clean::CleanOptions {
                rule,
                list_queries,
                resolve,
                notify,
            };
            commands::clean::execute(&config, options).await?;
        }

        // --- USE CASE: NOTIFY ---
        Commands::Notify {
            message,
            check_channel,
        } => {
            commands::notify::execute(&message, check_channel).await?;
        }

        // --- USE CASE: BATCH FILTERING ---
        Commands::Batch {
            input_dir,
            output_dir,
            domains,
        } => {
            commands::batch::execute(&input_dir, &output_dir, &domains)?;
        }

        // --- USE CASE: PARTICIPANT ROW COUNTS ---
        Commands::RowCounts {
            project_id,
            dataset_ids,
            pids,
            pid_table,
            hpo_id,
            dry_run,
        } => {
            let options = commands::row_counts::RowCountOptions {
                pids,
                pid_table,
                hpo_id,
                dry_run,
            };
            commands::row_counts::execute(&project_id, &dataset_ids, options).await?;
        }
    }

    Ok(())
}
