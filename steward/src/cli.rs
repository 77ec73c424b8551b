// steward/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "steward")]
#[command(about = "Concept suppression and curation rules for clinical datasets", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🧹 Applies the configured cleaning rules to a dataset
    Clean {
        /// Config file, or directory containing steward.yaml
        #[arg(long, default_value = ".")]
        config: PathBuf,

        /// Apply only the rule with this name
        #[arg(long, short)]
        rule: Option<String>,

        /// Print the generated queries instead of running them
        #[arg(long, default_value = "false")]
        list_queries: bool,

        /// With --list-queries: resolve tables against the warehouse first
        #[arg(long, default_value = "false")]
        resolve: bool,

        /// Post a run summary to Slack (SLACK_TOKEN / SLACK_CHANNEL)
        #[arg(long, default_value = "false")]
        notify: bool,
    },

    /// 📣 Posts a message to the configured Slack channel
    Notify {
        message: String,

        /// Only check that the channel is visible to the bot
        #[arg(long, default_value = "false")]
        check_channel: bool,
    },

    /// 🧬 Filters per-domain NDJSON exports (negative ages, orphans)
    Batch {
        #[arg(long)]
        input_dir: PathBuf,

        #[arg(long)]
        output_dir: PathBuf,

        /// Domains to process (default: every <domain>.json found)
        #[arg(long, value_delimiter = ',')]
        domains: Vec<String>,
    },

    /// 📊 Counts rows per table for a set of participants
    RowCounts {
        #[arg(long)]
        project_id: String,

        #[arg(long, required = true, value_delimiter = ',')]
        dataset_ids: Vec<String>,

        /// Comma separated person_ids
        #[arg(long, value_delimiter = ',', conflicts_with = "pid_table", required_unless_present = "pid_table")]
        pids: Vec<i64>,

        /// Table of person_ids as project.dataset.table
        #[arg(long)]
        pid_table: Option<String>,

        /// Site id prefixing the tables of EHR datasets (`<hpo_id>_person`)
        #[arg(long)]
        hpo_id: Option<String>,

        /// Print the count queries instead of running them
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use clap::Parser;

    #[test]
    fn test_cli_parse_clean_defaults() -> Result<()> {
        let args = Cli::parse_from(["steward", "clean"]);
        match args.command {
            Commands::Clean {
                config,
                rule,
                list_queries,
                resolve,
                notify,
            } => {
                assert_eq!(config.to_string_lossy(), ".");
                assert_eq!(rule, None);
                assert!(!list_queries && !resolve && !notify);
                Ok(())
            }
            _ => bail!("Expected Clean command"),
        }
    }

    #[test]
    fn test_cli_parse_clean_list_queries() -> Result<()> {
        let args = Cli::parse_from([
            "steward",
            "clean",
            "--config",
            "/tmp/steward.yaml",
            "--rule",
            "covid_concepts",
            "--list-queries",
        ]);
        match args.command {
            Commands::Clean {
                config,
                rule,
                list_queries,
                ..
            } => {
                assert_eq!(config.to_string_lossy(), "/tmp/steward.yaml");
                assert_eq!(rule.as_deref(), Some("covid_concepts"));
                assert!(list_queries);
                Ok(())
            }
            _ => bail!("Expected Clean command"),
        }
    }

    #[test]
    fn test_cli_parse_row_counts_pids() -> Result<()> {
        let args = Cli::parse_from([
            "steward",
            "row-counts",
            "--project-id",
            "p",
            "--dataset-ids",
            "ehr_1,combined_2",
            "--pids",
            "1,2,3",
            "--hpo-id",
            "nyc",
        ]);
        match args.command {
            Commands::RowCounts {
                dataset_ids,
                pids,
                pid_table,
                hpo_id,
                ..
            } => {
                assert_eq!(dataset_ids, vec!["ehr_1", "combined_2"]);
                assert_eq!(pids, vec![1, 2, 3]);
                assert!(pid_table.is_none());
                assert_eq!(hpo_id.as_deref(), Some("nyc"));
                Ok(())
            }
            _ => bail!("Expected RowCounts command"),
        }
    }

    #[test]
    fn test_cli_row_counts_needs_a_pid_source() {
        assert!(
            Cli::try_parse_from(["steward", "row-counts", "--project-id", "p", "--dataset-ids", "d"])
                .is_err()
        );
    }
}
