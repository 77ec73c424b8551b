// steward/src/commands/clean.rs
//
// USE CASE: Apply (or list) the configured cleaning rules.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use std::path::Path;

use steward_core::application::{
    PlannedQuery, build_rules, clean_dataset, clean_dataset_and_notify, get_query_list,
};
use steward_core::infrastructure::adapters::{BigQueryEngine, SlackConfig, SlackNotifier};
use steward_core::infrastructure::config::{load_cdm_catalog, load_config};
use steward_core::ports::QueryEngine;

pub struct CleanOptions {
    pub rule: Option<String>,
    pub list_queries: bool,
    pub resolve: bool,
    pub notify: bool,
}

pub async fn execute(config_path: &Path, options: CleanOptions) -> anyhow::Result<()> {
    println!("⚙️  Loading configuration...");
    let config = load_config(config_path)?;
    let catalog = load_cdm_catalog(config.cdm_schema_path.as_deref())?;
    println!(
        "   Dataset: {}.{} (sandbox: {})",
        config.project_id, config.dataset_id, config.sandbox_dataset_id
    );

    // Slack is checked before any query runs.
    let notifier = if options.notify {
        Some(SlackNotifier::new(SlackConfig::from_env()?))
    } else {
        None
    };

    let mut rules = build_rules(&config, &catalog, options.rule.as_deref())?;
    println!("   Rules: {}", rules.len());

    if options.list_queries {
        let engine = if options.resolve {
            Some(BigQueryEngine::from_env(&config.project_id, config.bigquery.clone())?)
        } else {
            None
        };
        let planned = get_query_list(
            &mut rules,
            engine.as_ref().map(|e| e as &dyn QueryEngine),
        )
        .await?;
        print_queries(&planned);
        return Ok(());
    }

    let engine = BigQueryEngine::from_env(&config.project_id, config.bigquery.clone())?;
    let report = match &notifier {
        Some(notifier) => {
            clean_dataset_and_notify(
                &engine,
                notifier,
                &config.project_id,
                &config.dataset_id,
                &mut rules,
            )
            .await?
        }
        None => clean_dataset(&engine, &config.project_id, &mut rules).await?,
    };
    println!(
        "\n✨ {}",
        report.summary(&config.project_id, &config.dataset_id)
    );
    if notifier.is_some() {
        println!("📣 Summary posted to Slack");
    }

    Ok(())
}

fn print_queries(planned: &[PlannedQuery]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Rule", "Destination", "Disposition"]);

    for (index, query) in planned.iter().enumerate() {
        let disposition = query
            .spec
            .destination
            .as_ref()
            .map(|d| d.disposition.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            (index + 1).to_string(),
            query.rule.clone(),
            query.spec.destination_label(),
            disposition,
        ]);
    }
    println!("{table}");

    for (index, query) in planned.iter().enumerate() {
        println!("\n-- [{}] {} -> {}", index + 1, query.rule, query.spec.destination_label());
        println!("{};", query.spec.query.trim_end_matches(';'));
    }
}
