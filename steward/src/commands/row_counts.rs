// steward/src/commands/row_counts.rs
//
// USE CASE: Count the rows a set of participants holds in each dataset.

use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;

use steward_core::application::participant_row_counts;
use steward_core::application::row_counts::person_tables;
use steward_core::domain::participants::{
    DatasetType, PidSource, row_count_candidates, row_count_query,
};
use steward_core::infrastructure::adapters::BigQueryEngine;
use steward_core::infrastructure::config::{BigQuerySettings, load_cdm_catalog};

pub struct RowCountOptions {
    pub pids: Vec<i64>,
    pub pid_table: Option<String>,
    pub hpo_id: Option<String>,
    pub dry_run: bool,
}

pub async fn execute(
    project_id: &str,
    dataset_ids: &[String],
    options: RowCountOptions,
) -> anyhow::Result<()> {
    let pid_source: PidSource = match options.pid_table {
        Some(table) => table.parse()?,
        None => PidSource::from_ids(options.pids)?,
    };
    let hpo_id = options.hpo_id.as_deref();
    let catalog = load_cdm_catalog(None)?;

    if options.dry_run {
        // Without the warehouse every candidate table is assumed to exist.
        let tables = person_tables(&catalog);
        for dataset_id in dataset_ids {
            let dataset_type = DatasetType::from_dataset_id(dataset_id);
            let candidates = row_count_candidates(dataset_type, &tables, hpo_id)?;
            println!("-- {} ({})", dataset_id, dataset_type);
            println!(
                "{};\n",
                row_count_query(project_id, dataset_id, dataset_type, &pid_source, &candidates, hpo_id)?
            );
        }
        return Ok(());
    }

    let engine = BigQueryEngine::from_env(project_id, BigQuerySettings::default())?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Dataset", "Type", "Table", "CDM table", "Rows"]);

    for dataset_id in dataset_ids {
        let counts =
            participant_row_counts(&engine, &catalog, project_id, dataset_id, &pid_source, hpo_id)
                .await?;
        for count in counts {
            table.add_row(vec![
                count.dataset_id,
                count.dataset_type.to_string(),
                count.table,
                count.cdm_table,
                count.count.to_string(),
            ]);
        }
    }
    println!("{table}");
    Ok(())
}
