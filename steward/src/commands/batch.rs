// steward/src/commands/batch.rs
//
// USE CASE: Filter per-domain NDJSON exports.

use std::path::Path;

use steward_core::application::run_batch_pipeline;

pub fn execute(input_dir: &Path, output_dir: &Path, domains: &[String]) -> anyhow::Result<()> {
    println!("🧬 Filtering exports in '{}'...", input_dir.display());

    let report = run_batch_pipeline(input_dir, output_dir, domains)?;

    for (domain, summary) in &report.domains {
        println!(
            "   {:<24} read {:>8}  kept {:>8}",
            domain, summary.read, summary.written
        );
    }
    println!(
        "✨ {} file(s) written to {}",
        report.outputs.len(),
        output_dir.display()
    );
    Ok(())
}
