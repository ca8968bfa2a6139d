//! SalesETL CLI — run the weekly sales ETL from a YAML config file.
//!
//! Reads the configuration (default `config.yml`), validates it, runs the
//! pipeline, and prints a per-stage report. Invalid configuration aborts
//! before the pipeline is constructed.

use anyhow::Result;
use clap::Parser;
use salesetl_core::{LoadOutcome, PersistOutcome, Pipeline, PipelineConfig, RunReport};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "salesetl",
    about = "Weekly sales ETL — joins order CSVs and writes a partitioned Parquet dataset"
)]
struct Cli {
    /// Path to the YAML config file.
    #[arg(long, default_value = "config.yml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match PipelineConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let mut pipeline = Pipeline::new(config);
    let report = pipeline.run()?;
    print_report(&report);

    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("=== Pipeline Run ===");
    for (table, outcome) in &report.loads {
        match outcome {
            LoadOutcome::Loaded { rows } => {
                println!("{table:<12} {rows} rows");
            }
            LoadOutcome::Empty { reason } => {
                println!("{table:<12} empty ({reason:?})");
            }
        }
    }
    println!();
    println!("Merged rows:  {}", report.merged_rows);
    println!("Weekly rows:  {}", report.weekly_rows);
    match &report.persist {
        PersistOutcome::Written { path, partitions } => {
            println!(
                "Output:       {} ({partitions} partition files)",
                path.display()
            );
        }
        PersistOutcome::Failed { reason } => {
            println!("Output:       FAILED ({reason})");
        }
    }
    println!();
}
