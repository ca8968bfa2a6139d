//! SalesETL Core — batch ETL from raw order CSVs to a weekly sales dataset.
//!
//! This crate contains the whole pipeline:
//! - Validated YAML configuration (paths, output directory, partition columns)
//! - Closed enumeration of the four input tables
//! - Per-table schema contracts for the columns the joins consume
//! - The five ETL stages: load, merge, transform, aggregate, persist
//! - Hive-partitioned Parquet writer for the weekly output
//!
//! Load and persist are fail-soft: failures are logged and reported as
//! explicit outcomes in the run report. Merge, transform, and aggregate are
//! fail-loud and propagate errors to the caller.

pub mod config;
pub mod persist;
pub mod pipeline;
pub mod schema;
pub mod week;

pub use config::{ConfigError, DataPaths, PipelineConfig, TableName};
pub use persist::PersistError;
pub use pipeline::{
    EmptyReason, LoadOutcome, PersistOutcome, Pipeline, PipelineError, RunReport,
};
pub use schema::SchemaError;
pub use week::week_ending_monday;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
        assert_send::<TableName>();
        assert_sync::<TableName>();
    }

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
        assert_send::<LoadOutcome>();
        assert_sync::<LoadOutcome>();
        assert_send::<PersistOutcome>();
        assert_sync::<PersistOutcome>();
    }
}
