//! The five-stage ETL pipeline: load, merge, transform, aggregate, persist.
//!
//! Error policy (per stage):
//! - `load` and `persist` are fail-soft: failures are logged and returned as
//!   explicit outcomes, and the run continues.
//! - `merge`, `transform`, and `aggregate` are fail-loud: errors propagate
//!   to the caller and terminate the run.
//!
//! A load failure therefore surfaces later, more informatively, as a
//! missing-column error in `merge`.

use crate::config::{PipelineConfig, TableName};
use crate::persist::write_partitioned;
use crate::schema::{
    self, CUSTOMER_ID, ORDER_ID, ORDER_PURCHASE_TIMESTAMP, PRICE, PRICE_SUM, PRODUCT_CATEGORY_NAME,
    PRODUCT_ID, WEEK_START_DATE,
};
use crate::week::week_ending_monday;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{error, info, warn};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Why a fail-soft load produced an empty table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    FileNotFound,
    EmptyFile,
    Malformed,
}

/// Outcome of loading one input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { rows: usize },
    Empty { reason: EmptyReason },
}

/// Outcome of the final persist stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Written { path: PathBuf, partitions: usize },
    Failed { reason: String },
}

/// Per-stage results of a full pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub loads: Vec<(TableName, LoadOutcome)>,
    pub merged_rows: usize,
    pub weekly_rows: usize,
    pub persist: PersistOutcome,
}

/// The ETL pipeline. Holds the validated config plus intermediate datasets.
///
/// Single-threaded, one sequential invocation per run; calling `run` again
/// restarts from scratch.
pub struct Pipeline {
    config: PipelineConfig,
    customers: Option<DataFrame>,
    orders: Option<DataFrame>,
    order_items: Option<DataFrame>,
    products: Option<DataFrame>,
    merged: Option<DataFrame>,
    weekly: Option<DataFrame>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            customers: None,
            orders: None,
            order_items: None,
            products: None,
            merged: None,
            weekly: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The merged record set, once `merge` has run.
    pub fn merged(&self) -> Option<&DataFrame> {
        self.merged.as_ref()
    }

    /// The weekly aggregate, once `aggregate` has run.
    pub fn weekly(&self) -> Option<&DataFrame> {
        self.weekly.as_ref()
    }

    fn slot(&mut self, table: TableName) -> &mut Option<DataFrame> {
        match table {
            TableName::Customers => &mut self.customers,
            TableName::Orders => &mut self.orders,
            TableName::OrderItems => &mut self.order_items,
            TableName::Products => &mut self.products,
        }
    }

    fn table(&self, table: TableName) -> Option<&DataFrame> {
        match table {
            TableName::Customers => self.customers.as_ref(),
            TableName::Orders => self.orders.as_ref(),
            TableName::OrderItems => self.order_items.as_ref(),
            TableName::Products => self.products.as_ref(),
        }
    }

    /// Load one input table. Fail-soft: file-not-found, empty, or malformed
    /// content is logged and replaced by an empty table so the run can
    /// continue to a more informative merge failure.
    pub fn load(&mut self, table: TableName) -> LoadOutcome {
        let path = self.config.data_paths.get(table).to_path_buf();

        let outcome = if !path.is_file() {
            warn!("file not found for table '{table}': {}", path.display());
            LoadOutcome::Empty {
                reason: EmptyReason::FileNotFound,
            }
        } else if fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true) {
            warn!("empty dataset for table '{table}': {}", path.display());
            LoadOutcome::Empty {
                reason: EmptyReason::EmptyFile,
            }
        } else {
            match read_csv(&path) {
                Ok(df) => {
                    info!("loaded table '{table}': {} rows", df.height());
                    let rows = df.height();
                    *self.slot(table) = Some(df);
                    return LoadOutcome::Loaded { rows };
                }
                Err(e) => {
                    warn!("error parsing file for table '{table}': {e}");
                    LoadOutcome::Empty {
                        reason: EmptyReason::Malformed,
                    }
                }
            }
        };

        *self.slot(table) = Some(DataFrame::empty());
        outcome
    }

    /// Load all four tables in the fixed order customers, orders,
    /// order_items, products.
    pub fn load_all(&mut self) -> Vec<(TableName, LoadOutcome)> {
        TableName::ALL
            .into_iter()
            .map(|table| (table, self.load(table)))
            .collect()
    }

    /// Join the four tables and project to the canonical output columns.
    ///
    /// Inner joins in the fixed order orders⋈order_items on `order_id`,
    /// ⋈customers on `customer_id`, ⋈products on `product_id`. Rows whose
    /// keys are absent from any table are dropped.
    pub fn merge(&mut self) -> Result<(), PipelineError> {
        for table in TableName::ALL {
            let df = self.table(table).ok_or(PipelineError::StageOrder {
                stage: "merge",
                needs: "load_all",
            })?;
            schema::require_columns(df, table)?;
        }

        // require_columns above guarantees the slots are filled
        let orders = self.orders.clone().unwrap_or_default();
        let order_items = self.order_items.clone().unwrap_or_default();
        let customers = self.customers.clone().unwrap_or_default();
        let products = self.products.clone().unwrap_or_default();

        let merged = orders
            .lazy()
            .join(
                order_items.lazy(),
                [col(ORDER_ID)],
                [col(ORDER_ID)],
                JoinArgs::new(JoinType::Inner),
            )
            .join(
                customers.lazy(),
                [col(CUSTOMER_ID)],
                [col(CUSTOMER_ID)],
                JoinArgs::new(JoinType::Inner),
            )
            .join(
                products.lazy(),
                [col(PRODUCT_ID)],
                [col(PRODUCT_ID)],
                JoinArgs::new(JoinType::Inner),
            )
            .select([
                col(PRODUCT_ID),
                col(ORDER_PURCHASE_TIMESTAMP).alias(WEEK_START_DATE),
                col(PRODUCT_CATEGORY_NAME),
                col(PRICE).alias(PRICE_SUM),
            ])
            .collect()?;

        info!("merged tables: {} rows survive the inner joins", merged.height());
        self.merged = Some(merged);
        Ok(())
    }

    /// Parse `week_start_date` into a datetime column.
    ///
    /// Accepts `%Y-%m-%d %H:%M:%S` and bare `%Y-%m-%d`. Any value that fits
    /// neither format is a hard error carrying the offending value.
    pub fn transform(&mut self) -> Result<(), PipelineError> {
        let merged = self.merged.as_mut().ok_or(PipelineError::StageOrder {
            stage: "transform",
            needs: "merge",
        })?;

        let column = merged.column(WEEK_START_DATE)?;
        if matches!(column.dtype(), DataType::Datetime(_, _)) {
            return Ok(());
        }

        let ca = column.str()?;
        let mut millis = Vec::with_capacity(ca.len());
        for value in ca.iter() {
            let value = value.ok_or_else(|| PipelineError::UnparseableTimestamp {
                value: "<null>".to_string(),
            })?;
            let parsed = parse_timestamp(value).ok_or_else(|| {
                PipelineError::UnparseableTimestamp {
                    value: value.to_string(),
                }
            })?;
            millis.push(parsed.and_utc().timestamp_millis());
        }

        let parsed = Column::new(WEEK_START_DATE.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        merged.with_column(parsed)?;
        info!("transformed 'week_start_date' into a datetime index");
        Ok(())
    }

    /// Bucket rows into Monday-ending weeks and sum prices per group.
    ///
    /// Identifier and category columns are group-by keys, never summed; the
    /// result has one row per (week, product, category), sorted by week then
    /// product.
    pub fn aggregate(&mut self) -> Result<(), PipelineError> {
        let merged = self.merged.as_ref().ok_or(PipelineError::StageOrder {
            stage: "aggregate",
            needs: "transform",
        })?;
        if !matches!(
            merged.column(WEEK_START_DATE)?.dtype(),
            DataType::Datetime(_, _)
        ) {
            return Err(PipelineError::StageOrder {
                stage: "aggregate",
                needs: "transform",
            });
        }

        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch is a valid date");
        let ts = merged.column(WEEK_START_DATE)?.datetime()?;
        let mut week_days: Vec<i32> = Vec::with_capacity(ts.len());
        for value in ts.iter() {
            let ms = value.ok_or_else(|| PipelineError::UnparseableTimestamp {
                value: "<null>".to_string(),
            })?;
            let date = DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| PipelineError::UnparseableTimestamp {
                    value: format!("{ms}ms"),
                })?
                .date_naive();
            let week = week_ending_monday(date);
            week_days.push((week - epoch).num_days() as i32);
        }

        let mut keyed = merged.clone();
        keyed.with_column(
            Column::new(WEEK_START_DATE.into(), week_days).cast(&DataType::Date)?,
        )?;

        let weekly = keyed
            .lazy()
            .group_by([
                col(WEEK_START_DATE),
                col(PRODUCT_ID),
                col(PRODUCT_CATEGORY_NAME),
            ])
            .agg([col(PRICE_SUM).sum()])
            .sort(
                [WEEK_START_DATE, PRODUCT_ID],
                SortMultipleOptions::default(),
            )
            .collect()?;

        info!("aggregated into {} weekly rows", weekly.height());
        self.weekly = Some(weekly);
        Ok(())
    }

    /// Write the weekly aggregate as a Hive-partitioned Parquet dataset.
    ///
    /// Fail-soft: any failure is logged with its cause and reported as
    /// `PersistOutcome::Failed`, never raised.
    pub fn persist(&mut self) -> PersistOutcome {
        let Some(weekly) = self.weekly.as_ref() else {
            error!("nothing to persist: aggregate has not run");
            return PersistOutcome::Failed {
                reason: "aggregate has not run".to_string(),
            };
        };

        let prepared = match coerce_identifiers(weekly) {
            Ok(df) => df,
            Err(e) => {
                error!("error saving parquet dataset: {e}");
                return PersistOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        match write_partitioned(&prepared, &self.config.output_path, &self.config.partition_by)
        {
            Ok(partitions) => {
                info!(
                    "parquet dataset saved at: {} ({partitions} partition files)",
                    self.config.output_path.display()
                );
                PersistOutcome::Written {
                    path: self.config.output_path.clone(),
                    partitions,
                }
            }
            Err(e) => {
                error!("error saving parquet dataset: {e}");
                PersistOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Run the full pipeline in strict order.
    ///
    /// Load and persist outcomes are recorded in the returned report;
    /// merge, transform, and aggregate errors propagate.
    pub fn run(&mut self) -> Result<RunReport, PipelineError> {
        let loads = self.load_all();
        self.merge()?;
        self.transform()?;
        self.aggregate()?;

        let merged_rows = self.merged.as_ref().map_or(0, DataFrame::height);
        let weekly_rows = self.weekly.as_ref().map_or(0, DataFrame::height);
        let persist = self.persist();

        Ok(RunReport {
            loads,
            merged_rows,
            weekly_rows,
            persist,
        })
    }
}

/// Cast identifier and category columns to the string dtype before writing.
fn coerce_identifiers(df: &DataFrame) -> PolarsResult<DataFrame> {
    let mut out = df.clone();
    for name in [PRODUCT_ID, PRODUCT_CATEGORY_NAME] {
        let cast = out.column(name)?.cast(&DataType::String)?;
        out.with_column(cast)?;
    }
    Ok(out)
}

fn read_csv(path: &Path) -> PolarsResult<DataFrame> {
    LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()?
        .collect()
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_hms_opt(0, 0, 0).expect("midnight is a valid time"))
        })
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("'{stage}' called before '{needs}'")]
    StageOrder {
        stage: &'static str,
        needs: &'static str,
    },

    #[error(transparent)]
    Schema(#[from] crate::schema::SchemaError),

    #[error("unparseable timestamp in 'week_start_date': {value}")]
    UnparseableTimestamp { value: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}
