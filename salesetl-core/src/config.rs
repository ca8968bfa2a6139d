//! Validated pipeline configuration, loaded from a YAML file.
//!
//! The configuration is an immutable record constructed once at startup.
//! Validation runs before the pipeline is built: every data path must be an
//! existing regular file, the output path an existing directory, and at
//! least one partition column must be given.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// The four input tables the pipeline consumes.
///
/// Modeled as a closed enum so a missing table is a configuration error
/// caught up front, not a runtime lookup failure mid-pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableName {
    Customers,
    Orders,
    OrderItems,
    Products,
}

impl TableName {
    /// All tables, in the order the pipeline loads them.
    pub const ALL: [TableName; 4] = [
        TableName::Customers,
        TableName::Orders,
        TableName::OrderItems,
        TableName::Products,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Customers => "customers",
            TableName::Orders => "orders",
            TableName::OrderItems => "order_items",
            TableName::Products => "products",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One CSV path per input table, from the YAML `data_paths` mapping.
///
/// Deserializing through a struct (rather than a free-form map) makes a
/// missing table key a parse error.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataPaths {
    pub customers: PathBuf,
    pub orders: PathBuf,
    pub order_items: PathBuf,
    pub products: PathBuf,
}

impl DataPaths {
    pub fn get(&self, table: TableName) -> &Path {
        match table {
            TableName::Customers => &self.customers,
            TableName::Orders => &self.orders,
            TableName::OrderItems => &self.order_items,
            TableName::Products => &self.products,
        }
    }
}

/// Pipeline configuration: input paths, output directory, partition columns.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub data_paths: DataPaths,
    pub output_path: PathBuf,
    pub partition_by: Vec<String>,
}

impl PipelineConfig {
    /// Read, parse, and validate a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content).map_err(|source| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration string without path validation.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Validate paths: every data path is a regular file, the output path is
    /// a directory, and at least one partition column is configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for table in TableName::ALL {
            let path = self.data_paths.get(table);
            if !path.is_file() {
                return Err(ConfigError::DataPathNotFile {
                    table,
                    path: path.to_path_buf(),
                });
            }
        }
        if !self.output_path.is_dir() {
            return Err(ConfigError::OutputPathNotDir {
                path: self.output_path.clone(),
            });
        }
        if self.partition_by.is_empty() {
            return Err(ConfigError::EmptyPartitionBy);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse YAML config at {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("data path for table '{table}' is not an existing file: {path}")]
    DataPathNotFile { table: TableName, path: PathBuf },

    #[error("output path is not an existing directory: {path}")]
    OutputPathNotDir { path: PathBuf },

    #[error("partition_by must list at least one column")]
    EmptyPartitionBy,
}
