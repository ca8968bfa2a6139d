//! Hive-partitioned Parquet writer.
//!
//! Layout: `{output_path}/{col}={value}/.../part-0.parquet`, one directory
//! level per partition column in configured order. Partition columns are
//! dropped from the leaf files; their values live in the directory names.
//!
//! Re-running with the same configuration rewrites each leaf file in place
//! (deterministic overwrite, no append).

use polars::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder directory value for null partition keys.
const NULL_PARTITION: &str = "__null__";

/// Write `df` as a partitioned Parquet dataset under `output_path`.
///
/// Every partition column must exist in `df`. Returns the number of leaf
/// files written.
pub fn write_partitioned(
    df: &DataFrame,
    output_path: &Path,
    partition_by: &[String],
) -> Result<usize, PersistError> {
    for column in partition_by {
        if !df.schema().contains(column) {
            return Err(PersistError::MissingPartitionColumn {
                column: column.clone(),
            });
        }
    }

    // Partition keys become directory names, so coerce them to strings up
    // front (dates format as YYYY-MM-DD).
    let mut keyed = df.clone();
    for column in partition_by {
        let cast = keyed
            .column(column)
            .map_err(|e| PersistError::Polars(e.to_string()))?
            .cast(&DataType::String)
            .map_err(|e| PersistError::Polars(e.to_string()))?;
        keyed
            .with_column(cast)
            .map_err(|e| PersistError::Polars(e.to_string()))?;
    }

    write_level(&keyed, output_path, partition_by)
}

fn write_level(
    df: &DataFrame,
    dir: &Path,
    partition_by: &[String],
) -> Result<usize, PersistError> {
    let Some((column, rest)) = partition_by.split_first() else {
        write_leaf(df, dir)?;
        return Ok(1);
    };

    let ca = df
        .column(column)
        .and_then(|c| Ok(c.str()?.clone()))
        .map_err(|e| PersistError::Polars(e.to_string()))?;

    let values: BTreeSet<String> = ca
        .iter()
        .map(|v| v.unwrap_or(NULL_PARTITION).to_string())
        .collect();

    let mut written = 0;
    for value in values {
        let mask: BooleanChunked = ca
            .iter()
            .map(|v| Some(v.unwrap_or(NULL_PARTITION) == value))
            .collect();
        let subset = df
            .filter(&mask)
            .and_then(|d| d.drop(column))
            .map_err(|e| PersistError::Polars(e.to_string()))?;

        let subdir = dir.join(format!("{column}={value}"));
        written += write_level(&subset, &subdir, rest)?;
    }
    Ok(written)
}

fn write_leaf(df: &DataFrame, dir: &Path) -> Result<(), PersistError> {
    fs::create_dir_all(dir).map_err(|source| PersistError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join("part-0.parquet");
    let file = fs::File::create(&path).map_err(|source| PersistError::Io {
        path: path.clone(),
        source,
    })?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| PersistError::Polars(e.to_string()))?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("partition column '{column}' does not exist in the output")]
    MissingPartitionColumn { column: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parquet write failed: {0}")]
    Polars(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> DataFrame {
        df!(
            "product_category_name" => &["toys", "toys", "books"],
            "product_id" => &["p1", "p2", "p3"],
            "price_sum" => &[10.0, 20.0, 5.0],
        )
        .unwrap()
    }

    #[test]
    fn writes_one_directory_per_partition_value() {
        let tmp = tempfile::tempdir().unwrap();
        let written = write_partitioned(
            &sample_frame(),
            tmp.path(),
            &["product_category_name".to_string()],
        )
        .unwrap();

        assert_eq!(written, 2);
        assert!(tmp
            .path()
            .join("product_category_name=toys/part-0.parquet")
            .is_file());
        assert!(tmp
            .path()
            .join("product_category_name=books/part-0.parquet")
            .is_file());
    }

    #[test]
    fn partition_column_is_dropped_from_leaf_files() {
        let tmp = tempfile::tempdir().unwrap();
        write_partitioned(
            &sample_frame(),
            tmp.path(),
            &["product_category_name".to_string()],
        )
        .unwrap();

        let leaf = tmp.path().join("product_category_name=toys/part-0.parquet");
        let file = fs::File::open(leaf).unwrap();
        let df = ParquetReader::new(file).finish().unwrap();

        assert!(!df.schema().contains("product_category_name"));
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn nested_partitions_follow_configured_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_partitioned(
            &sample_frame(),
            tmp.path(),
            &[
                "product_category_name".to_string(),
                "product_id".to_string(),
            ],
        )
        .unwrap();

        assert!(tmp
            .path()
            .join("product_category_name=toys/product_id=p1/part-0.parquet")
            .is_file());
        assert!(tmp
            .path()
            .join("product_category_name=books/product_id=p3/part-0.parquet")
            .is_file());
    }

    #[test]
    fn rerun_overwrites_leaf_files_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let cols = vec!["product_category_name".to_string()];

        write_partitioned(&sample_frame(), tmp.path(), &cols).unwrap();
        write_partitioned(&sample_frame(), tmp.path(), &cols).unwrap();

        let toys_dir = tmp.path().join("product_category_name=toys");
        let files: Vec<_> = fs::read_dir(&toys_dir).unwrap().collect();
        assert_eq!(files.len(), 1, "rerun must not accumulate files");
    }

    #[test]
    fn missing_partition_column_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = write_partitioned(&sample_frame(), tmp.path(), &["nope".to_string()])
            .unwrap_err();
        assert!(matches!(err, PersistError::MissingPartitionColumn { .. }));
    }
}
