//! Column contracts for the input tables and the merged record set.

use crate::config::TableName;
use polars::prelude::*;

/// Join key between orders and order_items.
pub const ORDER_ID: &str = "order_id";
/// Join key between orders and customers.
pub const CUSTOMER_ID: &str = "customer_id";
/// Join key between order_items and products.
pub const PRODUCT_ID: &str = "product_id";
/// Purchase timestamp on orders; renamed to `week_start_date` after merge.
pub const ORDER_PURCHASE_TIMESTAMP: &str = "order_purchase_timestamp";
/// Category on products; carried through to the output.
pub const PRODUCT_CATEGORY_NAME: &str = "product_category_name";
/// Item price on order_items; renamed to `price_sum` after merge.
pub const PRICE: &str = "price";

/// Weekly bucket column in the merged and aggregated output.
pub const WEEK_START_DATE: &str = "week_start_date";
/// Summed price column in the merged and aggregated output.
pub const PRICE_SUM: &str = "price_sum";

/// Columns the joins and transform consume from each input table.
pub fn required_columns(table: TableName) -> &'static [&'static str] {
    match table {
        TableName::Customers => &[CUSTOMER_ID],
        TableName::Orders => &[ORDER_ID, CUSTOMER_ID, ORDER_PURCHASE_TIMESTAMP],
        TableName::OrderItems => &[ORDER_ID, PRODUCT_ID, PRICE],
        TableName::Products => &[PRODUCT_ID, PRODUCT_CATEGORY_NAME],
    }
}

/// The canonical merged column set, in output order.
pub const MERGED_COLUMNS: [&str; 4] =
    [PRODUCT_ID, WEEK_START_DATE, PRODUCT_CATEGORY_NAME, PRICE_SUM];

/// Check that a table carries every column the pipeline consumes from it.
///
/// This is where a fail-soft load surfaces as a hard error: an empty table
/// substituted at load time has none of its required columns.
pub fn require_columns(df: &DataFrame, table: TableName) -> Result<(), SchemaError> {
    let actual = df.schema();
    for column in required_columns(table) {
        if !actual.contains(column) {
            return Err(SchemaError::MissingColumn {
                table,
                column: (*column).to_string(),
            });
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("table '{table}' is missing required column '{column}'")]
    MissingColumn { table: TableName, column: String },
}
