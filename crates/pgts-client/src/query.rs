//! Shaping `query/simpleexecute` results into grids.

use pgts_rpc::contracts::SimpleExecuteResult;

use crate::results::{ColumnSchema, DataGrid, ExecutionStatus, GridRow, QueryResults};

/// Display type given to every column; cells arrive as rendered text.
pub const DISPLAY_DATA_TYPE: &str = "String";

/// Convert a raw execute result into a single-grid [`QueryResults`].
///
/// Missing ordinals fall back to the column's position.
pub fn to_query_results(result: SimpleExecuteResult) -> QueryResults {
    let schema = result
        .column_info
        .into_iter()
        .enumerate()
        .map(|(position, column)| ColumnSchema {
            column_name: column.column_name.unwrap_or_default(),
            ordinal: column
                .column_ordinal
                .unwrap_or_else(|| i64::try_from(position).unwrap_or(i64::MAX)),
            data_type: DISPLAY_DATA_TYPE.to_owned(),
        })
        .collect();

    let rows = result
        .rows
        .into_iter()
        .enumerate()
        .map(|(index, cells)| GridRow {
            index,
            data: cells.into_iter().map(|cell| cell.display_value).collect(),
        })
        .collect();

    QueryResults {
        messages: Vec::new(),
        results: vec![DataGrid { schema, rows }],
        status: ExecutionStatus::Success,
        row_count: result.row_count,
    }
}
