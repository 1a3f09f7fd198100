//! Plain-text rendering of results.

use std::fmt::Write as _;

use pgts_client::results::DataGrid;
use pgts_client::{QueryResults, TreeNode};

/// Render result grids as aligned columns.
pub fn query_table(results: &QueryResults) -> String {
    let mut out = String::new();
    for grid in &results.results {
        out.push_str(&grid_table(grid));
    }
    let noun = if results.row_count == 1 { "row" } else { "rows" };
    let _ = writeln!(out, "({} {noun})", results.row_count);
    out
}

fn grid_table(grid: &DataGrid) -> String {
    let header: Vec<&str> = grid.schema.iter().map(|c| c.column_name.as_str()).collect();
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &grid.rows {
        for (i, cell) in row.data.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }

    let mut out = String::new();
    push_line(&mut out, header.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for row in &grid.rows {
        push_line(&mut out, row.data.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
}

/// One line per node: marker, label, entity type, path.
pub fn tree_nodes(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        let marker = if node.is_leaf { "-" } else { "+" };
        let _ = writeln!(
            out,
            "{marker} {}  [{}]  {}",
            node.display_value, node.entity_type, node.path
        );
    }
    out
}
