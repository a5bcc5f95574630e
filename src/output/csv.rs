// CSV export of the full cluster table: Keyword, one column per domain, match.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::cluster::aggregate::ClusterTable;

/// Render the table as CSV text.
pub fn render(table: &ClusterTable) -> String {
    let mut out = String::new();

    let header: Vec<String> = std::iter::once("Keyword")
        .chain(table.domains.iter().map(String::as_str))
        .chain(std::iter::once("match"))
        .map(escape)
        .collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for row in &table.rows {
        let fields: Vec<String> = std::iter::once(escape(&row.keyword))
            .chain(row.counts.iter().map(u32::to_string))
            .chain(std::iter::once(row.match_score.to_string()))
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

/// Write the table to `path` as CSV.
pub fn write(table: &ClusterTable, path: &Path) -> Result<()> {
    fs::write(path, render(table))
        .with_context(|| format!("Failed to write CSV to {}", path.display()))
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
