use crate::metrics::AggregateTable;
use crate::types::Observation;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// File name of the filtered long-table export.
pub const EXPORT_FILE: &str = "green_ai_filtered_data.csv";

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_aggregate_csv(path: &Path, table: &AggregateTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(table.headers())?;
    for rec in table.records() {
        wtr.write_record(rec)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Serialize the long table as CSV into any writer. The header is written
/// even when there are no rows.
pub fn export_observations<W: Write>(writer: W, rows: &[Observation]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(EXPORT_COLUMNS)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Column names of the export, matching the `Observation` field order.
pub const EXPORT_COLUMNS: [&str; 11] = [
    "question_id",
    "question_category",
    "model_category",
    "model",
    "tokens",
    "time_sec",
    "score",
    "cost",
    "electricity_wh",
    "co2_g",
    "model_position",
];

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn preview_aggregate(table: &AggregateTable, max_rows: usize) {
    if table.is_empty() {
        println!("(no rows)\n");
        return;
    }
    println!("{}\n", render_aggregate(table, max_rows));
}

/// Markdown rendering of the first `max_rows` groups, missing values as NaN.
pub fn render_aggregate(table: &AggregateTable, max_rows: usize) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.headers());
    for rec in table.records().into_iter().take(max_rows) {
        let width = table.dimensions.len();
        builder.push_record(rec.into_iter().enumerate().map(|(i, cell)| {
            if i >= width && cell.is_empty() {
                "NaN".to_string()
            } else {
                cell
            }
        }));
    }
    builder.build().with(Style::markdown()).to_string()
}
