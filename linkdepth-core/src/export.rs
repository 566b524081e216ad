// Tabular export of crawl results

use crate::error::{CoreError, Result};
use linkdepth_scanner::{LinkEdge, PageText};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fs;
use std::path::Path;

pub const EDGE_COLUMNS: [&str; 4] = ["Base URL", "Depth - 1 URL", "Depth - 2 URL", "Depth Level"];
pub const TEXT_COLUMNS: [&str; 3] = ["URL", "Depth", "Text"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "xlsx" => Some(ExportFormat::Xlsx),
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    /// Pick the format from the file extension, falling back to CSV.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_str)
            .unwrap_or(ExportFormat::Csv)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Column names plus string rows, ready for any spreadsheet-like sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn with_columns(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row per edge, values copied as stored.
pub fn to_rows(edges: &[LinkEdge]) -> Table {
    let mut table = Table::with_columns(&EDGE_COLUMNS);
    table.rows = edges
        .iter()
        .map(|edge| {
            vec![
                edge.base_url.clone(),
                edge.depth1_url.clone(),
                edge.depth2_url.clone(),
                edge.level.as_str().to_string(),
            ]
        })
        .collect();
    table
}

pub fn text_rows(pages: &[PageText]) -> Table {
    let mut table = Table::with_columns(&TEXT_COLUMNS);
    table.rows = pages
        .iter()
        .map(|page| vec![page.url.clone(), page.depth.to_string(), page.text.clone()])
        .collect();
    table
}

pub fn render_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| CoreError::Io(e.into_error()))
}

/// Single-sheet workbook: a bold header row, then one row per table row.
pub fn render_xlsx(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (col, name) in (0u16..).zip(&table.columns) {
        sheet.write_string_with_format(0, col, name, &header)?;
    }
    for (row_idx, row) in (1u32..).zip(&table.rows) {
        for (col, value) in (0u16..).zip(row) {
            sheet.write_string(row_idx, col, value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// JSON document with one object per row keyed by column name.
pub fn render_json(table: &Table) -> Result<String> {
    let rows: Vec<Value> = table
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = table
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| (column.clone(), Value::String(value.clone())))
                .collect();
            Value::Object(object)
        })
        .collect();

    let document = json!({
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "columns": table.columns,
        "rows": rows,
    });

    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn write_table(table: &Table, path: &Path, format: ExportFormat) -> Result<()> {
    let content = match format {
        ExportFormat::Xlsx => render_xlsx(table),
        ExportFormat::Csv => render_csv(table),
        ExportFormat::Json => render_json(table).map(String::into_bytes),
    }
    .map_err(|e| CoreError::export(path, e))?;

    fs::write(path, content).map_err(|e| CoreError::export(path, e))
}
