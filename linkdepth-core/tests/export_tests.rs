// Tests for spreadsheet export

use calamine::{Reader, Xlsx, open_workbook};
use linkdepth_core::CoreError;
use linkdepth_core::export::{
    EDGE_COLUMNS, ExportFormat, TEXT_COLUMNS, render_csv, render_json, render_xlsx, text_rows,
    to_rows, write_table,
};
use linkdepth_scanner::{LinkEdge, PageText};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn sample_edges() -> Vec<LinkEdge> {
    vec![
        LinkEdge::depth1("http://example.com", "http://example.com/a"),
        LinkEdge::depth2(
            "http://example.com",
            "http://example.com/a",
            "http://example.com/a/b",
        ),
    ]
}

// ============================================================================
// Export Format Tests
// ============================================================================

#[test]
fn test_export_format_from_str() {
    assert_eq!(ExportFormat::from_str("csv"), Some(ExportFormat::Csv));
    assert_eq!(ExportFormat::from_str("JSON"), Some(ExportFormat::Json));
    assert_eq!(ExportFormat::from_str("XLSX"), Some(ExportFormat::Xlsx));
    assert_eq!(ExportFormat::from_str("xls"), None);
}

#[test]
fn test_export_format_from_path() {
    assert_eq!(ExportFormat::from_path(Path::new("out.json")), ExportFormat::Json);
    assert_eq!(ExportFormat::from_path(Path::new("out.CSV")), ExportFormat::Csv);
    assert_eq!(ExportFormat::from_path(Path::new("out")), ExportFormat::Csv);
    assert_eq!(ExportFormat::from_path(Path::new("out.xlsx")), ExportFormat::Xlsx);
    assert_eq!(ExportFormat::from_path(Path::new("out.ods")), ExportFormat::Csv);
}

// ============================================================================
// Row Mapping Tests
// ============================================================================

#[test]
fn test_to_rows_fixed_columns() {
    let table = to_rows(&sample_edges());
    assert_eq!(table.columns, EDGE_COLUMNS.to_vec());
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.rows[0],
        vec!["http://example.com", "http://example.com/a", "", "1"]
    );
    assert_eq!(
        table.rows[1],
        vec![
            "http://example.com",
            "http://example.com/a",
            "http://example.com/a/b",
            "2"
        ]
    );
}

#[test]
fn test_to_rows_empty() {
    let table = to_rows(&[]);
    assert!(table.is_empty());
    assert_eq!(table.columns.len(), 4);
}

#[test]
fn test_text_rows() {
    let pages = vec![PageText {
        url: "http://example.com/".to_string(),
        depth: 0,
        text: "Hello, \"quoted\" world".to_string(),
    }];
    let table = text_rows(&pages);
    assert_eq!(table.columns, TEXT_COLUMNS.to_vec());
    assert_eq!(table.rows[0][1], "0");
}

// ============================================================================
// Rendering Tests
// ============================================================================

#[test]
fn test_render_csv() {
    let csv = String::from_utf8(render_csv(&to_rows(&sample_edges())).unwrap()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Base URL,Depth - 1 URL,Depth - 2 URL,Depth Level");
    assert_eq!(lines[1], "http://example.com,http://example.com/a,,1");
    assert_eq!(
        lines[2],
        "http://example.com,http://example.com/a,http://example.com/a/b,2"
    );
}

#[test]
fn test_render_csv_quotes_text() {
    let pages = vec![PageText {
        url: "http://example.com/".to_string(),
        depth: 1,
        text: "Hello, \"quoted\" world".to_string(),
    }];
    let csv = String::from_utf8(render_csv(&text_rows(&pages)).unwrap()).unwrap();
    assert!(csv.contains(r#""Hello, ""quoted"" world""#));
}

#[test]
fn test_render_json() {
    let json = render_json(&to_rows(&sample_edges())).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert!(value["generated_at"].is_string());
    assert_eq!(value["columns"][3], "Depth Level");
    assert_eq!(value["rows"][0]["Depth - 2 URL"], "");
    assert_eq!(value["rows"][1]["Depth Level"], "2");
}

// ============================================================================
// File Output Tests
// ============================================================================

#[test]
fn test_write_table_csv() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("edges.csv");

    write_table(&to_rows(&sample_edges()), &path, ExportFormat::Csv)?;

    let content = fs::read_to_string(&path)?;
    assert!(content.starts_with("Base URL,"));
    assert_eq!(content.lines().count(), 3);
    Ok(())
}

#[test]
fn test_write_table_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("edges.json");

    write_table(&to_rows(&sample_edges()), &path, ExportFormat::Json)?;

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(value["rows"].as_array().map(|r| r.len()), Some(2));
    Ok(())
}

#[test]
fn test_render_xlsx_is_a_zip_container() {
    let bytes = render_xlsx(&to_rows(&sample_edges())).unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[test]
fn test_write_table_xlsx() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("combined_extracted_urls.xlsx");

    write_table(&to_rows(&sample_edges()), &path, ExportFormat::Xlsx)?;

    let mut workbook: Xlsx<_> = open_workbook(&path)?;
    assert_eq!(workbook.sheet_names().len(), 1);
    let range = workbook
        .worksheet_range_at(0)
        .ok_or("workbook has no sheet")??;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], EDGE_COLUMNS.to_vec());
    assert_eq!(rows[1][1], "http://example.com/a");
    assert_eq!(rows[1][3], "1");
    assert_eq!(rows[2][2], "http://example.com/a/b");
    Ok(())
}

#[test]
fn test_write_table_unwritable_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("edges.csv");

    let err = write_table(&to_rows(&sample_edges()), &path, ExportFormat::Csv).unwrap_err();
    assert!(matches!(err, CoreError::Export { .. }));
    assert!(err.to_string().contains("edges.csv"));
}
