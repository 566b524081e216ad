//! Loading seed URLs from a CSV file with a `URL` column.

use crate::error::{CoreError, Result};
use linkdepth_scanner::SeedUrl;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::warn;

pub const URL_COLUMN: &str = "URL";

/// Load seeds from either a CSV file or a single URL argument.
pub fn load_seeds_from_source(url: Option<&str>, input: Option<&Path>) -> Result<Vec<SeedUrl>> {
    if let Some(path) = input {
        load_seeds(path)
    } else if let Some(url) = url {
        parse_seeds(&[url.to_string()])
    } else {
        Err(CoreError::Input(
            "Either --url or --input must be provided".to_string(),
        ))
    }
}

pub fn load_seeds(path: &Path) -> Result<Vec<SeedUrl>> {
    let file = File::open(path).map_err(|e| {
        CoreError::Input(format!("Failed to read seed file {}: {}", path.display(), e))
    })?;

    load_seeds_from_reader(file).map_err(|e| match e {
        CoreError::Input(msg) => CoreError::Input(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Read seeds from CSV. Blank cells are skipped, repeated seeds are kept
/// once, and any cell that is not an absolute http(s) URL fails the load.
pub fn load_seeds_from_reader<R: Read>(reader: R) -> Result<Vec<SeedUrl>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| CoreError::Input(format!("unreadable header row: {}", e)))?
        .clone();

    let column = headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == URL_COLUMN)
        .ok_or_else(|| {
            CoreError::Input(format!(
                "missing '{}' column (found: {})",
                URL_COLUMN,
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })?;

    let mut cells = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = record.map_err(|e| CoreError::Input(format!("row {}: {}", line, e)))?;
        let cell = record.get(column).unwrap_or_default();
        if !cell.is_empty() {
            cells.push((line, cell.to_string()));
        }
    }

    let seeds = validate(cells)?;
    if seeds.is_empty() {
        return Err(CoreError::Input("no seed URLs found".to_string()));
    }
    Ok(seeds)
}

/// Validate raw seed strings; every entry must be an absolute http(s) URL.
pub fn parse_seeds(raw: &[String]) -> Result<Vec<SeedUrl>> {
    let cells = raw
        .iter()
        .enumerate()
        .map(|(idx, seed)| (idx + 1, seed.clone()))
        .collect();
    validate(cells)
}

fn validate(cells: Vec<(usize, String)>) -> Result<Vec<SeedUrl>> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for (line, cell) in cells {
        let seed =
            SeedUrl::parse(&cell).map_err(|e| CoreError::Input(format!("row {}: {}", line, e)))?;
        if seen.insert(seed.as_str().to_string()) {
            seeds.push(seed);
        } else {
            warn!("Skipping repeated seed {} (row {})", seed, line);
        }
    }

    Ok(seeds)
}
