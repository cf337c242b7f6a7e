//! Thin CSV extraction boundary. Reads one spreadsheet export into raw
//! records; all typing decisions beyond "present or not" belong to the
//! normalizer.

use crate::domain::{DatasetKind, FieldValue, RawRecord};
use crate::error::{EtlError, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Region code stamped onto a sales file based on the configured region name,
/// the way the source teams organize their exports.
pub fn region_code_for(region_name: &str) -> Option<&'static str> {
    match region_name.to_lowercase().as_str() {
        "emea" => Some("1"),
        "americas" => Some("2"),
        "asia" | "apac" | "asia_pacific" => Some("4"),
        _ => None,
    }
}

/// Column aliases seen across the teams' exports, mapped to the canonical
/// header each dataset is validated against.
fn canonical_column(name: &str, kind: DatasetKind) -> String {
    let upper = name.trim().to_uppercase();
    let mapped = match (kind, upper.as_str()) {
        (DatasetKind::Sales, "MATERIAL" | "MATERIAL_NO" | "MATERIAL_NUMBER") => "MATERIAL_NBR",
        (DatasetKind::Sales, "SALES_GROSS") => "GROSS_SALES",
        (DatasetKind::Sales, "SALES_NET") => "NET_SALES",
        (DatasetKind::Sales, "REGION" | "REGION_CD") => "REGION_CODE",
        (DatasetKind::Forecast, "MATERIAL" | "MATERIAL_NO" | "MATERIAL_NBR") => "MATERIAL_NUMBER",
        (DatasetKind::Forecast, "FORECAST_VALUE") => "FORECAST_VAL",
        _ => return upper,
    };
    mapped.to_string()
}

fn cell_value(cell: &str) -> FieldValue {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        FieldValue::Missing
    } else {
        FieldValue::Text(trimmed.to_string())
    }
}

/// Read one CSV export into raw records. `region_code` overrides the
/// REGION_CODE column for sales files whose region is known from the config
/// key. An unreadable or empty file is a run-level fault.
pub fn read_csv(
    path: &Path,
    kind: DatasetKind,
    region_code: Option<&str>,
) -> Result<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| canonical_column(h, kind))
        .collect();

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row?;
        let mut fields: HashMap<String, FieldValue> = headers
            .iter()
            .cloned()
            .zip(row.iter().map(cell_value))
            .collect();
        if let Some(code) = region_code {
            fields.insert("REGION_CODE".to_string(), FieldValue::Text(code.to_string()));
        }
        records.push(RawRecord {
            fields,
            source: path.display().to_string(),
            // header is line 1
            line: idx as u64 + 2,
        });
    }

    if records.is_empty() {
        return Err(EtlError::EmptyInput(path.display().to_string()));
    }
    info!(file = %path.display(), dataset = %kind, rows = records.len(), "extracted file");
    Ok(records)
}
