//! Bulk import transform
//!
//! Turns an uploaded tabular dataset (CSV or JSON) plus a per-request
//! column mapping into respondent-creation rows. Validation is strictly
//! front-loaded: the mapping is checked against the header set before any
//! row is read, and the first bad row aborts the whole import.

use crate::error::{AppError, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Supported dataset formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ImportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ImportFormat::Csv),
            "json" => Ok(ImportFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// A parsed tabular dataset: ordered headers plus rows of named fields
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

/// Which dataset columns hold which respondent fields.
/// Supplied per request; username and password mappings are mandatory.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: String,
    pub password: String,
}

impl ColumnMapping {
    /// Check every named column against the dataset headers before any row
    /// processing begins.
    pub fn validate(&self, headers: &[String]) -> Result<()> {
        let mut named = vec![self.username.as_str(), self.password.as_str()];
        named.extend(self.first_name.as_deref());
        named.extend(self.last_name.as_deref());

        for column in named {
            if !headers.iter().any(|h| h == column) {
                return Err(AppError::Validation(format!(
                    "Mapped column '{}' does not exist in the dataset",
                    column
                )));
            }
        }
        Ok(())
    }
}

/// One row after mapping; password still plain at this stage
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
}

/// Parse raw upload bytes into a dataset
pub fn parse_dataset(bytes: &[u8], format: ImportFormat) -> Result<Dataset> {
    match format {
        ImportFormat::Csv => parse_csv(bytes),
        ImportFormat::Json => parse_json(bytes),
    }
}

fn parse_csv(bytes: &[u8]) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::Validation(format!("Invalid CSV file: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AppError::Validation(format!("Invalid CSV file: {}", e)))?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(Dataset { headers, rows })
}

fn parse_json(bytes: &[u8]) -> Result<Dataset> {
    let records: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_slice(bytes)
        .map_err(|e| AppError::Validation(format!("Invalid JSON file: {}", e)))?;

    // Header order follows first appearance across all records, the way a
    // dataframe would derive its columns.
    let mut headers: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|h| (h.clone(), json_field_to_string(record.get(h))))
                .collect()
        })
        .collect();

    Ok(Dataset { headers, rows })
}

fn json_field_to_string(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Map every dataset row through the column mapping. The first row with an
/// empty username or password aborts the transform with a `Validation`
/// error naming the 1-based row number; nothing is partially produced.
pub fn map_rows(dataset: &Dataset, mapping: &ColumnMapping) -> Result<Vec<MappedRow>> {
    mapping.validate(&dataset.headers)?;

    let mut mapped = Vec::with_capacity(dataset.rows.len());
    for (index, row) in dataset.rows.iter().enumerate() {
        let username = field(row, &mapping.username);
        let password = field(row, &mapping.password);

        if username.is_empty() || password.is_empty() {
            return Err(AppError::Validation(format!(
                "row {}: username and password fields cannot be empty",
                index + 1
            )));
        }

        mapped.push(MappedRow {
            first_name: mapping
                .first_name
                .as_ref()
                .map(|c| field(row, c))
                .unwrap_or_default(),
            last_name: mapping
                .last_name
                .as_ref()
                .map(|c| field(row, c))
                .unwrap_or_default(),
            username,
            password,
        });
    }

    Ok(mapped)
}

fn field(row: &HashMap<String, String>, column: &str) -> String {
    row.get(column).cloned().unwrap_or_default()
}
