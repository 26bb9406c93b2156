//! On-disk encodings of a collection
//!
//! Every format turns a slice of records into bytes and back. The store
//! never looks at the bytes itself.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::types::Record;
use crate::error::{BotError, CatalogError};

/// Supported collection file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageFormat {
    /// Pretty-printed JSON array
    #[serde(rename = "json")]
    Json,
    /// CSV with a header row
    #[serde(rename = "csv")]
    Csv,
    /// One JSON object per line, append-only on insert
    #[serde(rename = "jsonl")]
    JsonLines,
}

impl StorageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            StorageFormat::Json => "json",
            StorageFormat::Csv => "csv",
            StorageFormat::JsonLines => "jsonl",
        }
    }

    /// Whether inserts can append a single encoded record
    pub fn is_append_only(self) -> bool {
        matches!(self, StorageFormat::JsonLines)
    }

    /// Encode a whole collection
    pub fn encode<R: Record>(self, records: &[R]) -> Result<Vec<u8>, CatalogError> {
        let encode_err = |reason: String| CatalogError::Encode {
            kind: R::KIND,
            reason,
        };

        match self {
            StorageFormat::Json => {
                let mut data =
                    serde_json::to_vec_pretty(records).map_err(|e| encode_err(e.to_string()))?;
                data.push(b'\n');
                Ok(data)
            }
            StorageFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                for record in records {
                    writer
                        .serialize(record.to_row())
                        .map_err(|e| encode_err(e.to_string()))?;
                }
                writer
                    .into_inner()
                    .map_err(|e| encode_err(e.to_string()))
            }
            StorageFormat::JsonLines => {
                let mut data = Vec::new();
                for record in records {
                    data.extend(self.encode_line(record)?);
                }
                Ok(data)
            }
        }
    }

    /// Encode one record as an appendable line (JSON lines only)
    pub fn encode_line<R: Record>(self, record: &R) -> Result<Vec<u8>, CatalogError> {
        let mut line = serde_json::to_vec(record).map_err(|e| CatalogError::Encode {
            kind: R::KIND,
            reason: e.to_string(),
        })?;
        line.push(b'\n');
        Ok(line)
    }

    /// Decode a whole collection read from `path`
    pub fn decode<R: Record>(self, path: &Path, data: &[u8]) -> Result<Vec<R>, CatalogError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let records: Vec<R> = match self {
            StorageFormat::Json => {
                serde_json::from_slice(data).map_err(|e| CatalogError::corrupt(path, e))?
            }
            StorageFormat::Csv => {
                let mut reader = csv::Reader::from_reader(data);
                let mut records = Vec::new();
                for row in reader.deserialize::<R::Row>() {
                    let row = row.map_err(|e| CatalogError::corrupt(path, e))?;
                    records.push(R::from_row(row).map_err(|e| CatalogError::corrupt(path, e))?);
                }
                records
            }
            StorageFormat::JsonLines => {
                let text = std::str::from_utf8(data).map_err(|e| CatalogError::corrupt(path, e))?;
                text.lines()
                    .enumerate()
                    .filter(|(_, line)| !line.trim().is_empty())
                    .map(|(n, line)| {
                        serde_json::from_str(line).map_err(|e| {
                            CatalogError::corrupt(path, format!("line {}: {}", n + 1, e))
                        })
                    })
                    .collect::<Result<_, _>>()?
            }
        };

        for record in &records {
            record
                .validate()
                .map_err(|e| CatalogError::corrupt(path, e))?;
        }
        Ok(records)
    }
}

impl std::str::FromStr for StorageFormat {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(StorageFormat::Json),
            "csv" => Ok(StorageFormat::Csv),
            "jsonl" | "log" | "ndjson" => Ok(StorageFormat::JsonLines),
            other => Err(BotError::Config(format!("unknown storage format: {}", other))),
        }
    }
}
