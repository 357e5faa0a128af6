//! JSON export parser.
//!
//! Unlike the HTML export, the JSON document is machine-generated, so a
//! single unparsable date rejects the whole document before any download.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::entry::MemoryEntry;
use crate::ParseError;

/// Capture time layout of the JSON export, including the literal zone.
pub const JSON_DATE_LAYOUT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Debug, Deserialize)]
struct JsonExport {
    #[serde(rename = "Saved Media", default)]
    saved_media: Vec<JsonRecord>,
}

#[derive(Debug, Deserialize)]
struct JsonRecord {
    #[serde(rename = "Date")]
    date: String,

    #[serde(rename = "Media Type", default)]
    media_type: String,

    #[serde(rename = "Location", default)]
    location: String,

    #[serde(rename = "Media Download Url", default)]
    media_download_url: String,
}

/// Parse a JSON export, preserving record order.
pub fn parse_json(content: &[u8]) -> Result<Vec<MemoryEntry>, ParseError> {
    let export: JsonExport =
        serde_json::from_slice(content).map_err(|source| ParseError::Json { source })?;

    let entries = export
        .saved_media
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let capture_time = NaiveDateTime::parse_from_str(&record.date, JSON_DATE_LAYOUT)
                .map_err(|source| ParseError::InvalidDate {
                    index,
                    value: record.date.clone(),
                    source,
                })?
                .and_utc();
            Ok(MemoryEntry::new(
                capture_time,
                &record.media_type,
                &record.location,
                record.media_download_url,
            ))
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    tracing::debug!(entries = entries.len(), "Parsed JSON export");
    Ok(entries)
}
