//! Keepsake Export Model
//!
//! Defines the data contracts of a memory export:
//! - **Entries:** one [`MemoryEntry`] per exported photo or video
//! - **HTML parser:** lenient, row-by-row table scraping
//! - **JSON parser:** strict, whole-document deserialization
//!
//! The export format is chosen from the input file extension.

pub mod entry;
pub mod html;
pub mod json;

use std::path::{Path, PathBuf};

use keepsake_common::KeepsakeError;

pub use entry::*;
pub use html::{parse_html, strip_tags};
pub use json::parse_json;

/// Supported export document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Html,
    Json,
}

impl ExportFormat {
    /// Pick the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "html" | "htm" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            _ => Err(ParseError::UnsupportedFormat { extension }),
        }
    }
}

/// Parse export content of a known format.
pub fn parse_export(content: &[u8], format: ExportFormat) -> Result<Vec<MemoryEntry>, ParseError> {
    match format {
        ExportFormat::Html => Ok(parse_html(&String::from_utf8_lossy(content))),
        ExportFormat::Json => parse_json(content),
    }
}

/// Read and parse an export document, selecting the parser by extension.
///
/// An empty result is valid and means there is nothing to download.
pub fn parse_export_file(path: impl AsRef<Path>) -> Result<Vec<MemoryEntry>, ParseError> {
    let path = path.as_ref();
    let format = ExportFormat::from_path(path)?;
    let content = std::fs::read(path).map_err(|source| ParseError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    parse_export(&content, format)
}

/// Errors that abort parsing of a whole export document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported export format: '{extension}' (expected .html or .json)")]
    UnsupportedFormat { extension: String },

    #[error("Malformed JSON export: {source}")]
    Json { source: serde_json::Error },

    #[error("Invalid date '{value}' in record {index}: {source}")]
    InvalidDate {
        index: usize,
        value: String,
        source: chrono::ParseError,
    },
}

impl From<ParseError> for KeepsakeError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::UnsupportedFormat { extension } => {
                KeepsakeError::unsupported_input(extension)
            }
            ParseError::IoError { path, source }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                KeepsakeError::FileNotFound { path }
            }
            ParseError::IoError { source, .. } => KeepsakeError::Io(source),
            other => KeepsakeError::parse(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ExportFormat::from_path(Path::new("memories_history.html")).unwrap(),
            ExportFormat::Html
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("export/MEMORIES.JSON")).unwrap(),
            ExportFormat::Json
        );
        assert!(matches!(
            ExportFormat::from_path(Path::new("memories.csv")),
            Err(ParseError::UnsupportedFormat { .. })
        ));
        assert!(ExportFormat::from_path(Path::new("memories")).is_err());
    }

    #[test]
    fn test_missing_file_maps_to_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memories_history.json");
        let err: KeepsakeError = parse_export_file(&path).unwrap_err().into();
        assert!(matches!(err, KeepsakeError::FileNotFound { path: p } if p == path));

        let err: KeepsakeError = parse_export_file(dir.path().join("memories.txt"))
            .unwrap_err()
            .into();
        assert_eq!(err.to_string(), "Unsupported input file type: txt");
    }

    #[test]
    fn test_parse_export_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memories.json");
        std::fs::write(
            &path,
            r#"{"Saved Media":[{"Date":"2023-10-27 10:00:00 UTC","Media Type":"Image","Location":"","Media Download Url":"u"}]}"#,
        )
        .unwrap();

        let entries = parse_export_file(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "u");
    }

    #[test]
    fn test_parse_export_file_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_export_file(dir.path().join("absent.html")).unwrap_err();
        assert!(matches!(err, ParseError::IoError { .. }));
    }
}
