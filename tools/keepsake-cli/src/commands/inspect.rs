//! Summarize an export without downloading.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use keepsake_common::KeepsakeError;
use keepsake_export_model::{parse_export_file, AssetKind, MemoryEntry};
use serde::Serialize;

#[derive(Debug, Default, Serialize, PartialEq)]
struct ExportSummary {
    entries: usize,
    images: usize,
    videos: usize,
    with_location: usize,
    earliest: Option<DateTime<Utc>>,
    latest: Option<DateTime<Utc>>,
}

impl ExportSummary {
    fn from_entries(entries: &[MemoryEntry]) -> Self {
        let mut summary = Self {
            entries: entries.len(),
            ..Default::default()
        };
        for entry in entries {
            match entry.kind {
                AssetKind::Image => summary.images += 1,
                AssetKind::Video => summary.videos += 1,
            }
            if entry.coordinates.is_some() {
                summary.with_location += 1;
            }
        }
        summary.earliest = entries.iter().map(|e| e.capture_time).min();
        summary.latest = entries.iter().map(|e| e.capture_time).max();
        summary
    }
}

pub fn run(input: PathBuf, json: bool) -> anyhow::Result<()> {
    let entries = parse_export_file(&input).map_err(KeepsakeError::from)?;
    let summary = ExportSummary::from_entries(&entries);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Export: {}", input.display());
    println!("  Memories: {}", summary.entries);
    println!("  Images: {}", summary.images);
    println!("  Videos: {}", summary.videos);
    println!("  With location: {}", summary.with_location);
    if let (Some(earliest), Some(latest)) = (summary.earliest, summary.latest) {
        println!(
            "  Range: {} .. {}",
            earliest.format("%Y-%m-%d"),
            latest.format("%Y-%m-%d")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_summary_counts() {
        let day = |d| Utc.with_ymd_and_hms(2023, 5, d, 12, 0, 0).unwrap();
        let entries = vec![
            MemoryEntry::new(day(9), "Image", "1.5, 2.5", "a"),
            MemoryEntry::new(day(2), "Video", "", "b"),
            MemoryEntry::new(day(20), "Image", "", "c"),
        ];

        let summary = ExportSummary::from_entries(&entries);
        assert_eq!(summary.entries, 3);
        assert_eq!(summary.images, 2);
        assert_eq!(summary.videos, 1);
        assert_eq!(summary.with_location, 1);
        assert_eq!(summary.earliest, Some(day(2)));
        assert_eq!(summary.latest, Some(day(20)));
    }

    #[test]
    fn test_empty_export() {
        assert_eq!(ExportSummary::from_entries(&[]), ExportSummary::default());
    }
}
