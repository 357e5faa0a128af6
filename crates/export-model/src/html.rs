//! HTML export parser.
//!
//! The HTML export is a table: one `<tr>` per memory with four `<td>` cells
//! in fixed order (capture time, media type, location, download action).
//! Rows that do not fit this shape are skipped individually; a malformed row
//! never aborts the rest of the document.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::entry::MemoryEntry;

static ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<tr>(.*?)</tr>").expect("row pattern is valid"));
static CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<td>(.*?)</td>").expect("cell pattern is valid"));
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
static DOWNLOAD_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"downloadMemories\('([^']+)'").expect("download call pattern is valid")
});

/// Capture time layout once the trailing ` UTC` marker is removed.
pub const HTML_DATE_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Minimum number of cells a row needs to describe an entry.
const REQUIRED_CELLS: usize = 4;

/// Parse every well-formed row of an HTML export, preserving source order.
pub fn parse_html(html: &str) -> Vec<MemoryEntry> {
    let mut entries = Vec::new();
    let mut skipped = 0usize;

    for (row_index, row) in ROW.captures_iter(html).enumerate() {
        match parse_row(&row[1]) {
            Ok(entry) => entries.push(entry),
            Err(reason) => {
                skipped += 1;
                tracing::debug!(row = row_index, reason, "Skipping export row");
            }
        }
    }

    tracing::debug!(entries = entries.len(), skipped, "Parsed HTML export");
    entries
}

fn parse_row(row: &str) -> Result<MemoryEntry, &'static str> {
    let cells: Vec<&str> = CELL
        .captures_iter(row)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if cells.len() < REQUIRED_CELLS {
        return Err("fewer than four cells");
    }

    let date_text = strip_tags(cells[0]);
    let date_text = date_text.trim();
    let date_text = date_text.strip_suffix(" UTC").unwrap_or(date_text);
    let capture_time = NaiveDateTime::parse_from_str(date_text, HTML_DATE_LAYOUT)
        .map_err(|_| "unparsable capture time")?
        .and_utc();

    let label = strip_tags(cells[1]);
    let location = strip_tags(cells[2]);

    let url = DOWNLOAD_CALL
        .captures(cells[3])
        .and_then(|c| c.get(1))
        .ok_or("no download link")?
        .as_str();

    Ok(MemoryEntry::new(capture_time, &label, &location, url))
}

/// Remove every markup tag from a fragment, keeping only its text.
pub fn strip_tags(input: &str) -> String {
    TAG.replace_all(input, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::AssetKind;
    use chrono::{TimeZone, Utc};

    const TWO_ROWS: &str = r##"
        <table>
            <tbody>
                <tr>
                    <td>2023-10-27 10:00:00 UTC</td>
                    <td>Test Type</td>
                    <td>34.052235, -118.243683</td>
                    <td><a href="#" onclick="return downloadMemories('http://example.com/memory1.jpg')">Download</a></td>
                </tr>
                <tr>
                    <td>2023-10-28 11:00:00 UTC</td>
                    <td>Test Video</td>
                    <td>40.712776, -74.005974</td>
                    <td><a href="#" onclick="return downloadMemories('http://example.com/memory2.mp4')">Download</a></td>
                </tr>
            </tbody>
        </table>
    "##;

    #[test]
    fn test_parse_html_rows_in_order() {
        let entries = parse_html(TWO_ROWS);
        assert_eq!(entries.len(), 2);

        assert_eq!(
            entries[0].capture_time,
            Utc.with_ymd_and_hms(2023, 10, 27, 10, 0, 0).unwrap()
        );
        assert_eq!(entries[0].media_type, "Test Type");
        assert_eq!(entries[0].kind, AssetKind::Image);
        let coords = entries[0].coordinates.as_ref().unwrap();
        assert_eq!(coords.latitude, "34.052235");
        assert_eq!(coords.longitude, "-118.243683");
        assert_eq!(entries[0].url, "http://example.com/memory1.jpg");

        assert_eq!(entries[1].media_type, "Test Video");
        assert_eq!(entries[1].kind, AssetKind::Video);
        assert_eq!(entries[1].extension(), ".mp4");
        assert_eq!(entries[1].url, "http://example.com/memory2.mp4");
    }

    #[test]
    fn test_malformed_rows_are_skipped_without_aborting() {
        let html = r#"
            <tr><th>Date</th><th>Media Type</th></tr>
            <tr><td>2023-01-01 00:00:00 UTC</td><td>Image</td><td>1.0, 2.0</td></tr>
            <tr>
                <td>yesterday</td><td>Image</td><td></td>
                <td><a onclick="downloadMemories('http://example.com/bad-date')">x</a></td>
            </tr>
            <tr>
                <td>2023-01-02 00:00:00 UTC</td><td>Image</td><td></td>
                <td><a href="http://example.com/no-call">x</a></td>
            </tr>
            <tr>
                <td>2023-01-03 08:30:15 UTC</td><td><b>Image</b></td><td>Unknown</td>
                <td><a onclick="downloadMemories('http://example.com/ok', this, true)">x</a></td>
            </tr>
        "#;

        let entries = parse_html(html);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "http://example.com/ok");
        assert_eq!(entries[0].media_type, "Image");
        assert!(entries[0].coordinates.is_none());
        assert_eq!(
            entries[0].capture_time,
            Utc.with_ymd_and_hms(2023, 1, 3, 8, 30, 15).unwrap()
        );
    }

    #[test]
    fn test_empty_document_yields_no_entries() {
        assert!(parse_html("<html><body>No memories</body></html>").is_empty());
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Hello, <b>world</b>!</p>"), "Hello, world!");
    }
}
