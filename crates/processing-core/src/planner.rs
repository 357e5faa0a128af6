//! Destination path planning.
//!
//! ```text
//! <root>/<YYYY>/<MM>/<label> <timestamp><ext>                      plain asset
//! <root>/overlays/{images|videos}/<YYYY>/<MM>/<label> <timestamp><ext>  from a bundle
//! <root>/overlays/archives/<YYYY>/<MM>/<label> <timestamp>.zip      retained bundle
//! ```
//!
//! Paths depend only on the entry and the template, so re-running an export
//! overwrites the same files.

use std::path::PathBuf;

use chrono::Datelike;
use keepsake_export_model::MemoryEntry;

use crate::date_format::DateTemplate;

const OVERLAYS_DIR: &str = "overlays";
const ARCHIVES_DIR: &str = "archives";

/// Where a finished asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOrigin {
    /// The download was the asset itself.
    Plain,
    /// The asset was rebuilt from a ZIP bundle.
    Bundle,
}

/// Computes deterministic output locations for entries.
#[derive(Debug, Clone)]
pub struct PathPlanner {
    output_root: PathBuf,
    template: DateTemplate,
}

impl PathPlanner {
    pub fn new(output_root: impl Into<PathBuf>, template: DateTemplate) -> Self {
        Self {
            output_root: output_root.into(),
            template,
        }
    }

    /// `<label> <timestamp>` without extension.
    pub fn file_stem(&self, entry: &MemoryEntry) -> String {
        format!(
            "{} {}",
            sanitize_component(&entry.media_type),
            sanitize_component(&self.template.render(&entry.capture_time))
        )
    }

    /// `<label> <timestamp><ext>`.
    pub fn file_name(&self, entry: &MemoryEntry) -> String {
        format!("{}{}", self.file_stem(entry), entry.extension())
    }

    /// Final location of the asset for the given origin.
    pub fn asset_path(&self, entry: &MemoryEntry, origin: AssetOrigin) -> PathBuf {
        let base = match origin {
            AssetOrigin::Plain => self.output_root.clone(),
            AssetOrigin::Bundle => self
                .output_root
                .join(OVERLAYS_DIR)
                .join(entry.kind.overlay_dir()),
        };
        date_dir(base, entry).join(self.file_name(entry))
    }

    /// Location of a retained bundle.
    pub fn archive_path(&self, entry: &MemoryEntry) -> PathBuf {
        let base = self.output_root.join(OVERLAYS_DIR).join(ARCHIVES_DIR);
        date_dir(base, entry).join(format!("{}.zip", self.file_stem(entry)))
    }
}

fn date_dir(base: PathBuf, entry: &MemoryEntry) -> PathBuf {
    let time = entry.capture_time;
    base.join(format!("{:04}", time.year()))
        .join(format!("{:02}", time.month()))
}

/// Replace path separators so a label never escapes its directory.
fn sanitize_component(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(label: &str) -> MemoryEntry {
        MemoryEntry::new(
            Utc.with_ymd_and_hms(2023, 4, 7, 10, 0, 5).unwrap(),
            label,
            "",
            "https://example.com/x",
        )
    }

    #[test]
    fn test_plain_image_path() {
        let planner = PathPlanner::new("/out", DateTemplate::default());
        assert_eq!(
            planner.asset_path(&entry("Image"), AssetOrigin::Plain),
            PathBuf::from("/out/2023/04/Image 07-Apr-2023 10-00-05.jpg")
        );
    }

    #[test]
    fn test_bundle_paths_nest_under_overlays() {
        let planner = PathPlanner::new("/out", DateTemplate::default());
        assert_eq!(
            planner.asset_path(&entry("Image"), AssetOrigin::Bundle),
            PathBuf::from("/out/overlays/images/2023/04/Image 07-Apr-2023 10-00-05.jpg")
        );
        assert_eq!(
            planner.asset_path(&entry("Video"), AssetOrigin::Bundle),
            PathBuf::from("/out/overlays/videos/2023/04/Video 07-Apr-2023 10-00-05.mp4")
        );
    }

    #[test]
    fn test_archive_path() {
        let planner = PathPlanner::new("/out", DateTemplate::parse("YYYYMMDD_HHmmss"));
        assert_eq!(
            planner.archive_path(&entry("Video")),
            PathBuf::from("/out/overlays/archives/2023/04/Video 20230407_100005.zip")
        );
    }

    #[test]
    fn test_separators_in_labels_are_replaced() {
        let planner = PathPlanner::new("/out", DateTemplate::parse("YYYY/MM/DD"));
        assert_eq!(planner.file_name(&entry("a/b")), "a_b 2023_04_07.jpg");
    }

    #[test]
    fn test_paths_are_deterministic() {
        let planner = PathPlanner::new("/out", DateTemplate::default());
        let e = entry("Image");
        assert_eq!(
            planner.asset_path(&e, AssetOrigin::Plain),
            planner.asset_path(&e.clone(), AssetOrigin::Plain)
        );
    }
}
