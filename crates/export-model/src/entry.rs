//! Memory entries as they appear in an export document.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Signed decimal or integer tokens inside free-text location fields.
static NUMERIC_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?(?:\d*\.\d+|\d+)").expect("numeric token pattern is valid")
});

/// Kind of asset an entry resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Video,
}

impl AssetKind {
    /// Derive the kind from an export media-type label.
    pub fn from_label(label: &str) -> Self {
        if label.contains("Video") {
            Self::Video
        } else {
            Self::Image
        }
    }

    /// File extension (with leading dot) of the finished asset.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Image => ".jpg",
            Self::Video => ".mp4",
        }
    }

    /// Sub-directory name used under `overlays/`.
    pub fn overlay_dir(self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Video => "videos",
        }
    }
}

/// Capture location, kept as the numeric tokens found in the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: String,
    pub longitude: String,
}

impl Coordinates {
    /// Extract the first two numeric tokens of a free-text location.
    ///
    /// Returns `None` when fewer than two tokens are present, so latitude
    /// and longitude are always both set or both absent.
    pub fn from_text(text: &str) -> Option<Self> {
        let mut tokens = NUMERIC_TOKEN.find_iter(text).map(|m| m.as_str());
        let latitude = tokens.next()?;
        let longitude = tokens.next()?;
        Some(Self {
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
        })
    }

    /// Decimal degrees; tokens that fail to parse read as zero.
    pub fn degrees(&self) -> (f64, f64) {
        (
            self.latitude.parse().unwrap_or(0.0),
            self.longitude.parse().unwrap_or(0.0),
        )
    }
}

/// A single exported record pending download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Capture time in UTC.
    pub capture_time: DateTime<Utc>,

    /// Trimmed media-type label (e.g. "Image", "Video").
    pub media_type: String,

    /// Optional capture location.
    pub coordinates: Option<Coordinates>,

    /// Download URL.
    pub url: String,

    /// Asset kind derived from the label.
    pub kind: AssetKind,
}

impl MemoryEntry {
    /// Build an entry, deriving the asset kind from the raw label.
    pub fn new(
        capture_time: DateTime<Utc>,
        raw_label: &str,
        location_text: &str,
        url: impl Into<String>,
    ) -> Self {
        Self {
            capture_time,
            media_type: raw_label.trim().to_string(),
            coordinates: Coordinates::from_text(location_text),
            url: url.into(),
            kind: AssetKind::from_label(raw_label),
        }
    }

    /// File extension of the finished asset.
    pub fn extension(&self) -> &'static str {
        self.kind.extension()
    }
}
