//! Capture metadata stamping for finished images.
//!
//! EXIF is built with `little_exif` and spliced into the JPEG APP1 segment
//! with `img-parts`, so files that carried no EXIF before get a fresh block.
//! Every step is best-effort from the caller's point of view: see
//! [`stamp_asset`].

use std::fs::{FileTimes, OpenOptions};
use std::panic;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use img_parts::jpeg::Jpeg;
use img_parts::ImageEXIF;
use keepsake_export_model::{AssetKind, MemoryEntry};
use little_exif::exif_tag::ExifTag;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;
use little_exif::rational::uR64;

/// EXIF date layout.
const EXIF_DATE_LAYOUT: &str = "%Y:%m:%d %H:%M:%S";

/// `FF E1`, two length bytes and `Exif\0\0` precede the TIFF payload.
const APP1_HEADER_SIZE: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("EXIF encoding failed: {message}")]
    Exif { message: String },

    #[error("Not a usable JPEG: {message}")]
    Jpeg { message: String },
}

/// GPS reference letters and absolute DMS rationals for one position.
#[derive(Debug, Clone)]
pub struct GpsPosition {
    pub latitude_ref: &'static str,
    pub latitude: Vec<uR64>,
    pub longitude_ref: &'static str,
    pub longitude: Vec<uR64>,
}

impl GpsPosition {
    /// `None` at exactly (0, 0), which the export uses for "unknown".
    pub fn from_degrees(latitude: f64, longitude: f64) -> Option<Self> {
        if latitude == 0.0 && longitude == 0.0 {
            return None;
        }
        Some(Self {
            latitude_ref: if latitude < 0.0 { "S" } else { "N" },
            latitude: decimal_to_rationals(latitude.abs()),
            longitude_ref: if longitude < 0.0 { "W" } else { "E" },
            longitude: decimal_to_rationals(longitude.abs()),
        })
    }
}

/// Decimal degrees to `[deg/1, min/1, sec*1000/1000]`.
pub fn decimal_to_rationals(decimal: f64) -> Vec<uR64> {
    let decimal = decimal.abs();
    let degrees = decimal.trunc();
    let minutes_full = (decimal - degrees) * 60.0;
    let minutes = minutes_full.trunc();
    let seconds = (minutes_full - minutes) * 60.0;

    vec![
        uR64 {
            nominator: degrees as u32,
            denominator: 1,
        },
        uR64 {
            nominator: minutes as u32,
            denominator: 1,
        },
        uR64 {
            nominator: (seconds * 1000.0).round() as u32,
            denominator: 1000,
        },
    ]
}

/// Write capture dates and, when known, GPS position into a JPEG on disk.
pub fn write_exif(path: &Path, entry: &MemoryEntry) -> Result<(), MetadataError> {
    let io_err = |source: std::io::Error| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    };

    // little_exif can panic on files it does not understand.
    let mut metadata = match panic::catch_unwind(panic::AssertUnwindSafe(|| {
        Metadata::new_from_path(path)
    })) {
        Ok(Ok(existing)) => existing,
        _ => Metadata::new(),
    };

    let stamp = entry.capture_time.format(EXIF_DATE_LAYOUT).to_string();
    metadata.set_tag(ExifTag::ModifyDate(stamp.clone()));
    metadata.set_tag(ExifTag::DateTimeOriginal(stamp.clone()));
    metadata.set_tag(ExifTag::CreateDate(stamp));

    if let Some(coordinates) = &entry.coordinates {
        let (latitude, longitude) = coordinates.degrees();
        if let Some(gps) = GpsPosition::from_degrees(latitude, longitude) {
            metadata.set_tag(ExifTag::GPSLatitudeRef(gps.latitude_ref.to_string()));
            metadata.set_tag(ExifTag::GPSLatitude(gps.latitude));
            metadata.set_tag(ExifTag::GPSLongitudeRef(gps.longitude_ref.to_string()));
            metadata.set_tag(ExifTag::GPSLongitude(gps.longitude));
        }
    }

    let app1 = match panic::catch_unwind(panic::AssertUnwindSafe(|| {
        metadata.as_u8_vec(FileExtension::JPEG)
    })) {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            return Err(MetadataError::Exif {
                message: format!("{e:?}"),
            })
        }
        Err(_) => {
            return Err(MetadataError::Exif {
                message: "encoder panicked".to_string(),
            })
        }
    };
    if app1.len() <= APP1_HEADER_SIZE {
        return Err(MetadataError::Exif {
            message: "encoded block is empty".to_string(),
        });
    }

    let original = std::fs::read(path).map_err(io_err)?;
    let mut jpeg = Jpeg::from_bytes(original.into()).map_err(|e| MetadataError::Jpeg {
        message: e.to_string(),
    })?;
    jpeg.set_exif(Some(app1[APP1_HEADER_SIZE..].to_vec().into()));

    let mut output = Vec::new();
    jpeg.encoder().write_to(&mut output).map_err(io_err)?;
    std::fs::write(path, output).map_err(io_err)
}

/// Set both access and modification time of a file.
pub fn set_file_times(path: &Path, time: DateTime<Utc>) -> std::io::Result<()> {
    let time: SystemTime = time.into();
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_times(FileTimes::new().set_accessed(time).set_modified(time))
}

/// Stamp a written asset with its capture metadata.
///
/// Only images are touched. Failures are logged and never propagate: the
/// asset is already on disk and stays valid without its metadata.
pub fn stamp_asset(path: &Path, entry: &MemoryEntry) {
    if entry.kind != AssetKind::Image {
        return;
    }

    if let Err(err) = write_exif(path, entry) {
        tracing::debug!(path = %path.display(), error = %err, "Skipping EXIF update");
    }
    if let Err(err) = set_file_times(path, entry.capture_time) {
        tracing::warn!(path = %path.display(), error = %err, "Failed to set file times");
    }
}
