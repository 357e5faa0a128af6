//! Keepsake Render Engine
//!
//! Turns resolved payloads into finished library files:
//!
//! ```text
//! base + overlay (image) ── decode ── resize overlay ── alpha blend ── JPEG q90
//! base + overlay (video) ── temp files ── ffprobe ── ffmpeg overlay ── MP4
//! written JPEG ───────────── EXIF dates + GPS ── file times
//! ```
//!
//! Video work goes through [`VideoOverlayBackend`] so it can be swapped
//! out where ffmpeg is unavailable.

pub mod image_overlay;
pub mod metadata;
pub mod video_overlay;

pub use image_overlay::{composite_image, JPEG_QUALITY};
pub use metadata::{
    decimal_to_rationals, set_file_times, stamp_asset, write_exif, GpsPosition, MetadataError,
};
pub use video_overlay::{
    command_exists, composite_video, FfmpegBackend, VideoOverlayBackend, FALLBACK_DIMENSIONS,
};

/// Errors from overlay compositing.
#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    #[error("Failed to decode {stream} stream: {source}")]
    Decode {
        stream: &'static str,
        source: image::ImageError,
    },

    #[error("Failed to encode composite: {source}")]
    Encode { source: image::ImageError },

    #[error("Temporary file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: &'static str,
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        status: String,
        stderr: String,
    },

    #[error("Compositing cancelled")]
    Cancelled,
}

impl CompositeError {
    /// True when the inputs could not be decoded, as opposed to a tool or
    /// I/O failure.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
