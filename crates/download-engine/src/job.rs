//! Processing of a single entry, from download to stamped file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use keepsake_common::{CancelFlag, RunConfig};
use keepsake_export_model::{AssetKind, MemoryEntry};
use keepsake_processing_core::{
    resolve_bundle, ArchiveBundle, ArchiveError, AssetOrigin, PathPlanner, PayloadKind,
};
use keepsake_render_engine::{
    composite_image, composite_video, stamp_asset, CompositeError, VideoOverlayBackend,
};

use crate::fetch::{FetchError, Fetcher};

/// Everything a worker needs; shared read-only by all workers of a run.
pub struct JobContext {
    pub config: RunConfig,
    pub planner: PathPlanner,
    pub fetcher: Arc<dyn Fetcher>,
    pub video: Arc<dyn VideoOverlayBackend>,
    pub cancel: CancelFlag,
}

/// What happened to the overlay of a written asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayResult {
    /// The download was a finished asset, not a bundle.
    NotBundled,
    /// The bundle carried no overlay; the base was written as-is.
    BaseOnly,
    /// Overlay present but compositing is disabled for this kind.
    Skipped,
    /// Overlay composited onto the base.
    Applied,
    /// Overlay could not be decoded; the base was written as-is.
    Degraded,
}

/// Why a job produced no output.
#[derive(Debug, thiserror::Error)]
pub enum JobFailure {
    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Overlay compositing failed: {0}")]
    Composite(CompositeError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub enum JobOutcome {
    Written {
        path: PathBuf,
        overlay: OverlayResult,
    },
    Failed {
        reason: JobFailure,
    },
}

/// Result of one job; exactly one is emitted per entry.
#[derive(Debug)]
pub struct JobReport {
    /// Position of the entry in the export document.
    pub index: usize,
    pub entry: Arc<MemoryEntry>,
    pub outcome: JobOutcome,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Written { .. })
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match &self.outcome {
            JobOutcome::Written { .. } => None,
            JobOutcome::Failed { reason } => Some(reason),
        }
    }
}

/// Download, recombine, persist and stamp one entry.
pub fn process_entry(index: usize, entry: Arc<MemoryEntry>, ctx: &JobContext) -> JobReport {
    let outcome = match run_job(&entry, ctx) {
        Ok((path, overlay)) => JobOutcome::Written { path, overlay },
        Err(reason) => JobOutcome::Failed { reason },
    };
    JobReport {
        index,
        entry,
        outcome,
    }
}

fn run_job(entry: &MemoryEntry, ctx: &JobContext) -> Result<(PathBuf, OverlayResult), JobFailure> {
    if ctx.cancel.is_cancelled() {
        return Err(JobFailure::Cancelled);
    }

    let payload = ctx.fetcher.fetch(&entry.url, &ctx.cancel).map_err(|err| match err {
        FetchError::Cancelled => JobFailure::Cancelled,
        other => JobFailure::Fetch(other),
    })?;

    let (path, overlay) = match PayloadKind::of(&payload) {
        PayloadKind::Asset => {
            let path = ctx.planner.asset_path(entry, AssetOrigin::Plain);
            write_file(&path, &payload)?;
            (path, OverlayResult::NotBundled)
        }
        PayloadKind::Archive => {
            if ctx.config.keep_archives {
                let archive_path = ctx.planner.archive_path(entry);
                if let Err(err) = write_file(&archive_path, &payload) {
                    tracing::warn!(error = %err, "Failed to keep archive");
                }
            }

            let bundle = resolve_bundle(&payload, ctx.config.duplicate_policy)?;
            let (bytes, overlay) = recombine(entry, bundle, ctx)?;
            let path = ctx.planner.asset_path(entry, AssetOrigin::Bundle);
            write_file(&path, &bytes)?;
            (path, overlay)
        }
    };

    stamp_asset(&path, entry);
    tracing::debug!(path = %path.display(), ?overlay, "Wrote asset");
    Ok((path, overlay))
}

/// Produce the final bytes of a bundle.
fn recombine(
    entry: &MemoryEntry,
    bundle: ArchiveBundle,
    ctx: &JobContext,
) -> Result<(Vec<u8>, OverlayResult), JobFailure> {
    let base = bundle.base.bytes;
    let Some(overlay) = bundle.overlay else {
        return Ok((base, OverlayResult::BaseOnly));
    };

    let skip = match entry.kind {
        AssetKind::Image => ctx.config.skip_image_overlay,
        AssetKind::Video => ctx.config.skip_video_overlay,
    };
    if skip {
        return Ok((base, OverlayResult::Skipped));
    }

    match entry.kind {
        AssetKind::Image => match composite_image(&base, &overlay.bytes) {
            Ok(bytes) => Ok((bytes, OverlayResult::Applied)),
            Err(err) => {
                if err.is_decode() {
                    tracing::warn!(
                        url = %entry.url,
                        error = %err,
                        "Bundle image could not be decoded, keeping base image"
                    );
                } else {
                    tracing::warn!(
                        url = %entry.url,
                        error = %err,
                        "Image overlay failed, keeping base image"
                    );
                }
                Ok((base, OverlayResult::Degraded))
            }
        },
        AssetKind::Video => {
            match composite_video(ctx.video.as_ref(), &base, &overlay.bytes, &ctx.cancel) {
                Ok(bytes) => Ok((bytes, OverlayResult::Applied)),
                Err(CompositeError::Cancelled) => Err(JobFailure::Cancelled),
                Err(err) => {
                    tracing::warn!(
                        url = %entry.url,
                        backend = ctx.video.name(),
                        error = %err,
                        "Video overlay failed"
                    );
                    Err(JobFailure::Composite(err))
                }
            }
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), JobFailure> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)
    };
    write().map_err(|source| JobFailure::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use keepsake_common::RunDefaults;
    use keepsake_processing_core::DateTemplate;
    use keepsake_render_engine::FfmpegBackend;

    struct FixedFetcher(Vec<u8>);

    impl Fetcher for FixedFetcher {
        fn fetch(&self, _url: &str, _cancel: &CancelFlag) -> Result<Vec<u8>, FetchError> {
            Ok(self.0.clone())
        }
    }

    fn context(root: &Path, payload: &[u8]) -> JobContext {
        let mut config = RunConfig::from_defaults("memories.html", &RunDefaults::default());
        config.output_root = root.to_path_buf();
        JobContext {
            planner: PathPlanner::new(root, DateTemplate::default()),
            config,
            fetcher: Arc::new(FixedFetcher(payload.to_vec())),
            video: Arc::new(FfmpegBackend::with_binaries("keepsake-no-ffmpeg", "keepsake-no-ffprobe")),
            cancel: CancelFlag::new(),
        }
    }

    fn entry(label: &str) -> Arc<MemoryEntry> {
        Arc::new(MemoryEntry::new(
            Utc.with_ymd_and_hms(2023, 10, 27, 10, 0, 0).unwrap(),
            label,
            "",
            "https://example.com/a",
        ))
    }

    #[test]
    fn test_plain_payload_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), b"\x00\x00\x00\x18ftypmp42 video");

        let report = process_entry(3, entry("Video"), &ctx);
        assert_eq!(report.index, 3);
        let JobOutcome::Written { path, overlay } = &report.outcome else {
            panic!("expected a written asset, got {:?}", report.outcome);
        };
        assert_eq!(*overlay, OverlayResult::NotBundled);
        assert_eq!(*path, dir.path().join("2023/10/Video 27-Oct-2023 10-00-00.mp4"));
        assert_eq!(std::fs::read(path).unwrap(), b"\x00\x00\x00\x18ftypmp42 video");
    }

    #[test]
    fn test_cancelled_job_does_no_io() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), b"payload");
        ctx.cancel.cancel();

        let report = process_entry(0, entry("Image"), &ctx);
        assert!(matches!(report.failure(), Some(JobFailure::Cancelled)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unreadable_archive_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), b"PK\x03\x04 truncated");

        let report = process_entry(0, entry("Image"), &ctx);
        assert!(matches!(report.failure(), Some(JobFailure::Archive(_))));
        assert!(!report.is_success());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
