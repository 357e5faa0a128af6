//! Video overlay compositing through an external encoder.

use std::ffi::OsString;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use keepsake_common::CancelFlag;
use tempfile::NamedTempFile;

use crate::CompositeError;

/// Canvas used when the base video cannot be probed.
pub const FALLBACK_DIMENSIONS: (u32, u32) = (540, 960);

const TEMP_PREFIX: &str = "keepsake-";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Trait for video compositing backends (ffmpeg, test doubles, ...).
pub trait VideoOverlayBackend: Send + Sync {
    /// Width and height of the first video stream, if it can be read.
    fn probe(&self, path: &Path) -> Option<(u32, u32)>;

    /// Scale `overlay` to `dimensions`, draw it over `base` at the origin,
    /// and write the result to `output`.
    fn composite(
        &self,
        base: &Path,
        overlay: &Path,
        dimensions: (u32, u32),
        output: &Path,
        cancel: &CancelFlag,
    ) -> Result<(), CompositeError>;

    /// Check if this backend is usable on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Composite a video bundle held in memory and return the encoded result.
///
/// Both streams are written to uniquely named temporary files that are
/// removed when this function returns, on success or failure.
pub fn composite_video(
    backend: &dyn VideoOverlayBackend,
    base: &[u8],
    overlay: &[u8],
    cancel: &CancelFlag,
) -> Result<Vec<u8>, CompositeError> {
    if cancel.is_cancelled() {
        return Err(CompositeError::Cancelled);
    }

    let base_file = materialize(base, ".mp4")?;
    let overlay_file = materialize(overlay, ".overlay")?;
    let output_file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".mp4")
        .tempfile()?;

    let dimensions = backend.probe(base_file.path()).unwrap_or_else(|| {
        tracing::debug!(
            fallback = ?FALLBACK_DIMENSIONS,
            "Could not probe base video dimensions"
        );
        FALLBACK_DIMENSIONS
    });

    backend.composite(
        base_file.path(),
        overlay_file.path(),
        dimensions,
        output_file.path(),
        cancel,
    )?;

    Ok(std::fs::read(output_file.path())?)
}

fn materialize(bytes: &[u8], suffix: &str) -> Result<NamedTempFile, CompositeError> {
    let mut file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(suffix)
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

/// ffmpeg/ffprobe subprocess backend.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self::with_binaries("ffmpeg", "ffprobe")
    }

    /// Use specific executables instead of the ones on PATH.
    pub fn with_binaries(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn ffprobe_available(&self) -> bool {
        command_exists(&self.ffprobe)
    }
}

impl VideoOverlayBackend for FfmpegBackend {
    fn probe(&self, path: &Path) -> Option<(u32, u32)> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "csv=p=0:s=x",
            ])
            .arg(path)
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }
        parse_dimensions(&String::from_utf8(output.stdout).ok()?)
    }

    fn composite(
        &self,
        base: &Path,
        overlay: &Path,
        dimensions: (u32, u32),
        output: &Path,
        cancel: &CancelFlag,
    ) -> Result<(), CompositeError> {
        let args = overlay_args(base, overlay, dimensions, output);
        tracing::debug!(?args, "Running ffmpeg");

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CompositeError::Spawn {
                tool: "ffmpeg",
                source,
            })?;

        // Drain stderr so ffmpeg never blocks on a full pipe.
        let stderr_task = child.stderr.take().map(|stderr| {
            std::thread::spawn(move || -> String {
                let mut reader = BufReader::new(stderr);
                let mut output = String::new();
                match reader.read_to_string(&mut output) {
                    Ok(_) => output,
                    Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
                }
            })
        });

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if cancel.is_cancelled() {
                tracing::debug!(pid = child.id(), "Killing ffmpeg after cancellation");
                let _ = child.kill();
                let _ = child.wait();
                if let Some(task) = stderr_task {
                    let _ = task.join();
                }
                return Err(CompositeError::Cancelled);
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stderr_output = stderr_task
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default();

        if !status.success() {
            return Err(CompositeError::ToolFailed {
                tool: "ffmpeg",
                status: status.to_string(),
                stderr: last_lines(&stderr_output, 8),
            });
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.ffmpeg)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// ffmpeg arguments for an overlay pass.
fn overlay_args(base: &Path, overlay: &Path, (width, height): (u32, u32), output: &Path) -> Vec<OsString> {
    let filter = format!("[1:v]scale={width}:{height}[ovr];[0:v][ovr]overlay=0:0");
    vec![
        "-i".into(),
        base.into(),
        "-i".into(),
        overlay.into(),
        "-filter_complex".into(),
        filter.into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-c:a".into(),
        "copy".into(),
        output.into(),
        "-y".into(),
    ]
}

/// Parse ffprobe's `WIDTHxHEIGHT` line.
fn parse_dimensions(raw: &str) -> Option<(u32, u32)> {
    let line = raw.lines().next()?.trim();
    let (w, h) = line.split_once('x')?;
    let width = w.parse::<u32>().ok()?;
    let height = h.parse::<u32>().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}

/// Whether an executable is reachable through the shell's PATH lookup.
///
/// The name is passed as a positional parameter, never spliced into the
/// script.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .args(["-c", r#"command -v "$1" >/dev/null 2>&1"#, "sh", binary])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
