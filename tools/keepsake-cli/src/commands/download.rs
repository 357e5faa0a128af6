//! Download every memory of an export.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use keepsake_common::config::{
    clamp_concurrency, DuplicatePolicy, FailurePolicy, RunConfig, RunDefaults,
};
use keepsake_common::{format_eta, KeepsakeError};
use keepsake_download_engine::{CancelFlag, Pipeline, RunSummary};
use keepsake_export_model::parse_export_file;
use keepsake_render_engine::{FfmpegBackend, VideoOverlayBackend};

const BAR_WIDTH: usize = 30;

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Export document (.html or .json)
    pub input: PathBuf,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of parallel downloads (default: one per CPU core)
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Keep image bases without compositing overlays
    #[arg(long)]
    pub skip_image_overlay: bool,

    /// Keep video bases without compositing overlays
    #[arg(long)]
    pub skip_video_overlay: bool,

    /// Also save the original ZIP bundles
    #[arg(long)]
    pub keep_archives: bool,

    /// File-name timestamp template, e.g. YYYYMMDD_HHMMSS
    #[arg(long, value_name = "TEMPLATE")]
    pub date_format: Option<String>,

    /// Per-request timeout
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Fail the command if any download fails
    #[arg(long)]
    pub strict: bool,

    /// Prefer the first archive member of each role instead of the last
    #[arg(long)]
    pub first_match_wins: bool,
}

impl DownloadArgs {
    /// Merge flags over persisted defaults. Flags can only switch behavior
    /// on; they never turn off something the config enables.
    pub fn into_run_config(self, defaults: &RunDefaults) -> RunConfig {
        let mut config = RunConfig::from_defaults(self.input, defaults);

        if let Some(output) = self.output {
            config.output_root = output;
        }
        if self.concurrency.is_some() {
            config.concurrency = clamp_concurrency(self.concurrency);
        }
        config.skip_image_overlay |= self.skip_image_overlay;
        config.skip_video_overlay |= self.skip_video_overlay;
        config.keep_archives |= self.keep_archives;
        if let Some(format) = self.date_format.filter(|f| !f.is_empty()) {
            config.date_format = Some(format);
        }
        if let Some(secs) = self.timeout {
            config.fetch_timeout = Some(Duration::from_secs(secs));
        }
        if self.strict {
            config.failure_policy = FailurePolicy::Surface;
        }
        if self.first_match_wins {
            config.duplicate_policy = DuplicatePolicy::FirstWins;
        }
        config
    }
}

pub async fn run(args: DownloadArgs, defaults: &RunDefaults) -> anyhow::Result<()> {
    let config = args.into_run_config(defaults);

    let entries = parse_export_file(&config.input_path).map_err(KeepsakeError::from)?;
    println!(
        "Found {} memories in {}",
        entries.len(),
        config.input_path.display()
    );
    if entries.is_empty() {
        println!("Nothing to download.");
        return Ok(());
    }

    if !config.skip_video_overlay && !FfmpegBackend::new().is_available() {
        tracing::warn!("ffmpeg not found in PATH; video overlays will fail");
    }

    println!("  Output: {}", config.output_root.display());
    println!("  Workers: {}", config.concurrency);

    let cancel = CancelFlag::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, finishing in-flight downloads");
                cancel.cancel();
            }
        })
    };

    let policy = config.failure_policy;
    let output_root = config.output_root.clone();

    // The blocking HTTP client must live outside the async context.
    let summary = tokio::task::spawn_blocking(move || -> anyhow::Result<RunSummary> {
        let pipeline = Pipeline::with_defaults(config)?.with_cancel(cancel);
        let summary = pipeline.run_with_observer(entries, |_, snapshot| {
            print!("\r  {}   ", snapshot.render_bar(BAR_WIDTH));
            let _ = std::io::stdout().flush();
        });
        println!();
        Ok(summary)
    })
    .await
    .context("Download workers panicked")??;
    interrupt.abort();

    print_summary(&summary, &output_root);
    summary.into_result(policy)?;
    Ok(())
}

fn print_summary(summary: &RunSummary, output_root: &std::path::Path) {
    println!(
        "Done in {}: {} written, {} failed",
        format_eta(summary.elapsed),
        summary.written,
        summary.failed
    );
    if summary.degraded > 0 {
        println!("  {} written without their overlay", summary.degraded);
    }
    if summary.cancelled > 0 {
        println!("  {} skipped after interruption", summary.cancelled);
    }
    println!("  Library: {}", output_root.display());
}
