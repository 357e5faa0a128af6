//! Worker pool and report aggregation.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;
use keepsake_common::{CancelFlag, FailurePolicy, KeepsakeError, KeepsakeResult, RunConfig};
use keepsake_export_model::MemoryEntry;
use keepsake_processing_core::{DateTemplate, PathPlanner, ProgressSnapshot, ProgressTracker};
use keepsake_render_engine::{FfmpegBackend, VideoOverlayBackend};

use crate::fetch::{FetchError, Fetcher, HttpFetcher};
use crate::job::{process_entry, JobContext, JobFailure, JobOutcome, JobReport, OverlayResult};

/// Totals of a finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub written: usize,
    pub failed: usize,
    /// Written, but without the overlay that should have been applied.
    pub degraded: usize,
    /// Subset of `failed` that stopped because of cancellation.
    pub cancelled: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    fn record(&mut self, report: &JobReport) {
        match &report.outcome {
            JobOutcome::Written { overlay, .. } => {
                self.written += 1;
                if *overlay == OverlayResult::Degraded {
                    self.degraded += 1;
                }
            }
            JobOutcome::Failed { reason } => {
                self.failed += 1;
                if matches!(reason, JobFailure::Cancelled) {
                    self.cancelled += 1;
                }
            }
        }
    }

    /// Apply the failure policy: under `Surface`, any failed job turns the
    /// run into an error.
    pub fn into_result(self, policy: FailurePolicy) -> KeepsakeResult<Self> {
        if policy == FailurePolicy::Surface && self.failed > 0 {
            return Err(KeepsakeError::pipeline(format!(
                "{} of {} downloads failed",
                self.failed, self.total
            )));
        }
        Ok(self)
    }
}

/// A configured download run.
pub struct Pipeline {
    ctx: JobContext,
}

impl Pipeline {
    pub fn new(
        config: RunConfig,
        fetcher: Arc<dyn Fetcher>,
        video: Arc<dyn VideoOverlayBackend>,
    ) -> Self {
        let planner = PathPlanner::new(
            config.output_root.clone(),
            DateTemplate::from_setting(config.date_format.as_deref()),
        );
        Self {
            ctx: JobContext {
                config,
                planner,
                fetcher,
                video,
                cancel: CancelFlag::new(),
            },
        }
    }

    /// HTTP fetcher and ffmpeg backend.
    pub fn with_defaults(config: RunConfig) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(config.fetch_timeout)?;
        Ok(Self::new(config, Arc::new(fetcher), Arc::new(FfmpegBackend::new())))
    }

    /// Share an externally owned cancellation flag.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.ctx.cancel = cancel;
        self
    }

    pub fn run(&self, entries: Vec<MemoryEntry>) -> RunSummary {
        self.run_with_observer(entries, |_, _| {})
    }

    /// Process every entry and return once all workers have been joined.
    ///
    /// `observer` runs on the calling thread once per report, in completion
    /// order, after the progress tracker has counted it.
    pub fn run_with_observer<F>(&self, entries: Vec<MemoryEntry>, mut observer: F) -> RunSummary
    where
        F: FnMut(&JobReport, &ProgressSnapshot),
    {
        let total = entries.len();
        let mut tracker = ProgressTracker::new(total);
        let mut summary = RunSummary {
            total,
            ..Default::default()
        };
        if total == 0 {
            return summary;
        }

        let workers = self.ctx.config.concurrency.clamp(1, total);
        tracing::info!(
            entries = total,
            workers,
            output = %self.ctx.config.output_root.display(),
            "Starting downloads"
        );

        let (job_tx, job_rx) = bounded::<(usize, Arc<MemoryEntry>)>(total);
        for (index, entry) in entries.into_iter().enumerate() {
            if job_tx.send((index, Arc::new(entry))).is_err() {
                break;
            }
        }
        drop(job_tx);

        let (report_tx, report_rx) = bounded::<JobReport>(total);
        let policy = self.ctx.config.failure_policy;

        thread::scope(|scope| {
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let report_tx = report_tx.clone();
                let ctx = &self.ctx;
                scope.spawn(move || {
                    for (index, entry) in job_rx.iter() {
                        let report = process_entry(index, entry, ctx);
                        if report_tx.send(report).is_err() {
                            break;
                        }
                    }
                    tracing::trace!(worker, "Worker finished");
                });
            }
            drop(report_tx);

            for report in report_rx.iter() {
                tracker.record(report.is_success());
                summary.record(&report);
                if let Some(reason) = report.failure() {
                    log_failure(policy, &report, reason);
                }
                observer(&report, &tracker.snapshot());
            }
        });

        summary.elapsed = tracker.clock().elapsed();
        tracing::info!(
            written = summary.written,
            failed = summary.failed,
            degraded = summary.degraded,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Downloads finished"
        );
        summary
    }
}

fn log_failure(policy: FailurePolicy, report: &JobReport, reason: &JobFailure) {
    match policy {
        FailurePolicy::Swallow => tracing::debug!(
            index = report.index,
            url = %report.entry.url,
            error = %reason,
            "Download failed"
        ),
        FailurePolicy::Surface => tracing::warn!(
            index = report.index,
            url = %report.entry.url,
            error = %reason,
            "Download failed"
        ),
    }
}
