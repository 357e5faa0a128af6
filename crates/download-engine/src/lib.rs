//! Keepsake Download Engine
//!
//! Runs every entry of an export through the download pipeline on a fixed
//! pool of worker threads.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐  bounded queue  ┌──────────────────────────────────────┐
//! │  entries  │ ──────────────▶ │ worker × N                           │
//! └───────────┘                 │  fetch → classify → resolve bundle   │
//!                               │  → composite → write → stamp         │
//!                               └──────────────────┬───────────────────┘
//!                                                  │ JobReport
//!                                                  ▼
//!                               ┌──────────────────────────────────────┐
//!                               │ aggregator (calling thread)          │
//!                               │  ProgressTracker + observer          │
//!                               └──────────────────────────────────────┘
//! ```

pub mod fetch;
pub mod job;
pub mod scheduler;

pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use job::{process_entry, JobContext, JobFailure, JobOutcome, JobReport, OverlayResult};
pub use keepsake_common::CancelFlag;
pub use scheduler::{Pipeline, RunSummary};
