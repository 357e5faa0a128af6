//! Keepsake Processing Core
//!
//! Decides what happens to a downloaded payload before anything touches
//! the output library:
//! - **Classify:** plain asset or ZIP bundle, by signature
//! - **Archive:** pick the base and overlay members out of a bundle
//! - **Planner:** deterministic destination paths and file names
//! - **Progress:** completion accounting, throughput, and ETA
//!
//! This crate performs no file or network I/O. All inputs are bytes or
//! entries; all outputs are data.

pub mod archive;
pub mod classify;
pub mod date_format;
pub mod planner;
pub mod progress;

pub use archive::{resolve_bundle, ArchiveBundle, ArchiveError, ArchiveMember};
pub use classify::{is_archive, PayloadKind};
pub use date_format::DateTemplate;
pub use planner::{AssetOrigin, PathPlanner};
pub use progress::{ProgressSnapshot, ProgressTracker};
