//! Keepsake Common Utilities
//!
//! Shared infrastructure for all Keepsake crates:
//! - Error types and result aliases
//! - Cooperative cancellation flag
//! - Run clock for throughput and ETA calculations
//! - Tracing/logging initialization
//! - Configuration loading and the immutable per-run configuration

pub mod cancel;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use cancel::CancelFlag;
pub use clock::*;
pub use config::*;
pub use error::*;
