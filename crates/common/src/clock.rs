//! Run clock used for throughput and ETA reporting.

use std::time::{Duration, Instant};

/// A monotonic clock anchored to the start of a run.
#[derive(Debug, Clone)]
pub struct RunClock {
    epoch: Instant,
}

impl RunClock {
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Time elapsed since the run started.
    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Format a duration as `1h02m03s`, `2m05s` or `7s`, rounded to whole seconds.
pub fn format_eta(duration: Duration) -> String {
    let total = duration.as_secs_f64().round() as u64;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h{minutes:02}m{seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed_is_monotonic() {
        let clock = RunClock::start();
        let first = clock.elapsed();
        assert!(clock.elapsed() >= first);
        assert!(first < Duration::from_secs(1));
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(Duration::from_secs(0)), "0s");
        assert_eq!(format_eta(Duration::from_millis(7_400)), "7s");
        assert_eq!(format_eta(Duration::from_secs(125)), "2m05s");
        assert_eq!(format_eta(Duration::from_secs(3723)), "1h02m03s");
    }
}
