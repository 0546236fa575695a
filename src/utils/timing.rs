//! Timing utilities
//!
//! Wall-clock access goes through [`Clock`] so cache freshness can be tested
//! without sleeping. [`Timer`] logs how long generation and refresh steps take.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, info, warn};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of "now" for freshness decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A timer for measuring operation durations
#[derive(Debug)]
pub struct Timer {
    start_time: Instant,
    operation_name: String,
    checkpoints: Vec<(String, Instant)>,
}

impl Timer {
    /// Create a new timer for the given operation
    pub fn start(operation_name: &str) -> Self {
        debug!("⏱️ Starting timer for: {}", operation_name);

        Self {
            start_time: Instant::now(),
            operation_name: operation_name.to_string(),
            checkpoints: Vec::new(),
        }
    }

    /// Add a checkpoint to track intermediate timing
    pub fn checkpoint(&mut self, checkpoint_name: &str) {
        let now = Instant::now();
        self.checkpoints.push((checkpoint_name.to_string(), now));

        let elapsed = now.duration_since(self.start_time);
        debug!(
            "📍 {} - {}: {}ms",
            self.operation_name,
            checkpoint_name,
            elapsed.as_millis()
        );
    }

    /// Finish the timer and log the total duration, warning past `threshold`
    pub fn finish_with_threshold(self, threshold: Duration) -> Duration {
        let total_duration = self.start_time.elapsed();

        let mut last_time = self.start_time;
        for (name, time) in &self.checkpoints {
            debug!(
                "   └─ {}: {}ms",
                name,
                time.duration_since(last_time).as_millis()
            );
            last_time = *time;
        }

        if total_duration > threshold {
            warn!(
                "🐌 {} took {}ms (threshold {}ms)",
                self.operation_name,
                total_duration.as_millis(),
                threshold.as_millis()
            );
        } else {
            info!(
                "🕐 {} completed in {}ms",
                self.operation_name,
                total_duration.as_millis()
            );
        }

        total_duration
    }
}
