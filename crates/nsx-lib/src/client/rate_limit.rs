//! Fixed-window call throttle shared by every controller request
//!
//! Once `threshold` calls have been made, the next caller sleeps for the pause
//! duration and the counter starts over. Bursts of exactly `threshold` calls
//! pass freely before each pause.

use crate::observability::ExporterMetrics;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Configuration for the call throttle
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Calls allowed before a pause (default: 30)
    pub threshold: u32,
    /// Whether pausing is enabled at all (default: true)
    pub enabled: bool,
    /// Length of each pause (default: 1 second)
    pub pause: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            threshold: 30,
            enabled: true,
            pause: Duration::from_secs(1),
        }
    }
}

/// Call counter with a blunt pause-and-reset policy
pub struct RateLimiter {
    config: RateLimitConfig,
    calls: Mutex<u32>,
    metrics: ExporterMetrics,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            calls: Mutex::new(0),
            metrics: ExporterMetrics::new(),
        }
    }

    /// Account for one outgoing call, pausing first if the window is full
    ///
    /// The lock is held across the pause so concurrent callers queue behind it.
    pub async fn acquire(&self) {
        let mut calls = self.calls.lock().await;
        if self.config.enabled && *calls >= self.config.threshold {
            debug!(
                event = "rate_limit_pause",
                calls = *calls,
                pause_ms = self.config.pause.as_millis() as u64,
                "Hit rate limit threshold, waiting for controller API to cool down"
            );
            self.metrics.inc_rate_limit_pauses();
            tokio::time::sleep(self.config.pause).await;
            *calls = 0;
        }
        *calls = calls.saturating_add(1);
    }

    /// Calls counted in the current window
    pub async fn calls(&self) -> u32 {
        *self.calls.lock().await
    }
}
