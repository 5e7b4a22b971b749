//! Fixed-interval liveness ticker for Lanyard.
//!
//! Drives the periodic "is the companion still there?" probe with a probe
//! timeout, a jittered first beat and latency metrics.
//!
//! # No overlapping beats
//!
//! The next beat is scheduled from the moment a probe *finishes*, not from
//! when it started, so a slow probe can never overlap the following one.
//!
//! # Disabled mode
//!
//! When `interval` is zero the ticker is disabled and
//! [`Heartbeat::wait_for_beat`] pends forever.
//!
//! # Integration
//!
//! The ticker is designed to sit inside a monitor task:
//!
//! ```ignore
//! loop {
//!     heartbeat.wait_for_beat().await;
//!     match heartbeat.run_probe(provider.check_liveness()).await {
//!         ProbeOutcome::Passed(()) => continue,
//!         ProbeOutcome::Failed(e) => { /* companion lost */ break }
//!         ProbeOutcome::TimedOut(limit) => { /* companion lost */ break }
//!     }
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Full configuration for the liveness ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Time between the end of one probe and the start of the next.
    /// Zero disables the ticker.
    pub interval: Duration,
    /// How long a single probe may take before it counts as failed.
    /// Must be much smaller than `interval`.
    pub timeout: Duration,
    /// Random delay (0..max) added to the *first* beat only.
    pub initial_jitter: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
            initial_jitter: Duration::from_millis(250),
        }
    }
}

impl HeartbeatConfig {
    /// Smallest probe timeout accepted.
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(1);

    /// A config with the given interval and timeout, no jitter.
    pub fn with_interval(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            initial_jitter: Duration::ZERO,
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`Heartbeat::new`]. Rules:
    /// - `timeout` is at least [`Self::MIN_TIMEOUT`].
    /// - `timeout` is at most half of `interval` (unless disabled).
    pub fn validated(mut self) -> Self {
        if self.timeout < Self::MIN_TIMEOUT {
            self.timeout = Self::MIN_TIMEOUT;
        }
        if !self.interval.is_zero() {
            let cap = (self.interval / 2).max(Self::MIN_TIMEOUT);
            if self.timeout > cap {
                warn!(
                    timeout = ?self.timeout,
                    interval = ?self.interval,
                    "liveness timeout exceeds half the interval, clamping"
                );
                self.timeout = cap;
            }
        }
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Beat info and probe outcome
// ---------------------------------------------------------------------------

/// Information about a beat, returned by [`Heartbeat::wait_for_beat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatInfo {
    /// Monotonically increasing beat number (starts at 1).
    pub beat: u64,
}

/// Result of [`Heartbeat::run_probe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome<T, E> {
    Passed(T),
    Failed(E),
    /// The probe did not finish within the configured timeout.
    TimedOut(Duration),
}

impl<T, E> ProbeOutcome<T, E> {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed(_))
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics for probes run through [`Heartbeat::run_probe`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeartbeatMetrics {
    pub total_probes: u64,
    /// Failed or timed-out probes.
    pub total_failures: u64,
    pub last_latency: Duration,
    pub max_latency: Duration,
    /// Exponential moving average of probe latency (α = 0.1).
    pub avg_latency: Duration,
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

/// Fixed-interval liveness ticker. One per monitored session.
pub struct Heartbeat {
    config: HeartbeatConfig,
    beat_count: u64,
    /// When the next beat should fire. `None` when disabled.
    next_beat: Option<Instant>,
    metrics: HeartbeatMetrics,
}

impl Heartbeat {
    /// Create a ticker from config. The first beat is due after one
    /// interval plus a random share of `initial_jitter`.
    pub fn new(config: HeartbeatConfig) -> Self {
        let config = config.validated();

        let next_beat = config.is_enabled().then(|| {
            let max_jitter = config.initial_jitter.as_micros() as u64;
            let jitter = if max_jitter > 0 {
                Duration::from_micros(rand::rng().random_range(0..max_jitter))
            } else {
                Duration::ZERO
            };
            Instant::now() + config.interval + jitter
        });

        if config.is_enabled() {
            debug!(
                interval = ?config.interval,
                timeout = ?config.timeout,
                "heartbeat created"
            );
        } else {
            debug!("heartbeat created disabled (zero interval)");
        }

        Self {
            config,
            beat_count: 0,
            next_beat,
            metrics: HeartbeatMetrics::default(),
        }
    }

    /// Wait until the next beat is due.
    ///
    /// When disabled this future pends forever, which still lets
    /// `tokio::select!` process other branches.
    pub async fn wait_for_beat(&mut self) -> BeatInfo {
        let Some(next) = self.next_beat else {
            return std::future::pending().await;
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        self.beat_count += 1;
        // Provisional; `run_probe` reschedules from the probe's completion.
        self.next_beat = Some(now + self.config.interval);

        trace!(beat = self.beat_count, "heartbeat");

        BeatInfo {
            beat: self.beat_count,
        }
    }

    /// Run one probe under the configured timeout, record its latency and
    /// schedule the next beat one interval after it finished.
    pub async fn run_probe<T, E, F>(&mut self, probe: F) -> ProbeOutcome<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let outcome = match time::timeout(self.config.timeout, probe).await {
            Ok(Ok(value)) => ProbeOutcome::Passed(value),
            Ok(Err(e)) => ProbeOutcome::Failed(e),
            Err(_) => ProbeOutcome::TimedOut(self.config.timeout),
        };
        let finished = Instant::now();
        let latency = finished.saturating_duration_since(started);

        self.record(latency, outcome.is_passed());
        if self.config.is_enabled() {
            self.next_beat = Some(finished + self.config.interval);
        }

        outcome
    }

    fn record(&mut self, latency: Duration, passed: bool) {
        let m = &mut self.metrics;
        m.total_probes += 1;
        if !passed {
            m.total_failures += 1;
        }
        m.last_latency = latency;
        if latency > m.max_latency {
            m.max_latency = latency;
        }
        let alpha = 0.1;
        let prev = m.avg_latency.as_secs_f64();
        m.avg_latency = Duration::from_secs_f64(
            prev * (1.0 - alpha) + latency.as_secs_f64() * alpha,
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    pub fn beat_count(&self) -> u64 {
        self.beat_count
    }

    pub fn metrics(&self) -> &HeartbeatMetrics {
        &self.metrics
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }
}
