//! Integration tests for the liveness ticker.
//!
//! Uses `tokio::time::pause()` (via `start_paused`) so sleeps resolve as
//! soon as the runtime is idle and time is fully deterministic.

use std::time::Duration;

use lanyard_heartbeat::{Heartbeat, HeartbeatConfig, ProbeOutcome};
use tokio::time::Instant;

/// Paused time advances in whole timer ticks, so allow a few ms of slack.
fn assert_near(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected ~{expected:?}, got {actual:?}"
    );
}

fn config_1s() -> HeartbeatConfig {
    HeartbeatConfig::with_interval(
        Duration::from_secs(1),
        Duration::from_millis(100),
    )
}

// =========================================================================
// Config
// =========================================================================

#[test]
fn test_default_config_interval_and_timeout() {
    let cfg = HeartbeatConfig::default();
    assert_eq!(cfg.interval, Duration::from_secs(30));
    assert_eq!(cfg.timeout, Duration::from_secs(5));
    assert!(cfg.is_enabled());
}

#[test]
fn test_zero_interval_is_disabled() {
    let hb = Heartbeat::new(HeartbeatConfig::with_interval(
        Duration::ZERO,
        Duration::from_secs(1),
    ));
    assert!(!hb.is_enabled());
}

// =========================================================================
// Beats
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_first_beat_fires_after_one_interval() {
    let start = Instant::now();
    let mut hb = Heartbeat::new(config_1s());

    let info = hb.wait_for_beat().await;

    assert_eq!(info.beat, 1);
    assert_near(start.elapsed(), Duration::from_secs(1));
    assert_eq!(hb.beat_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_jitter_delays_first_beat_within_bound() {
    let start = Instant::now();
    let mut hb = Heartbeat::new(HeartbeatConfig {
        initial_jitter: Duration::from_millis(200),
        ..config_1s()
    });

    hb.wait_for_beat().await;

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_millis(1205));
}

#[tokio::test(start_paused = true)]
async fn test_next_beat_is_scheduled_from_probe_completion() {
    let mut hb = Heartbeat::new(config_1s());

    hb.wait_for_beat().await;
    let outcome = hb
        .run_probe(async {
            tokio::time::sleep(Duration::from_millis(80)).await;
            Ok::<_, ()>(())
        })
        .await;
    assert!(outcome.is_passed());
    let probe_done = Instant::now();

    hb.wait_for_beat().await;

    assert_near(probe_done.elapsed(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_disabled_never_beats() {
    let mut hb = Heartbeat::new(HeartbeatConfig::with_interval(
        Duration::ZERO,
        Duration::from_secs(1),
    ));

    let result =
        tokio::time::timeout(Duration::from_secs(60), hb.wait_for_beat()).await;
    assert!(result.is_err(), "disabled heartbeat should pend forever");
}

// =========================================================================
// Probes
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_probe_failure_is_reported_and_counted() {
    let mut hb = Heartbeat::new(config_1s());

    let outcome = hb.run_probe(async { Err::<(), _>("refused") }).await;

    assert_eq!(outcome, ProbeOutcome::Failed("refused"));
    assert_eq!(hb.metrics().total_probes, 1);
    assert_eq!(hb.metrics().total_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_probe_times_out_at_configured_limit() {
    let mut hb = Heartbeat::new(config_1s());
    let start = Instant::now();

    let outcome: ProbeOutcome<(), ()> =
        hb.run_probe(std::future::pending()).await;

    assert_eq!(outcome, ProbeOutcome::TimedOut(Duration::from_millis(100)));
    assert_near(start.elapsed(), Duration::from_millis(100));
    assert_eq!(hb.metrics().total_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_probe_latency_recorded() {
    let mut hb = Heartbeat::new(config_1s());

    hb.run_probe(async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok::<_, ()>(())
    })
    .await;

    assert_near(hb.metrics().last_latency, Duration::from_millis(30));
    assert_eq!(hb.metrics().max_latency, hb.metrics().last_latency);
}

// =========================================================================
// Integration: monitor loop that stops at the first failed probe
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_monitor_loop_stops_on_first_failure() {
    let mut hb = Heartbeat::new(config_1s());
    let mut probes = 0u32;

    let failed_at = loop {
        let info = hb.wait_for_beat().await;
        probes += 1;
        let n = probes;
        let outcome = hb
            .run_probe(async move { if n == 3 { Err(()) } else { Ok(()) } })
            .await;
        if !outcome.is_passed() {
            break info.beat;
        }
    };

    assert_eq!(failed_at, 3);
    assert_eq!(hb.metrics().total_probes, 3);
    assert_eq!(hb.metrics().total_failures, 1);
}
