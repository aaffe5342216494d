//! Scheduler timing under paused time. `tokio::time::advance` stands in
//! for work done inside a tick.

use std::time::Duration;

use gamehall_tick::{TickConfig, TickScheduler, TickStats};
use tokio::time::Instant;

fn scheduler() -> TickScheduler {
    TickScheduler::new(TickConfig::default().jitter_us(0))
}

#[test]
fn test_config_deserializes_with_defaults() {
    let config: TickConfig = serde_json::from_str(r#"{ "tick_rate_hz": 10 }"#).unwrap();
    assert_eq!(config.tick_rate_hz, 10);
    assert_eq!(config.initial_jitter_us, 2_000);
    assert_eq!(config.slow_tick_ratio, 0.8);
}

#[test]
fn test_zero_rate_runs_at_one_hz() {
    let s = TickScheduler::with_rate(0);
    assert_eq!(s.tick_rate_hz(), 1);
    assert_eq!(s.period(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_ticks_every_50ms_by_default() {
    let mut s = scheduler();
    let start = Instant::now();

    for expected in 1..=4 {
        let tick = s.wait_for_tick().await;
        assert_eq!(tick.tick, expected);
        assert_eq!(tick.elapsed, Duration::from_millis(50));
        assert!(!tick.late);
    }
    assert_eq!(start.elapsed(), Duration::from_millis(200));
    assert_eq!(s.tick_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_work_comes_out_of_the_next_sleep() {
    let mut s = scheduler();
    let start = Instant::now();

    s.wait_for_tick().await;
    tokio::time::advance(Duration::from_millis(20)).await;
    s.record_tick_end();
    s.wait_for_tick().await;

    assert_eq!(start.elapsed(), Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_late_tick_does_not_burst() {
    let mut s = scheduler();

    s.wait_for_tick().await;
    tokio::time::advance(Duration::from_millis(175)).await;
    s.record_tick_end();

    let late = s.wait_for_tick().await;
    assert!(late.late);
    assert_eq!(late.elapsed, Duration::from_millis(175));

    let next = s.wait_for_tick().await;
    assert!(!next.late);
    assert_eq!(next.elapsed, Duration::from_millis(50));
    assert_eq!(s.stats().late_ticks, 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_work_is_counted() {
    let mut s = scheduler();

    s.wait_for_tick().await;
    tokio::time::advance(Duration::from_millis(10)).await;
    s.record_tick_end();
    s.wait_for_tick().await;
    tokio::time::advance(Duration::from_millis(45)).await;
    s.record_tick_end();

    let stats = s.stats();
    assert_eq!(stats.ticks, 2);
    assert_eq!(stats.slow_ticks, 1);
    assert_eq!(stats.longest_work, Duration::from_millis(45));
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_between_ticks_is_noop() {
    let mut s = scheduler();
    s.record_tick_end();
    assert_eq!(s.stats(), TickStats::default());
}
