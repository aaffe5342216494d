//! Fixed-period tick scheduler for Gamehall game sessions.
//!
//! Every running room owns one [`TickScheduler`]. The session loop awaits
//! [`TickScheduler::wait_for_tick`], does its work, then reports the end of
//! the tick with [`TickScheduler::record_tick_end`]:
//!
//! ```ignore
//! loop {
//!     let tick = scheduler.wait_for_tick().await;
//!     let outcome = engine.on_tick(&state, tick.elapsed);
//!     scheduler.record_tick_end();
//! }
//! ```
//!
//! Deadlines are absolute (`sleep_until`): work done inside a tick is taken
//! out of the following sleep. A tick that fires late is never made up
//! for; the next deadline is a full period after the late one, so a stalled
//! room resumes at its normal pace instead of bursting.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Ticks per second, clamped to `1..=MAX_TICK_RATE_HZ`. Default: 20,
    /// one tick every 50 ms.
    pub tick_rate_hz: u32,
    /// Fraction of the period a tick's work may use before it is logged
    /// as slow. Default: 0.8.
    pub slow_tick_ratio: f64,
    /// Upper bound of the random delay added before the first tick, so
    /// rooms started together don't tick in lockstep. 0 disables it.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: Self::DEFAULT_TICK_RATE_HZ,
            slow_tick_ratio: 0.8,
            initial_jitter_us: 2_000,
        }
    }
}

impl TickConfig {
    pub const DEFAULT_TICK_RATE_HZ: u32 = 20;
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Tests use `jitter_us(0)` for exact timing.
    pub fn jitter_us(mut self, initial_jitter_us: u64) -> Self {
        self.initial_jitter_us = initial_jitter_us;
        self
    }

    fn clamped(mut self) -> Self {
        let rate = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        if rate != self.tick_rate_hz {
            warn!(requested = self.tick_rate_hz, rate, "tick rate out of range");
            self.tick_rate_hz = rate;
        }
        self.slow_tick_ratio = self.slow_tick_ratio.clamp(0.0, 1.0);
        self
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

/// One fired tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Starts at 1.
    pub tick: u64,
    /// Time since the previous tick, or since the scheduler was created
    /// for the first one.
    pub elapsed: Duration,
    /// Fired more than a tenth of a period after its deadline.
    pub late: bool,
}

/// Counters a room can report when it finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub ticks: u64,
    pub late_ticks: u64,
    /// Ticks whose work went past `slow_tick_ratio` of the period.
    pub slow_ticks: u64,
    pub longest_work: Duration,
}

// ---------------------------------------------------------------------------
// TickScheduler
// ---------------------------------------------------------------------------

pub struct TickScheduler {
    config: TickConfig,
    period: Duration,
    deadline: Instant,
    previous: Instant,
    /// Set by `wait_for_tick`, taken by `record_tick_end`.
    started: Option<Instant>,
    stats: TickStats,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.clamped();
        let period = config.period();
        let jitter = match config.initial_jitter_us {
            0 => Duration::ZERO,
            max => Duration::from_micros(rand::rng().random_range(0..max)),
        };
        let now = Instant::now();
        debug!(rate_hz = config.tick_rate_hz, period_ms = period.as_millis() as u64, "tick scheduler created");

        Self {
            config,
            period,
            deadline: now + period + jitter,
            previous: now,
            started: None,
            stats: TickStats::default(),
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Sleeps until the next deadline.
    pub async fn wait_for_tick(&mut self) -> Tick {
        time::sleep_until(self.deadline).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(self.deadline);
        let late = late_by > self.period / 10;
        let elapsed = now.saturating_duration_since(self.previous);

        self.stats.ticks += 1;
        if late {
            self.stats.late_ticks += 1;
            warn!(
                tick = self.stats.ticks,
                late_ms = late_by.as_millis() as u64,
                "tick fired late"
            );
            self.deadline = now + self.period;
        } else {
            self.deadline += self.period;
        }
        self.previous = now;
        self.started = Some(now);
        trace!(tick = self.stats.ticks, "tick");

        Tick {
            tick: self.stats.ticks,
            elapsed,
            late,
        }
    }

    /// Marks the current tick's work done. No-op between ticks.
    pub fn record_tick_end(&mut self) {
        let Some(started) = self.started.take() else {
            return;
        };
        let work = started.elapsed();
        self.stats.longest_work = self.stats.longest_work.max(work);

        if work.as_secs_f64() >= self.period.as_secs_f64() * self.config.slow_tick_ratio {
            self.stats.slow_ticks += 1;
            warn!(
                tick = self.stats.ticks,
                work_ms = work.as_millis() as u64,
                period_ms = self.period.as_millis() as u64,
                "slow tick"
            );
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.stats.ticks
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}
