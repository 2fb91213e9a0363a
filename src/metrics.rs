//! Aggregation and cache counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct EngineMetrics {
    start_time: Instant,
    passes: AtomicU64,
    bets_folded: AtomicU64,
    bets_dropped: AtomicU64,
    rows_produced: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    pass_time_us: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub passes: u64,
    pub bets_folded: u64,
    pub bets_dropped: u64,
    pub rows_produced: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub average_pass_us: u64,
    pub uptime_secs: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            passes: AtomicU64::new(0),
            bets_folded: AtomicU64::new(0),
            bets_dropped: AtomicU64::new(0),
            rows_produced: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            pass_time_us: AtomicU64::new(0),
        }
    }

    /// One completed aggregation pass
    pub fn record_pass(&self, folded: usize, dropped: usize, rows: usize, elapsed: Duration) {
        self.passes.fetch_add(1, Ordering::Relaxed);
        self.bets_folded.fetch_add(folded as u64, Ordering::Relaxed);
        self.bets_dropped.fetch_add(dropped as u64, Ordering::Relaxed);
        self.rows_produced.fetch_add(rows as u64, Ordering::Relaxed);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.pass_time_us.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn average_pass_duration(&self) -> Duration {
        let passes = self.passes.load(Ordering::Relaxed);
        if passes == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.pass_time_us.load(Ordering::Relaxed) / passes)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            bets_folded: self.bets_folded.load(Ordering::Relaxed),
            bets_dropped: self.bets_dropped.load(Ordering::Relaxed),
            rows_produced: self.rows_produced.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            average_pass_us: self.average_pass_duration().as_micros() as u64,
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
