use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct Counters {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    prices_invalidated: AtomicU64,
    records_tracked: AtomicU64,
    lock_fallbacks: AtomicU64,
}

static COUNTERS: Lazy<Counters> = Lazy::new(Counters::default);

fn add(counter: &AtomicU64, value: u64) {
    counter.fetch_add(value, Ordering::Relaxed);
}

pub fn record_started() {
    add(&COUNTERS.started, 1);
}

pub fn record_succeeded() {
    add(&COUNTERS.succeeded, 1);
}

pub fn record_failed() {
    add(&COUNTERS.failed, 1);
}

pub fn record_invalidated(rows: usize) {
    add(&COUNTERS.prices_invalidated, rows as u64);
}

pub fn record_tracked(records: usize) {
    add(&COUNTERS.records_tracked, records as u64);
}

pub fn record_lock_fallback() {
    add(&COUNTERS.lock_fallbacks, 1);
}

#[derive(Clone, Debug, Default)]
pub struct PropagationMetricsSnapshot {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub prices_invalidated: u64,
    pub records_tracked: u64,
    pub lock_fallbacks: u64,
}

pub fn snapshot() -> PropagationMetricsSnapshot {
    PropagationMetricsSnapshot {
        started: COUNTERS.started.load(Ordering::Relaxed),
        succeeded: COUNTERS.succeeded.load(Ordering::Relaxed),
        failed: COUNTERS.failed.load(Ordering::Relaxed),
        prices_invalidated: COUNTERS.prices_invalidated.load(Ordering::Relaxed),
        records_tracked: COUNTERS.records_tracked.load(Ordering::Relaxed),
        lock_fallbacks: COUNTERS.lock_fallbacks.load(Ordering::Relaxed),
    }
}
