//! Global atomic counters for the recompute loop.
//!
//! Counters are bumped silently at the call site. Call [`Metrics::flush`]
//! to emit the current values as one `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lock-free counters.
pub struct Metrics {
    evaluator_calls: AtomicU64,
    evaluator_failures: AtomicU64,
    fields_kept: AtomicU64,
    fields_created: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            evaluator_calls: AtomicU64::new(0),
            evaluator_failures: AtomicU64::new(0),
            fields_kept: AtomicU64::new(0),
            fields_created: AtomicU64::new(0),
        }
    }

    pub fn inc_evaluator_calls(&self) {
        self.evaluator_calls.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluator_calls", "counter incremented");
    }

    pub fn inc_evaluator_failures(&self) {
        self.evaluator_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluator_failures", "counter incremented");
    }

    /// Add one reconciliation pass's kept/created counts.
    pub fn record_reconcile(&self, kept: usize, created: usize) {
        self.fields_kept.fetch_add(kept as u64, Ordering::Relaxed);
        self.fields_created.fetch_add(created as u64, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            evaluator_calls = self.evaluator_calls(),
            evaluator_failures = self.evaluator_failures(),
            fields_kept = self.fields_kept(),
            fields_created = self.fields_created(),
        );
    }

    pub fn evaluator_calls(&self) -> u64 {
        self.evaluator_calls.load(Ordering::Relaxed)
    }

    pub fn evaluator_failures(&self) -> u64 {
        self.evaluator_failures.load(Ordering::Relaxed)
    }

    pub fn fields_kept(&self) -> u64 {
        self.fields_kept.load(Ordering::Relaxed)
    }

    pub fn fields_created(&self) -> u64 {
        self.fields_created.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.evaluator_calls.store(0, Ordering::Relaxed);
        self.evaluator_failures.store(0, Ordering::Relaxed);
        self.fields_kept.store(0, Ordering::Relaxed);
        self.fields_created.store(0, Ordering::Relaxed);
    }
}
