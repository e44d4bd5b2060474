//! Global atomic counters for pipeline observability.
//!
//! Counters are incremented at the call site. Call [`Metrics::flush`] to
//! emit the current values as a single `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    turns_started: AtomicU64,
    asset_shortcuts: AtomicU64,
    scripts_rejected: AtomicU64,
    execution_failures: AtomicU64,
    generation_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            turns_started: AtomicU64::new(0),
            asset_shortcuts: AtomicU64::new(0),
            scripts_rejected: AtomicU64::new(0),
            execution_failures: AtomicU64::new(0),
            generation_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_turns(&self) {
        self.turns_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "turns_started", "counter incremented");
    }

    pub fn inc_shortcuts(&self) {
        self.asset_shortcuts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "asset_shortcuts", "counter incremented");
    }

    pub fn inc_rejections(&self) {
        self.scripts_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "scripts_rejected", "counter incremented");
    }

    pub fn inc_execution_failures(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "execution_failures", "counter incremented");
    }

    pub fn inc_generation_failures(&self) {
        self.generation_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "generation_failures", "counter incremented");
    }

    /// Emit all counters as one `info!` event.
    ///
    /// Call at natural boundaries (process exit, history clear) rather than
    /// on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            turns_started = self.turns_started(),
            asset_shortcuts = self.asset_shortcuts(),
            scripts_rejected = self.scripts_rejected(),
            execution_failures = self.execution_failures(),
            generation_failures = self.generation_failures(),
        );
    }

    pub fn turns_started(&self) -> u64 {
        self.turns_started.load(Ordering::Relaxed)
    }

    pub fn asset_shortcuts(&self) -> u64 {
        self.asset_shortcuts.load(Ordering::Relaxed)
    }

    pub fn scripts_rejected(&self) -> u64 {
        self.scripts_rejected.load(Ordering::Relaxed)
    }

    pub fn execution_failures(&self) -> u64 {
        self.execution_failures.load(Ordering::Relaxed)
    }

    pub fn generation_failures(&self) -> u64 {
        self.generation_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.turns_started.store(0, Ordering::Relaxed);
        self.asset_shortcuts.store(0, Ordering::Relaxed);
        self.scripts_rejected.store(0, Ordering::Relaxed);
        self.execution_failures.store(0, Ordering::Relaxed);
        self.generation_failures.store(0, Ordering::Relaxed);
    }
}
