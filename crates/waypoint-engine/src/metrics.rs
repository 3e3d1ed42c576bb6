use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;

/// Engine-lifetime counters and per-step timings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    /// Steps whose action completed successfully.
    pub steps_executed: u64,
    /// Wrapped failures, counted under either error policy.
    pub errors: u64,
    /// Duration of the most recent successful action of each step.
    pub execution_times: BTreeMap<String, Duration>,
}

impl Metrics {
    /// Last recorded duration of a step, in milliseconds.
    pub fn execution_time_ms(&self, step: &str) -> Option<u128> {
        self.execution_times.get(step).map(|d| d.as_millis())
    }
}

/// Shared metrics store owned by one engine.
///
/// Updates from concurrent runs interleave; the lock is held only for a
/// single counter update, never across a step.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    inner: Mutex<Metrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully executed step. Revisiting a step overwrites
    /// its previous timing.
    pub fn record_step(&self, step: &str, elapsed: Duration) {
        let mut metrics = self.lock();
        metrics.steps_executed += 1;
        metrics.execution_times.insert(step.to_string(), elapsed);
    }

    pub fn record_error(&self) {
        self.lock().errors += 1;
    }

    /// Read-only snapshot of the current counters.
    pub fn snapshot(&self) -> Metrics {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Metrics> {
        // Counters stay meaningful even if a holder panicked
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
