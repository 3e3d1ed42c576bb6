use std::fmt;
use std::future::Future;

use waypoint_core::Result;

use crate::logger::InstanceLogger;
use crate::metrics::MetricsCollector;

/// What happens to a failure raised by a wrapped call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Propagate the failure to the caller of `execute`, aborting the run.
    Rethrow,
    /// Halt the run at the failing step without an error.
    Swallow,
}

impl ErrorPolicy {
    pub fn from_rethrow(rethrow_errors: bool) -> Self {
        if rethrow_errors {
            Self::Rethrow
        } else {
            Self::Swallow
        }
    }
}

/// The externally supplied call being protected.
#[derive(Debug, Clone, Copy)]
pub enum Call<'a> {
    Action(&'a str),
    Conditions,
}

impl fmt::Display for Call<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Call::Action(name) => write!(f, "action {}", name),
            Call::Conditions => f.write_str("condition evaluation"),
        }
    }
}

/// Uniform protected call around every action and condition evaluation.
///
/// A failure is logged with the instance, step and call, counted in
/// metrics, and then either returned as `Err` (rethrow) or turned into
/// `Ok(None)` (swallow) so the engine halts at that step.
pub struct ErrorGuard<'a> {
    policy: ErrorPolicy,
    log: &'a InstanceLogger,
    metrics: &'a MetricsCollector,
}

impl<'a> ErrorGuard<'a> {
    pub fn new(policy: ErrorPolicy, log: &'a InstanceLogger, metrics: &'a MetricsCollector) -> Self {
        Self {
            policy,
            log,
            metrics,
        }
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub async fn call<T, F>(&self, step: &str, call: Call<'_>, fut: F) -> Result<Option<T>>
    where
        F: Future<Output = Result<T>>,
    {
        match fut.await {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                self.log
                    .error(&format!("Error in step {} during {}: {}", step, call, e));
                self.metrics.record_error();
                match self.policy {
                    ErrorPolicy::Rethrow => Err(e),
                    ErrorPolicy::Swallow => Ok(None),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use waypoint_core::WaypointError;
    use waypoint_test_utils::{LogLevel, RecordingLogger};

    fn setup() -> (Arc<RecordingLogger>, InstanceLogger, MetricsCollector) {
        let sink = Arc::new(RecordingLogger::new());
        let log = InstanceLogger::new("guard-test", true, sink.clone());
        (sink, log, MetricsCollector::new())
    }

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(ErrorPolicy::from_rethrow(true), ErrorPolicy::Rethrow);
        assert_eq!(ErrorPolicy::from_rethrow(false), ErrorPolicy::Swallow);
    }

    #[tokio::test]
    async fn test_success_passes_value() {
        let (sink, log, metrics) = setup();
        let guard = ErrorGuard::new(ErrorPolicy::Rethrow, &log, &metrics);

        let out = guard
            .call("s1", Call::Conditions, async { Ok(true) })
            .await
            .unwrap();
        assert_eq!(out, Some(true));
        assert_eq!(metrics.snapshot().errors, 0);
        assert!(sink.entries().is_empty());
    }

    #[tokio::test]
    async fn test_rethrow_counts_and_propagates() {
        let (sink, log, metrics) = setup();
        let guard = ErrorGuard::new(ErrorPolicy::Rethrow, &log, &metrics);

        let err = guard
            .call::<(), _>("pay", Call::Action("charge"), async {
                Err(WaypointError::action("charge", "declined"))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WaypointError::Action { .. }));
        assert_eq!(metrics.snapshot().errors, 1);
        let errors = sink.at(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("[Instance guard-test] Error in step pay during action charge"));
    }

    #[tokio::test]
    async fn test_swallow_returns_none() {
        let (_sink, log, metrics) = setup();
        let guard = ErrorGuard::new(ErrorPolicy::Swallow, &log, &metrics);

        let out = guard
            .call::<bool, _>("s1", Call::Conditions, async {
                Err(WaypointError::UnsupportedOperator("between".into()))
            })
            .await
            .unwrap();
        assert_eq!(out, None);
        assert_eq!(metrics.snapshot().errors, 1);
    }
}
