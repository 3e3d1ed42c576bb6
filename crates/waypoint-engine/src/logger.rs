use std::sync::Arc;

use tracing::{error, info, warn};

use waypoint_core::Logger;

/// Default sink: forwards messages to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        info!(target: "waypoint", "{}", message);
    }

    fn warn(&self, message: &str) {
        warn!(target: "waypoint", "{}", message);
    }

    fn error(&self, message: &str) {
        error!(target: "waypoint", "{}", message);
    }
}

/// Logger bound to one engine instance.
///
/// Every message is prefixed with `[Instance <id>]` so interleaved output
/// from several engines can be told apart. When disabled, nothing reaches
/// the sink.
#[derive(Clone)]
pub struct InstanceLogger {
    instance_id: String,
    enabled: bool,
    sink: Arc<dyn Logger>,
}

impl InstanceLogger {
    pub fn new(instance_id: impl Into<String>, enabled: bool, sink: Arc<dyn Logger>) -> Self {
        Self {
            instance_id: instance_id.into(),
            enabled,
            sink,
        }
    }

    /// A logger that drops everything.
    pub fn disabled() -> Self {
        Self::new(String::new(), false, Arc::new(TracingLogger))
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn log(&self, message: &str) {
        if self.enabled {
            self.sink.log(&self.prefixed(message));
        }
    }

    pub fn warn(&self, message: &str) {
        if self.enabled {
            self.sink.warn(&self.prefixed(message));
        }
    }

    pub fn error(&self, message: &str) {
        if self.enabled {
            self.sink.error(&self.prefixed(message));
        }
    }

    fn prefixed(&self, message: &str) -> String {
        format!("[Instance {}] {}", self.instance_id, message)
    }
}

impl std::fmt::Debug for InstanceLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceLogger")
            .field("instance_id", &self.instance_id)
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_test_utils::{LogLevel, RecordingLogger};

    #[test]
    fn test_prefixes_instance_id() {
        let sink = Arc::new(RecordingLogger::new());
        let log = InstanceLogger::new("abc123", true, sink.clone());

        log.log("hello");
        log.warn("careful");
        log.error("boom");

        let entries = sink.entries();
        assert_eq!(
            entries,
            vec![
                (LogLevel::Log, "[Instance abc123] hello".to_string()),
                (LogLevel::Warn, "[Instance abc123] careful".to_string()),
                (LogLevel::Error, "[Instance abc123] boom".to_string()),
            ]
        );
    }

    #[test]
    fn test_disabled_drops_messages() {
        let sink = Arc::new(RecordingLogger::new());
        let log = InstanceLogger::new("abc123", false, sink.clone());

        log.log("hello");
        log.error("boom");

        assert!(sink.entries().is_empty());
        assert!(!InstanceLogger::disabled().is_enabled());
    }
}
