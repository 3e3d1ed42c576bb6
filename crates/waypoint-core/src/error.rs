use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaypointError {
    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Evaluation errors
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    // Action errors
    #[error("Action failed: {action}: {message}")]
    Action { action: String, message: String },

    // State errors
    #[error("Invalid saved state: {0}")]
    State(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // TOML errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl WaypointError {
    /// Shorthand for an action failure.
    pub fn action(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Action {
            action: action.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WaypointError>;
