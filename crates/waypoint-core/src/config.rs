use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WaypointError};

/// Top-level Waypoint configuration (`waypoint.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineOptions,
    /// Declarative actions available to blueprints run from the CLI.
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

/// Engine-wide options fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Propagate wrapped failures out of `execute` (default: true). When
    /// false, a failure halts the run at the failing step instead.
    #[serde(default = "default_rethrow_errors")]
    pub rethrow_errors: bool,
    /// Emit engine log messages (default: true).
    #[serde(default = "default_logging_enabled")]
    pub logging_enabled: bool,
    /// Halt a run after this many executed steps (default: unbounded).
    #[serde(default)]
    pub max_steps: Option<usize>,
    /// Identifier prefixed to every log line. Generated when absent.
    #[serde(default)]
    pub instance_id: Option<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            rethrow_errors: default_rethrow_errors(),
            logging_enabled: default_logging_enabled(),
            max_steps: None,
            instance_id: None,
        }
    }
}

impl EngineOptions {
    pub fn with_rethrow_errors(mut self, rethrow: bool) -> Self {
        self.rethrow_errors = rethrow;
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_instance_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = Some(id.into());
        self
    }
}

fn default_rethrow_errors() -> bool { true }
fn default_logging_enabled() -> bool { true }

/// A named action declared in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub name: String,
    #[serde(flatten)]
    pub kind: ActionKind,
}

/// Behavior of a declared action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    /// Leave the context untouched.
    Noop,
    /// Merge fixed values into the context.
    Assign {
        #[serde(default)]
        values: BTreeMap<String, Value>,
    },
    /// Delete keys from the context.
    Remove {
        #[serde(default)]
        keys: Vec<String>,
    },
    /// Always fail with the given message.
    Fail {
        #[serde(default = "default_fail_message")]
        message: String,
    },
}

fn default_fail_message() -> String { "configured failure".to_string() }

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| WaypointError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content)?;

        let config: AppConfig =
            toml::from_str(&expanded).map_err(|e| WaypointError::Config(e.to_string()))?;
        config.check_action_names()?;
        Ok(config)
    }

    /// Load the config if the file exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn check_action_names(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for action in &self.actions {
            if action.name.trim().is_empty() {
                return Err(WaypointError::Config("Action with empty name".into()));
            }
            if !seen.insert(action.name.as_str()) {
                return Err(WaypointError::Config(format!(
                    "Action {} is declared more than once",
                    action.name
                )));
            }
        }
        Ok(())
    }
}

/// Expand `${ENV_VAR}` patterns in a string. An unclosed `${` is rejected.
fn expand_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        result.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = after.find('}').ok_or_else(|| {
            WaypointError::Config(format!(
                "Unterminated ${{ in config near: {}",
                after.lines().next().unwrap_or_default()
            ))
        })?;
        let var_name = &after[..close];
        match std::env::var(var_name) {
            Ok(val) => result.push_str(&val),
            // Unset variables stay as written
            Err(_) => result.push_str(&rest[open..open + 3 + close]),
        }
        rest = &after[close + 1..];
    }
    result.push_str(rest);
    Ok(result)
}
