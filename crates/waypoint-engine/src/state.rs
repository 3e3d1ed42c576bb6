use serde::{Deserialize, Serialize};

use waypoint_core::{ExecutionContext, Result, WaypointError};

/// Suspended run: the context plus the step to continue from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
    pub context: ExecutionContext,
    pub current_step: String,
}

impl ExecutionState {
    pub fn new(context: ExecutionContext, current_step: impl Into<String>) -> Self {
        Self {
            context,
            current_step: current_step.into(),
        }
    }
}

/// Encode a context and step as `{"context": {...}, "currentStep": "..."}`.
pub fn save(context: &ExecutionContext, current_step: &str) -> Result<String> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Snapshot<'a> {
        context: &'a ExecutionContext,
        current_step: &'a str,
    }

    Ok(serde_json::to_string(&Snapshot {
        context,
        current_step,
    })?)
}

/// Decode a blob produced by [`save`].
pub fn load(encoded: &str) -> Result<ExecutionState> {
    serde_json::from_str(encoded).map_err(|e| WaypointError::State(e.to_string()))
}
