pub mod blueprint;
pub mod config;
pub mod context;
pub mod error;
pub mod traits;

pub use blueprint::{
    Blueprint, Condition, ConditionExpression, LogicalOperator, Operator, Step, Transitions,
};
pub use config::{ActionConfig, ActionKind, AppConfig, EngineOptions};
pub use context::ExecutionContext;
pub use error::{Result, WaypointError};
pub use traits::{Action, Logger};
