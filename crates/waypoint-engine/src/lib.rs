//! Step-execution engine.
//!
//! An [`Engine`] walks a [`Blueprint`](waypoint_core::Blueprint) one step at
//! a time: it invokes the step's action through the [`ErrorGuard`], records
//! metrics, evaluates the step's conditions, resolves the next step from the
//! transition table, and loops until a step has no successor or the run
//! halts.

pub mod builtin;
pub mod condition;
pub mod engine;
pub mod guard;
pub mod logger;
pub mod metrics;
pub mod registry;
pub mod state;
pub mod transition;

pub use builtin::ConfiguredAction;
pub use condition::{evaluate, ConditionEvaluator};
pub use engine::{Engine, HaltReason, RunOutcome};
pub use guard::{Call, ErrorGuard, ErrorPolicy};
pub use logger::{InstanceLogger, TracingLogger};
pub use metrics::{Metrics, MetricsCollector};
pub use registry::{ActionRegistry, FnAction};
pub use state::ExecutionState;
pub use transition::{resolve, resolve_key, Outcome};
