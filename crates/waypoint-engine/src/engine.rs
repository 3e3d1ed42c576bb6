use std::sync::Arc;
use std::time::Instant;

use waypoint_core::{
    Action, Blueprint, EngineOptions, ExecutionContext, Logger, Result, WaypointError,
};

use crate::condition::ConditionEvaluator;
use crate::guard::{Call, ErrorGuard, ErrorPolicy};
use crate::logger::{InstanceLogger, TracingLogger};
use crate::metrics::{Metrics, MetricsCollector};
use crate::registry::ActionRegistry;
use crate::state::{self, ExecutionState};
use crate::transition::{self, Outcome};

/// How a run ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A step with no further transition finished.
    Completed { last_step: String },
    /// The run stopped early at `step`.
    Halted { step: String, reason: HaltReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The requested step name is empty or not in the blueprint.
    UnknownStep,
    /// The conditions evaluated to `outcome` and the step has neither a
    /// target for it nor a `next` fallback.
    MissingTransition { outcome: bool },
    /// The action failed and the error policy swallowed it.
    ActionFailed,
    /// Condition evaluation failed and the error policy swallowed it.
    ConditionFailed,
    /// The configured `max_steps` was reached.
    StepLimitReached,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    /// The step the run ended on.
    pub fn step(&self) -> &str {
        match self {
            RunOutcome::Completed { last_step } => last_step,
            RunOutcome::Halted { step, .. } => step,
        }
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        match self {
            RunOutcome::Completed { .. } => None,
            RunOutcome::Halted { reason, .. } => Some(*reason),
        }
    }
}

/// Drives a context through a blueprint.
///
/// The blueprint and action registry are fixed at construction, where every
/// step's action is checked against the registry. Runs share the engine's
/// metrics, so concurrent runs on one engine interleave their counters.
pub struct Engine {
    blueprint: Blueprint,
    actions: ActionRegistry,
    options: EngineOptions,
    policy: ErrorPolicy,
    log: InstanceLogger,
    metrics: MetricsCollector,
}

impl Engine {
    /// Create an engine that logs through `tracing`.
    pub fn new(blueprint: Blueprint, actions: ActionRegistry, options: EngineOptions) -> Result<Self> {
        Self::with_logger(blueprint, actions, options, Arc::new(TracingLogger))
    }

    /// Create an engine with a custom log sink.
    pub fn with_logger(
        blueprint: Blueprint,
        actions: ActionRegistry,
        options: EngineOptions,
        logger: Arc<dyn Logger>,
    ) -> Result<Self> {
        validate_actions(&blueprint, &actions)?;
        blueprint.validate()?;

        let instance_id = options
            .instance_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let log = InstanceLogger::new(instance_id, options.logging_enabled, logger);

        Ok(Self {
            blueprint,
            actions,
            policy: ErrorPolicy::from_rethrow(options.rethrow_errors),
            options,
            log,
            metrics: MetricsCollector::new(),
        })
    }

    pub fn instance_id(&self) -> &str {
        self.log.instance_id()
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Snapshot of the engine-lifetime metrics.
    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    /// Run from the blueprint's start step.
    pub async fn execute(&self, ctx: &mut ExecutionContext) -> Result<RunOutcome> {
        let start = self.blueprint.start.clone();
        self.execute_from(ctx, &start).await
    }

    /// Run from `step_name`.
    ///
    /// Soft halts (unknown step, missing transition target, and failures
    /// under the swallow policy) end the run with `Ok(RunOutcome::Halted)`.
    /// Under the rethrow policy a failing action or condition aborts the
    /// run with that error; metrics for steps already finished are kept.
    pub async fn execute_from(&self, ctx: &mut ExecutionContext, step_name: &str) -> Result<RunOutcome> {
        let guard = ErrorGuard::new(self.policy, &self.log, &self.metrics);
        let mut current = step_name.to_string();
        let mut executed = 0usize;

        loop {
            let step = match self.blueprint.step(&current) {
                Some(step) if !current.is_empty() => step,
                _ => {
                    self.log.warn(&format!("Invalid step: {}", current));
                    return Ok(halted(current, HaltReason::UnknownStep));
                }
            };

            if let Some(max) = self.options.max_steps {
                if executed >= max {
                    self.log.warn(&format!(
                        "Step limit of {} reached before step {}, halting",
                        max, current
                    ));
                    return Ok(halted(current, HaltReason::StepLimitReached));
                }
            }

            let action = self.action_for(&current, &step.action)?;
            self.log.log(&format!(
                "Starting execution of step: {} with action: {}",
                current, step.action
            ));

            let started = Instant::now();
            let completed = guard
                .call(&current, Call::Action(&step.action), action.invoke(ctx))
                .await?;
            let elapsed = started.elapsed();

            if completed.is_none() {
                self.log.warn(&format!(
                    "Execution of step {} was halted due to an error.",
                    current
                ));
                return Ok(halted(current, HaltReason::ActionFailed));
            }

            self.metrics.record_step(&current, elapsed);
            executed += 1;
            self.log.log(&format!(
                "Completed execution of step: {} in {}ms",
                current,
                elapsed.as_millis()
            ));

            let outcome = match step.conditions {
                Some(ref conditions) => {
                    let evaluator = ConditionEvaluator::new(&self.log);
                    let view: &ExecutionContext = ctx;
                    let result = guard
                        .call(&current, Call::Conditions, async {
                            evaluator.evaluate(conditions, view)
                        })
                        .await?;

                    let Some(matched) = result else {
                        self.log.warn(&format!(
                            "Condition evaluation for step {} failed.",
                            current
                        ));
                        return Ok(halted(current, HaltReason::ConditionFailed));
                    };
                    self.log.log(&format!(
                        "Conditions evaluated for step {}: {}",
                        current, matched
                    ));
                    Outcome::Condition(matched)
                }
                None => Outcome::Unconditional,
            };

            // An unmatched conditional outcome falls back to `next`.
            let target = match (transition::resolve(&step.transitions, outcome), outcome) {
                (Some(next), _) => Some(next),
                (None, Outcome::Condition(matched)) => {
                    self.log.warn(&format!(
                        "No valid transition found for condition result: {}",
                        matched
                    ));
                    transition::resolve(&step.transitions, Outcome::Unconditional)
                }
                (None, Outcome::Unconditional) => None,
            };

            match (target, outcome) {
                (Some(next), _) => {
                    self.log.log(&format!(
                        "Transitioning from step {} to step {}",
                        current, next
                    ));
                    current = next.to_string();
                }
                (None, Outcome::Condition(matched)) => {
                    return Ok(halted(
                        current,
                        HaltReason::MissingTransition { outcome: matched },
                    ));
                }
                (None, Outcome::Unconditional) => {
                    self.log.log(&format!("Step {} is terminal", current));
                    return Ok(RunOutcome::Completed { last_step: current });
                }
            }
        }
    }

    /// Continue a suspended run from its saved step.
    pub async fn resume(&self, state: &mut ExecutionState) -> Result<RunOutcome> {
        let step = state.current_step.clone();
        self.execute_from(&mut state.context, &step).await
    }

    /// Encode a context and step for later [`resume`](Self::resume).
    pub fn save_state(&self, ctx: &ExecutionContext, current_step: &str) -> Result<String> {
        state::save(ctx, current_step)
    }

    pub fn load_state(&self, encoded: &str) -> Result<ExecutionState> {
        state::load(encoded)
    }

    fn action_for(&self, step: &str, action: &str) -> Result<Arc<dyn Action>> {
        self.actions.get(action).ok_or_else(|| {
            WaypointError::Config(format!(
                "Action {} is not defined for step {}",
                action, step
            ))
        })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("instance_id", &self.instance_id())
            .field("start", &self.blueprint.start)
            .field("steps", &self.blueprint.steps.len())
            .field("policy", &self.policy)
            .finish()
    }
}

fn halted(step: String, reason: HaltReason) -> RunOutcome {
    RunOutcome::Halted { step, reason }
}

/// Every step must name a registered action. Steps are checked in name
/// order so the reported step is deterministic.
fn validate_actions(blueprint: &Blueprint, actions: &ActionRegistry) -> Result<()> {
    let mut names: Vec<&String> = blueprint.steps.keys().collect();
    names.sort();
    for name in names {
        let action = &blueprint.steps[name].action;
        if !actions.contains(action) {
            return Err(WaypointError::Config(format!(
                "Action {} is not defined for step {}",
                action, name
            )));
        }
    }
    Ok(())
}
