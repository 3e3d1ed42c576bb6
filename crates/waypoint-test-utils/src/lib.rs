//! Shared fixtures for Waypoint tests: a recording logger, scripted actions,
//! and the canonical eligibility and order-pipeline blueprints.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures::future::BoxFuture;
use serde_json::Value;

use waypoint_core::{
    Action, Blueprint, ConditionExpression, ExecutionContext, Logger, Result, Step, Transitions,
    WaypointError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Log,
    Warn,
    Error,
}

/// Logger that keeps every message for later assertions.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.lock().unwrap().clone()
    }

    /// Messages logged at the given level.
    pub fn at(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|(_, m)| m.contains(needle))
    }

    fn push(&self, level: LogLevel, message: &str) {
        self.entries.lock().unwrap().push((level, message.to_string()));
    }
}

impl Logger for RecordingLogger {
    fn log(&self, message: &str) {
        self.push(LogLevel::Log, message);
    }

    fn warn(&self, message: &str) {
        self.push(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }
}

/// Action that counts its invocations and optionally writes fixed values
/// into the context.
#[derive(Debug, Default)]
pub struct ScriptedAction {
    calls: AtomicUsize,
    writes: Vec<(String, Value)>,
    failure: Option<String>,
}

impl ScriptedAction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `key = value` into the context on every call.
    pub fn writes(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.writes.push((key.into(), value.into()));
        self
    }

    /// Fail every call with this message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Action for ScriptedAction {
    fn invoke<'a>(&'a self, ctx: &'a mut ExecutionContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(ref message) = self.failure {
                return Err(WaypointError::action("scripted", message.clone()));
            }
            for (key, value) in &self.writes {
                ctx.set(key.clone(), value.clone());
            }
            Ok(())
        })
    }
}

/// `checkAge -> checkPlanLevel -> premiumContent | basicContent`, with
/// `ageRestricted` on the under-18 branch.
pub fn eligibility_blueprint() -> Blueprint {
    Blueprint::new("checkAge")
        .with_step(
            "checkAge",
            Step::new("checkAgeAction")
                .with_transitions(Transitions::branch("checkPlanLevel", "ageRestricted"))
                .with_conditions(ConditionExpression::leaf(
                    "age",
                    "greater_than_or_equals",
                    18,
                )),
        )
        .with_step(
            "checkPlanLevel",
            Step::new("checkPlanLevelAction")
                .with_transitions(Transitions::branch("premiumContent", "basicContent"))
                .with_conditions(ConditionExpression::leaf("planLevel", "equals", "premium")),
        )
        .with_step("ageRestricted", Step::new("ageRestrictedAction"))
        .with_step("premiumContent", Step::new("premiumContentAction"))
        .with_step("basicContent", Step::new("basicContentAction"))
}

/// Action names referenced by [`eligibility_blueprint`].
pub const ELIGIBILITY_ACTIONS: [&str; 5] = [
    "checkAgeAction",
    "checkPlanLevelAction",
    "ageRestrictedAction",
    "premiumContentAction",
    "basicContentAction",
];

/// `checkInventory -> processPayment -> shipOrder`, with `outOfStock` and
/// `paymentFailed` as the failure branches. The inventory and payment
/// actions are expected to set `inventoryAvailable` / `paymentSuccessful`.
pub fn order_blueprint() -> Blueprint {
    Blueprint::new("checkInventory")
        .with_step(
            "checkInventory",
            Step::new("checkInventoryAction")
                .with_transitions(Transitions::branch("processPayment", "outOfStock"))
                .with_conditions(ConditionExpression::leaf("inventoryAvailable", "equals", true)),
        )
        .with_step(
            "processPayment",
            Step::new("processPaymentAction")
                .with_transitions(Transitions::branch("shipOrder", "paymentFailed"))
                .with_conditions(ConditionExpression::leaf("paymentSuccessful", "equals", true)),
        )
        .with_step("outOfStock", Step::new("outOfStockAction"))
        .with_step("paymentFailed", Step::new("paymentFailedAction"))
        .with_step("shipOrder", Step::new("shipOrderAction"))
}

/// Action names referenced by [`order_blueprint`].
pub const ORDER_ACTIONS: [&str; 5] = [
    "checkInventoryAction",
    "processPaymentAction",
    "outOfStockAction",
    "paymentFailedAction",
    "shipOrderAction",
];

/// Build a context from a JSON object literal.
pub fn context(value: Value) -> ExecutionContext {
    ExecutionContext::from_json(value).expect("context fixture must be a JSON object")
}
