use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WaypointError};

/// A declarative workflow: the entry step plus every named step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    /// Name of the step each run starts from by default.
    pub start: String,
    /// All steps, keyed by name.
    pub steps: HashMap<String, Step>,
}

/// One node of a blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Name of the registered action bound to this step.
    pub action: String,
    /// Outcome-to-step table.
    #[serde(default)]
    pub transitions: Transitions,
    /// Optional condition tree; when present it selects `true`/`false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<ConditionExpression>,
}

/// Transition table of a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transitions {
    #[serde(rename = "true", default, skip_serializing_if = "Option::is_none")]
    pub on_true: Option<String>,
    #[serde(rename = "false", default, skip_serializing_if = "Option::is_none")]
    pub on_false: Option<String>,
    /// Unconditional successor; `None` (or JSON `null`) marks a terminal step.
    #[serde(default)]
    pub next: Option<String>,
}

/// Boolean expression tree evaluated against a context.
///
/// Deserializes from any of the three blueprint forms: an
/// `{"operator": "AND"|"OR", "conditions": [...]}` group, a bare array
/// (implicit AND), or a `{"key", "operator", "value"}` leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionExpression {
    Group {
        operator: LogicalOperator,
        conditions: Vec<ConditionExpression>,
    },
    All(Vec<ConditionExpression>),
    Leaf(Condition),
}

/// Combinator for a condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// A single comparison of a context value against a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub key: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

/// Leaf comparison operator.
///
/// Unknown names are kept as [`Operator::Unsupported`] so a blueprint still
/// loads; evaluating such a leaf fails with
/// [`WaypointError::UnsupportedOperator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEquals,
    LesserThan,
    LesserThanOrEquals,
    In,
    NotIn,
    Range,
    RangeNotIn,
    Unsupported(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::GreaterThanOrEquals => "greater_than_or_equals",
            Self::LesserThan => "lesser_than",
            Self::LesserThanOrEquals => "lesser_than_or_equals",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Range => "range",
            Self::RangeNotIn => "range_not_in",
            Self::Unsupported(name) => name,
        }
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "greater_than" => Self::GreaterThan,
            "greater_than_or_equals" => Self::GreaterThanOrEquals,
            "lesser_than" => Self::LesserThan,
            "lesser_than_or_equals" => Self::LesserThanOrEquals,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "range" => Self::Range,
            "range_not_in" => Self::RangeNotIn,
            _ => Self::Unsupported(s),
        }
    }
}

impl From<&str> for Operator {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Condition {
    pub fn new(key: impl Into<String>, operator: impl Into<Operator>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

impl ConditionExpression {
    /// Leaf comparison.
    pub fn leaf(key: impl Into<String>, operator: impl Into<Operator>, value: impl Into<Value>) -> Self {
        Self::Leaf(Condition::new(key, operator, value))
    }

    /// Group whose children must all hold.
    pub fn and(conditions: Vec<ConditionExpression>) -> Self {
        Self::Group {
            operator: LogicalOperator::And,
            conditions,
        }
    }

    /// Group where any child holding is enough.
    pub fn or(conditions: Vec<ConditionExpression>) -> Self {
        Self::Group {
            operator: LogicalOperator::Or,
            conditions,
        }
    }

    /// Check that every group in the tree has at least one child.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Self::Leaf(_) => Ok(()),
            Self::Group { conditions, .. } | Self::All(conditions) => {
                if conditions.is_empty() {
                    return Err("condition group has no children".to_string());
                }
                conditions.iter().try_for_each(|c| c.validate())
            }
        }
    }
}

impl Transitions {
    /// Terminal table: no successor of any kind.
    pub fn terminal() -> Self {
        Self::default()
    }

    /// Unconditional successor.
    pub fn next(step: impl Into<String>) -> Self {
        Self {
            next: Some(step.into()),
            ..Self::default()
        }
    }

    /// Conditional successors selected by the step's condition result.
    pub fn branch(on_true: impl Into<String>, on_false: impl Into<String>) -> Self {
        Self {
            on_true: Some(on_true.into()),
            on_false: Some(on_false.into()),
            next: None,
        }
    }
}

impl Step {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            transitions: Transitions::terminal(),
            conditions: None,
        }
    }

    pub fn with_transitions(mut self, transitions: Transitions) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn with_conditions(mut self, conditions: ConditionExpression) -> Self {
        self.conditions = Some(conditions);
        self
    }
}

impl Blueprint {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            steps: HashMap::new(),
        }
    }

    /// Add a step (builder style).
    pub fn with_step(mut self, name: impl Into<String>, step: Step) -> Self {
        self.steps.insert(name.into(), step);
        self
    }

    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.get(name)
    }

    /// Parse a blueprint from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse a blueprint from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a blueprint file. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| WaypointError::ConfigNotFound(path.display().to_string()))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }

    /// Structural checks that do not need the action registry: the start
    /// step exists and no condition group is empty.
    pub fn validate(&self) -> Result<()> {
        if !self.steps.contains_key(&self.start) {
            return Err(WaypointError::Config(format!(
                "Start step {} is not defined",
                self.start
            )));
        }
        let mut names: Vec<&String> = self.steps.keys().collect();
        names.sort();
        for name in names {
            if let Some(ref conditions) = self.steps[name].conditions {
                conditions.validate().map_err(|e| {
                    WaypointError::Config(format!("Invalid conditions for step {}: {}", name, e))
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ELIGIBILITY: &str = r#"{
        "start": "checkAge",
        "steps": {
            "checkAge": {
                "action": "checkAgeAction",
                "transitions": { "true": "checkPlanLevel", "false": "ageRestricted" },
                "conditions": { "key": "age", "operator": "greater_than_or_equals", "value": 18 }
            },
            "checkPlanLevel": {
                "action": "checkPlanLevelAction",
                "transitions": { "true": "premiumContent", "false": "basicContent" },
                "conditions": { "key": "planLevel", "operator": "equals", "value": "premium" }
            },
            "ageRestricted": { "action": "ageRestrictedAction", "transitions": { "next": null } },
            "premiumContent": { "action": "premiumContentAction", "transitions": { "next": null } },
            "basicContent": { "action": "basicContentAction", "transitions": { "next": null } }
        }
    }"#;

    #[test]
    fn test_parse_json_blueprint() {
        let bp = Blueprint::from_json(ELIGIBILITY).unwrap();
        assert_eq!(bp.start, "checkAge");
        assert_eq!(bp.steps.len(), 5);

        let check_age = bp.step("checkAge").unwrap();
        assert_eq!(check_age.transitions.on_true.as_deref(), Some("checkPlanLevel"));
        assert_eq!(check_age.transitions.on_false.as_deref(), Some("ageRestricted"));
        assert_eq!(
            check_age.conditions,
            Some(ConditionExpression::leaf("age", "greater_than_or_equals", 18))
        );

        let terminal = bp.step("premiumContent").unwrap();
        assert_eq!(terminal.transitions, Transitions::terminal());
        assert!(bp.validate().is_ok());
    }

    #[test]
    fn test_parse_condition_forms() {
        let group: ConditionExpression = serde_json::from_value(json!({
            "operator": "OR",
            "conditions": [
                { "key": "a", "operator": "equals", "value": 1 },
                { "key": "b", "operator": "in", "value": [1, 2] }
            ]
        }))
        .unwrap();
        assert!(matches!(
            group,
            ConditionExpression::Group { operator: LogicalOperator::Or, ref conditions } if conditions.len() == 2
        ));

        let implicit: ConditionExpression = serde_json::from_value(json!([
            { "key": "a", "operator": "equals", "value": 1 }
        ]))
        .unwrap();
        assert!(matches!(implicit, ConditionExpression::All(ref c) if c.len() == 1));
    }

    #[test]
    fn test_unknown_operator_still_parses() {
        let leaf: ConditionExpression =
            serde_json::from_value(json!({ "key": "a", "operator": "return_value" })).unwrap();
        match leaf {
            ConditionExpression::Leaf(c) => {
                assert_eq!(c.operator, Operator::Unsupported("return_value".into()));
                assert_eq!(c.value, Value::Null);
            }
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_roundtrips_by_name() {
        for name in [
            "equals",
            "not_equals",
            "greater_than",
            "greater_than_or_equals",
            "lesser_than",
            "lesser_than_or_equals",
            "in",
            "not_in",
            "range",
            "range_not_in",
        ] {
            let op = Operator::from(name);
            assert!(!matches!(op, Operator::Unsupported(_)), "{name}");
            assert_eq!(String::from(op), name);
        }
    }

    #[test]
    fn test_parse_toml_blueprint() {
        let toml_str = r#"
start = "reserve"

[steps.reserve]
action = "reserve_stock"
transitions = { true = "charge", false = "backorder" }
conditions = { key = "in_stock", operator = "equals", value = true }

[steps.charge]
action = "charge_card"

[steps.backorder]
action = "notify"
"#;
        let bp = Blueprint::from_toml(toml_str).unwrap();
        assert_eq!(bp.start, "reserve");
        assert_eq!(bp.step("charge").unwrap().transitions.next, None);
        assert!(bp.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_start() {
        let bp = Blueprint::new("nowhere").with_step("a", Step::new("noop"));
        let err = bp.validate().unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_validate_empty_group() {
        let bp = Blueprint::new("a").with_step(
            "a",
            Step::new("noop").with_conditions(ConditionExpression::or(vec![])),
        );
        let err = bp.validate().unwrap_err();
        assert!(err.to_string().contains("step a"));
    }

    #[test]
    fn test_validate_reports_first_invalid_step_by_name() {
        let mut bp = Blueprint::new("m");
        for name in ["m", "z", "c", "q", "f", "w"] {
            bp = bp.with_step(
                name,
                Step::new("noop").with_conditions(ConditionExpression::and(vec![])),
            );
        }
        for _ in 0..8 {
            let err = bp.validate().unwrap_err();
            assert!(err.to_string().contains("for step c:"), "{}", err);
        }
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut tmp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        tmp.write_all(ELIGIBILITY.as_bytes()).unwrap();
        let bp = Blueprint::load(tmp.path()).unwrap();
        assert_eq!(bp.steps.len(), 5);

        let missing = Blueprint::load(Path::new("/nonexistent/blueprint.json"));
        assert!(matches!(missing, Err(WaypointError::ConfigNotFound(_))));
    }
}
