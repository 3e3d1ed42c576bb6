use std::fmt;

use waypoint_core::Transitions;

/// What a step produced for the purpose of picking its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The step's conditions evaluated to this value.
    Condition(bool),
    /// The step has no conditions.
    Unconditional,
}

impl Outcome {
    /// Transition-table key for this outcome.
    pub fn key(&self) -> &'static str {
        match self {
            Outcome::Condition(true) => "true",
            Outcome::Condition(false) => "false",
            Outcome::Unconditional => "next",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Look up the successor for an outcome. Absent and empty targets both
/// mean "no transition".
pub fn resolve(transitions: &Transitions, outcome: Outcome) -> Option<&str> {
    let target = match outcome {
        Outcome::Condition(true) => &transitions.on_true,
        Outcome::Condition(false) => &transitions.on_false,
        Outcome::Unconditional => &transitions.next,
    };
    target.as_deref().filter(|s| !s.is_empty())
}

/// Look up the successor by table key (`"true"`, `"false"` or `"next"`).
/// Unknown keys resolve to no transition.
pub fn resolve_key<'a>(transitions: &'a Transitions, key: &str) -> Option<&'a str> {
    let outcome = match key {
        "true" => Outcome::Condition(true),
        "false" => Outcome::Condition(false),
        "next" => Outcome::Unconditional,
        _ => return None,
    };
    resolve(transitions, outcome)
}
