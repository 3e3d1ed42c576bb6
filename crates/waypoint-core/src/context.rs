use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mutable data bag threaded through every step of one run.
///
/// The caller owns the context; actions read and mutate it in place and the
/// engine only reads it when evaluating conditions. Keys are strings and
/// values are JSON, so any context built from structured data round-trips
/// through the state serializer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContext {
    data: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context from initial data.
    pub fn from_map(data: HashMap<String, Value>) -> Self {
        Self { data }
    }

    /// Create a context from a JSON object. Returns `None` for any other
    /// JSON value.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(obj) => Some(Self {
                data: obj.into_iter().collect(),
            }),
            _ => None,
        }
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Whether the key is present, even if its value is null.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Get a value as a string, if it's a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(|v| v.as_i64())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(|v| v.as_f64())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }

    /// Set a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Set a string value.
    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), Value::String(value.into()));
    }

    /// Remove a key, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Merge another context into this one (overwrites on conflict).
    pub fn merge(&mut self, other: &ExecutionContext) {
        for (k, v) in &other.data {
            self.data.insert(k.clone(), v.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the underlying data map.
    pub fn data(&self) -> &HashMap<String, Value> {
        &self.data
    }

    /// Render the context as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_operations() {
        let mut ctx = ExecutionContext::new();
        ctx.set_str("plan_level", "premium");
        ctx.set("age", 20);
        ctx.set("verified", true);

        assert_eq!(ctx.get_str("plan_level"), Some("premium"));
        assert_eq!(ctx.get_i64("age"), Some(20));
        assert_eq!(ctx.get_f64("age"), Some(20.0));
        assert_eq!(ctx.get_bool("verified"), Some(true));
        assert_eq!(ctx.get("missing"), None);
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn test_null_value_is_present() {
        let mut ctx = ExecutionContext::new();
        ctx.set("coupon", Value::Null);
        assert!(ctx.contains_key("coupon"));
        assert!(!ctx.contains_key("discount"));
    }

    #[test]
    fn test_merge_and_remove() {
        let mut a = ExecutionContext::new();
        a.set_str("a", "1");
        a.set_str("b", "2");

        let mut b = ExecutionContext::new();
        b.set_str("b", "overwritten");
        b.set_str("c", "3");

        a.merge(&b);
        assert_eq!(a.get_str("b"), Some("overwritten"));
        assert_eq!(a.remove("c"), Some(json!("3")));
        assert!(!a.contains_key("c"));
    }

    #[test]
    fn test_from_json() {
        let ctx = ExecutionContext::from_json(json!({"age": 20, "tags": ["a"]})).unwrap();
        assert_eq!(ctx.get_i64("age"), Some(20));
        assert_eq!(ctx.to_json(), json!({"age": 20, "tags": ["a"]}));

        assert!(ExecutionContext::from_json(json!([1, 2])).is_none());
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut ctx = ExecutionContext::new();
        ctx.set("age", 20);
        let json = serde_json::to_string(&ctx).unwrap();
        assert_eq!(json, r#"{"age":20}"#);
    }
}
