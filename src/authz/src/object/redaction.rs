//! Redaction rules: the null-equivalent written for a denied field

use serde_json::{Map, Value};
use std::fmt;

/// Maps a value to its redacted form
pub trait RedactionRule {
    /// Whether this rule handles `value`
    fn supports(&self, value: &Value) -> bool;

    /// Redacted replacement for `value`
    fn redacted_value_for(&self, value: &Value) -> Value;
}

/// Fallback rule: every value becomes `null`
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRule;

impl RedactionRule for NullRule {
    fn supports(&self, _value: &Value) -> bool {
        true
    }

    fn redacted_value_for(&self, _value: &Value) -> Value {
        Value::Null
    }
}

/// Collections become empty collections of the same kind
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCollectionRule;

impl RedactionRule for EmptyCollectionRule {
    fn supports(&self, value: &Value) -> bool {
        value.is_array() || value.is_object()
    }

    fn redacted_value_for(&self, value: &Value) -> Value {
        match value {
            Value::Object(_) => Value::Object(Map::new()),
            _ => Value::Array(Vec::new()),
        }
    }
}

/// Ordered rules, first match wins, with [`NullRule`] as the final fallback
pub struct RedactionRuleSet {
    rules: Vec<Box<dyn RedactionRule>>,
    fallback: NullRule,
}

impl RedactionRuleSet {
    /// Rule set with [`EmptyCollectionRule`] registered
    pub fn new() -> Self {
        let mut rules = Self::null_only();
        rules.register(EmptyCollectionRule);
        rules
    }

    /// Rule set that redacts everything to `null`
    pub fn null_only() -> Self {
        Self {
            rules: Vec::new(),
            fallback: NullRule,
        }
    }

    /// Append a rule; it is tried after previously registered rules
    pub fn register<R: RedactionRule + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }

    /// Redacted replacement for `value`
    pub fn redact(&self, value: &Value) -> Value {
        self.rules
            .iter()
            .find(|rule| rule.supports(value))
            .map(|rule| rule.redacted_value_for(value))
            .unwrap_or_else(|| self.fallback.redacted_value_for(value))
    }

    /// Number of registered rules, excluding the fallback
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RedactionRuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RedactionRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactionRuleSet")
            .field("rules", &self.rules.len())
            .finish()
    }
}
