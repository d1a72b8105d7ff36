//! Accumulated properties, guards over them, and property edits.
//!
//! Guards and edits are plain data so that transitions stay comparable,
//! hashable and serializable.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A scalar property value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl PropValue {
    /// Convert a JSON scalar. Returns `None` for null, floats, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<PropValue> {
        match value {
            serde_json::Value::Bool(b) => Some(PropValue::Bool(*b)),
            serde_json::Value::Number(n) => n.as_i64().map(PropValue::Int),
            serde_json::Value::String(s) => Some(PropValue::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Bool(b) => write!(f, "{}", b),
            PropValue::Int(i) => write!(f, "{}", i),
            PropValue::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

impl From<i64> for PropValue {
    fn from(i: i64) -> Self {
        PropValue::Int(i)
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Text(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Text(s)
    }
}

// ── Properties ──────────────────────────────────────────────────────

/// Properties accumulated on one role instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, PropValue>);

impl Properties {
    pub fn new() -> Self {
        Properties(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.0.remove(key);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropValue)> {
        self.0.iter()
    }

    /// Overlay `other` on top of these properties.
    pub fn merge(&mut self, other: &Properties) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Keep only the listed keys.
    pub fn retain_keys(&mut self, keys: &BTreeSet<String>) {
        self.0.retain(|k, _| keys.contains(k));
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Properties(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}

// ── Guard ───────────────────────────────────────────────────────────

/// Predicate over accumulated properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "op", content = "args")]
pub enum Guard {
    #[default]
    Always,
    Has(String),
    Equals(String, PropValue),
    Not(Box<Guard>),
    All(Vec<Guard>),
    Any(Vec<Guard>),
}

impl Guard {
    pub fn equals(key: impl Into<String>, value: impl Into<PropValue>) -> Guard {
        Guard::Equals(key.into(), value.into())
    }

    pub fn not(guard: Guard) -> Guard {
        Guard::Not(Box::new(guard))
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Guard::Always)
    }

    /// Evaluate against a property set. A missing key never equals anything.
    pub fn eval(&self, props: &Properties) -> bool {
        match self {
            Guard::Always => true,
            Guard::Has(key) => props.contains(key),
            Guard::Equals(key, value) => props.get(key) == Some(value),
            Guard::Not(inner) => !inner.eval(props),
            Guard::All(guards) => guards.iter().all(|g| g.eval(props)),
            Guard::Any(guards) => guards.iter().any(|g| g.eval(props)),
        }
    }
}

// ── Property edits ──────────────────────────────────────────────────

/// One edit in a transition's property modifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PropertyEdit {
    Set(String, PropValue),
    Remove(String),
    Clear,
}

/// Apply a modifier to a property set, returning the new set.
pub fn apply_edits(edits: &[PropertyEdit], props: &Properties) -> Properties {
    let mut out = props.clone();
    for edit in edits {
        match edit {
            PropertyEdit::Set(k, v) => out.insert(k.clone(), v.clone()),
            PropertyEdit::Remove(k) => out.remove(k),
            PropertyEdit::Clear => out.clear(),
        }
    }
    out
}
