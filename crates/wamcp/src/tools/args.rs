// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loosely typed access to a tool's JSON argument bag.
//!
//! Clients send numbers where strings are expected (and the reverse), so
//! lookups coerce scalars and treat empty values as absent.

use serde_json::{Map, Value};

use crate::tools::ToolError;

/// Borrowed view over `tools/call` arguments.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Args<'a> {
    /// Non-object arguments behave like an empty object.
    pub fn new(value: &'a Value) -> Self {
        Self { map: value.as_object() }
    }

    /// Key present at all, even if null or empty.
    pub fn has(&self, key: &str) -> bool {
        self.map.is_some_and(|m| m.contains_key(key))
    }

    /// The raw value, if present.
    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|m| m.get(key))
    }

    /// The value, if present and non-empty.
    pub fn value(&self, key: &str) -> Option<&'a Value> {
        self.raw(key).filter(|v| truthy(v))
    }

    /// A non-empty scalar rendered as a string.
    pub fn str(&self, key: &str) -> Option<String> {
        self.value(key).and_then(scalar)
    }

    /// A non-empty array.
    pub fn array(&self, key: &str) -> Option<&'a Vec<Value>> {
        self.value(key).and_then(Value::as_array)
    }

    /// Nested object argument.
    pub fn object(&self, key: &str) -> Args<'a> {
        Args { map: self.raw(key).and_then(Value::as_object) }
    }

    /// Fail unless every key holds a non-empty value.
    pub fn check(&self, keys: &[&str]) -> Result<(), ToolError> {
        let missing: Vec<&str> = keys.iter().copied().filter(|k| self.value(k).is_none()).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ToolError::new(format!("Missing required parameter(s): {}", missing.join(", "))))
        }
    }

    /// Required string arguments, in order.
    pub fn required<const N: usize>(&self, keys: [&str; N]) -> Result<[String; N], ToolError> {
        self.check(&keys)?;
        Ok(keys.map(|k| self.str(k).unwrap_or_default()))
    }

    /// Boolean accepting `true`, `"yes"`, `"1"`, `"on"` and friends.
    pub fn flag(&self, key: &str) -> bool {
        match self.raw(key) {
            Some(Value::Bool(b)) => *b,
            Some(v) => scalar(v).is_some_and(|s| {
                matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on")
            }),
            None => false,
        }
    }

    /// Integer argument, falling back to `default` when absent or unparseable.
    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        match self.raw(key) {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    /// Floating point argument given as a number or numeric string.
    pub fn float(&self, key: &str) -> Option<f64> {
        match self.raw(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// JSON truthiness: null, false, zero and empty containers are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Render a non-empty string or number as a string.
pub fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_owned()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
