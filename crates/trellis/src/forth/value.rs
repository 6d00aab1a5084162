//! Stack values and typed pop helpers.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// A value living on the interpreter stack.
///
/// `ArrayMarker` is the sentinel pushed by `[` and consumed by `]`. It is a
/// distinct variant rather than a magic string so that a user text `"["`
/// cannot terminate an array by accident.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    /// A bare word pushed literally: `'word`, or an unexpanded `$…` token.
    Symbol(String),
    ArrayMarker,
    Array(Vec<Value>),
    /// A deferred token list, built by `{ … }` and run by `exec`.
    Block(Vec<String>),
}

pub type Stack = Vec<Value>;

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }
}

/// Pop the top value. Errors with the canonical underflow message.
pub fn pop(stack: &mut Stack) -> Result<Value, String> {
    stack.pop().ok_or_else(|| "stack underflow".to_string())
}

/// Pop a number. The stack is left untouched on a type mismatch.
pub fn pop_number(stack: &mut Stack) -> Result<f64, String> {
    match stack.last() {
        None => Err("stack underflow".to_string()),
        Some(Value::Number(n)) => {
            let n = *n;
            stack.pop();
            Ok(n)
        }
        Some(other) => Err(format!("value is not a number: {}", format_value(other))),
    }
}

/// Pop a number and truncate it to an integer.
pub fn pop_int(stack: &mut Stack) -> Result<i64, String> {
    pop_number(stack).map(|n| n as i64)
}

/// Pop a text or symbol value. The stack is left untouched on a mismatch.
pub fn pop_text(stack: &mut Stack) -> Result<String, String> {
    match stack.last() {
        None => Err("stack underflow".to_string()),
        Some(Value::Text(_) | Value::Symbol(_)) => match stack.pop() {
            Some(Value::Text(s) | Value::Symbol(s)) => Ok(s),
            _ => unreachable!(),
        },
        Some(other) => Err(format!("expected string, got {}", format_value(other))),
    }
}

/// Pop a finished array value.
pub fn pop_array(stack: &mut Stack) -> Result<Vec<Value>, String> {
    match stack.last() {
        None => Err("stack underflow".to_string()),
        Some(Value::Array(_)) => match stack.pop() {
            Some(Value::Array(items)) => Ok(items),
            _ => unreachable!(),
        },
        Some(other) => Err(format!("expected array, got {}", format_value(other))),
    }
}

/// Pop a quoted block's token list.
pub fn pop_block(stack: &mut Stack) -> Result<Vec<String>, String> {
    match stack.last() {
        None => Err("stack underflow".to_string()),
        Some(Value::Block(_)) => match stack.pop() {
            Some(Value::Block(tokens)) => Ok(tokens),
            _ => unreachable!(),
        },
        Some(_) => Err("top item is not a quoted block".to_string()),
    }
}

/// Pop values down to the nearest `ArrayMarker` and bundle them, preserving
/// their original stack order. The marker is consumed.
pub fn collect_array(stack: &mut Stack) -> Result<Vec<Value>, String> {
    match stack.iter().rposition(|v| matches!(v, Value::ArrayMarker)) {
        Some(pos) => {
            let items = stack.split_off(pos + 1);
            stack.pop();
            Ok(items)
        }
        None => Err("no array start marker found".to_string()),
    }
}

/// Human-readable rendering used by `.`, `print-stack` and `print-array`.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("{n}"),
        Value::Text(s) | Value::Symbol(s) => format!("\"{s}\""),
        Value::ArrayMarker => "[".to_string(),
        Value::Array(items) => {
            let elements: Vec<String> = items.iter().map(format_value).collect();
            format!("[ {} ]", elements.join(" "))
        }
        Value::Block(tokens) => format_block(tokens),
    }
}

/// Render a block's tokens, re-grouping nested `{ … }` runs into single
/// elements so the outer structure stays readable.
fn format_block(tokens: &[String]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut nested = String::new();
    let mut depth = 0usize;

    for token in tokens {
        if token == "{" {
            if depth > 0 {
                nested.push_str(token);
                nested.push(' ');
            }
            depth += 1;
        } else if token == "}" {
            depth = depth.saturating_sub(1);
            if depth > 0 {
                nested.push_str(token);
                nested.push(' ');
            } else if !nested.is_empty() {
                parts.push(format!("{{ {}}}", nested.trim_end()));
                nested.clear();
            }
        } else if depth > 0 {
            nested.push_str(token);
            nested.push(' ');
        } else {
            parts.push(token.clone());
        }
    }

    format!("{{ {} }}", parts.join(" "))
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) | Value::Symbol(s) => serializer.serialize_str(s),
            // A marker can legitimately sit on the user stack mid-construction.
            Value::ArrayMarker => serializer.serialize_str("["),
            Value::Array(items) => items.serialize(serializer),
            Value::Block(tokens) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("block", tokens)?;
                map.end()
            }
        }
    }
}
