//! Rule tree validation.
//!
//! Grammar:
//!
//! ```text
//! Rule := {"AND": [Rule, ...]} | {"OR": [Rule, ...]} | {<leaf_name>: <params_object>}
//! ```
//!
//! Walks a JSON rule tree, checks it against the rule registry and produces a
//! [`RuleNode`]. Every failure is a `RuleInvalid` error whose message carries the
//! path of the offending node (`$.AND[1].OR[0]`) and the rule or key at fault.

use crate::domain::error::ScannerError;
use crate::domain::indicator::MAX_PERIOD;
use crate::domain::rule::{LeafRule, Params, RuleNode};
use crate::domain::rule_registry::{self, ParamKind, RuleSpec};
use serde_json::{Map, Value};

/// Check a rule tree; returns normally when it would compile.
pub fn validate_rule(rule: &Value) -> Result<(), ScannerError> {
    parse_rule(rule).map(|_| ())
}

/// Parse JSON text into a validated rule tree.
pub fn parse_rule_str(input: &str) -> Result<RuleNode, ScannerError> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| ScannerError::rule(format!("malformed rule JSON: {e}")))?;
    parse_rule(&value)
}

pub fn parse_rule(rule: &Value) -> Result<RuleNode, ScannerError> {
    parse_node(rule, "$")
}

fn parse_node(rule: &Value, path: &str) -> Result<RuleNode, ScannerError> {
    let obj = rule
        .as_object()
        .ok_or_else(|| invalid(path, format!("rule must be an object, found {}", kind_of(rule))))?;

    let mut entries = obj.iter();
    let (key, body) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        (None, _) => return Err(invalid(path, "empty rule object")),
        (Some(_), Some(_)) => {
            let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
            return Err(invalid(
                path,
                format!("rule must have exactly one key, found {}", keys.join(", ")),
            ));
        }
    };

    match key.as_str() {
        "AND" => Ok(RuleNode::And(parse_children("AND", body, path)?)),
        "OR" => Ok(RuleNode::Or(parse_children("OR", body, path)?)),
        name => parse_leaf(name, body, path).map(RuleNode::Leaf),
    }
}

fn parse_children(op: &str, body: &Value, path: &str) -> Result<Vec<RuleNode>, ScannerError> {
    let children = match body.as_array() {
        Some(children) if !children.is_empty() => children,
        _ => return Err(invalid(path, format!("{op} must be a non-empty list"))),
    };

    children
        .iter()
        .enumerate()
        .map(|(i, child)| parse_node(child, &format!("{path}.{op}[{i}]")))
        .collect()
}

fn parse_leaf(name: &str, body: &Value, path: &str) -> Result<LeafRule, ScannerError> {
    let spec = rule_registry::lookup(name)
        .ok_or_else(|| invalid(path, format!("unknown rule: {name}")))?;

    let cfg = body
        .as_object()
        .ok_or_else(|| invalid(path, format!("rule config must be an object for {name}")))?;

    let params = resolve_params(spec, cfg, path)?;
    Ok(LeafRule { spec, params })
}

fn resolve_params(
    spec: &'static RuleSpec,
    cfg: &Map<String, Value>,
    path: &str,
) -> Result<Params, ScannerError> {
    let name = spec.name;

    for key in cfg.keys() {
        if spec.param(key).is_none() {
            return Err(invalid(path, format!("invalid key '{key}' in {name}")));
        }
    }

    let mut params = Params::new();
    for param in spec.params {
        let value = match (cfg.get(param.name), param.default) {
            (Some(raw), _) => number_param(name, param.name, param.kind, raw, path)?,
            (None, Some(default)) => default,
            (None, None) => {
                return Err(invalid(
                    path,
                    format!("missing required '{}' in {name}", param.name),
                ));
            }
        };
        params.insert(param.name.to_string(), value);
    }

    Ok(params)
}

fn number_param(
    rule: &str,
    key: &str,
    kind: ParamKind,
    raw: &Value,
    path: &str,
) -> Result<f64, ScannerError> {
    let value = raw
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(path, format!("'{key}' in {rule} must be a number")))?;

    if kind == ParamKind::Period && (value < 1.0 || value.fract() != 0.0) {
        return Err(invalid(
            path,
            format!("'{key}' in {rule} must be a positive integer, found {value}"),
        ));
    }
    if kind == ParamKind::Period && value > MAX_PERIOD as f64 {
        return Err(invalid(
            path,
            format!("'{key}' in {rule} must be at most {MAX_PERIOD}, found {value}"),
        ));
    }

    Ok(value)
}

fn invalid(path: &str, reason: impl Into<String>) -> ScannerError {
    ScannerError::rule(format!("at {path}: {}", reason.into()))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
