//! Rule tree data structures.
//!
//! This module defines the validated form of a screening rule:
//! - `RuleNode`: recursive Leaf / And / Or tree
//! - `LeafRule`: a registered rule name bound to its resolved parameters
//! - `Predicate`: the compiled, infallible boolean test over a [`BarTable`]

use crate::domain::bar_table::BarTable;
use crate::domain::indicator::IndicatorType;
use crate::domain::rule_registry::RuleSpec;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Resolved leaf parameters, defaults included.
pub type Params = BTreeMap<String, f64>;

/// A leaf that has passed validation against the rule registry.
///
/// Only the parser can build one, so every leaf reaching the compiler is
/// known to name a registered rule with a complete, well-typed parameter set.
#[derive(Debug, Clone)]
pub struct LeafRule {
    pub(crate) spec: &'static RuleSpec,
    pub(crate) params: Params,
}

impl LeafRule {
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<f64> {
        self.params.get(key).copied()
    }

    pub fn indicators(&self) -> Vec<IndicatorType> {
        (self.spec.indicators)(&self.params)
    }
}

impl PartialEq for LeafRule {
    fn eq(&self, other: &Self) -> bool {
        self.spec.name == other.spec.name && self.params == other.params
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    Leaf(LeafRule),
    And(Vec<RuleNode>),
    Or(Vec<RuleNode>),
}

impl RuleNode {
    /// Indicators the tree reads, de-duplicated, in first-seen order.
    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        let mut out = Vec::new();
        self.collect_indicators(&mut out);
        out
    }

    fn collect_indicators(&self, out: &mut Vec<IndicatorType>) {
        match self {
            RuleNode::Leaf(leaf) => {
                for indicator in leaf.indicators() {
                    if !out.contains(&indicator) {
                        out.push(indicator);
                    }
                }
            }
            RuleNode::And(children) | RuleNode::Or(children) => {
                for child in children {
                    child.collect_indicators(out);
                }
            }
        }
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            RuleNode::Leaf(_) => 1,
            RuleNode::And(children) | RuleNode::Or(children) => {
                children.iter().map(RuleNode::leaf_count).sum()
            }
        }
    }

    /// Wire form, with defaults made explicit.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        match self {
            RuleNode::Leaf(leaf) => {
                let params: Map<String, Value> = leaf
                    .params
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(*v)))
                    .collect();
                obj.insert(leaf.name().to_string(), Value::Object(params));
            }
            RuleNode::And(children) => {
                obj.insert("AND".into(), children.iter().map(RuleNode::to_json).collect());
            }
            RuleNode::Or(children) => {
                obj.insert("OR".into(), children.iter().map(RuleNode::to_json).collect());
            }
        }
        Value::Object(obj)
    }
}

/// Compiled rule. Evaluation never fails: a missing column, an undefined
/// value or too few rows all evaluate to `false`.
pub struct Predicate {
    test: Box<dyn Fn(&BarTable) -> bool + Send + Sync>,
}

impl Predicate {
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&BarTable) -> bool + Send + Sync + 'static,
    {
        Self {
            test: Box::new(test),
        }
    }

    pub fn evaluate(&self, table: &BarTable) -> bool {
        (self.test)(table)
    }

    /// True iff every child is true.
    pub fn all(children: Vec<Predicate>) -> Self {
        Predicate::new(move |table| children.iter().all(|p| p.evaluate(table)))
    }

    /// True iff at least one child is true.
    pub fn any(children: Vec<Predicate>) -> Self {
        Predicate::new(move |table| children.iter().any(|p| p.evaluate(table)))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}
