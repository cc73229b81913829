//! Rule compilation: validated [`RuleNode`] trees into executable [`Predicate`]s.

use crate::domain::error::ScannerError;
use crate::domain::rule::{Predicate, RuleNode};
use crate::domain::rule_parser::parse_rule;
use serde_json::Value;

/// Compile a validated tree. Infallible: the parser already checked every leaf
/// against the same registry entry that supplies its factory.
pub fn compile(rule: &RuleNode) -> Predicate {
    match rule {
        RuleNode::Leaf(leaf) => (leaf.spec.build)(&leaf.params),
        RuleNode::And(children) => Predicate::all(children.iter().map(compile).collect()),
        RuleNode::Or(children) => Predicate::any(children.iter().map(compile).collect()),
    }
}

/// Validate and compile a JSON rule tree.
pub fn build_rule(rule: &Value) -> Result<Predicate, ScannerError> {
    let tree = parse_rule(rule)?;
    Ok(compile(&tree))
}
