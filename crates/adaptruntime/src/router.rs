//! Router condition evaluation.
//!
//! Expression forms:
//!
//! - any expression containing `success` is true when `context.success == true`
//! - otherwise, any expression containing `error` is true when the context has
//!   an `error` field
//! - otherwise, `a == b` or `a === b` compares two identifier-like tokens.
//!   Each token is looked up in the context, then in `context.result`;
//!   unresolved or quoted tokens are literal strings
//! - anything else is false

use adaptcore::{NodeId, RouterConfig, Workflow};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(['"]?)([A-Za-z0-9_.\-]+)(['"]?)$"#).unwrap());

pub fn evaluate_condition(expression: &str, context: &Value) -> bool {
    if expression.contains("success") {
        return context.get("success").and_then(Value::as_bool) == Some(true);
    }
    if expression.contains("error") {
        return context.get("error").is_some();
    }
    equality(expression, context).unwrap_or(false)
}

fn equality(expression: &str, context: &Value) -> Option<bool> {
    let (left, right) = match expression.split_once("===") {
        Some(parts) => parts,
        None => expression.split_once("==")?,
    };
    if right.contains("==") {
        return None;
    }
    let left = operand(left.trim(), context)?;
    let right = operand(right.trim(), context)?;
    Some(left == right)
}

fn operand(token: &str, context: &Value) -> Option<String> {
    let caps = TOKEN.captures(token)?;
    let name = caps.get(2)?.as_str();
    let quoted = !caps[1].is_empty() || !caps[3].is_empty();
    if quoted {
        return Some(name.to_string());
    }

    let resolved = lookup(context, name).or_else(|| context.get("result").and_then(|r| lookup(r, name)));
    Some(match resolved {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => name.to_string(),
    })
}

/// Dotted path lookup, `a.b.c`
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| current.get(key))
}

/// Next node after `router_id`: first matching condition's `thenNode`, else
/// the first declared `elseNode`, else the router's first outgoing edge.
pub fn next_node(
    router_id: &str,
    config: &RouterConfig,
    context: &Value,
    workflow: &Workflow,
) -> Option<NodeId> {
    for condition in &config.conditions {
        if let Some(then_node) = &condition.then_node {
            if evaluate_condition(&condition.expression, context) {
                tracing::debug!(
                    router = router_id,
                    expression = %condition.expression,
                    next = %then_node,
                    "router condition matched"
                );
                return Some(then_node.clone());
            }
        }
    }

    config
        .conditions
        .iter()
        .find_map(|c| c.else_node.clone())
        .or_else(|| workflow.outgoing(router_id).next().map(|e| e.target.clone()))
}
