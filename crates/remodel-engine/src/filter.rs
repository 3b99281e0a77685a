//! Filter tree rewriting
//!
//! A chart's filters are stored as raw JSON and classified into a
//! [`FilterNode`] tree while rewriting. Node shapes are checked in a fixed
//! order because a node can carry more than one of the recognised keys:
//!
//! ```text
//! null / {} / blank scalar  -> Empty
//! dimensions | metrics      -> Group
//! and                       -> And
//! or                        -> Or
//! target                    -> Leaf
//! anything else             -> InvalidFilterShape
//! ```
//!
//! Keys a node carries besides its children (ids, operators, values) are kept
//! in place, so converting back to JSON preserves key order.

use serde_json::{Map, Value};

use crate::error::RewriteError;
use crate::rule::RenameRule;

const DIMENSIONS: &str = "dimensions";
const METRICS: &str = "metrics";
const AND: &str = "and";
const OR: &str = "or";
const TARGET: &str = "target";
const FIELD_ID: &str = "fieldId";

/// One node of a filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// `null`, `{}` or a blank scalar (`false`, `0`, `""`, `[]`); kept as is
    Empty(Value),
    /// Top-level split into dimension and metric filters
    Group(FilterGroup),
    /// All children must hold
    And(FilterJunction),
    /// Any child must hold
    Or(FilterJunction),
    /// A single rule on one field
    Leaf(FilterLeaf),
}

/// Dimension/metric split; either branch may be absent
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGroup {
    /// Dimension filters
    pub dimensions: Option<Box<FilterNode>>,
    /// Metric filters
    pub metrics: Option<Box<FilterNode>>,
    fields: Map<String, Value>,
}

/// Ordered children of an `and` / `or` node
#[derive(Debug, Clone, PartialEq)]
pub struct FilterJunction {
    /// Child nodes, in stored order
    pub children: Vec<FilterNode>,
    fields: Map<String, Value>,
}

/// A filter rule targeting one field
#[derive(Debug, Clone, PartialEq)]
pub struct FilterLeaf {
    target: Map<String, Value>,
    fields: Map<String, Value>,
}

impl FilterLeaf {
    /// Field the rule targets, if present
    #[must_use]
    pub fn field_id(&self) -> Option<&str> {
        self.target.get(FIELD_ID).and_then(Value::as_str)
    }
}

impl FilterNode {
    /// Classify a JSON filter tree
    ///
    /// # Errors
    /// `RewriteError::InvalidFilterShape` for the first node that matches none
    /// of the recognised shapes.
    pub fn parse(value: &Value) -> Result<Self, RewriteError> {
        let obj = match value {
            Value::Object(obj) => obj,
            _ if is_blank(value) => return Ok(Self::Empty(value.clone())),
            _ => return Err(RewriteError::invalid_filter_shape(value)),
        };

        if obj.is_empty() {
            return Ok(Self::Empty(value.clone()));
        }

        if obj.contains_key(DIMENSIONS) || obj.contains_key(METRICS) {
            let branch = |key: &str| -> Result<Option<Box<Self>>, RewriteError> {
                obj.get(key)
                    .map(|child| Self::parse(child).map(Box::new))
                    .transpose()
            };
            return Ok(Self::Group(FilterGroup {
                dimensions: branch(DIMENSIONS)?,
                metrics: branch(METRICS)?,
                fields: shell(obj, &[DIMENSIONS, METRICS]),
            }));
        }

        if let Some(children) = obj.get(AND) {
            return FilterJunction::parse(value, obj, AND, children).map(Self::And);
        }

        if let Some(children) = obj.get(OR) {
            return FilterJunction::parse(value, obj, OR, children).map(Self::Or);
        }

        if let Some(target) = obj.get(TARGET) {
            let Value::Object(target) = target else {
                return Err(RewriteError::invalid_filter_shape(value));
            };
            return Ok(Self::Leaf(FilterLeaf {
                target: target.clone(),
                fields: shell(obj, &[TARGET]),
            }));
        }

        Err(RewriteError::invalid_filter_shape(value))
    }

    /// Rewrite every leaf's field id, keeping the tree shape
    #[must_use]
    pub fn rewrite(&self, rule: &RenameRule) -> Self {
        match self {
            Self::Empty(value) => Self::Empty(value.clone()),
            Self::Group(group) => Self::Group(FilterGroup {
                dimensions: group.dimensions.as_ref().map(|n| Box::new(n.rewrite(rule))),
                metrics: group.metrics.as_ref().map(|n| Box::new(n.rewrite(rule))),
                fields: group.fields.clone(),
            }),
            Self::And(junction) => Self::And(junction.rewrite(rule)),
            Self::Or(junction) => Self::Or(junction.rewrite(rule)),
            Self::Leaf(leaf) => {
                let mut target = leaf.target.clone();
                if let Some(Value::String(id)) = leaf.target.get(FIELD_ID) {
                    target.insert(FIELD_ID.to_string(), Value::String(rule.rewrite(id).into_owned()));
                }
                Self::Leaf(FilterLeaf {
                    target,
                    fields: leaf.fields.clone(),
                })
            }
        }
    }

    /// Field ids of every leaf, depth first
    #[must_use]
    pub fn field_ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_field_ids(&mut out);
        out
    }

    fn collect_field_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Empty(_) => {}
            Self::Group(group) => {
                for branch in [&group.dimensions, &group.metrics].into_iter().flatten() {
                    branch.collect_field_ids(out);
                }
            }
            Self::And(junction) | Self::Or(junction) => {
                for child in &junction.children {
                    child.collect_field_ids(out);
                }
            }
            Self::Leaf(leaf) => out.extend(leaf.field_id()),
        }
    }

    /// Convert back to JSON
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Empty(value) => value.clone(),
            Self::Group(group) => {
                let mut fields = group.fields.clone();
                if let Some(node) = &group.dimensions {
                    fields.insert(DIMENSIONS.to_string(), node.to_value());
                }
                if let Some(node) = &group.metrics {
                    fields.insert(METRICS.to_string(), node.to_value());
                }
                Value::Object(fields)
            }
            Self::And(junction) => junction.to_value(AND),
            Self::Or(junction) => junction.to_value(OR),
            Self::Leaf(leaf) => {
                let mut fields = leaf.fields.clone();
                fields.insert(TARGET.to_string(), Value::Object(leaf.target.clone()));
                Value::Object(fields)
            }
        }
    }
}

impl FilterJunction {
    fn parse(
        node: &Value,
        obj: &Map<String, Value>,
        key: &str,
        children: &Value,
    ) -> Result<Self, RewriteError> {
        let Value::Array(children) = children else {
            return Err(RewriteError::invalid_filter_shape(node));
        };
        Ok(Self {
            children: children
                .iter()
                .map(FilterNode::parse)
                .collect::<Result<_, _>>()?,
            fields: shell(obj, &[key]),
        })
    }

    fn rewrite(&self, rule: &RenameRule) -> Self {
        Self {
            children: self.children.iter().map(|c| c.rewrite(rule)).collect(),
            fields: self.fields.clone(),
        }
    }

    fn to_value(&self, key: &str) -> Value {
        let mut fields = self.fields.clone();
        fields.insert(
            key.to_string(),
            Value::Array(self.children.iter().map(FilterNode::to_value).collect()),
        );
        Value::Object(fields)
    }
}

impl TryFrom<&Value> for FilterNode {
    type Error = RewriteError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<&FilterNode> for Value {
    fn from(node: &FilterNode) -> Self {
        node.to_value()
    }
}

/// Rewrite an optional JSON filter tree
///
/// # Errors
/// `RewriteError::InvalidFilterShape` if any node is unrecognised; the tree
/// walk stops at the first one.
pub fn rewrite_filters(
    filters: Option<&Value>,
    rule: &RenameRule,
) -> Result<Option<Value>, RewriteError> {
    filters.map(|tree| rewrite_filter_tree(tree, rule)).transpose()
}

/// Rewrite one JSON filter tree
///
/// # Errors
/// `RewriteError::InvalidFilterShape` if any node is unrecognised.
pub fn rewrite_filter_tree(tree: &Value, rule: &RenameRule) -> Result<Value, RewriteError> {
    Ok(FilterNode::parse(tree)?.rewrite(rule).to_value())
}

/// Stored placeholders for "no filter"
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Bool(true) | Value::Object(_) => false,
    }
}

/// Copy of a node's keys with child slots nulled; children are re-inserted
/// at the same position on output.
fn shell(obj: &Map<String, Value>, child_keys: &[&str]) -> Map<String, Value> {
    obj.iter()
        .map(|(k, v)| {
            let v = if child_keys.contains(&k.as_str()) {
                Value::Null
            } else {
                v.clone()
            };
            (k.clone(), v)
        })
        .collect()
}
