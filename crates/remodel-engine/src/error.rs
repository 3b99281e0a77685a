//! Error types for the rewrite engine
//!
//! Two families:
//! - Rule construction failures (rejected before any document is touched)
//! - Rewrite failures (fatal to one document, never to a run)

use serde_json::Value;

/// Invalid rename rule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// One of the model names is empty
    #[error("model name must not be empty ({which})")]
    EmptyModelName {
        /// Which side of the rule was empty (`old` or `new`)
        which: &'static str,
    },

    /// Old and new model names are the same
    #[error("old and new model names are identical: '{0}'")]
    IdenticalModelNames(String),
}

/// Failure rewriting a single chart document
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RewriteError {
    /// A filter node matched none of the recognised shapes
    #[error("invalid filter shape: {node}")]
    InvalidFilterShape {
        /// The offending node, for diagnostics
        node: Value,
    },
}

impl RewriteError {
    /// Create invalid filter shape error
    #[inline]
    #[must_use]
    pub fn invalid_filter_shape(node: &Value) -> Self {
        Self::InvalidFilterShape { node: node.clone() }
    }

    /// The offending filter node, if any
    #[inline]
    #[must_use]
    pub fn node(&self) -> Option<&Value> {
        match self {
            Self::InvalidFilterShape { node } => Some(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rule_error_display() {
        let err = RuleError::EmptyModelName { which: "old" };
        assert!(err.to_string().contains("old"));

        let err = RuleError::IdenticalModelNames("customers".to_string());
        assert!(err.to_string().contains("customers"));
    }

    #[test]
    fn rewrite_error_carries_node() {
        let node = json!({"unexpected": true});
        let err = RewriteError::invalid_filter_shape(&node);

        assert_eq!(err.node(), Some(&node));
        assert!(err.to_string().contains("unexpected"));
    }
}
