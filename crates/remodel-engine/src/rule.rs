//! Rename rule and the identifier/key rewriters built on it
//!
//! Rewriting is textual: every occurrence of the old model name inside an
//! identifier is replaced, not just a leading `<model>_` token. An identifier
//! that already contains the new model name is left alone, which is what
//! keeps a second pass from rewriting `users_id` into `usersusers_id`.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RuleError;
use crate::field::Field;

/// Old and new model names for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRule")]
pub struct RenameRule {
    old: String,
    new: String,
}

#[derive(Deserialize)]
struct RawRule {
    old: String,
    new: String,
}

impl TryFrom<RawRule> for RenameRule {
    type Error = RuleError;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        Self::new(raw.old, raw.new)
    }
}

impl RenameRule {
    /// Create a rename rule
    ///
    /// # Errors
    /// - `RuleError::EmptyModelName` if either name is empty
    /// - `RuleError::IdenticalModelNames` if both names are equal
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Result<Self, RuleError> {
        let old = old.into();
        let new = new.into();

        if old.is_empty() {
            return Err(RuleError::EmptyModelName { which: "old" });
        }
        if new.is_empty() {
            return Err(RuleError::EmptyModelName { which: "new" });
        }
        if old == new {
            return Err(RuleError::IdenticalModelNames(old));
        }

        if old.contains(new.as_str()) {
            tracing::warn!(
                old = %old,
                new = %new,
                "old model name contains the new one; identifiers already containing '{}' will not be rewritten",
                new
            );
        }

        Ok(Self { old, new })
    }

    /// Model name being replaced
    #[inline]
    #[must_use]
    pub fn old(&self) -> &str {
        &self.old
    }

    /// Replacement model name
    #[inline]
    #[must_use]
    pub fn new_name(&self) -> &str {
        &self.new
    }

    /// Rewrite a single field identifier
    ///
    /// Borrowed input comes back borrowed when nothing changes.
    ///
    /// # Examples
    /// ```
    /// # use remodel_engine::RenameRule;
    /// let rule = RenameRule::new("customers", "users").unwrap();
    /// assert_eq!(rule.rewrite("customers_total_spend"), "users_total_spend");
    /// assert_eq!(rule.rewrite("users_total_spend"), "users_total_spend");
    /// assert_eq!(rule.rewrite("orders_amount"), "orders_amount");
    /// ```
    #[must_use]
    pub fn rewrite<'a>(&self, id: &'a str) -> Cow<'a, str> {
        if id.contains(self.new.as_str()) || !id.contains(self.old.as_str()) {
            return Cow::Borrowed(id);
        }
        Cow::Owned(id.replace(self.old.as_str(), &self.new))
    }

    /// Rewrite an identifier that may be absent
    #[inline]
    #[must_use]
    pub fn rewrite_opt(&self, id: Option<&str>) -> Option<String> {
        id.map(|id| self.rewrite(id).into_owned())
    }

    /// Rewrite an optional document key; `null` and absence carry over
    #[inline]
    #[must_use]
    pub fn rewrite_field(&self, id: &Field<String>) -> Field<String> {
        id.as_ref().map(|id| self.rewrite(id).into_owned())
    }

    /// Rewrite every identifier in a sequence, keeping order and length
    #[must_use]
    pub fn rewrite_all(&self, ids: &[String]) -> Vec<String> {
        ids.iter().map(|id| self.rewrite(id).into_owned()).collect()
    }

    /// Rewrite the keys of a mapping, carrying values over unchanged
    ///
    /// When two keys rewrite to the same output key the value of the later
    /// one wins; the entry stays at the position of the first.
    #[must_use]
    pub fn rewrite_keys(&self, map: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::with_capacity(map.len());
        for (key, value) in map {
            let new_key = self.rewrite(key).into_owned();
            if out.insert(new_key.clone(), value.clone()).is_some() {
                tracing::debug!(key = %key, rewritten = %new_key, "column key collision, keeping later value");
            }
        }
        out
    }

    /// Whole-string match, used for the chart's table name
    #[must_use]
    pub fn rewrite_exact(&self, name: &str) -> String {
        if name == self.old {
            self.new.clone()
        } else {
            name.to_string()
        }
    }
}
