//! Field-level validation results.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One reason a piece of checkout data is not acceptable.
///
/// `field` is a dotted path such as `checkout.shippingAddress.city`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Invalid {
    /// A required value is missing.
    Null { field: String },

    /// A required text value is missing or blank.
    BlankOrNull { field: String },

    /// A cached external snapshot is too old and must be fetched again.
    RefreshRequired { field: String },

    /// Any other violated constraint.
    Generic { field: String, reason: String },
}

impl Invalid {
    pub fn null(field: impl Into<String>) -> Self {
        Invalid::Null {
            field: field.into(),
        }
    }

    pub fn blank_or_null(field: impl Into<String>) -> Self {
        Invalid::BlankOrNull {
            field: field.into(),
        }
    }

    pub fn refresh_required(field: impl Into<String>) -> Self {
        Invalid::RefreshRequired {
            field: field.into(),
        }
    }

    pub fn generic(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Invalid::Generic {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the dotted path of the offending field.
    pub fn field(&self) -> &str {
        match self {
            Invalid::Null { field }
            | Invalid::BlankOrNull { field }
            | Invalid::RefreshRequired { field }
            | Invalid::Generic { field, .. } => field,
        }
    }

    pub fn is_refresh_required(&self) -> bool {
        matches!(self, Invalid::RefreshRequired { .. })
    }
}

impl std::fmt::Display for Invalid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Invalid::Null { field } => write!(f, "{field} is missing"),
            Invalid::BlankOrNull { field } => write!(f, "{field} must not be blank"),
            Invalid::RefreshRequired { field } => write!(f, "{field} requires a refresh"),
            Invalid::Generic { field, reason } => write!(f, "{field} {reason}"),
        }
    }
}

/// A non-empty collection of [`Invalid`] entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<Invalid>);

impl ValidationErrors {
    pub fn new(invalids: Vec<Invalid>) -> Self {
        Self(invalids)
    }

    /// Returns `Ok(())` when there is nothing to report.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }

    /// True if at least one entry asks for a snapshot refresh.
    pub fn requires_refresh(&self) -> bool {
        self.0.iter().any(Invalid::is_refresh_required)
    }

    pub fn extend(&mut self, invalids: impl IntoIterator<Item = Invalid>) {
        self.0.extend(invalids);
    }

    pub fn push(&mut self, invalid: Invalid) {
        self.0.push(invalid);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invalid> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Invalid> {
        self.0
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Joins a parent path and a field name.
pub fn path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

/// Reports a blank text value.
pub fn invalid_if_blank(parent: &str, field: &str, value: &str) -> Option<Invalid> {
    value
        .trim()
        .is_empty()
        .then(|| Invalid::blank_or_null(path(parent, field)))
}

/// Reports a value that does not match a pattern.
pub fn invalid_unless_match(
    parent: &str,
    field: &str,
    value: &str,
    pattern: &Regex,
) -> Option<Invalid> {
    (!pattern.is_match(value))
        .then(|| Invalid::generic(path(parent, field), "has an invalid format"))
}
