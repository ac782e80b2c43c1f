//! Label selector parsing.
//!
//! A selector is a comma-separated conjunction of requirements:
//!
//! ```text
//! env=prod                 label present with value
//! env==prod                same as `=`
//! env!=prod                no label with that key and value
//! env in (prod,staging)    label value is one of the set
//! env notin (prod,dev)     no label value from the set
//! env                      label key exists
//! !env                     label key absent
//! ```
//!
//! Keys may carry a DNS-style prefix (`example.com/env`). Commas inside a
//! parenthesised set belong to the set, not to the requirement list.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_NAME_LENGTH: usize = 63;
const MAX_PREFIX_LENGTH: usize = 253;

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").expect("valid name regex")
});

static VALUE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?)?$").expect("valid value regex")
});

static PREFIX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid prefix regex")
});

static SET_REQUIREMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<key>\S+)\s+(?P<op>in|notin)\s*\((?P<values>[^()]*)\)$")
        .expect("valid set requirement regex")
});

/// Errors raised while parsing a selector or a label key/value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelSelectorError {
    #[error("label selector cannot be empty")]
    Empty,

    #[error("'{0}' is not a valid label selector requirement")]
    InvalidRequirement(String),

    #[error("label key '{key}' is invalid: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("label value '{value}' is invalid: {reason}")]
    InvalidValue { value: String, reason: String },

    #[error("unbalanced parentheses in label selector '{0}'")]
    UnbalancedParentheses(String),
}

/// A label key, optionally prefixed (`prefix/name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelKey {
    pub prefix: Option<String>,
    pub name: String,
}

impl LabelKey {
    /// Parse and validate a `prefix/name` or bare `name` key
    pub fn parse(raw: &str) -> Result<Self, LabelSelectorError> {
        let invalid = |reason: &str| LabelSelectorError::InvalidKey {
            key: raw.to_string(),
            reason: reason.to_string(),
        };

        let (prefix, name) = match raw.split_once('/') {
            Some((prefix, name)) => (Some(prefix), name),
            None => (None, raw),
        };

        if let Some(prefix) = prefix {
            if prefix.is_empty() || prefix.len() > MAX_PREFIX_LENGTH {
                return Err(invalid("prefix must be between 1 and 253 characters"));
            }
            if !PREFIX_PATTERN.is_match(prefix) {
                return Err(invalid("prefix must be a valid DNS subdomain"));
            }
        }

        if name.is_empty() || name.len() > MAX_NAME_LENGTH {
            return Err(invalid("name must be between 1 and 63 characters"));
        }
        if !NAME_PATTERN.is_match(name) {
            return Err(invalid(
                "name must begin and end with an alphanumeric character and contain only alphanumerics, '-', '_' or '.'",
            ));
        }

        Ok(Self { prefix: prefix.map(str::to_string), name: name.to_string() })
    }
}

impl fmt::Display for LabelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}/{}", prefix, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Validate a label value
pub fn validate_label_value(value: &str) -> Result<(), LabelSelectorError> {
    if value.len() > MAX_NAME_LENGTH {
        return Err(LabelSelectorError::InvalidValue {
            value: value.to_string(),
            reason: "must be 63 characters or less".to_string(),
        });
    }
    if !VALUE_PATTERN.is_match(value) {
        return Err(LabelSelectorError::InvalidValue {
            value: value.to_string(),
            reason: "must begin and end with an alphanumeric character".to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelOperator {
    Equal,
    NotEqual,
    In,
    NotIn,
    Exists,
    NotExists,
}

impl LabelOperator {
    /// Whether matching resources must carry a qualifying label row
    pub fn is_inclusive(self) -> bool {
        matches!(self, Self::Equal | Self::In | Self::Exists)
    }
}

/// One requirement of a selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRequirement {
    pub key: LabelKey,
    pub operator: LabelOperator,
    /// Empty for `Exists`/`NotExists`, one value for `Equal`/`NotEqual`
    pub values: Vec<String>,
}

impl LabelRequirement {
    pub fn equal(key: LabelKey, value: impl Into<String>) -> Self {
        Self { key, operator: LabelOperator::Equal, values: vec![value.into()] }
    }

    pub fn exists(key: LabelKey) -> Self {
        Self { key, operator: LabelOperator::Exists, values: Vec::new() }
    }

    fn parse(raw: &str) -> Result<Self, LabelSelectorError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LabelSelectorError::InvalidRequirement(raw.to_string()));
        }

        if let Some(captures) = SET_REQUIREMENT.captures(raw) {
            let key = LabelKey::parse(&captures["key"])?;
            let operator =
                if &captures["op"] == "in" { LabelOperator::In } else { LabelOperator::NotIn };
            let values = captures["values"]
                .split(',')
                .map(str::trim)
                .map(|v| validate_label_value(v).map(|_| v.to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            if values.iter().any(String::is_empty) {
                return Err(LabelSelectorError::InvalidRequirement(raw.to_string()));
            }
            return Ok(Self { key, operator, values });
        }

        if let Some(key) = raw.strip_prefix('!') {
            return Ok(Self {
                key: LabelKey::parse(key.trim())?,
                operator: LabelOperator::NotExists,
                values: Vec::new(),
            });
        }

        let binary = raw
            .split_once("!=")
            .map(|(k, v)| (k, v, LabelOperator::NotEqual))
            .or_else(|| raw.split_once("==").map(|(k, v)| (k, v, LabelOperator::Equal)))
            .or_else(|| raw.split_once('=').map(|(k, v)| (k, v, LabelOperator::Equal)));

        match binary {
            Some((key, value, operator)) => {
                let value = value.trim();
                if value.contains('=') || value.contains('(') || value.contains(')') {
                    return Err(LabelSelectorError::InvalidRequirement(raw.to_string()));
                }
                validate_label_value(value)?;
                Ok(Self { key: LabelKey::parse(key.trim())?, operator, values: vec![value.to_string()] })
            }
            None if raw.contains(char::is_whitespace) || raw.contains(['(', ')']) => {
                Err(LabelSelectorError::InvalidRequirement(raw.to_string()))
            }
            None => Ok(Self::exists(LabelKey::parse(raw)?)),
        }
    }
}

impl fmt::Display for LabelRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            LabelOperator::Equal => write!(f, "{}={}", self.key, self.values.join("")),
            LabelOperator::NotEqual => write!(f, "{}!={}", self.key, self.values.join("")),
            LabelOperator::In => write!(f, "{} in ({})", self.key, self.values.join(",")),
            LabelOperator::NotIn => write!(f, "{} notin ({})", self.key, self.values.join(",")),
            LabelOperator::Exists => write!(f, "{}", self.key),
            LabelOperator::NotExists => write!(f, "!{}", self.key),
        }
    }
}

/// A parsed selector: every requirement must hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector {
    requirements: Vec<LabelRequirement>,
}

impl LabelSelector {
    pub fn requirements(&self) -> &[LabelRequirement] {
        &self.requirements
    }

    pub fn into_requirements(self) -> Vec<LabelRequirement> {
        self.requirements
    }
}

impl FromStr for LabelSelector {
    type Err = LabelSelectorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.trim().is_empty() {
            return Err(LabelSelectorError::Empty);
        }

        let requirements = split_requirements(raw)?
            .into_iter()
            .map(LabelRequirement::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { requirements })
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.requirements.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Split on top-level commas, keeping commas inside `( )` with their set
fn split_requirements(raw: &str) -> Result<Vec<&str>, LabelSelectorError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, ch) in raw.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| LabelSelectorError::UnbalancedParentheses(raw.to_string()))?;
            }
            ',' if depth == 0 => {
                parts.push(&raw[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(LabelSelectorError::UnbalancedParentheses(raw.to_string()));
    }
    parts.push(&raw[start..]);
    Ok(parts)
}
