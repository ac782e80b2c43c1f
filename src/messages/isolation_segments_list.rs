//! Isolation segment list request
//!
//! Accepts filter params either as a JSON object or a query string. List
//! filters may be given as arrays or comma-separated strings; page numbers as
//! numbers or numeric strings.

use crate::domain::LabelSelector;
use crate::errors::{IsosegError, Result};
use crate::messages::pagination::{Ordering, PaginationOptions, DEFAULT_PAGE, DEFAULT_PER_PAGE};
use serde::Deserialize;
use std::collections::BTreeSet;
use validator::{Validate, ValidationError};

pub const ALLOWED_KEYS: &[&str] = &[
    "guids",
    "names",
    "organization_guids",
    "label_selector",
    "page",
    "per_page",
    "order_by",
];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringList {
    Many(Vec<String>),
    Joined(String),
}

impl StringList {
    fn into_vec(self) -> Vec<String> {
        match self {
            StringList::Many(values) => values,
            StringList::Joined(joined) if joined.is_empty() => Vec::new(),
            StringList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Number {
    Int(i64),
    Text(String),
}

impl Number {
    fn parse(self, field: &'static str) -> Result<u32> {
        let value = match self {
            Number::Int(value) => value,
            Number::Text(text) => text.trim().parse::<i64>().map_err(|_| {
                IsosegError::validation_field(format!("{} must be an integer", field), field)
            })?,
        };
        // Out of range values are reported by the validator bounds below
        Ok(u32::try_from(value.max(0)).unwrap_or(u32::MAX))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParams {
    guids: Option<StringList>,
    names: Option<StringList>,
    organization_guids: Option<StringList>,
    label_selector: Option<String>,
    page: Option<Number>,
    per_page: Option<Number>,
    order_by: Option<String>,
}

fn validate_entries(values: &[String]) -> std::result::Result<(), ValidationError> {
    if values.iter().any(|v| v.trim().is_empty()) {
        let mut error = ValidationError::new("blank_entry");
        error.message = Some("must not contain blank entries".into());
        return Err(error);
    }
    Ok(())
}

/// Validated filter criteria for listing isolation segments
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct IsolationSegmentsListMessage {
    #[validate(custom(function = "validate_entries"))]
    guids: Option<Vec<String>>,

    #[validate(custom(function = "validate_entries"))]
    names: Option<Vec<String>>,

    #[validate(custom(function = "validate_entries"))]
    organization_guids: Option<Vec<String>>,

    label_selector: Option<LabelSelector>,

    #[validate(range(min = 1, message = "Page must be greater than 0"))]
    page: u32,

    #[validate(range(min = 1, max = 5000, message = "Per page must be between 1 and 5000"))]
    per_page: u32,

    ordering: Ordering,

    requested: BTreeSet<&'static str>,
}

impl Default for IsolationSegmentsListMessage {
    fn default() -> Self {
        Self {
            guids: None,
            names: None,
            organization_guids: None,
            label_selector: None,
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            ordering: Ordering::default(),
            requested: BTreeSet::new(),
        }
    }
}

impl IsolationSegmentsListMessage {
    /// Build a message from a JSON object of params
    pub fn from_params(params: &serde_json::Value) -> Result<Self> {
        if let Some(object) = params.as_object() {
            let mut unknown: Vec<&str> = object
                .keys()
                .map(String::as_str)
                .filter(|k| !ALLOWED_KEYS.contains(k))
                .collect();
            if !unknown.is_empty() {
                unknown.sort_unstable();
                return Err(IsosegError::validation(format!(
                    "Unknown query parameter(s): '{}'. Valid parameters are: '{}'",
                    unknown.join("', '"),
                    ALLOWED_KEYS.join("', '")
                )));
            }
        } else if !params.is_null() {
            return Err(IsosegError::validation("Params must be an object"));
        }

        let raw: RawParams = if params.is_null() {
            serde_json::from_value(serde_json::json!({}))?
        } else {
            serde_json::from_value(params.clone())
                .map_err(|e| IsosegError::validation(format!("Invalid params: {}", e)))?
        };

        Self::from_raw(raw)
    }

    /// Build a message from `guids=a,b&names=x&page=2`
    pub fn from_query_string(query: &str) -> Result<Self> {
        let mut object = serde_json::Map::new();
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            object.insert(key.into_owned(), serde_json::Value::String(value.into_owned()));
        }
        Self::from_params(&serde_json::Value::Object(object))
    }

    fn from_raw(raw: RawParams) -> Result<Self> {
        let mut message = Self::default();

        if let Some(guids) = raw.guids {
            message.requested.insert("guids");
            message.guids = Some(guids.into_vec());
        }
        if let Some(names) = raw.names {
            message.requested.insert("names");
            message.names = Some(names.into_vec());
        }
        if let Some(org_guids) = raw.organization_guids {
            message.requested.insert("organization_guids");
            message.organization_guids = Some(org_guids.into_vec());
        }
        if let Some(selector) = raw.label_selector {
            message.requested.insert("label_selector");
            let selector = selector
                .parse::<LabelSelector>()
                .map_err(|e| IsosegError::validation_field(e.to_string(), "label_selector"))?;
            message.label_selector = Some(selector);
        }
        if let Some(page) = raw.page {
            message.requested.insert("page");
            message.page = page.parse("page")?;
        }
        if let Some(per_page) = raw.per_page {
            message.requested.insert("per_page");
            message.per_page = per_page.parse("per_page")?;
        }
        if let Some(order_by) = raw.order_by {
            message.requested.insert("order_by");
            message.ordering = order_by.parse()?;
        }

        message.validate()?;
        Ok(message)
    }

    /// Whether `key` was supplied, even if its value was empty
    pub fn requested(&self, key: &str) -> bool {
        self.requested.contains(key)
    }

    pub fn guids(&self) -> Option<&Vec<String>> {
        self.guids.as_ref()
    }

    pub fn names(&self) -> Option<&Vec<String>> {
        self.names.as_ref()
    }

    pub fn organization_guids(&self) -> Option<&Vec<String>> {
        self.organization_guids.as_ref()
    }

    pub fn label_selector(&self) -> Option<&LabelSelector> {
        self.label_selector.as_ref()
    }

    pub fn pagination(&self) -> PaginationOptions {
        PaginationOptions { page: self.page, per_page: self.per_page, ordering: self.ordering }
    }
}
