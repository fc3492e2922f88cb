use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestTypeId(pub i64);

impl fmt::Display for RequestTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalog entry describing one kind of request. Deactivation is a soft
/// delete: existing requests keep referencing a deactivated type by `key`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestType {
    pub id: RequestTypeId,
    pub key: String,
    pub label: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequestType {
    pub key: String,
    pub label: String,
    pub category: String,
    pub description: Option<String>,
}

impl NewRequestType {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("key", &self.key)?;
        require("label", &self.label)?;
        require("category", &self.category)?;
        Ok(())
    }

    /// Trimmed copy ready for submission.
    pub fn normalized(&self) -> Self {
        Self {
            key: self.key.trim().to_owned(),
            label: self.label.trim().to_owned(),
            category: self.category.trim().to_owned(),
            description: self
                .description
                .as_deref()
                .map(str::trim)
                .filter(|description| !description.is_empty())
                .map(str::to_owned),
        }
    }
}

/// Partial update payload for `PATCH /request-types/:id`. Absent fields are
/// left untouched by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTypePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(())
}
