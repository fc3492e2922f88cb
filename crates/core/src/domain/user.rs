use std::fmt;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Workflow role of a user. The backend has carried two spellings for the
/// approver role over its lifetime ("aprobador" and "approver"); both
/// canonicalize to [`Role::Approver`] here so that neither spelling silently
/// hides a valid approver. Anything unrecognized canonicalizes to
/// [`Role::Unset`], which blocks all workflow actions until the role-selection
/// step has run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Role {
    Requester,
    Approver,
    #[default]
    Unset,
}

impl Role {
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "solicitante" | "requester" => Self::Requester,
            "aprobador" | "approver" => Self::Approver,
            _ => Self::Unset,
        }
    }

    /// Primary wire spelling, `None` for a role that has not been chosen yet.
    pub fn as_wire(self) -> Option<&'static str> {
        match self {
            Self::Requester => Some("solicitante"),
            Self::Approver => Some("aprobador"),
            Self::Unset => None,
        }
    }

    pub fn is_approver(self) -> bool {
        self == Self::Approver
    }

    pub fn is_set(self) -> bool {
        self != Self::Unset
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Requester => "requester",
            Self::Approver => "approver",
            Self::Unset => "unset",
        };
        write!(f, "{label}")
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.as_wire() {
            Some(spelling) => serializer.serialize_str(spelling),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Unset, Self::from_wire))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl User {
    /// Display label used wherever the UI shows who someone is.
    pub fn label(&self) -> &str {
        if self.name.is_empty() { &self.email } else { &self.name }
    }
}
