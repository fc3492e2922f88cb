use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub i64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of an approval request. `Approved` and `Rejected` are terminal
/// absorbing states. The backend has emitted both Spanish and English
/// spellings; both are accepted on input and the primary wire spelling is
/// emitted on output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pendiente" | "pending" => Some(Self::Pending),
            "aprobado" | "approved" => Some(Self::Approved),
            "rechazado" | "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Pending => "pendiente",
            Self::Approved => "aprobado",
            Self::Rejected => "rechazado",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        write!(f, "{label}")
    }
}

impl Serialize for RequestStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for RequestStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::from_wire(&raw)
            .ok_or_else(|| de::Error::custom(format!("unknown request status `{raw}`")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: RequestId,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub type_key: String,
    pub status: RequestStatus,
    pub requester_id: UserId,
    pub approver_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::RequestStatus;

    #[test]
    fn both_status_spellings_canonicalize() {
        assert_eq!(RequestStatus::from_wire("pendiente"), Some(RequestStatus::Pending));
        assert_eq!(RequestStatus::from_wire("pending"), Some(RequestStatus::Pending));
        assert_eq!(RequestStatus::from_wire("aprobado"), Some(RequestStatus::Approved));
        assert_eq!(RequestStatus::from_wire("Approved"), Some(RequestStatus::Approved));
        assert_eq!(RequestStatus::from_wire("rechazado"), Some(RequestStatus::Rejected));
        assert_eq!(RequestStatus::from_wire("rejected"), Some(RequestStatus::Rejected));
    }

    #[test]
    fn unknown_status_is_a_decode_error() {
        assert_eq!(RequestStatus::from_wire("archived"), None);
        let result: Result<RequestStatus, _> = serde_json::from_str(r#""archived""#);
        assert!(result.is_err());
    }

    #[test]
    fn terminal_statuses_absorb() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
    }

    #[test]
    fn status_round_trips_through_primary_spelling() {
        let json = serde_json::to_string(&RequestStatus::Approved).unwrap();
        assert_eq!(json, r#""aprobado""#);
        let back: RequestStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RequestStatus::Approved);
    }
}
