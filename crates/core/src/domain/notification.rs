use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::request::RequestId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub i64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One notification for the current session's user. `read_at == None` means
/// unread; marking as read is one-way and idempotent, and only the backend
/// ever sets `read_at`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    #[serde(default)]
    pub request_id: Option<RequestId>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Derived, never stored: the count of entries with a null `read_at`.
pub fn unread_count(entries: &[Notification]) -> usize {
    entries.iter().filter(|entry| !entry.is_read()).count()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{unread_count, Notification, NotificationId};

    fn notification(id: i64, read: bool) -> Notification {
        Notification {
            id: NotificationId(id),
            message: format!("notification {id}"),
            request_id: None,
            created_at: Utc.timestamp_opt(100, 0).unwrap(),
            read_at: read.then(|| Utc.timestamp_opt(200, 0).unwrap()),
        }
    }

    #[test]
    fn unread_count_matches_null_read_at_entries() {
        let entries =
            vec![notification(1, false), notification(2, true), notification(3, false)];
        assert_eq!(unread_count(&entries), 2);
        assert_eq!(unread_count(&[]), 0);
    }
}
