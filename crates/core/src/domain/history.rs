use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::request::{RequestId, RequestStatus};
use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryEntryId(pub i64);

/// One confirmed status change, produced exclusively by the backend. The
/// client never synthesizes entries; it only orders and renders what the
/// detail snapshot returned. `old_status` is null for the creation entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    pub request_id: RequestId,
    pub actor_id: UserId,
    #[serde(default)]
    pub actor_name: Option<String>,
    #[serde(default)]
    pub old_status: Option<RequestStatus>,
    pub new_status: RequestStatus,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn actor_label(&self) -> String {
        match &self.actor_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("#{}", self.actor_id),
        }
    }

    pub fn describe_change(&self) -> String {
        match self.old_status {
            Some(old) => format!("{old} → {}", self.new_status),
            None => format!("new → {}", self.new_status),
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.created_at.to_rfc3339(), self.actor_label(), self.describe_change())?;
        if let Some(comment) = &self.comment {
            write!(f, " \"{comment}\"")?;
        }
        Ok(())
    }
}

/// Orders entries oldest-first by `created_at`. The sort is stable so the
/// backend's arrival order is preserved on ties; entries are never re-sorted
/// by id.
pub fn sort_oldest_first(entries: &mut [HistoryEntry]) {
    entries.sort_by_key(|entry| entry.created_at);
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{sort_oldest_first, HistoryEntry, HistoryEntryId};
    use crate::domain::request::{RequestId, RequestStatus};
    use crate::domain::user::UserId;

    fn entry(id: i64, at_secs: i64, new_status: RequestStatus) -> HistoryEntry {
        HistoryEntry {
            id: HistoryEntryId(id),
            request_id: RequestId(1),
            actor_id: UserId(7),
            actor_name: None,
            old_status: None,
            new_status,
            comment: None,
            created_at: Utc.timestamp_opt(at_secs, 0).unwrap(),
        }
    }

    #[test]
    fn entries_order_oldest_first() {
        let mut entries = vec![
            entry(3, 300, RequestStatus::Approved),
            entry(1, 100, RequestStatus::Pending),
            entry(2, 200, RequestStatus::Pending),
        ];
        sort_oldest_first(&mut entries);
        let ids: Vec<i64> = entries.iter().map(|entry| entry.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn ties_preserve_arrival_order_not_id_order() {
        let mut entries = vec![
            entry(9, 100, RequestStatus::Pending),
            entry(2, 100, RequestStatus::Approved),
        ];
        sort_oldest_first(&mut entries);
        let ids: Vec<i64> = entries.iter().map(|entry| entry.id.0).collect();
        assert_eq!(ids, vec![9, 2]);
    }

    #[test]
    fn creation_entry_describes_from_new() {
        let created = entry(1, 100, RequestStatus::Pending);
        assert_eq!(created.describe_change(), "new → pending");

        let mut approved = entry(2, 200, RequestStatus::Approved);
        approved.old_status = Some(RequestStatus::Pending);
        assert_eq!(approved.describe_change(), "pending → approved");
    }

    #[test]
    fn actor_label_falls_back_to_id() {
        let mut with_name = entry(1, 100, RequestStatus::Pending);
        with_name.actor_name = Some("Ana".to_owned());
        assert_eq!(with_name.actor_label(), "Ana");

        let without_name = entry(2, 100, RequestStatus::Pending);
        assert_eq!(without_name.actor_label(), "#7");
    }
}
