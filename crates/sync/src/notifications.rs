use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use tramite_client::{ApiError, ApprovalsApi};
use tramite_core::domain::notification::unread_count;
use tramite_core::{Notification, NotificationId, RequestId};

/// Unread-aware notification feed for the current session.
///
/// Refreshed on session change and by a periodic timer; the unread count is
/// always derived from the list, never stored, so the two cannot drift.
/// Operations are sequenced: a refresh whose snapshot was taken before a
/// concurrent mark-as-read completed must not resurrect that entry as unread.
#[derive(Clone)]
pub struct NotificationEngine {
    api: Arc<dyn ApprovalsApi>,
    state: Arc<Mutex<FeedState>>,
}

#[derive(Default)]
struct FeedState {
    entries: Vec<Notification>,
    /// Bumped by every completed local write; refresh snapshots taken under
    /// an older value are merged instead of applied wholesale.
    op_seq: u64,
}

impl NotificationEngine {
    pub fn new(api: Arc<dyn ApprovalsApi>) -> Self {
        Self { api, state: Arc::new(Mutex::new(FeedState::default())) }
    }

    pub fn entries(&self) -> Vec<Notification> {
        self.lock().entries.clone()
    }

    /// Count of entries with a null `read_at`; derived on every call.
    pub fn unread_count(&self) -> usize {
        unread_count(&self.lock().entries)
    }

    /// Replaces the full list with the backend's. If a mark-as-read completed
    /// while this snapshot was in flight, the later-completing write wins:
    /// locally-confirmed read entries are kept over the snapshot's stale
    /// unread rows.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let started_seq = self.lock().op_seq;
        let fetched = self.api.notifications().await?;

        let mut state = self.lock();
        if state.op_seq == started_seq {
            state.entries = fetched;
        } else {
            debug!(
                event_name = "notifications.stale_refresh_merged",
                "merging refresh snapshot taken before a completed write"
            );
            let merged: Vec<Notification> = fetched
                .into_iter()
                .map(|incoming| {
                    match state.entries.iter().find(|local| local.id == incoming.id) {
                        Some(local) if local.is_read() && !incoming.is_read() => local.clone(),
                        _ => incoming,
                    }
                })
                .collect();
            state.entries = merged;
        }
        Ok(())
    }

    /// Idempotent mark-as-read. An already-read local copy is a no-op that
    /// still yields the deep-link target; otherwise the backend is called and
    /// on success exactly that one entry is replaced with the server's
    /// returned representation. On failure the entry stays unread and nothing
    /// else in the list is touched.
    ///
    /// The returned `request_id` is the navigation target; callers must only
    /// navigate when this returns `Ok`, so a failed mark never hides its
    /// error behind a page change.
    pub async fn mark_read(&self, id: NotificationId) -> Result<Option<RequestId>, ApiError> {
        let local = self.lock().entries.iter().find(|entry| entry.id == id).cloned();
        if let Some(local) = &local {
            if local.is_read() {
                return Ok(local.request_id);
            }
        }

        let updated = match self.api.mark_notification_read(id).await {
            Ok(updated) => updated,
            Err(error) => {
                warn!(
                    event_name = "notifications.mark_read_failed",
                    notification_id = id.0,
                    error = %error,
                    "mark-as-read failed; entry stays unread"
                );
                return Err(error);
            }
        };

        let mut state = self.lock();
        state.op_seq += 1;
        if let Some(slot) = state.entries.iter_mut().find(|entry| entry.id == id) {
            *slot = updated.clone();
        }
        Ok(updated.request_id)
    }

    /// Session teardown: the next session starts from an empty feed.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.op_seq += 1;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FeedState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::NotificationEngine;
    use tramite_client::api::{
        ApprovalsApi, AuthSession, NewUser, RequestDetail, StatusChange, StatusChangeOutcome,
    };
    use tramite_client::{ApiError, InMemoryBackend};
    use tramite_core::{
        ApprovalRequest, NewRequest, NewRequestType, Notification, NotificationId, RequestId,
        RequestType, RequestTypeId, RequestTypePatch, Role, User, UserId,
    };

    async fn backend_with_two_notifications() -> (Arc<InMemoryBackend>, UserId) {
        let backend = Arc::new(InMemoryBackend::new());
        let requester = backend.seed_user("Luis", "luis@coe.dev", Role::Requester);
        let approver = backend.seed_user("Ana", "ana@coe.dev", Role::Approver);
        backend.sign_in_as(requester.id);
        for title in ["Despliegue pagos", "Acceso a base"] {
            backend
                .create_request(&NewRequest {
                    title: title.to_owned(),
                    description: "detalle".to_owned(),
                    type_key: "despliegue".to_owned(),
                    approver_id: approver.id,
                })
                .await
                .unwrap();
        }
        backend.sign_in_as(approver.id);
        (backend, approver.id)
    }

    #[tokio::test]
    async fn unread_count_is_derived_from_the_list() {
        let (backend, _) = backend_with_two_notifications().await;
        let engine = NotificationEngine::new(backend.clone());
        assert_eq!(engine.unread_count(), 0);

        engine.refresh().await.unwrap();
        assert_eq!(engine.entries().len(), 2);
        assert_eq!(engine.unread_count(), 2);

        let first = engine.entries()[0].id;
        engine.mark_read(first).await.unwrap();
        assert_eq!(engine.unread_count(), 1);
    }

    #[tokio::test]
    async fn mark_read_replaces_exactly_one_entry() {
        let (backend, _) = backend_with_two_notifications().await;
        let engine = NotificationEngine::new(backend.clone());
        engine.refresh().await.unwrap();

        let before = engine.entries();
        let target = before[0].id;
        let link = engine.mark_read(target).await.unwrap();
        assert!(link.is_some());

        let after = engine.entries();
        assert!(after[0].is_read());
        assert_eq!(after[1], before[1]);
    }

    #[tokio::test]
    async fn already_read_entry_is_a_local_noop_with_the_link() {
        let (backend, _) = backend_with_two_notifications().await;
        let engine = NotificationEngine::new(backend.clone());
        engine.refresh().await.unwrap();

        let target = engine.entries()[0].id;
        engine.mark_read(target).await.unwrap();
        let calls_after_first = backend.mark_read_calls();

        let link = engine.mark_read(target).await.unwrap();
        assert!(link.is_some());
        assert_eq!(backend.mark_read_calls(), calls_after_first);
    }

    #[tokio::test]
    async fn session_change_starts_from_an_empty_feed() {
        let (backend, _) = backend_with_two_notifications().await;
        let engine = NotificationEngine::new(backend.clone());
        engine.refresh().await.unwrap();
        assert_eq!(engine.entries().len(), 2);

        engine.clear();
        assert!(engine.entries().is_empty());
        assert_eq!(engine.unread_count(), 0);
    }

    /// Serves a feed snapshot, optionally holding the response open so a
    /// mark-as-read can complete in between.
    struct GatedFeed {
        entries: Mutex<Vec<Notification>>,
        gate: tokio::sync::Notify,
        hold_refresh: AtomicBool,
    }

    impl GatedFeed {
        fn new(entries: Vec<Notification>) -> Self {
            Self {
                entries: Mutex::new(entries),
                gate: tokio::sync::Notify::new(),
                hold_refresh: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl ApprovalsApi for GatedFeed {
        async fn login_with_credential(&self, _: &str) -> Result<AuthSession, ApiError> {
            unreachable!("not used by the feed tests")
        }

        async fn set_role(&self, _: UserId, _: Role) -> Result<User, ApiError> {
            unreachable!("not used by the feed tests")
        }

        async fn users(&self) -> Result<Vec<User>, ApiError> {
            unreachable!("not used by the feed tests")
        }

        async fn create_user(&self, _: &NewUser) -> Result<User, ApiError> {
            unreachable!("not used by the feed tests")
        }

        async fn request_types(&self) -> Result<Vec<RequestType>, ApiError> {
            unreachable!("not used by the feed tests")
        }

        async fn create_request_type(
            &self,
            _: &NewRequestType,
        ) -> Result<RequestType, ApiError> {
            unreachable!("not used by the feed tests")
        }

        async fn update_request_type(
            &self,
            _: RequestTypeId,
            _: &RequestTypePatch,
        ) -> Result<RequestType, ApiError> {
            unreachable!("not used by the feed tests")
        }

        async fn deactivate_request_type(&self, _: RequestTypeId) -> Result<RequestType, ApiError> {
            unreachable!("not used by the feed tests")
        }

        async fn create_request(&self, _: &NewRequest) -> Result<ApprovalRequest, ApiError> {
            unreachable!("not used by the feed tests")
        }

        async fn request_detail(&self, _: RequestId) -> Result<RequestDetail, ApiError> {
            unreachable!("not used by the feed tests")
        }

        async fn requests_by_approver(
            &self,
            _: UserId,
        ) -> Result<Vec<ApprovalRequest>, ApiError> {
            unreachable!("not used by the feed tests")
        }

        async fn pending_requests(&self, _: UserId) -> Result<Vec<ApprovalRequest>, ApiError> {
            unreachable!("not used by the feed tests")
        }

        async fn change_status(
            &self,
            _: RequestId,
            _: &StatusChange,
        ) -> Result<StatusChangeOutcome, ApiError> {
            unreachable!("not used by the feed tests")
        }

        async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
            // Snapshot first, then (maybe) wait: the response carries the
            // state as of issuance time, like a real in-flight poll.
            let snapshot = self.entries.lock().unwrap().clone();
            if self.hold_refresh.load(Ordering::SeqCst) {
                self.gate.notified().await;
            }
            Ok(snapshot)
        }

        async fn mark_notification_read(
            &self,
            id: NotificationId,
        ) -> Result<Notification, ApiError> {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries
                .iter_mut()
                .find(|entry| entry.id == id)
                .ok_or(ApiError::NotFound { message: "notification not found".to_owned() })?;
            if entry.read_at.is_none() {
                entry.read_at = Some(Utc::now());
            }
            Ok(entry.clone())
        }
    }

    fn unread(id: i64) -> Notification {
        Notification {
            id: NotificationId(id),
            message: format!("notification {id}"),
            request_id: Some(RequestId(id)),
            created_at: Utc::now(),
            read_at: None,
        }
    }

    #[tokio::test]
    async fn stale_refresh_does_not_resurrect_a_read_entry() {
        let feed = Arc::new(GatedFeed::new(vec![unread(1), unread(2)]));
        let engine = NotificationEngine::new(feed.clone());
        engine.refresh().await.unwrap();

        // A poll goes out and snapshots both entries as unread, then stalls.
        feed.hold_refresh.store(true, Ordering::SeqCst);
        let stale_refresh = tokio::spawn({
            let engine = engine.clone();
            async move { engine.refresh().await }
        });
        tokio::task::yield_now().await;

        // The mark-as-read completes while the poll is still in flight.
        engine.mark_read(NotificationId(1)).await.unwrap();
        assert_eq!(engine.unread_count(), 1);

        // The stale snapshot lands last; the later-completing write wins.
        feed.hold_refresh.store(false, Ordering::SeqCst);
        feed.gate.notify_waiters();
        stale_refresh.await.unwrap().unwrap();

        let entries = engine.entries();
        assert!(entries.iter().find(|entry| entry.id == NotificationId(1)).unwrap().is_read());
        assert_eq!(engine.unread_count(), 1);
    }

    #[tokio::test]
    async fn failed_mark_read_leaves_the_list_intact() {
        let feed = Arc::new(GatedFeed::new(vec![unread(1)]));
        let engine = NotificationEngine::new(feed.clone());
        engine.refresh().await.unwrap();

        let result = engine.mark_read(NotificationId(99)).await;
        assert!(matches!(result, Err(ApiError::NotFound { .. })));
        assert_eq!(engine.unread_count(), 1);
        assert_eq!(engine.entries().len(), 1);
    }
}
