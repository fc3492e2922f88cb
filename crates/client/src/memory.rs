use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use tramite_core::domain::history::sort_oldest_first;
use tramite_core::{
    ApprovalRequest, HistoryEntry, HistoryEntryId, NewRequest, NewRequestType, Notification,
    NotificationId, RequestId, RequestStatus, RequestType, RequestTypeId, RequestTypePatch, Role,
    User, UserId,
};

use crate::api::{
    ApprovalsApi, AuthSession, NewUser, RequestDetail, StatusChange, StatusChangeOutcome,
};
use crate::error::ApiError;

/// In-process stand-in for the backend, mirroring its observable semantics:
/// creation seeds a `null → pending` history entry and notifies the approver,
/// a confirmed transition appends exactly one entry and notifies the
/// requester, and re-applying a terminal status is a `changed = false` no-op.
///
/// Used by the engine tests and by offline smoke runs; the acting identity is
/// whoever logged in last (or was injected with [`InMemoryBackend::sign_in_as`]).
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    users: Vec<User>,
    types: Vec<RequestType>,
    requests: Vec<ApprovalRequest>,
    history: Vec<HistoryEntry>,
    notifications: Vec<(UserId, Notification)>,
    actor: Option<UserId>,
    next_user_id: i64,
    next_type_id: i64,
    next_request_id: i64,
    next_history_id: i64,
    next_notification_id: i64,
    change_status_calls: usize,
    mark_read_calls: usize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_user(&self, name: &str, email: &str, role: Role) -> User {
        let mut state = self.lock();
        state.next_user_id += 1;
        let user = User {
            id: UserId(state.next_user_id),
            name: name.to_owned(),
            email: email.to_owned(),
            role,
        };
        state.users.push(user.clone());
        user
    }

    pub fn seed_request_type(&self, key: &str, label: &str, category: &str) -> RequestType {
        let mut state = self.lock();
        state.next_type_id += 1;
        let request_type = RequestType {
            id: RequestTypeId(state.next_type_id),
            key: key.to_owned(),
            label: label.to_owned(),
            category: category.to_owned(),
            description: None,
            active: true,
        };
        state.types.push(request_type.clone());
        request_type
    }

    /// Sets the acting identity directly, as if a token for this user had
    /// been presented.
    pub fn sign_in_as(&self, user_id: UserId) {
        self.lock().actor = Some(user_id);
    }

    pub fn sign_out(&self) {
        self.lock().actor = None;
    }

    /// How many transition intents reached the backend. Lets tests assert
    /// that a locally-denied transition issued no call at all.
    pub fn change_status_calls(&self) -> usize {
        self.lock().change_status_calls
    }

    /// How many mark-as-read calls reached the backend; an already-read local
    /// copy must not produce one.
    pub fn mark_read_calls(&self) -> usize {
        self.lock().mark_read_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl State {
    fn actor(&self) -> Result<User, ApiError> {
        let actor_id = self.actor.ok_or(ApiError::SessionExpired {
            message: "authentication required".to_owned(),
        })?;
        self.users
            .iter()
            .find(|user| user.id == actor_id)
            .cloned()
            .ok_or(ApiError::SessionExpired { message: "unknown session user".to_owned() })
    }

    fn push_notification(&mut self, recipient: UserId, message: String, request_id: RequestId) {
        self.next_notification_id += 1;
        let notification = Notification {
            id: NotificationId(self.next_notification_id),
            message,
            request_id: Some(request_id),
            created_at: Utc::now(),
            read_at: None,
        };
        self.notifications.push((recipient, notification));
    }

    fn push_history(
        &mut self,
        request_id: RequestId,
        actor: &User,
        old_status: Option<RequestStatus>,
        new_status: RequestStatus,
        comment: Option<String>,
    ) {
        self.next_history_id += 1;
        self.history.push(HistoryEntry {
            id: HistoryEntryId(self.next_history_id),
            request_id,
            actor_id: actor.id,
            actor_name: Some(actor.name.clone()),
            old_status,
            new_status,
            comment,
            created_at: Utc::now(),
        });
    }
}

#[async_trait]
impl ApprovalsApi for InMemoryBackend {
    /// The fake credential exchange treats the credential as the account
    /// email: first login creates the user with an unset role, mirroring the
    /// backend's first-login behavior.
    async fn login_with_credential(&self, credential: &str) -> Result<AuthSession, ApiError> {
        let email = credential.trim().to_ascii_lowercase();
        if email.is_empty() {
            return Err(ApiError::SessionExpired { message: "invalid credential".to_owned() });
        }

        let mut state = self.lock();
        let user = match state.users.iter().find(|user| user.email == email).cloned() {
            Some(user) => user,
            None => {
                state.next_user_id += 1;
                let name = email.split('@').next().unwrap_or(&email).to_owned();
                let user = User {
                    id: UserId(state.next_user_id),
                    name,
                    email: email.clone(),
                    role: Role::Unset,
                };
                state.users.push(user.clone());
                user
            }
        };
        state.actor = Some(user.id);

        Ok(AuthSession { token: format!("token-{}", user.id), user })
    }

    async fn set_role(&self, user_id: UserId, role: Role) -> Result<User, ApiError> {
        let mut state = self.lock();
        state.actor()?;
        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or(ApiError::NotFound { message: format!("user #{user_id} not found") })?;
        user.role = role;
        Ok(user.clone())
    }

    async fn users(&self) -> Result<Vec<User>, ApiError> {
        let state = self.lock();
        state.actor()?;
        Ok(state.users.clone())
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        let mut state = self.lock();
        state.actor()?;
        state.next_user_id += 1;
        let created = User {
            id: UserId(state.next_user_id),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn request_types(&self) -> Result<Vec<RequestType>, ApiError> {
        let state = self.lock();
        state.actor()?;
        Ok(state.types.clone())
    }

    async fn create_request_type(
        &self,
        payload: &NewRequestType,
    ) -> Result<RequestType, ApiError> {
        let payload = payload.normalized();
        if let Err(error) = payload.validate() {
            return Err(ApiError::Backend { status: 400, message: error.to_string() });
        }

        let mut state = self.lock();
        state.actor()?;
        if state.types.iter().any(|existing| existing.key.eq_ignore_ascii_case(&payload.key)) {
            return Err(ApiError::Backend {
                status: 400,
                message: format!("request type `{}` already exists", payload.key),
            });
        }
        state.next_type_id += 1;
        let created = RequestType {
            id: RequestTypeId(state.next_type_id),
            key: payload.key,
            label: payload.label,
            category: payload.category,
            description: payload.description,
            active: true,
        };
        state.types.push(created.clone());
        Ok(created)
    }

    async fn update_request_type(
        &self,
        id: RequestTypeId,
        patch: &RequestTypePatch,
    ) -> Result<RequestType, ApiError> {
        let mut state = self.lock();
        state.actor()?;
        let request_type = state
            .types
            .iter_mut()
            .find(|request_type| request_type.id == id)
            .ok_or(ApiError::NotFound { message: format!("request type #{id} not found") })?;

        if let Some(label) = &patch.label {
            request_type.label = label.clone();
        }
        if let Some(category) = &patch.category {
            request_type.category = category.clone();
        }
        if let Some(description) = &patch.description {
            request_type.description = Some(description.clone());
        }
        if let Some(active) = patch.active {
            request_type.active = active;
        }
        Ok(request_type.clone())
    }

    async fn deactivate_request_type(&self, id: RequestTypeId) -> Result<RequestType, ApiError> {
        self.update_request_type(
            id,
            &RequestTypePatch { active: Some(false), ..RequestTypePatch::default() },
        )
        .await
    }

    async fn create_request(&self, draft: &NewRequest) -> Result<ApprovalRequest, ApiError> {
        let draft = draft.normalized();
        if let Err(error) = draft.validate() {
            return Err(ApiError::Backend { status: 400, message: error.to_string() });
        }

        let mut state = self.lock();
        let requester = state.actor()?;
        if !state.users.iter().any(|user| user.id == draft.approver_id) {
            return Err(ApiError::NotFound {
                message: format!("approver #{} not found", draft.approver_id),
            });
        }

        state.next_request_id += 1;
        let now = Utc::now();
        let request = ApprovalRequest {
            id: RequestId(state.next_request_id),
            title: draft.title,
            description: draft.description,
            type_key: draft.type_key,
            status: RequestStatus::Pending,
            requester_id: requester.id,
            approver_id: draft.approver_id,
            created_at: now,
            updated_at: now,
        };
        state.requests.push(request.clone());
        state.push_history(request.id, &requester, None, RequestStatus::Pending, None);
        state.push_notification(
            request.approver_id,
            format!("Nueva solicitud #{} pendiente de aprobación: {}", request.id, request.title),
            request.id,
        );

        Ok(request)
    }

    async fn request_detail(&self, id: RequestId) -> Result<RequestDetail, ApiError> {
        let state = self.lock();
        state.actor()?;
        let request = state
            .requests
            .iter()
            .find(|request| request.id == id)
            .cloned()
            .ok_or(ApiError::NotFound { message: format!("request #{id} not found") })?;

        let mut history: Vec<HistoryEntry> =
            state.history.iter().filter(|entry| entry.request_id == id).cloned().collect();
        sort_oldest_first(&mut history);

        Ok(RequestDetail { request, history })
    }

    async fn requests_by_approver(
        &self,
        approver_id: UserId,
    ) -> Result<Vec<ApprovalRequest>, ApiError> {
        let state = self.lock();
        state.actor()?;
        Ok(state
            .requests
            .iter()
            .filter(|request| request.approver_id == approver_id)
            .cloned()
            .collect())
    }

    async fn pending_requests(
        &self,
        approver_id: UserId,
    ) -> Result<Vec<ApprovalRequest>, ApiError> {
        let state = self.lock();
        state.actor()?;
        Ok(state
            .requests
            .iter()
            .filter(|request| {
                request.approver_id == approver_id && request.status == RequestStatus::Pending
            })
            .cloned()
            .collect())
    }

    async fn change_status(
        &self,
        id: RequestId,
        change: &StatusChange,
    ) -> Result<StatusChangeOutcome, ApiError> {
        let mut state = self.lock();
        state.change_status_calls += 1;
        let actor = state.actor()?;

        let request = state
            .requests
            .iter()
            .find(|request| request.id == id)
            .cloned()
            .ok_or(ApiError::NotFound { message: format!("request #{id} not found") })?;

        if actor.id != request.approver_id {
            return Err(ApiError::Forbidden {
                message: "solo el aprobador asignado puede aprobar o rechazar".to_owned(),
            });
        }

        if !change.new_status.is_terminal() {
            return Err(ApiError::InvalidState {
                message: format!("`{}` is not a valid target status", change.new_status),
            });
        }

        // Idempotent re-application of the current terminal status.
        if request.status == change.new_status {
            return Ok(StatusChangeOutcome {
                request: request.clone(),
                changed: false,
                message: format!(
                    "La solicitud #{id} ya estaba en estado \"{}\"",
                    request.status.as_wire()
                ),
            });
        }

        if request.status.is_terminal() {
            return Err(ApiError::InvalidState {
                message: format!(
                    "la solicitud #{id} ya está en estado terminal \"{}\"",
                    request.status.as_wire()
                ),
            });
        }

        let old_status = request.status;
        let new_status = change.new_status;
        let updated = {
            let stored = state
                .requests
                .iter_mut()
                .find(|request| request.id == id)
                .ok_or(ApiError::NotFound { message: format!("request #{id} not found") })?;
            stored.status = new_status;
            stored.updated_at = Utc::now();
            stored.clone()
        };

        let comment = change
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|comment| !comment.is_empty())
            .map(str::to_owned);
        state.push_history(id, &actor, Some(old_status), new_status, comment);
        state.push_notification(
            updated.requester_id,
            format!("Tu solicitud #{id} fue {}", new_status.as_wire()),
            id,
        );

        Ok(StatusChangeOutcome {
            request: updated,
            changed: true,
            message: format!(
                "Solicitud #{id} actualizada a estado \"{}\"",
                new_status.as_wire()
            ),
        })
    }

    async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        let state = self.lock();
        let actor = state.actor()?;
        Ok(state
            .notifications
            .iter()
            .filter(|(recipient, _)| *recipient == actor.id)
            .map(|(_, notification)| notification.clone())
            .collect())
    }

    async fn mark_notification_read(
        &self,
        id: NotificationId,
    ) -> Result<Notification, ApiError> {
        let mut state = self.lock();
        state.mark_read_calls += 1;
        let actor = state.actor()?;
        let entry = state
            .notifications
            .iter_mut()
            .find(|(recipient, notification)| *recipient == actor.id && notification.id == id)
            .map(|(_, notification)| notification)
            .ok_or(ApiError::NotFound { message: format!("notification #{id} not found") })?;

        if entry.read_at.is_none() {
            entry.read_at = Some(Utc::now());
        }
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryBackend;
    use crate::api::{ApprovalsApi, StatusChange};
    use crate::error::ApiError;
    use tramite_core::{NewRequest, RequestStatus, Role};

    fn draft(approver_id: tramite_core::UserId) -> NewRequest {
        NewRequest {
            title: "Despliegue pagos v2".to_owned(),
            description: "Ventana nocturna".to_owned(),
            type_key: "despliegue".to_owned(),
            approver_id,
        }
    }

    #[tokio::test]
    async fn creation_seeds_pending_status_history_and_approver_notification() {
        let backend = InMemoryBackend::new();
        let requester = backend.seed_user("Luis", "luis@coe.dev", Role::Requester);
        let approver = backend.seed_user("Ana", "ana@coe.dev", Role::Approver);
        backend.sign_in_as(requester.id);

        let created = backend.create_request(&draft(approver.id)).await.unwrap();
        assert_eq!(created.status, RequestStatus::Pending);

        let detail = backend.request_detail(created.id).await.unwrap();
        assert_eq!(detail.request.title, "Despliegue pagos v2");
        assert_eq!(detail.history.len(), 1);
        assert_eq!(detail.history[0].old_status, None);
        assert_eq!(detail.history[0].new_status, RequestStatus::Pending);
        assert_eq!(detail.history[0].actor_id, requester.id);

        backend.sign_in_as(approver.id);
        let inbox = backend.notifications().await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].request_id, Some(created.id));
        assert!(!inbox[0].is_read());
    }

    #[tokio::test]
    async fn non_assigned_actor_is_forbidden_and_appends_nothing() {
        let backend = InMemoryBackend::new();
        let requester = backend.seed_user("Luis", "luis@coe.dev", Role::Requester);
        let approver = backend.seed_user("Ana", "ana@coe.dev", Role::Approver);
        let other = backend.seed_user("Bea", "bea@coe.dev", Role::Approver);
        backend.sign_in_as(requester.id);
        let created = backend.create_request(&draft(approver.id)).await.unwrap();

        backend.sign_in_as(other.id);
        let result = backend
            .change_status(
                created.id,
                &StatusChange { new_status: RequestStatus::Approved, comment: None },
            )
            .await;
        assert!(matches!(result, Err(ApiError::Forbidden { .. })));

        backend.sign_in_as(approver.id);
        let detail = backend.request_detail(created.id).await.unwrap();
        assert_eq!(detail.request.status, RequestStatus::Pending);
        assert_eq!(detail.history.len(), 1);
    }

    #[tokio::test]
    async fn confirmed_transition_appends_exactly_one_entry() {
        let backend = InMemoryBackend::new();
        let requester = backend.seed_user("Luis", "luis@coe.dev", Role::Requester);
        let approver = backend.seed_user("Ana", "ana@coe.dev", Role::Approver);
        backend.sign_in_as(requester.id);
        let created = backend.create_request(&draft(approver.id)).await.unwrap();

        backend.sign_in_as(approver.id);
        let outcome = backend
            .change_status(
                created.id,
                &StatusChange {
                    new_status: RequestStatus::Approved,
                    comment: Some("ok".to_owned()),
                },
            )
            .await
            .unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.request.status, RequestStatus::Approved);

        let detail = backend.request_detail(created.id).await.unwrap();
        assert_eq!(detail.history.len(), 2);
        let last = detail.history.last().unwrap();
        assert_eq!(last.old_status, Some(RequestStatus::Pending));
        assert_eq!(last.new_status, RequestStatus::Approved);
        assert_eq!(last.actor_id, approver.id);
        assert_eq!(last.comment.as_deref(), Some("ok"));

        backend.sign_in_as(requester.id);
        let inbox = backend.notifications().await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].request_id, Some(created.id));
    }

    #[tokio::test]
    async fn reapplying_the_terminal_status_reports_unchanged() {
        let backend = InMemoryBackend::new();
        let requester = backend.seed_user("Luis", "luis@coe.dev", Role::Requester);
        let approver = backend.seed_user("Ana", "ana@coe.dev", Role::Approver);
        backend.sign_in_as(requester.id);
        let created = backend.create_request(&draft(approver.id)).await.unwrap();

        backend.sign_in_as(approver.id);
        let change = StatusChange { new_status: RequestStatus::Approved, comment: None };
        backend.change_status(created.id, &change).await.unwrap();
        let second = backend.change_status(created.id, &change).await.unwrap();

        assert!(!second.changed);
        assert_eq!(second.request.status, RequestStatus::Approved);

        let detail = backend.request_detail(created.id).await.unwrap();
        assert_eq!(detail.history.len(), 2);
    }

    #[tokio::test]
    async fn crossing_terminal_statuses_is_an_invalid_state() {
        let backend = InMemoryBackend::new();
        let requester = backend.seed_user("Luis", "luis@coe.dev", Role::Requester);
        let approver = backend.seed_user("Ana", "ana@coe.dev", Role::Approver);
        backend.sign_in_as(requester.id);
        let created = backend.create_request(&draft(approver.id)).await.unwrap();

        backend.sign_in_as(approver.id);
        backend
            .change_status(
                created.id,
                &StatusChange { new_status: RequestStatus::Rejected, comment: None },
            )
            .await
            .unwrap();
        let result = backend
            .change_status(
                created.id,
                &StatusChange { new_status: RequestStatus::Approved, comment: None },
            )
            .await;
        assert!(matches!(result, Err(ApiError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn unauthenticated_calls_are_rejected() {
        let backend = InMemoryBackend::new();
        let result = backend.users().await;
        assert!(matches!(result, Err(ApiError::SessionExpired { .. })));
    }

    #[tokio::test]
    async fn first_login_creates_an_unset_role_user() {
        let backend = InMemoryBackend::new();
        let auth = backend.login_with_credential("nuevo@coe.dev").await.unwrap();
        assert_eq!(auth.user.role, Role::Unset);
        assert_eq!(auth.user.name, "nuevo");
        assert!(auth.token.starts_with("token-"));

        let again = backend.login_with_credential("nuevo@coe.dev").await.unwrap();
        assert_eq!(again.user.id, auth.user.id);
    }

    #[tokio::test]
    async fn mark_read_is_one_way_and_idempotent() {
        let backend = InMemoryBackend::new();
        let requester = backend.seed_user("Luis", "luis@coe.dev", Role::Requester);
        let approver = backend.seed_user("Ana", "ana@coe.dev", Role::Approver);
        backend.sign_in_as(requester.id);
        let created = backend.create_request(&draft(approver.id)).await.unwrap();
        let _ = created;

        backend.sign_in_as(approver.id);
        let inbox = backend.notifications().await.unwrap();
        let first = backend.mark_notification_read(inbox[0].id).await.unwrap();
        assert!(first.is_read());

        let second = backend.mark_notification_read(inbox[0].id).await.unwrap();
        assert_eq!(second.read_at, first.read_at);
    }
}
