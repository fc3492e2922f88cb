use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tramite_core::{
    ApprovalRequest, HistoryEntry, NewRequest, NewRequestType, Notification, NotificationId,
    RequestId, RequestType, RequestTypeId, RequestTypePatch, Role, User, UserId,
};

use crate::error::ApiError;

/// The atomic snapshot returned by `GET /requests/:id`: the request and its
/// full history together, so a fresh status is never shown next to stale
/// history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDetail {
    pub request: ApprovalRequest,
    pub history: Vec<HistoryEntry>,
}

/// Body of `POST /requests/:id/status`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    #[serde(rename = "newStatus")]
    pub new_status: tramite_core::RequestStatus,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Outcome of a transition intent. `changed == false` means the backend
/// treated the intent as an idempotent re-application and left the request
/// untouched; `message` is always human-readable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeOutcome {
    pub request: ApprovalRequest,
    pub changed: bool,
    pub message: String,
}

/// Result of the identity-provider credential exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Everything the backend offers this client. Implemented by [`RestClient`]
/// for the real wire and by [`InMemoryBackend`] for tests and smoke runs.
///
/// [`RestClient`]: crate::rest::RestClient
/// [`InMemoryBackend`]: crate::memory::InMemoryBackend
#[async_trait]
pub trait ApprovalsApi: Send + Sync {
    async fn login_with_credential(&self, credential: &str) -> Result<AuthSession, ApiError>;
    async fn set_role(&self, user_id: UserId, role: Role) -> Result<User, ApiError>;

    async fn users(&self) -> Result<Vec<User>, ApiError>;
    async fn create_user(&self, user: &NewUser) -> Result<User, ApiError>;

    async fn request_types(&self) -> Result<Vec<RequestType>, ApiError>;
    async fn create_request_type(&self, payload: &NewRequestType)
        -> Result<RequestType, ApiError>;
    async fn update_request_type(
        &self,
        id: RequestTypeId,
        patch: &RequestTypePatch,
    ) -> Result<RequestType, ApiError>;
    /// Soft delete: the backend clears `active` and keeps the row.
    async fn deactivate_request_type(&self, id: RequestTypeId) -> Result<RequestType, ApiError>;

    async fn create_request(&self, draft: &NewRequest) -> Result<ApprovalRequest, ApiError>;
    async fn request_detail(&self, id: RequestId) -> Result<RequestDetail, ApiError>;
    async fn requests_by_approver(
        &self,
        approver_id: UserId,
    ) -> Result<Vec<ApprovalRequest>, ApiError>;
    async fn pending_requests(
        &self,
        approver_id: UserId,
    ) -> Result<Vec<ApprovalRequest>, ApiError>;
    async fn change_status(
        &self,
        id: RequestId,
        change: &StatusChange,
    ) -> Result<StatusChangeOutcome, ApiError>;

    async fn notifications(&self) -> Result<Vec<Notification>, ApiError>;
    async fn mark_notification_read(&self, id: NotificationId)
        -> Result<Notification, ApiError>;
}
