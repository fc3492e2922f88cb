use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use secrecy::ExposeSecret;
use tracing::{debug, warn};
use uuid::Uuid;

use tramite_core::config::ApiConfig;
use tramite_core::{
    ApprovalRequest, NewRequest, NewRequestType, Notification, NotificationId, RequestId,
    RequestType, RequestTypeId, RequestTypePatch, Role, User, UserId,
};

use crate::api::{
    ApprovalsApi, AuthSession, NewUser, RequestDetail, StatusChange, StatusChangeOutcome,
};
use crate::error::ApiError;
use crate::session::SessionStore;

/// The real backend over HTTP. Every call carries the session's bearer token
/// (when present) plus a generated correlation id; a session-level `401`
/// tears the session down before the error is surfaced.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl RestClient {
    pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn begin(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let correlation_id = Uuid::new_v4();
        debug!(
            event_name = "api.request",
            correlation_id = %correlation_id,
            method = %method,
            path,
            "issuing backend call"
        );

        let mut builder = self
            .http
            .request(method, self.url(path))
            .header("x-correlation-id", correlation_id.to_string());
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder
    }

    async fn execute<T>(&self, builder: reqwest::RequestBuilder) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response =
            builder.send().await.map_err(|error| ApiError::Transport(error.to_string()))?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = ApiError::from_status(status.as_u16(), extract_backend_message(&body));
            // Global teardown applies to an established session only; a 401
            // on an unauthenticated call (login, doctor probe) has no session
            // to tear down and must not clear someone else's stored one.
            if error.is_session_expired() && self.session.is_authenticated() {
                warn!(
                    event_name = "api.session_expired",
                    status = status.as_u16(),
                    "backend rejected the session; tearing it down"
                );
                self.session.logout();
            }
            return Err(error);
        }

        response.json::<T>().await.map_err(|error| ApiError::Decode(error.to_string()))
    }

    async fn get<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        self.execute(self.begin(Method::GET, path)).await
    }

    async fn send_json<T>(
        &self,
        method: Method,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        self.execute(self.begin(method, path).json(body)).await
    }
}

/// The backend reports failures as `{"error": "<human-readable>"}`.
fn extract_backend_message(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body).ok().and_then(|parsed| parsed.error)
}

#[async_trait]
impl ApprovalsApi for RestClient {
    async fn login_with_credential(&self, credential: &str) -> Result<AuthSession, ApiError> {
        self.send_json(
            Method::POST,
            "/auth/google",
            &serde_json::json!({ "credential": credential }),
        )
        .await
    }

    async fn set_role(&self, user_id: UserId, role: Role) -> Result<User, ApiError> {
        self.send_json(
            Method::PATCH,
            &format!("/users/{user_id}/role"),
            &serde_json::json!({ "role": role }),
        )
        .await
    }

    async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.get("/users").await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        self.send_json(Method::POST, "/users", user).await
    }

    async fn request_types(&self) -> Result<Vec<RequestType>, ApiError> {
        self.get("/request-types").await
    }

    async fn create_request_type(
        &self,
        payload: &NewRequestType,
    ) -> Result<RequestType, ApiError> {
        self.send_json(Method::POST, "/request-types", payload).await
    }

    async fn update_request_type(
        &self,
        id: RequestTypeId,
        patch: &RequestTypePatch,
    ) -> Result<RequestType, ApiError> {
        self.send_json(Method::PATCH, &format!("/request-types/{id}"), patch).await
    }

    async fn deactivate_request_type(&self, id: RequestTypeId) -> Result<RequestType, ApiError> {
        self.execute(self.begin(Method::DELETE, &format!("/request-types/{id}"))).await
    }

    async fn create_request(&self, draft: &NewRequest) -> Result<ApprovalRequest, ApiError> {
        self.send_json(Method::POST, "/requests", draft).await
    }

    async fn request_detail(&self, id: RequestId) -> Result<RequestDetail, ApiError> {
        self.get(&format!("/requests/{id}")).await
    }

    async fn requests_by_approver(
        &self,
        approver_id: UserId,
    ) -> Result<Vec<ApprovalRequest>, ApiError> {
        self.get(&format!("/requests/by-approver/{approver_id}")).await
    }

    async fn pending_requests(
        &self,
        approver_id: UserId,
    ) -> Result<Vec<ApprovalRequest>, ApiError> {
        self.get(&format!("/requests/pending/{approver_id}")).await
    }

    async fn change_status(
        &self,
        id: RequestId,
        change: &StatusChange,
    ) -> Result<StatusChangeOutcome, ApiError> {
        self.send_json(Method::POST, &format!("/requests/{id}/status"), change).await
    }

    async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.get("/notifications").await
    }

    async fn mark_notification_read(
        &self,
        id: NotificationId,
    ) -> Result<Notification, ApiError> {
        self.execute(self.begin(Method::PATCH, &format!("/notifications/{id}/read"))).await
    }
}
