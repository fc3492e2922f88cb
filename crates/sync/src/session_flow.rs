use std::sync::Arc;

use secrecy::SecretString;
use tracing::info;

use tramite_client::{ApprovalsApi, SessionStore};
use tramite_core::{Catalog, Role, User};

use crate::errors::SyncError;

/// Session lifecycle orchestration: restore on start, credential exchange on
/// login, the one-shot role-selection step, teardown on logout.
pub struct AuthFlow {
    api: Arc<dyn ApprovalsApi>,
    session: SessionStore,
}

impl AuthFlow {
    pub fn new(api: Arc<dyn ApprovalsApi>, session: SessionStore) -> Self {
        Self { api, session }
    }

    /// Restores a persisted session, if any, on application start.
    pub fn restore(&self) -> Option<User> {
        self.session.restore()
    }

    /// Exchanges an identity-provider credential for a token plus profile and
    /// establishes the session atomically.
    pub async fn login(&self, credential: &str) -> Result<User, SyncError> {
        let auth = self.api.login_with_credential(credential).await?;
        self.session.login(auth.user.clone(), SecretString::from(auth.token));
        Ok(auth.user)
    }

    /// The post-first-login role selection. The role is mutable exactly once:
    /// a user whose role is already set is refused locally, and the swapped
    /// identity keeps the existing token.
    pub async fn choose_role(&self, role: Role) -> Result<User, SyncError> {
        if !role.is_set() {
            return Err(SyncError::NoRoleChosen);
        }
        let user = self.session.current_user().ok_or(SyncError::NotAuthenticated)?;
        if user.role.is_set() {
            return Err(SyncError::RoleAlreadySet);
        }

        let updated = self.api.set_role(user.id, role).await?;
        info!(
            event_name = "session.role_chosen",
            user_id = updated.id.0,
            role = %updated.role,
            "role selected"
        );
        self.session.update_user(updated.clone());
        Ok(updated)
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    /// Loads the read-mostly reference data (users + request types) behind
    /// the pickers and labels.
    pub async fn load_catalog(&self) -> Result<Catalog, SyncError> {
        let users = self.api.users().await?;
        let types = self.api.request_types().await?;
        Ok(Catalog::new(users, types))
    }
}
