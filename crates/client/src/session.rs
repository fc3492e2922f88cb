use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use secrecy::SecretString;
use tracing::{info, warn};

use tramite_core::User;

use crate::storage::ProfileStorage;

/// The authenticated identity plus its bearer token.
#[derive(Clone)]
pub struct Session {
    pub user: User,
    pub token: SecretString,
}

/// Process-wide session state with an explicit lifecycle: restored from
/// durable storage on start, swapped atomically on login/role-selection,
/// cleared on logout or session-level auth failure.
///
/// The whole identity lives behind one lock, so readers always observe a
/// consistent user+token pair. Every swap bumps a generation counter;
/// in-flight responses captured under an older generation must be dropped by
/// their callers.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Session>>>,
    generation: Arc<AtomicU64>,
    storage: ProfileStorage,
}

impl SessionStore {
    pub fn new(storage: ProfileStorage) -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            storage,
        }
    }

    /// Restores a persisted session, if any. A corrupt stored profile was
    /// already discarded by the storage layer; a token without a profile (or
    /// vice versa) is treated as logged out and cleaned up.
    pub fn restore(&self) -> Option<User> {
        let token = self.storage.load_token();
        let profile = self.storage.load_profile();

        match (token, profile) {
            (Some(token), Some(user)) => {
                self.swap(Some(Session { user: user.clone(), token }));
                info!(event_name = "session.restored", user_id = user.id.0, "session restored");
                Some(user)
            }
            (None, None) => None,
            _ => {
                warn!(
                    event_name = "session.partial_state_discarded",
                    "found token or profile but not both; clearing"
                );
                self.storage.clear();
                None
            }
        }
    }

    pub fn login(&self, user: User, token: SecretString) {
        if let Err(error) = self.storage.store_token(&token) {
            warn!(event_name = "session.persist_failed", error = %error, "token not persisted");
        }
        if let Err(error) = self.storage.store_profile(&user) {
            warn!(event_name = "session.persist_failed", error = %error, "profile not persisted");
        }
        info!(event_name = "session.login", user_id = user.id.0, "session established");
        self.swap(Some(Session { user, token }));
    }

    /// Replaces the identity while keeping the existing token. Used by the
    /// role-selection step, which returns an updated user but no new token.
    pub fn update_user(&self, user: User) {
        let token = match self.token() {
            Some(token) => token,
            None => {
                warn!(
                    event_name = "session.update_without_token",
                    "ignoring profile update on a logged-out store"
                );
                return;
            }
        };
        if let Err(error) = self.storage.store_profile(&user) {
            warn!(event_name = "session.persist_failed", error = %error, "profile not persisted");
        }
        self.swap(Some(Session { user, token }));
    }

    pub fn logout(&self) {
        self.storage.clear();
        info!(event_name = "session.logout", "session cleared");
        self.swap(None);
    }

    pub fn current_user(&self) -> Option<User> {
        self.read(|session| session.user.clone())
    }

    pub fn token(&self) -> Option<SecretString> {
        self.read(|session| session.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|_| ()).is_some()
    }

    /// True when a user is logged in but has not chosen a role yet; every
    /// workflow action is blocked until the role-selection step runs.
    pub fn requires_role_selection(&self) -> bool {
        self.current_user().is_some_and(|user| !user.role.is_set())
    }

    /// Current swap generation. Capture before an async call and compare
    /// after: a mismatch means the session changed mid-flight and the
    /// response must not be applied.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn swap(&self, session: Option<Session>) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = session;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn read<T>(&self, map: impl FnOnce(&Session) -> T) -> Option<T> {
        let guard = match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.as_ref().map(map)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::SessionStore;
    use crate::storage::ProfileStorage;
    use tramite_core::{Role, User, UserId};

    fn user(role: Role) -> User {
        User {
            id: UserId(7),
            name: "Ana".to_owned(),
            email: "ana@coe.dev".to_owned(),
            role,
        }
    }

    fn store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(ProfileStorage::new(dir.path()));
        (dir, store)
    }

    #[test]
    fn login_then_restore_round_trips() {
        let (dir, store) = store();
        store.login(user(Role::Approver), SecretString::from("tok-1".to_owned()));

        let fresh = SessionStore::new(ProfileStorage::new(dir.path()));
        assert_eq!(fresh.restore(), Some(user(Role::Approver)));
        assert!(fresh.is_authenticated());
    }

    #[test]
    fn corrupt_profile_restores_as_logged_out() {
        let (dir, store) = store();
        store.login(user(Role::Approver), SecretString::from("tok-1".to_owned()));
        std::fs::write(dir.path().join("current_user"), "{broken").unwrap();

        let fresh = SessionStore::new(ProfileStorage::new(dir.path()));
        assert_eq!(fresh.restore(), None);
        assert!(!fresh.is_authenticated());
    }

    #[test]
    fn logout_clears_memory_and_storage() {
        let (dir, store) = store();
        store.login(user(Role::Approver), SecretString::from("tok-1".to_owned()));
        store.logout();

        assert!(!store.is_authenticated());
        let fresh = SessionStore::new(ProfileStorage::new(dir.path()));
        assert_eq!(fresh.restore(), None);
    }

    #[test]
    fn every_swap_bumps_the_generation() {
        let (_dir, store) = store();
        let start = store.generation();
        store.login(user(Role::Unset), SecretString::from("tok-1".to_owned()));
        let after_login = store.generation();
        assert!(after_login > start);

        store.update_user(user(Role::Approver));
        let after_update = store.generation();
        assert!(after_update > after_login);

        store.logout();
        assert!(store.generation() > after_update);
    }

    #[test]
    fn unset_role_requires_selection() {
        let (_dir, store) = store();
        assert!(!store.requires_role_selection());
        store.login(user(Role::Unset), SecretString::from("tok-1".to_owned()));
        assert!(store.requires_role_selection());
        store.update_user(user(Role::Requester));
        assert!(!store.requires_role_selection());
    }

    #[test]
    fn update_user_keeps_the_token() {
        let (_dir, store) = store();
        store.login(user(Role::Unset), SecretString::from("tok-1".to_owned()));
        store.update_user(user(Role::Approver));
        assert!(store.token().is_some());
        assert_eq!(store.current_user().unwrap().role, Role::Approver);
    }
}
