use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::warn;

use tramite_core::User;

const TOKEN_KEY: &str = "auth_token";
const PROFILE_KEY: &str = "current_user";

/// Durable client storage: one small file per fixed key under the configured
/// directory. Reads never fail the caller - a corrupt or unreadable entry is
/// discarded (with a warning) so session restore always completes.
#[derive(Clone, Debug)]
pub struct ProfileStorage {
    dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not create storage directory `{path}`: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("could not write `{path}`: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("could not serialize stored profile: {0}")]
    Serialize(String),
}

impl ProfileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load_token(&self) -> Option<SecretString> {
        let raw = self.read(TOKEN_KEY)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(SecretString::from(trimmed.to_owned()))
    }

    pub fn store_token(&self, token: &SecretString) -> Result<(), StorageError> {
        self.write(TOKEN_KEY, token.expose_secret())
    }

    pub fn load_profile(&self) -> Option<User> {
        let raw = self.read(PROFILE_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(error) => {
                warn!(
                    event_name = "storage.profile_corrupt",
                    error = %error,
                    "discarding unparsable stored profile"
                );
                self.remove(PROFILE_KEY);
                None
            }
        }
    }

    pub fn store_profile(&self, user: &User) -> Result<(), StorageError> {
        let serialized =
            serde_json::to_string(user).map_err(|error| StorageError::Serialize(error.to_string()))?;
        self.write(PROFILE_KEY, &serialized)
    }

    /// Removes both entries; missing files are fine.
    pub fn clear(&self) {
        self.remove(TOKEN_KEY);
        self.remove(PROFILE_KEY);
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn read(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Some(contents),
            Err(error) if error.kind() == io::ErrorKind::NotFound => None,
            Err(error) => {
                warn!(
                    event_name = "storage.read_failed",
                    key,
                    error = %error,
                    "discarding unreadable storage entry"
                );
                None
            }
        }
    }

    fn write(&self, key: &str, contents: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)
            .map_err(|source| StorageError::CreateDir { path: self.dir.clone(), source })?;
        let path = self.path(key);
        fs::write(&path, contents).map_err(|source| StorageError::Write { path, source })
    }

    fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path(key));
    }
}

#[cfg(test)]
mod tests {
    use secrecy::{ExposeSecret, SecretString};

    use super::ProfileStorage;
    use tramite_core::{Role, User, UserId};

    fn user() -> User {
        User {
            id: UserId(7),
            name: "Ana".to_owned(),
            email: "ana@coe.dev".to_owned(),
            role: Role::Approver,
        }
    }

    #[test]
    fn token_and_profile_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ProfileStorage::new(dir.path());

        storage.store_token(&SecretString::from("tok-123".to_owned())).unwrap();
        storage.store_profile(&user()).unwrap();

        assert_eq!(storage.load_token().unwrap().expose_secret(), "tok-123");
        assert_eq!(storage.load_profile(), Some(user()));
    }

    #[test]
    fn missing_entries_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ProfileStorage::new(dir.path());
        assert!(storage.load_token().is_none());
        assert!(storage.load_profile().is_none());
    }

    #[test]
    fn corrupt_profile_is_discarded_not_a_crash() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ProfileStorage::new(dir.path());
        std::fs::write(dir.path().join("current_user"), "{not json").unwrap();

        assert!(storage.load_profile().is_none());
        // The corrupt entry is gone; the next restore stays clean.
        assert!(!dir.path().join("current_user").exists());
    }

    #[test]
    fn clear_removes_both_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ProfileStorage::new(dir.path());
        storage.store_token(&SecretString::from("tok".to_owned())).unwrap();
        storage.store_profile(&user()).unwrap();

        storage.clear();
        assert!(storage.load_token().is_none());
        assert!(storage.load_profile().is_none());
        // Clearing an already-empty store is a no-op.
        storage.clear();
    }
}
