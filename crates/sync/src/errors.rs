use thiserror::Error;

use tramite_client::ApiError;
use tramite_core::lifecycle::TransitionDenial;
use tramite_core::ValidationError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Denied(#[from] TransitionDenial),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no request is currently open")]
    NoActiveRequest,
    #[error("request detail has not been loaded yet")]
    NoSnapshot,
    #[error("no authenticated session")]
    NotAuthenticated,
    #[error("role was already chosen and can only be set once")]
    RoleAlreadySet,
    #[error("a concrete role must be chosen")]
    NoRoleChosen,
}

impl SyncError {
    /// Message to render inline, preferring what the backend said.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(error) => error.user_message(),
            other => other.to_string(),
        }
    }
}
