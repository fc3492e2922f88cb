use thiserror::Error;

/// Client-facing error taxonomy for backend calls.
///
/// `SessionExpired` (401) tears down the session globally; `Forbidden` (403)
/// stays inline at the component that issued the call. `Transport` is
/// retryable by user action only - nothing in this client retries silently.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("session expired or invalid: {message}")]
    SessionExpired { message: String },
    #[error("not allowed: {message}")]
    Forbidden { message: String },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("invalid state: {message}")]
    InvalidState { message: String },
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("response decoding failed: {0}")]
    Decode(String),
}

impl ApiError {
    /// Maps a non-2xx HTTP status plus the backend's `{"error": ...}` body
    /// (when present) onto the taxonomy.
    pub fn from_status(status: u16, backend_message: Option<String>) -> Self {
        let message = |fallback: &str| {
            backend_message
                .clone()
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| fallback.to_owned())
        };

        match status {
            401 => Self::SessionExpired { message: message("authentication required") },
            403 => Self::Forbidden { message: message("you are not allowed to do this") },
            404 => Self::NotFound { message: message("resource not found") },
            409 => Self::InvalidState { message: message("request is not in a valid state") },
            status => Self::Backend { status, message: message("unexpected backend error") },
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Message to render inline: the backend-provided one when present, a
    /// generic fallback otherwise.
    pub fn user_message(&self) -> String {
        match self {
            Self::SessionExpired { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::InvalidState { message }
            | Self::Backend { message, .. } => message.clone(),
            Self::Transport(_) => {
                "could not reach the approvals backend; check your connection and retry".to_owned()
            }
            Self::Decode(_) => "the backend returned an unexpected response".to_owned(),
        }
    }
}
