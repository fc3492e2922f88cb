//! REST surface of the approval-workflow client.
//!
//! This crate owns everything that talks to (or stands in for) the backend:
//! - **`api`** - the [`ApprovalsApi`] trait, the seam every engine depends on
//! - **`rest`** - [`RestClient`], the reqwest implementation
//! - **`memory`** - [`InMemoryBackend`], an in-process fake with the backend's
//!   observable semantics, for tests and offline smoke runs
//! - **`session`** - [`SessionStore`], the atomic identity/token holder
//! - **`storage`** - durable client storage for the token and profile
//! - **`error`** - the [`ApiError`] taxonomy and HTTP status mapping

pub mod api;
pub mod error;
pub mod memory;
pub mod rest;
pub mod session;
pub mod storage;

pub use api::{
    ApprovalsApi, AuthSession, NewUser, RequestDetail, StatusChange, StatusChangeOutcome,
};
pub use error::ApiError;
pub use memory::InMemoryBackend;
pub use rest::RestClient;
pub use session::{Session, SessionStore};
pub use storage::{ProfileStorage, StorageError};
