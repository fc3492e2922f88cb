//! Synchronization runtime for the approval-workflow client.
//!
//! Everything here keeps locally-cached views consistent with a backend that
//! is polled rather than pushed to:
//! - **`lifecycle`** - [`RequestController`], owner of one request's snapshot
//!   and the transition gate
//! - **`notifications`** - [`NotificationEngine`], the unread-aware feed with
//!   its refresh/mark-read race guard
//! - **`poller`** - cancellable scheduled tasks with an explicit start/stop
//!   contract
//! - **`session_flow`** - login, role selection, logout, catalog loading

pub mod errors;
pub mod lifecycle;
pub mod notifications;
pub mod poller;
pub mod session_flow;

pub use errors::SyncError;
pub use lifecycle::{submit_request, LoadOutcome, RequestController, TransitionReport};
pub use notifications::NotificationEngine;
pub use poller::Poller;
pub use session_flow::AuthFlow;
