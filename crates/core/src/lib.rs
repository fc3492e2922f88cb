pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod errors;
pub mod lifecycle;

pub use catalog::{Catalog, CategoryGroup};
pub use dashboard::{DashboardFilters, DashboardView, StatusFilter, TypeFilter};
pub use domain::draft::NewRequest;
pub use domain::history::{HistoryEntry, HistoryEntryId};
pub use domain::notification::{Notification, NotificationId};
pub use domain::request::{ApprovalRequest, RequestId, RequestStatus};
pub use domain::request_type::{NewRequestType, RequestType, RequestTypeId, RequestTypePatch};
pub use domain::user::{Role, User, UserId};
pub use errors::ValidationError;
pub use lifecycle::{authorize_transition, can_transition, TransitionDenial};
