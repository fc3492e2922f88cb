use crate::domain::request::{ApprovalRequest, RequestStatus};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(RequestStatus),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TypeFilter {
    #[default]
    All,
    Key(String),
}

/// Compound dashboard filter. All three criteria are AND-combined.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DashboardFilters {
    /// Case-insensitive substring over title, description, and id.
    pub search: String,
    pub status: StatusFilter,
    pub type_key: TypeFilter,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardView {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub filtered: Vec<ApprovalRequest>,
}

/// Pure aggregation over a fetched request set. Counts are computed over the
/// unfiltered input; `filtered` is always an order-preserving subset of it.
pub fn summarize(requests: &[ApprovalRequest], filters: &DashboardFilters) -> DashboardView {
    let count = |status: RequestStatus| {
        requests.iter().filter(|request| request.status == status).count()
    };

    DashboardView {
        total: requests.len(),
        pending: count(RequestStatus::Pending),
        approved: count(RequestStatus::Approved),
        rejected: count(RequestStatus::Rejected),
        filtered: requests.iter().filter(|request| matches(request, filters)).cloned().collect(),
    }
}

fn matches(request: &ApprovalRequest, filters: &DashboardFilters) -> bool {
    let haystack = format!("{} {} {}", request.title, request.description, request.id)
        .to_lowercase();
    let matches_search = haystack.contains(&filters.search.to_lowercase());

    let matches_status = match filters.status {
        StatusFilter::All => true,
        StatusFilter::Only(status) => request.status == status,
    };

    let matches_type = match &filters.type_key {
        TypeFilter::All => true,
        TypeFilter::Key(key) => request.type_key.eq_ignore_ascii_case(key),
    };

    matches_search && matches_status && matches_type
}
