use tramite_client::ApprovalsApi;
use tramite_core::dashboard::{summarize, DashboardFilters, StatusFilter, TypeFilter};
use tramite_core::{Catalog, RequestStatus, UserId};

use crate::commands::CommandResult;
use crate::context::AppContext;

pub async fn run(
    context: &AppContext,
    search: &str,
    status: &str,
    type_key: &str,
    approver: Option<i64>,
) -> CommandResult {
    let user = match context.require_workflow_user() {
        Ok(user) => user,
        Err(message) => return CommandResult::failure(message),
    };

    let status = match parse_status_filter(status) {
        Ok(status) => status,
        Err(message) => return CommandResult::failure(message),
    };
    let filters = DashboardFilters {
        search: search.to_owned(),
        status,
        type_key: parse_type_filter(type_key),
    };

    // Labels come from the catalog; a failed catalog load degrades to raw
    // type keys instead of blocking the dashboard.
    let catalog = match context.auth_flow().load_catalog().await {
        Ok(catalog) => catalog,
        Err(error) => {
            tracing::warn!(
                event_name = "cli.catalog_load_failed",
                error = %error,
                "rendering dashboard without catalog labels"
            );
            Catalog::default()
        }
    };

    let approver_id = match approver {
        Some(id) => UserId(id),
        None if user.role.is_approver() => user.id,
        None => {
            return CommandResult::failure(
                "you are not an approver; pass --approver <id> to view someone's dashboard",
            )
        }
    };

    let requests = match context.api.requests_by_approver(approver_id).await {
        Ok(requests) => requests,
        Err(error) => return CommandResult::failure(error.user_message()),
    };

    let view = summarize(&requests, &filters);
    let mut lines = vec![format!(
        "total {} · pending {} · approved {} · rejected {}",
        view.total, view.pending, view.approved, view.rejected
    )];

    if view.filtered.is_empty() {
        lines.push("no requests match the current filters".to_owned());
    }
    for request in &view.filtered {
        lines.push(format!(
            "#{:<4} {:<40} {:<20} {}",
            request.id.0,
            request.title,
            catalog.label_for(&request.type_key),
            request.status
        ));
    }

    CommandResult::success(lines.join("\n"))
}

fn parse_status_filter(raw: &str) -> Result<StatusFilter, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.is_empty() || normalized == "all" || normalized == "todos" {
        return Ok(StatusFilter::All);
    }
    RequestStatus::from_wire(&normalized)
        .map(StatusFilter::Only)
        .ok_or_else(|| format!("unknown status filter `{raw}`"))
}

fn parse_type_filter(raw: &str) -> TypeFilter {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.is_empty() || normalized == "all" || normalized == "todos" {
        TypeFilter::All
    } else {
        TypeFilter::Key(normalized)
    }
}
