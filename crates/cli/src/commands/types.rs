use tramite_client::ApprovalsApi;
use tramite_core::{NewRequestType, RequestTypeId, RequestTypePatch};

use crate::commands::CommandResult;
use crate::context::AppContext;

pub async fn list(context: &AppContext) -> CommandResult {
    if let Err(message) = context.require_user() {
        return CommandResult::failure(message);
    }

    let catalog = match context.auth_flow().load_catalog().await {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::failure(error.user_message()),
    };

    let groups = catalog.grouped_types();
    if groups.is_empty() {
        return CommandResult::success("no request types configured yet");
    }

    let mut lines = Vec::new();
    for group in groups {
        lines.push(format!("{}:", group.category));
        for request_type in group.types {
            let state = if request_type.active { "" } else { " [deactivated]" };
            let description = request_type
                .description
                .map(|description| format!(" · {description}"))
                .unwrap_or_default();
            lines.push(format!(
                "  #{:<3} {:<20} {}{state}{description}",
                request_type.id.0, request_type.key, request_type.label
            ));
        }
    }
    CommandResult::success(lines.join("\n"))
}

pub async fn add(
    context: &AppContext,
    key: &str,
    label: &str,
    category: &str,
    description: Option<String>,
) -> CommandResult {
    if let Err(message) = context.require_user() {
        return CommandResult::failure(message);
    }

    let draft = NewRequestType {
        key: key.to_owned(),
        label: label.to_owned(),
        category: category.to_owned(),
        description,
    }
    .normalized();
    if let Err(error) = draft.validate() {
        return CommandResult::failure(error.to_string());
    }

    match context.api.create_request_type(&draft).await {
        Ok(created) => CommandResult::success(format!(
            "request type `{}` created in category `{}`",
            created.key, created.category
        )),
        Err(error) => CommandResult::failure(error.user_message()),
    }
}

pub async fn toggle(context: &AppContext, id: i64) -> CommandResult {
    if let Err(message) = context.require_user() {
        return CommandResult::failure(message);
    }

    let types = match context.api.request_types().await {
        Ok(types) => types,
        Err(error) => return CommandResult::failure(error.user_message()),
    };
    let Some(current) = types.iter().find(|request_type| request_type.id.0 == id) else {
        return CommandResult::failure(format!("request type #{id} not found"));
    };

    let patch = RequestTypePatch { active: Some(!current.active), ..RequestTypePatch::default() };
    match context.api.update_request_type(RequestTypeId(id), &patch).await {
        Ok(updated) => CommandResult::success(format!(
            "request type `{}` is now {}",
            updated.key,
            if updated.active { "active" } else { "deactivated (soft-deleted)" }
        )),
        Err(error) => CommandResult::failure(error.user_message()),
    }
}
