use std::sync::Arc;
use std::time::Duration;

use tramite_client::api::RequestDetail;
use tramite_client::ApprovalsApi;
use tramite_core::{NewRequest, RequestId, RequestStatus, UserId};
use tramite_sync::{submit_request, LoadOutcome, NotificationEngine, Poller, RequestController};

use crate::commands::CommandResult;
use crate::context::AppContext;

pub async fn create(
    context: &AppContext,
    title: &str,
    description: &str,
    type_key: &str,
    approver: i64,
) -> CommandResult {
    if let Err(message) = context.require_workflow_user() {
        return CommandResult::failure(message);
    }

    let draft = NewRequest {
        title: title.to_owned(),
        description: description.to_owned(),
        type_key: type_key.to_owned(),
        approver_id: UserId(approver),
    };

    match submit_request(context.api.as_ref(), &draft).await {
        Ok(created) => CommandResult::success(format!(
            "request #{} created (status: {}); `tramite show {}` for the detail",
            created.id, created.status, created.id
        )),
        Err(error) => CommandResult::failure(error.user_message()),
    }
}

pub async fn pending(context: &AppContext, approver: Option<i64>) -> CommandResult {
    let user = match context.require_workflow_user() {
        Ok(user) => user,
        Err(message) => return CommandResult::failure(message),
    };
    let approver_id = match approver {
        Some(id) => UserId(id),
        None if user.role.is_approver() => user.id,
        None => {
            return CommandResult::failure(
                "you are not an approver; pass --approver <id> to view someone's inbox",
            )
        }
    };

    match context.api.pending_requests(approver_id).await {
        Ok(requests) if requests.is_empty() => {
            CommandResult::success(format!("no pending requests for approver #{approver_id}"))
        }
        Ok(requests) => {
            let lines: Vec<String> = requests
                .iter()
                .map(|request| {
                    format!("#{:<4} {:<40} {}", request.id.0, request.title, request.type_key)
                })
                .collect();
            CommandResult::success(lines.join("\n"))
        }
        Err(error) => CommandResult::failure(error.user_message()),
    }
}

pub async fn show(context: &AppContext, id: i64, watch: bool) -> CommandResult {
    if let Err(message) = context.require_workflow_user() {
        return CommandResult::failure(message);
    }

    let controller =
        Arc::new(RequestController::new(context.api.clone(), context.session.clone()));
    controller.open(RequestId(id));

    match controller.load().await {
        Ok(LoadOutcome::Applied(detail)) => {
            println!("{}", render_detail(&detail, controller.can_transition()));
        }
        Ok(LoadOutcome::Superseded) => {}
        Err(error) => return CommandResult::failure(error.user_message()),
    }

    if !watch {
        return CommandResult::success("");
    }

    // The detail poller lives exactly as long as this watch: ctrl-c stops it
    // before the command returns.
    let period = Duration::from_secs(context.config.polling.request_detail_secs);
    let poller = Poller::start("request-detail", period, {
        let controller = controller.clone();
        move || {
            let controller = controller.clone();
            async move {
                match controller.load().await {
                    Ok(LoadOutcome::Applied(detail)) => {
                        println!("{}", render_detail(&detail, controller.can_transition()));
                    }
                    Ok(LoadOutcome::Superseded) => {}
                    Err(error) => println!("error: {}", error.user_message()),
                }
            }
        }
    });

    let _ = tokio::signal::ctrl_c().await;
    poller.stop().await;
    CommandResult::success("stopped watching")
}

pub async fn decide(
    context: &AppContext,
    id: i64,
    approve: bool,
    comment: Option<String>,
) -> CommandResult {
    if let Err(message) = context.require_workflow_user() {
        return CommandResult::failure(message);
    }

    let notifications = NotificationEngine::new(context.api.clone());
    let controller =
        RequestController::new(context.api.clone(), context.session.clone())
            .with_notifications(notifications);
    controller.open(RequestId(id));
    if let Err(error) = controller.load().await {
        return CommandResult::failure(error.user_message());
    }

    let target = if approve { RequestStatus::Approved } else { RequestStatus::Rejected };
    match controller.transition(target, comment).await {
        Ok(report) => {
            let mut lines = vec![report.message];
            if report.changed {
                if let Some(detail) = controller.snapshot() {
                    lines.push(render_detail(&detail, false));
                }
            }
            CommandResult::success(lines.join("\n"))
        }
        Err(error) => CommandResult::failure(error.user_message()),
    }
}

fn render_detail(detail: &RequestDetail, can_decide: bool) -> String {
    let request = &detail.request;
    let mut lines = vec![
        format!("request #{}: {}", request.id, request.title),
        format!("  {}", request.description),
        format!(
            "  type: {} · status: {} · requester: #{} · approver: #{}",
            request.type_key, request.status, request.requester_id, request.approver_id
        ),
        format!(
            "  created {} · updated {}",
            request.created_at.format("%Y-%m-%d %H:%M"),
            request.updated_at.format("%Y-%m-%d %H:%M")
        ),
        "history:".to_owned(),
    ];

    if detail.history.is_empty() {
        lines.push("  no history yet".to_owned());
    }
    for entry in &detail.history {
        let mut line = format!(
            "  {} {} {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.actor_label(),
            entry.describe_change()
        );
        if let Some(comment) = &entry.comment {
            line.push_str(&format!(" \"{comment}\""));
        }
        lines.push(line);
    }

    if can_decide {
        lines.push(format!(
            "you are the assigned approver: `tramite approve {}` / `tramite reject {}`",
            request.id, request.id
        ));
    } else if request.status == RequestStatus::Pending {
        lines.push(format!(
            "only the assigned approver (#{}) may decide this request",
            request.approver_id
        ));
    }

    lines.join("\n")
}
