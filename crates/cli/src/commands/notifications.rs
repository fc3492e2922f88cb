use std::time::Duration;

use tramite_core::{Notification, NotificationId};
use tramite_sync::{NotificationEngine, Poller};

use crate::commands::CommandResult;
use crate::context::AppContext;

pub async fn list(context: &AppContext, watch: bool) -> CommandResult {
    if let Err(message) = context.require_user() {
        return CommandResult::failure(message);
    }

    let engine = NotificationEngine::new(context.api.clone());
    if let Err(error) = engine.refresh().await {
        return CommandResult::failure(error.user_message());
    }
    println!("{}", render_feed(&engine));

    if !watch {
        return CommandResult::success("");
    }

    let period = Duration::from_secs(context.config.polling.notifications_secs);
    let poller = Poller::start("notifications", period, {
        let engine = engine.clone();
        move || {
            let engine = engine.clone();
            async move {
                // A failed poll degrades to a visible error line; the feed
                // keeps its last good state.
                match engine.refresh().await {
                    Ok(()) => println!("{}", render_feed(&engine)),
                    Err(error) => println!("error: {}", error.user_message()),
                }
            }
        }
    });

    let _ = tokio::signal::ctrl_c().await;
    poller.stop().await;
    CommandResult::success("stopped watching")
}

pub async fn read(context: &AppContext, id: i64) -> CommandResult {
    if let Err(message) = context.require_user() {
        return CommandResult::failure(message);
    }

    let engine = NotificationEngine::new(context.api.clone());
    if let Err(error) = engine.refresh().await {
        return CommandResult::failure(error.user_message());
    }

    // Navigation only happens on success; a failed mark keeps the error
    // visible instead of jumping to the request.
    match engine.mark_read(NotificationId(id)).await {
        Ok(Some(request_id)) => CommandResult::success(format!(
            "marked as read; open it with `tramite show {request_id}`"
        )),
        Ok(None) => CommandResult::success("marked as read"),
        Err(error) => CommandResult::failure(error.user_message()),
    }
}

fn render_feed(engine: &NotificationEngine) -> String {
    let entries = engine.entries();
    let mut lines = vec![format!("{} unread", engine.unread_count())];
    if entries.is_empty() {
        lines.push("no notifications".to_owned());
    }
    for entry in &entries {
        lines.push(render_entry(entry));
    }
    lines.join("\n")
}

fn render_entry(entry: &Notification) -> String {
    let marker = if entry.is_read() { " " } else { "*" };
    let link = entry
        .request_id
        .map(|request_id| format!(" (request #{request_id})"))
        .unwrap_or_default();
    format!(
        "{marker} #{:<4} {} {}{link}",
        entry.id.0,
        entry.created_at.format("%Y-%m-%d %H:%M"),
        entry.message
    )
}
