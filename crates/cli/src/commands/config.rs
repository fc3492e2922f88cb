use tramite_core::config::LogFormat;

use crate::commands::CommandResult;
use crate::context::AppContext;

/// Effective configuration with source-sensitive values redacted: the stored
/// token is reported as present/absent, never printed.
pub fn run(context: &AppContext) -> CommandResult {
    let config = &context.config;
    let format = match config.logging.format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    };
    let session_line = match context.session.current_user() {
        Some(user) => format!("restored for {} <{}> (token: <redacted>)", user.label(), user.email),
        None => "none".to_owned(),
    };

    let lines = vec![
        format!("api.base_url           = {}", config.api.base_url),
        format!("api.timeout_secs       = {}", config.api.timeout_secs),
        format!("storage.dir            = {}", config.storage.dir.display()),
        format!("polling.notifications  = {}s", config.polling.notifications_secs),
        format!("polling.request_detail = {}s", config.polling.request_detail_secs),
        format!("logging.level          = {}", config.logging.level),
        format!("logging.format         = {format}"),
        format!("backend                = {}", if context.offline { "offline (in-memory)" } else { "rest" }),
        format!("session                = {session_line}"),
    ];
    CommandResult::success(lines.join("\n"))
}
