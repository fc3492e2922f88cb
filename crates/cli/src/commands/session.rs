use tramite_core::Role;

use crate::commands::CommandResult;
use crate::context::AppContext;

pub async fn login(context: &AppContext, credential: &str) -> CommandResult {
    match context.auth_flow().login(credential).await {
        Ok(user) => {
            let mut lines = vec![format!("logged in as {} <{}>", user.label(), user.email)];
            if !user.role.is_set() {
                lines.push(
                    "your role is not set yet; run `tramite role <requester|approver>`".to_owned(),
                );
            }
            CommandResult::success(lines.join("\n"))
        }
        Err(error) => CommandResult::failure(error.user_message()),
    }
}

pub fn logout(context: &AppContext) -> CommandResult {
    if !context.session.is_authenticated() {
        return CommandResult::success("no active session");
    }
    context.auth_flow().logout();
    CommandResult::success("session cleared")
}

pub fn whoami(context: &AppContext) -> CommandResult {
    match context.require_user() {
        Ok(user) => CommandResult::success(format!(
            "#{} {} <{}> · role: {}",
            user.id, user.label(), user.email, user.role
        )),
        Err(message) => CommandResult::failure(message),
    }
}

pub async fn choose_role(context: &AppContext, raw_role: &str) -> CommandResult {
    let role = Role::from_wire(raw_role);
    match context.auth_flow().choose_role(role).await {
        Ok(user) => CommandResult::success(format!("role set to {}", user.role)),
        Err(error) => CommandResult::failure(error.user_message()),
    }
}
