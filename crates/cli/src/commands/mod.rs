pub mod config;
pub mod dashboard;
pub mod doctor;
pub mod notifications;
pub mod requests;
pub mod session;
pub mod types;

/// Rendered outcome of one command: the text to print and the process exit
/// code. Failures render inline (backend message first, generic fallback
/// otherwise) instead of propagating to a global handler.
#[derive(Clone, Debug)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { exit_code: 1, output: format!("error: {}", message.into()) }
    }
}
