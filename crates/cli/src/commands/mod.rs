pub mod chat;
pub mod migrate;

/// Outcome of one subcommand: a process exit code plus a single JSON
/// line for the caller to parse.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self { exit_code: 0, output: render(command, "ok", None, &message.into()) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self { exit_code, output: render(command, "error", Some(error_class), &message.into()) }
    }
}

fn render(command: &str, status: &str, error_class: Option<&str>, message: &str) -> String {
    let mut payload = serde_json::json!({
        "command": command,
        "status": status,
        "message": message,
    });
    if let Some(class) = error_class {
        payload["error_class"] = class.into();
    }
    payload.to_string()
}
