use std::time::Duration;

/// Error type for the harness
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(
        "Timeout waiting for {description} after {timeout:?}: last observed count {last_count}, criteria: {criteria}"
    )]
    AssertionTimeout {
        description: String,
        criteria: String,
        last_count: usize,
        timeout: Duration,
    },

    #[error("`{command}` returned an unexpected exit code: expected {expected}, got {actual}")]
    UnexpectedExitCode {
        command: String,
        expected: i64,
        actual: i64,
        output: String,
    },

    #[error("Container runtime error: {0}")]
    Runtime(String),

    #[error("Could not find device. {0}")]
    DeviceNotFound(String),

    #[error("Cloud request failed: {status} {url}: {body}")]
    Cloud {
        status: u16,
        url: String,
        body: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Operation {id} finished as {status}: {reason}")]
    OperationFailed {
        id: String,
        status: String,
        reason: String,
    },

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown keyword: {0}")]
    UnknownKeyword(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<testcontainers::TestcontainersError> for HarnessError {
    fn from(e: testcontainers::TestcontainersError) -> Self {
        HarnessError::Runtime(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Shorten a command for error messages.
pub fn command_snippet(cmd: &str) -> String {
    const MAX: usize = 30;
    if cmd.chars().count() > MAX {
        let head: String = cmd.chars().take(MAX).collect();
        format!("{head}...")
    } else {
        cmd.to_string()
    }
}
