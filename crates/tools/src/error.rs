use felos_domain::error::Error;

/// Why a tool produced `success: false`.
///
/// The `Display` form is what lands in the tool result's `error` field, so
/// timeouts always read `timeout: ...`.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("{0}")]
    Upstream(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("image job failed: {0}")]
    JobFailed(String),
}

impl From<Error> for ToolError {
    fn from(e: Error) -> Self {
        match e {
            Error::Timeout(msg) => ToolError::Timeout(msg),
            other => ToolError::Upstream(other.to_string()),
        }
    }
}
