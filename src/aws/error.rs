//! Control plane error types

use thiserror::Error;

/// Errors raised while talking to the cloud control plane.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("aws CLI not found. Install it: https://aws.amazon.com/cli/")]
    CliNotFound,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("{operation} failed: {message}")]
    CommandFailed { operation: String, message: String },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Unexpected response from {operation}: {detail}")]
    UnexpectedResponse { operation: String, detail: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CloudError {
    /// Absence of the resource, as opposed to a failure to ask.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }

    /// The resource (or sub-resource) already exists
    pub fn is_conflict(&self) -> bool {
        match self {
            CloudError::CommandFailed { message, .. } => {
                let lower = message.to_lowercase();
                lower.contains("conflictexception") || lower.contains("already exists")
            }
            _ => false,
        }
    }

    /// Classify a failed CLI invocation from its stderr output.
    pub fn from_stderr(operation: &str, stderr: &str) -> Self {
        let lower = stderr.to_lowercase();

        if lower.contains("could not find")
            || lower.contains("notfound")
            || lower.contains("does not exist")
            || lower.contains("nosuchentity")
            || lower.contains("not found")
        {
            return CloudError::NotFound(first_line(stderr));
        }

        if lower.contains("unable to locate credentials")
            || lower.contains("expiredtoken")
            || lower.contains("invalidclienttokenid")
            || lower.contains("unrecognizedclient")
            || lower.contains("accessdenied")
            || lower.contains("signaturedoesnotmatch")
        {
            return CloudError::AuthFailed(first_line(stderr));
        }

        if lower.contains("throttling") || lower.contains("rate exceeded") {
            return CloudError::Throttled(first_line(stderr));
        }

        CloudError::CommandFailed {
            operation: operation.to_string(),
            message: first_line(stderr),
        }
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no error output")
        .to_string()
}

pub type Result<T> = std::result::Result<T, CloudError>;
