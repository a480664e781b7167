//! Subprocess wrapper around the `aws` command-line client

use super::error::{CloudError, Result};
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;

/// Maximum length of stderr output to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize CLI output for logging
/// Truncates long output and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', " ")
}

/// Runner for `aws <service> <operation>` invocations returning JSON
#[derive(Clone, Debug)]
pub struct AwsCli {
    program: String,
    profile: Option<String>,
}

impl AwsCli {
    /// Create a runner using the `aws` executable on PATH
    pub fn new(profile: Option<String>) -> Self {
        Self {
            program: "aws".to_string(),
            profile,
        }
    }

    /// Use a different executable (e.g. a pinned v2 install)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Run one CLI operation in `region` and parse its JSON output.
    ///
    /// Empty output (delete/stop operations) is returned as `Value::Null`.
    pub async fn run(
        &self,
        service: &str,
        operation: &str,
        region: &str,
        args: &[String],
    ) -> Result<Value> {
        let label = format!("{} {}", service, operation);
        tracing::debug!("aws {} --region {} {}", label, region, args.join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.arg(service)
            .arg(operation)
            .args(args)
            .arg("--region")
            .arg(region)
            .arg("--output")
            .arg("json")
            .arg("--no-cli-pager");

        if let Some(profile) = &self.profile {
            cmd.arg("--profile").arg(profile);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CloudError::CliNotFound);
            }
            Err(e) => return Err(CloudError::Io(e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!("aws {} failed: {}", label, sanitize_for_log(&stderr));
            return Err(CloudError::from_stderr(&label, &stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_output(&label, &stdout)
    }
}

/// Parse CLI stdout, treating empty output as `null`
pub fn parse_output(operation: &str, stdout: &str) -> Result<Value> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(trimmed).map_err(|e| CloudError::UnexpectedResponse {
        operation: operation.to_string(),
        detail: e.to_string(),
    })
}

/// Format a control plane error for display
/// Security: keeps raw provider messages short and free of control characters
pub fn format_aws_error(error: &CloudError) -> String {
    match error {
        CloudError::CliNotFound => error.to_string(),
        CloudError::AuthFailed(_) => {
            "Authentication failed. Run 'aws configure' or refresh your SSO session.".to_string()
        }
        CloudError::Throttled(_) => "Rate limit exceeded. Please try again later.".to_string(),
        CloudError::NotFound(_) => "Resource not found.".to_string(),
        other => {
            let text = other.to_string();
            let sanitized = text
                .chars()
                .filter(|c| c.is_ascii_graphic() || *c == ' ')
                .take(160)
                .collect::<String>();

            if sanitized.len() < text.len() {
                format!("{}...", sanitized)
            } else {
                sanitized
            }
        }
    }
}
