use thiserror::Error;

/// Errors raised while turning a task into a provider call.
///
/// None of these cross the executor boundary: every variant is translated into a
/// `ResultEnvelope` with `success = false` (or recovered locally, for `Parse`).
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// A required input parameter is missing. Never retried.
    #[error("Missing required parameter: {message}")]
    Validation { message: String, hint: String },

    /// The language model reply could not be decoded. Recovered by the parser fallback.
    #[error("Could not parse model reply: {0}")]
    Parse(String),

    /// Network or provider failure that is worth retrying.
    #[error("Provider request failed: {0}")]
    TransientProvider(String),

    /// Credential missing or rejected by the provider.
    #[error("Authentication failed: {message}")]
    Auth { message: String, hint: String },

    /// The provider refused the request for a reason retrying will not fix.
    #[error("Provider rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

pub type TaskResult<T> = Result<T, TaskError>;

impl TaskError {
    pub fn validation(message: impl Into<String>, hint: impl Into<String>) -> Self {
        TaskError::Validation {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn auth(message: impl Into<String>, hint: impl Into<String>) -> Self {
        TaskError::Auth {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Only transient provider failures are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::TransientProvider(_))
    }

    /// Human readable text shown in the envelope `content`.
    pub fn remediation(&self) -> String {
        match self {
            TaskError::Validation { message, hint } => format!("❌ {}\n💡 {}", message, hint),
            TaskError::Auth { message, hint } => format!("🔒 {}\n💡 {}", message, hint),
            TaskError::Parse(message) => format!("❌ Could not understand the request: {}", message),
            TaskError::TransientProvider(message) => {
                format!("⚠️ The service could not be reached: {}", message)
            }
            TaskError::Rejected { status, message } => {
                format!("❌ The service rejected the request (HTTP {}): {}", status, message)
            }
        }
    }

    /// Map a non-success HTTP status onto the error taxonomy.
    pub fn from_status(status: u16, body: &str, credential_hint: &str) -> Self {
        match status {
            401 | 403 => TaskError::auth(
                format!("Provider returned HTTP {}: {}", status, body),
                credential_hint,
            ),
            408 | 429 | 500..=599 => {
                TaskError::TransientProvider(format!("HTTP {}: {}", status, body))
            }
            _ => TaskError::Rejected {
                status,
                message: body.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for TaskError {
    fn from(err: reqwest::Error) -> Self {
        TaskError::TransientProvider(err.to_string())
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::Parse(err.to_string())
    }
}
