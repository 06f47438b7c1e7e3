use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("GitLab API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("GitLab API error (status {status}) after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open browser: {0}")]
    Browser(String),
}

impl MonitorError {
    /// Message suitable for an audit line: the server-provided text when there
    /// is one, the error's display form otherwise.
    pub fn server_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.trim().is_empty() => message.trim().to_string(),
            Self::Api { status, .. } => format!("Unknown error (status {status})"),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_prefers_api_message() {
        let err = MonitorError::Api {
            status: 403,
            message: " 403 Forbidden ".to_string(),
        };
        assert_eq!(err.server_message(), "403 Forbidden");
    }

    #[test]
    fn test_server_message_falls_back_when_api_message_is_empty() {
        let err = MonitorError::Api {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.server_message(), "Unknown error (status 500)");
    }

    #[test]
    fn test_server_message_uses_display_for_other_errors() {
        let err = MonitorError::Config("missing project".to_string());
        assert_eq!(err.server_message(), "Invalid configuration: missing project");
    }
}
