use log::{debug, warn};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

use crate::auth::Token;
use crate::error::{MonitorError, Result};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_SECONDS: u64 = 2;
const MAX_CONCURRENT_REQUESTS: usize = 16;
pub(super) const PAGE_SIZE: usize = 100;

pub struct GitLabClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
    semaphore: Arc<Semaphore>,
    retry_delay: Duration,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("mrwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MonitorError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base = format!("{}/", base_url.trim_end_matches('/'));
        let api_url = Url::parse(&base)
            .map_err(|e| MonitorError::Config(format!("Invalid base URL: {e}")))?
            .join("api/v4/")
            .map_err(|e| MonitorError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS)),
            retry_delay: Duration::from_secs(RETRY_DELAY_SECONDS),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// Endpoint relative to `api/v4/`.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(path)
            .map_err(|e| MonitorError::Config(format!("Invalid API URL '{path}': {e}")))
    }

    /// Endpoint under `projects/:id/`, where the id may be a numeric id or a
    /// `group/project` path.
    pub fn project_endpoint(&self, project: &str, path: &str) -> Result<Url> {
        let encoded: String = url::form_urlencoded::byte_serialize(project.as_bytes()).collect();
        self.endpoint(&format!("projects/{encoded}/{path}"))
    }

    /// GET with automatic retry on network errors, rate limits and server errors.
    pub(super) async fn get_json<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| MonitorError::Config(format!("HTTP client is shut down: {e}")))?;

        let mut retry_count = 0;
        loop {
            debug!("GET {url}");
            let request = self.auth_request(self.client.get(url.clone()));

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    if retry_count >= MAX_RETRIES {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error ({e}), retrying in {}s ({}/{MAX_RETRIES})...",
                        self.retry_delay.as_secs(),
                        retry_count + 1,
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status == 429 || status.is_server_error() {
                if retry_count >= MAX_RETRIES {
                    return Err(MonitorError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: MAX_RETRIES,
                    });
                }

                warn!(
                    "GitLab API error (status {status}). Waiting {}s before retry {}/{MAX_RETRIES}...",
                    self.retry_delay.as_secs(),
                    retry_count + 1,
                );

                tokio::time::sleep(self.retry_delay).await;
                retry_count += 1;
                continue;
            }

            return parse_response(response).await;
        }
    }

    /// POST without a body. Never retried: the server may already have acted.
    pub(super) async fn post_json<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| MonitorError::Config(format!("HTTP client is shut down: {e}")))?;

        debug!("POST {url}");
        let response = self.auth_request(self.client.post(url)).send().await?;
        parse_response(response).await
    }
}

async fn parse_response<T>(response: Response) -> Result<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(MonitorError::Api {
            status: status.as_u16(),
            message: error_message(&error_text),
        });
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Pulls the human-readable part out of a GitLab error body.
///
/// GitLab answers `{"message": "..."}`, `{"message": {"field": [...]}}` or
/// `{"error": "..."}`; anything else is passed through as text.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    match value.get("message").or_else(|| value.get("error")) {
        Some(serde_json::Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod new_tests {
        use super::*;

        #[test]
        fn test_appends_api_path_with_or_without_trailing_slash() {
            for base in ["https://gitlab.example.com", "https://gitlab.example.com/"] {
                let client = GitLabClient::new(base, None).unwrap();
                assert_eq!(
                    client.endpoint("user").unwrap().as_str(),
                    "https://gitlab.example.com/api/v4/user"
                );
            }
        }

        #[test]
        fn test_keeps_subpath_installations() {
            let client = GitLabClient::new("https://example.com/gitlab", None).unwrap();
            assert_eq!(
                client.endpoint("user").unwrap().as_str(),
                "https://example.com/gitlab/api/v4/user"
            );
        }

        #[test]
        fn test_rejects_invalid_base_url() {
            let err = GitLabClient::new("not a url", None).err().unwrap();
            assert!(matches!(err, MonitorError::Config(_)));
        }
    }

    mod project_endpoint_tests {
        use super::*;

        #[test]
        fn test_encodes_project_path() {
            let client = GitLabClient::new("https://gitlab.example.com", None).unwrap();
            let url = client
                .project_endpoint("group/sub/project", "merge_requests")
                .unwrap();
            assert_eq!(
                url.as_str(),
                "https://gitlab.example.com/api/v4/projects/group%2Fsub%2Fproject/merge_requests"
            );
        }

        #[test]
        fn test_numeric_ids_pass_through() {
            let client = GitLabClient::new("https://gitlab.example.com", None).unwrap();
            let url = client.project_endpoint("1234", "jobs/5/retry").unwrap();
            assert_eq!(
                url.as_str(),
                "https://gitlab.example.com/api/v4/projects/1234/jobs/5/retry"
            );
        }
    }

    mod error_message_tests {
        use super::*;

        #[test]
        fn test_reads_message_string() {
            assert_eq!(error_message(r#"{"message":"403 Forbidden"}"#), "403 Forbidden");
        }

        #[test]
        fn test_reads_error_field() {
            assert_eq!(
                error_message(r#"{"error":"insufficient_scope"}"#),
                "insufficient_scope"
            );
        }

        #[test]
        fn test_serializes_structured_message() {
            assert_eq!(
                error_message(r#"{"message":{"base":["Job is not retryable"]}}"#),
                r#"{"base":["Job is not retryable"]}"#
            );
        }

        #[test]
        fn test_passes_plain_text_through() {
            assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
        }
    }
}
