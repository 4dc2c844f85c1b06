use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use waypoint_core::config::DelegateConfig;
use waypoint_core::errors::{DelegateError, DelegateErrorKind};

/// Summary of an entity the delegate reports having created remotely.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEntity {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub mode: Option<String>,
}

impl CreatedEntity {
    pub fn summary(&self) -> String {
        format!("{} {}", self.kind, self.name)
    }
}

/// Structured reply from the remote assistant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateReply {
    pub response: String,
    #[serde(default)]
    pub entities_created: Vec<CreatedEntity>,
    #[serde(default)]
    pub document_generated: bool,
    #[serde(default)]
    pub priority_stream_created: bool,
    #[serde(default)]
    pub milestones_created: bool,
}

impl DelegateReply {
    pub fn text(response: impl Into<String>) -> Self {
        Self { response: response.into(), ..Self::default() }
    }
}

/// Upstream assistant that handles messages the local classifier cannot.
#[async_trait]
pub trait RemoteDelegate: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<DelegateReply, DelegateError>;
}

#[derive(Serialize)]
struct DelegateRequest<'a> {
    message: &'a str,
}

/// JSON-over-HTTP delegate client. Every call is bounded by the
/// configured timeout so a stalled upstream cannot wedge a submission,
/// and transient failures are retried up to the configured budget.
pub struct HttpDelegate {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    max_retries: u32,
}

impl HttpDelegate {
    pub fn from_config(config: &DelegateConfig) -> Result<Option<Self>, DelegateError> {
        let Some(base_url) = config.base_url.clone() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| {
                DelegateError::new(DelegateErrorKind::Generic, error.to_string())
            })?;
        Ok(Some(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        }))
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    async fn try_send(&self, text: &str) -> Result<DelegateReply, DelegateError> {
        let mut request = self.client.post(self.endpoint()).json(&DelegateRequest { message: text });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() || error.is_connect() {
                DelegateError::new(DelegateErrorKind::Network, error.to_string())
            } else {
                DelegateError::categorize(error.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DelegateError::categorize(format!("upstream returned {status}: {body}")));
        }

        response
            .json::<DelegateReply>()
            .await
            .map_err(|error| DelegateError::new(DelegateErrorKind::Generic, error.to_string()))
    }
}

#[async_trait]
impl RemoteDelegate for HttpDelegate {
    async fn send_message(&self, text: &str) -> Result<DelegateReply, DelegateError> {
        let mut remaining = self.max_retries;
        loop {
            match self.try_send(text).await {
                Ok(reply) => return Ok(reply),
                Err(error) if remaining > 0 && error.kind.is_retryable() => {
                    remaining -= 1;
                    debug!(%error, remaining, "retrying delegate call");
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Offline stand-in used by the CLI when no delegate URL is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct EchoDelegate;

#[async_trait]
impl RemoteDelegate for EchoDelegate {
    async fn send_message(&self, text: &str) -> Result<DelegateReply, DelegateError> {
        Ok(DelegateReply::text(format!(
            "I couldn't act on that directly, but here's what I heard: {text}"
        )))
    }
}
