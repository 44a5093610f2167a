//! HTTP notifier for the chat-bot layer
//!
//! Matches are POSTed to `{bot_url}/match`, expected membership is read from
//! `{bot_url}/restore`. Every call carries the shared secret in the
//! `secret-key` header.

use crate::config::NotifierSettings;
use crate::error::{MatchmakingError, Result};
use crate::notify::notifier::MatchNotifier;
use crate::types::{ExpectedQueues, MatchNotification, MatchResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;

/// Header carrying the shared secret
pub const SECRET_HEADER: &str = "secret-key";

/// reqwest-backed [`MatchNotifier`]
#[derive(Debug, Clone)]
pub struct HttpMatchNotifier {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl HttpMatchNotifier {
    pub fn new(settings: &NotifierSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()
            .map_err(|e| MatchmakingError::ConfigurationError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: settings.bot_url.trim_end_matches('/').to_string(),
            secret_key: settings.secret_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(SECRET_HEADER, &self.secret_key)
    }
}

#[async_trait]
impl MatchNotifier for HttpMatchNotifier {
    async fn notify_match(&self, result: &MatchResult) -> Result<()> {
        let body = MatchNotification::from(result);
        let url = self.url("match");
        debug!("Posting match {} to {}", body.match_id, url);

        let failure = |message: String| MatchmakingError::NotificationFailed {
            killer_id: result.killer_id,
            victim_id: result.victim_id,
            message,
        };

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failure(format!("bot answered {}", status)));
        }
        Ok(())
    }

    async fn fetch_expected_queues(&self) -> Result<ExpectedQueues> {
        let failure = |message: String| MatchmakingError::ReconciliationFailed { message };

        let response = self
            .authorized(self.client.get(self.url("restore")))
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failure(format!("bot answered {}", status)));
        }

        response
            .json::<ExpectedQueues>()
            .await
            .map_err(|e| failure(format!("invalid restore payload: {}", e)))
    }

    async fn ping(&self) -> Result<()> {
        let response = self
            .authorized(self.client.get(self.url("ping")))
            .send()
            .await
            .map_err(|e| MatchmakingError::InternalError {
                message: format!("bot unreachable: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(MatchmakingError::InternalError {
                message: format!("bot ping answered {}", response.status()),
            });
        }
        Ok(())
    }
}
