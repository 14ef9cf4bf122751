use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("notification webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Delivery side of notifications (push, chat, email gateway...).
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn deliver(&self, target_user_id: i32, message: &str) -> Result<(), DispatchError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    text: &'a str,
    user_id: i32,
}

/// Posts `{"text": ..., "userId": ...}` to a webhook such as a Slack incoming hook.
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    client: Client,
    webhook_url: String,
}

impl WebhookDispatcher {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    async fn deliver(&self, target_user_id: i32, message: &str) -> Result<(), DispatchError> {
        let payload = WebhookPayload {
            text: message,
            user_id: target_user_id,
        };

        self.client
            .post(&self.webhook_url)
            .json(&payload)
            .timeout(Duration::from_secs(5))
            .send()
            .await?
            .error_for_status()?; // non-2xx is a failure

        Ok(())
    }
}

/// Used when no webhook is configured; notifications stay in the database only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn deliver(&self, target_user_id: i32, message: &str) -> Result<(), DispatchError> {
        info!(target_user_id, text = message, "notification recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::matchers::{eq, json_decoded, request};
    use httptest::responders::status_code;
    use httptest::{Expectation, Server};
    use serde_json::json;

    #[tokio::test]
    async fn webhook_posts_message_and_target() {
        let server = Server::run();
        server.expect(
            Expectation::matching(httptest::all_of![
                request::method_path("POST", "/hooks/bugs"),
                request::body(json_decoded(eq(json!({ "text": "Bug #1 closed", "userId": 4 })))),
            ])
            .respond_with(status_code(200)),
        );

        let dispatcher = WebhookDispatcher::new(server.url("/hooks/bugs").to_string());
        dispatcher.deliver(4, "Bug #1 closed").await.unwrap();
    }

    #[tokio::test]
    async fn webhook_error_status_is_reported() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/hooks/bugs"))
                .respond_with(status_code(503)),
        );

        let dispatcher = WebhookDispatcher::new(server.url("/hooks/bugs").to_string());
        let result = dispatcher.deliver(4, "Bug #1 closed").await;
        assert!(matches!(result, Err(DispatchError::Http(_))));
    }
}
