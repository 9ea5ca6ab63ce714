//! Discord webhook execution.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::{DiscordError, Result};
use crate::types::WebhookPayload;

/// Posts payloads to a single webhook URL. Built without a URL it is
/// disabled and every send succeeds without doing anything.
#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    url: Option<String>,
}

impl WebhookClient {
    pub fn new(url: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("gw2style/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.map(str::to_owned),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    pub async fn send(&self, payload: &WebhookPayload) -> Result<()> {
        let Some(url) = &self.url else {
            tracing::debug!("Webhook not configured, skipping send");
            return Ok(());
        };

        let resp = self.client.post(url).json(payload).send().await?;
        let status = resp.status();
        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            return Err(DiscordError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode as AxumStatus, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<serde_json::Value>>>;

    async fn spawn_hook(status: AxumStatus) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route(
                "/hook",
                post(
                    move |State(seen): State<Seen>, Json(body): Json<serde_json::Value>| async move {
                        seen.lock().unwrap().push(body);
                        status
                    },
                ),
            )
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/hook"), seen)
    }

    fn payload() -> WebhookPayload {
        WebhookPayload {
            content: Some("hello".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn no_content_is_success() {
        let (url, seen) = spawn_hook(AxumStatus::NO_CONTENT).await;
        WebhookClient::new(Some(&url)).unwrap().send(&payload()).await.unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["content"], "hello");
    }

    #[tokio::test]
    async fn other_statuses_are_errors() {
        let (url, _) = spawn_hook(AxumStatus::TOO_MANY_REQUESTS).await;
        let err = WebhookClient::new(Some(&url))
            .unwrap()
            .send(&payload())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(429));
    }

    #[tokio::test]
    async fn disabled_client_is_a_no_op() {
        let client = WebhookClient::new(None).unwrap();
        assert!(!client.is_enabled());
        client.send(&payload()).await.unwrap();
    }
}
