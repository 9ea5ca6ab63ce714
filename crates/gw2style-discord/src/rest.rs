//! Bot-authenticated Discord REST client.

use std::time::Duration;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DiscordError, Result};
use crate::types::{CreateMessage, Message, MessageReference, User};

pub const DEFAULT_BASE: &str = "https://discord.com/api/v10";

/// ```rust,no_run
/// use gw2style_discord::rest::DiscordRest;
///
/// #[tokio::main]
/// async fn main() -> gw2style_discord::Result<()> {
///     let rest = DiscordRest::new("mytoken", None)?;
///     let msg = rest.get_message("1234", "5678").await?;
///     println!("{}", msg.content);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DiscordRest {
    client: Client,
    base_url: String,
}

impl DiscordRest {
    pub fn new(token: impl Into<String>, base_url: Option<&str>) -> Result<Self> {
        let token = {
            let t = token.into();
            if t.starts_with("Bot ") { t } else { format!("Bot {t}") }
        };
        let client = Client::builder()
            .default_headers({
                let mut h = reqwest::header::HeaderMap::new();
                h.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&token)
                        .map_err(|e| DiscordError::Other(e.to_string()))?,
                );
                h
            })
            .user_agent(concat!(
                "DiscordBot (https://gw2style.com, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.unwrap_or(DEFAULT_BASE).trim_end_matches('/').to_owned(),
        })
    }

    // ── Internal ──────────────────────────────────────────────────────────────

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&(impl Serialize + ?Sized)>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let msg = resp
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("message").and_then(|e| e.as_str()).map(str::to_owned))
                .unwrap_or_else(|| status.to_string());
            return Err(DiscordError::Api { status: status.as_u16(), message: msg });
        }
        Ok(resp.json::<T>().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None::<&Value>).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.delete(&url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(DiscordError::Api { status, message: resp.text().await.unwrap_or_default() });
        }
        Ok(())
    }

    // ── Messages ──────────────────────────────────────────────────────────────

    pub async fn get_message(&self, channel_id: &str, message_id: &str) -> Result<Message> {
        self.get(&format!("/channels/{channel_id}/messages/{message_id}")).await
    }

    pub async fn create_message(&self, channel_id: &str, content: impl Into<String>) -> Result<Message> {
        let body = CreateMessage { content: content.into(), message_reference: None };
        self.request(Method::POST, &format!("/channels/{channel_id}/messages"), Some(&body))
            .await
    }

    /// Send a message that replies to `message_id` in the same channel.
    pub async fn reply(
        &self,
        channel_id: &str,
        message_id: &str,
        content: impl Into<String>,
    ) -> Result<Message> {
        let body = CreateMessage {
            content: content.into(),
            message_reference: Some(MessageReference {
                message_id: message_id.to_owned(),
                channel_id: Some(channel_id.to_owned()),
            }),
        };
        self.request(Method::POST, &format!("/channels/{channel_id}/messages"), Some(&body))
            .await
    }

    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        self.delete(&format!("/channels/{channel_id}/messages/{message_id}")).await
    }

    // ── Users ─────────────────────────────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.get(&format!("/users/{user_id}")).await
    }
}
