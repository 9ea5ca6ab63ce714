//! Client for gw2style's own bot-authenticated admin endpoints.

use std::time::Duration;

use gw2style_common::models::moderation::{PublishPostRequest, RejectPostRequest};
use reqwest::Client;
use serde::Serialize;

use crate::error::{DiscordError, Result};

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    authorization: String,
}

impl BackendClient {
    /// `base_url` is the API root, e.g. `http://127.0.0.1:8080/api/v1`.
    pub fn new(base_url: &str, bot_token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("gw2style-bot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            authorization: format!("Bot {bot_token}"),
        })
    }

    pub async fn publish_post(&self, post_id: i64, body: &PublishPostRequest) -> Result<()> {
        self.post(&format!("/admin/posts/{post_id}/publish"), body).await
    }

    pub async fn reject_post(&self, post_id: i64, body: &RejectPostRequest) -> Result<()> {
        self.post(&format!("/admin/posts/{post_id}/reject"), body).await
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DiscordError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}
