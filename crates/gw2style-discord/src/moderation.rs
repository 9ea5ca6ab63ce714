//! The moderation bot: listens for ✅ / ❌ reactions in the moderation
//! channel and turns them into publish / reject calls on the backend.

use std::sync::Arc;

use gw2style_common::config::AppConfig;
use gw2style_common::models::moderation::{
    PublishPostRequest, RejectPostRequest, DEFAULT_REJECT_REASON,
};
use tokio::sync::{broadcast::error::RecvError, watch, RwLock};
use tracing::{debug, error, info, warn};

use crate::backend::BackendClient;
use crate::embeds::{self, POST_ID_FIELD};
use crate::error::{DiscordError, Result};
use crate::gateway::{GatewayClient, CLOSED_EVENT};
use crate::rest::DiscordRest;
use crate::types::{Message, ReactionAdd, Ready, User};
use crate::webhook::WebhookClient;

pub const APPROVE_EMOJI: &str = "✅";
pub const REJECT_EMOJI: &str = "❌";

/// Everything the bot needs to run.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub bot_token: String,
    pub moderation_channel_id: String,
    pub public_webhook_url: Option<String>,
    /// Website base URL used in announcement links.
    pub site_url: String,
    /// This server's API root (`.../api/v1`).
    pub backend_url: String,
    pub api_url: String,
    pub gateway_url: String,
}

impl BotSettings {
    /// `None` when the bot token or the moderation channel is missing.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let discord = &config.discord;
        Some(Self {
            bot_token: discord.bot_token()?.to_owned(),
            moderation_channel_id: discord.moderation_channel_id()?.to_owned(),
            public_webhook_url: discord.public_webhook_url().map(str::to_owned),
            site_url: config.server.public_url.clone(),
            backend_url: discord.backend_url(config.server.port),
            api_url: discord.api_url.clone(),
            gateway_url: discord.gateway_url.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Reject,
}

impl Verdict {
    pub fn from_emoji(name: &str) -> Option<Self> {
        match name {
            APPROVE_EMOJI => Some(Self::Approve),
            REJECT_EMOJI => Some(Self::Reject),
            _ => None,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OwnReaction,
    OtherChannel,
    OtherEmoji,
    NoPostId,
}

/// What handling one reaction amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ignored(IgnoreReason),
    Approved(i64),
    Rejected(i64),
    /// The backend refused or could not be reached; a warning was posted.
    Failed(i64),
}

/// Find the post id in a moderation notice: `(ID: n)` in the content first,
/// then an embed field named `Post ID`.
pub fn extract_post_id(msg: &Message) -> Option<i64> {
    let from_content = msg.content.find("(ID: ").and_then(|idx| {
        let rest = &msg.content[idx + 5..];
        let end = rest.find(')')?;
        rest[..end].trim().parse().ok()
    });

    from_content.or_else(|| {
        msg.embeds
            .iter()
            .flat_map(|e| e.fields.iter())
            .find(|f| f.name == POST_ID_FIELD)
            .and_then(|f| f.value.trim().parse().ok())
    })
}

pub struct ModerationBot {
    settings: BotSettings,
    rest: DiscordRest,
    backend: BackendClient,
    public: WebhookClient,
    bot_user_id: RwLock<Option<String>>,
}

impl ModerationBot {
    pub fn new(settings: BotSettings) -> Result<Self> {
        let rest = DiscordRest::new(settings.bot_token.as_str(), Some(&settings.api_url))?;
        let backend = BackendClient::new(&settings.backend_url, &settings.bot_token)?;
        let public = WebhookClient::new(settings.public_webhook_url.as_deref())?;
        Ok(Self {
            settings,
            rest,
            backend,
            public,
            bot_user_id: RwLock::new(None),
        })
    }

    /// Remember the bot's own user id so its reactions are skipped.
    pub async fn set_bot_user(&self, user_id: impl Into<String>) {
        *self.bot_user_id.write().await = Some(user_id.into());
    }

    /// Connect to the gateway and handle reactions until `shutdown` flips
    /// or the gateway gives up.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let gateway = GatewayClient::new(self.settings.bot_token.as_str(), Some(&self.settings.gateway_url));
        let mut events = gateway.subscribe();
        let gateway_task = gateway.connect();
        info!(channel = %self.settings.moderation_channel_id, "Moderation bot started");

        let result = loop {
            let event = tokio::select! {
                _ = shutdown.changed() => break Ok(()),
                event = events.recv() => event,
            };

            let event = match event {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Moderation bot lagged behind gateway events");
                    continue;
                }
                Err(RecvError::Closed) => break Err(DiscordError::NotConnected),
            };

            match event.event.as_deref() {
                Some("READY") => match serde_json::from_value::<Ready>(event.data) {
                    Ok(ready) => {
                        info!(user = %ready.user.username, "Bot is ready");
                        self.set_bot_user(ready.user.id).await;
                    }
                    Err(e) => warn!(error = %e, "Malformed READY payload"),
                },
                Some("MESSAGE_REACTION_ADD") => {
                    match serde_json::from_value::<ReactionAdd>(event.data) {
                        Ok(reaction) => {
                            let bot = Arc::clone(&self);
                            tokio::spawn(async move {
                                match bot.handle_reaction(&reaction).await {
                                    Ok(outcome) => debug!(?outcome, "Reaction handled"),
                                    Err(e) => error!(error = %e, "Failed to handle reaction"),
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "Malformed MESSAGE_REACTION_ADD payload"),
                    }
                }
                Some(CLOSED_EVENT) => break Err(DiscordError::NotConnected),
                _ => {}
            }
        };

        gateway_task.abort();
        info!("Moderation bot stopped");
        result
    }

    /// Handle a single reaction.
    pub async fn handle_reaction(&self, reaction: &ReactionAdd) -> Result<Outcome> {
        if self.bot_user_id.read().await.as_deref() == Some(reaction.user_id.as_str()) {
            return Ok(Outcome::Ignored(IgnoreReason::OwnReaction));
        }
        if reaction.channel_id != self.settings.moderation_channel_id {
            return Ok(Outcome::Ignored(IgnoreReason::OtherChannel));
        }
        let Some(verdict) = reaction.emoji.name.as_deref().and_then(Verdict::from_emoji) else {
            return Ok(Outcome::Ignored(IgnoreReason::OtherEmoji));
        };

        let msg = self
            .rest
            .get_message(&reaction.channel_id, &reaction.message_id)
            .await?;
        let Some(post_id) = extract_post_id(&msg) else {
            warn!(message_id = %msg.id, "No post id found in moderation message");
            return Ok(Outcome::Ignored(IgnoreReason::NoPostId));
        };

        let moderator = self.rest.get_user(&reaction.user_id).await?;
        info!(post_id, moderator = %moderator.username, ?verdict, "Processing moderation");

        let outcome = match verdict {
            Verdict::Approve => self.approve(post_id, &moderator, &msg).await,
            Verdict::Reject => self.reject(post_id, &moderator, &msg).await,
        };
        Ok(outcome)
    }

    async fn approve(&self, post_id: i64, moderator: &User, msg: &Message) -> Outcome {
        let body = PublishPostRequest {
            moderator_username: moderator.username.clone(),
            moderator_discord_id: moderator.id.clone(),
        };
        if let Err(e) = self.backend.publish_post(post_id, &body).await {
            error!(post_id, error = %e, "Backend refused to publish post");
            self.report_failure(msg, Verdict::Approve, &e).await;
            return Outcome::Failed(post_id);
        }

        self.say(
            &msg.channel_id,
            format!(
                "✅ Post #{post_id} has been **APPROVED** by {} and published!",
                moderator.username
            ),
        )
        .await;

        if !self.public.is_enabled() {
            warn!("Public webhook not configured, skipping announcement");
        } else if let Some(embed) = msg.embeds.first() {
            let payload = embeds::public_announcement(post_id, embed, &self.settings.site_url);
            match self.public.send(&payload).await {
                Ok(()) => info!(post_id, "Post announced to public channel"),
                Err(e) => error!(post_id, error = %e, "Failed to announce post"),
            }
        } else {
            warn!(post_id, "No embed found in moderation message");
        }

        self.remove_notice(msg).await;
        info!(post_id, "Post approved successfully");
        Outcome::Approved(post_id)
    }

    async fn reject(&self, post_id: i64, moderator: &User, msg: &Message) -> Outcome {
        let body = RejectPostRequest {
            moderator_username: moderator.username.clone(),
            moderator_discord_id: moderator.id.clone(),
            reason: Some(DEFAULT_REJECT_REASON.to_owned()),
        };
        if let Err(e) = self.backend.reject_post(post_id, &body).await {
            error!(post_id, error = %e, "Backend refused to reject post");
            self.report_failure(msg, Verdict::Reject, &e).await;
            return Outcome::Failed(post_id);
        }

        self.say(
            &msg.channel_id,
            format!(
                "❌ Post #{post_id} has been **REJECTED** by {}",
                moderator.username
            ),
        )
        .await;

        self.remove_notice(msg).await;
        info!(post_id, "Post rejected successfully");
        Outcome::Rejected(post_id)
    }

    async fn report_failure(&self, msg: &Message, verdict: Verdict, err: &DiscordError) {
        let text = match err.status() {
            Some(status) => format!("⚠️ Failed to {} post (status: {status})", verdict.verb()),
            None => format!("⚠️ Failed to {} post", verdict.verb()),
        };
        if let Err(e) = self.rest.reply(&msg.channel_id, &msg.id, text).await {
            error!(error = %e, "Failed to send error reply");
        }
    }

    async fn say(&self, channel_id: &str, content: String) {
        if let Err(e) = self.rest.create_message(channel_id, content).await {
            error!(error = %e, "Failed to send moderation result");
        }
    }

    async fn remove_notice(&self, msg: &Message) {
        if let Err(e) = self.rest.delete_message(&msg.channel_id, &msg.id).await {
            error!(error = %e, "Error deleting moderation message");
        }
    }
}
