//! # gw2style-discord
//!
//! Everything gw2style says to or hears from Discord:
//! - **webhook**: moderation notices and public announcements
//! - **rest** / **gateway**: the bot's view of the moderation channel
//! - **moderation**: turns ✅ / ❌ reactions into publish / reject calls

pub mod backend;
pub mod builders;
pub mod embeds;
pub mod error;
pub mod gateway;
pub mod moderation;
pub mod rest;
pub mod types;
pub mod webhook;

pub use backend::BackendClient;
pub use error::{DiscordError, Result};
pub use gateway::GatewayClient;
pub use moderation::{BotSettings, ModerationBot};
pub use rest::DiscordRest;
pub use types::*;
pub use webhook::WebhookClient;
