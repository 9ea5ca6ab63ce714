//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > config.toml > defaults

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Initialize the global configuration from environment.
///
/// Should be called once at application startup. `config_file` names an
/// optional TOML file (without extension) layered under the environment.
pub fn init(config_file: Option<&str>) -> Result<&'static AppConfig, ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let app_config = load(config_file)?;
    Ok(CONFIG.get_or_init(|| app_config))
}

/// Build a configuration without touching the global slot.
pub fn load(config_file: Option<&str>) -> Result<AppConfig, ConfigError> {
    builder_with_defaults()?
        // Optional config file
        .add_source(config::File::with_name(config_file.unwrap_or("config")).required(false))
        // Environment variables (GW2STYLE_SERVER__PORT, GW2STYLE_DATABASE__URL, etc.)
        .add_source(
            config::Environment::with_prefix("GW2STYLE")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("gw2.required_permissions")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

/// A builder pre-populated with every default. Required keys
/// (`database.url`, `auth.jwt_secret`) still have to come from a source.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("server.mode", "debug")?
        .set_default("server.public_url", "https://gw2style.com")?
        .set_default("database.max_connections", 20)?
        .set_default("database.min_connections", 2)?
        .set_default("auth.token_ttl_secs", 604_800)? // 7 days
        .set_default("auth.cookie_name", "jwt_token")?
        .set_default("auth.cookie_secure", false)?
        .set_default("gw2.api_url", "https://api.guildwars2.com")?
        .set_default(
            "gw2.required_permissions",
            vec!["account", "characters", "builds"],
        )?
        .set_default("gw2.timeout_secs", 10)?
        .set_default("discord.enabled", false)?
        .set_default("discord.api_url", "https://discord.com/api/v10")?
        .set_default(
            "discord.gateway_url",
            "wss://gateway.discord.gg/?v=10&encoding=json",
        )?
        .set_default("limits.default_page_size", 20)?
        .set_default("limits.max_page_size", 100)?
        .set_default("limits.popular_limit", 100)
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub gw2: Gw2Config,
    pub discord: DiscordConfig,
    pub limits: LimitsConfig,
}

/// Runtime mode. `release` switches logging to JSON.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Debug,
    Release,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub mode: Mode,
    /// Public website base URL, used in announcement links.
    pub public_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// JWT signing secret (HS256), should be 256+ bits of entropy
    pub jwt_secret: String,
    /// Token and cookie lifetime in seconds
    pub token_ttl_secs: u64,
    pub cookie_name: String,
    /// Set the `Secure` attribute on the auth cookie (HTTPS deployments).
    pub cookie_secure: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Gw2Config {
    /// Base URL of the Guild Wars 2 API (without `/v2`)
    pub api_url: String,
    /// API key scopes a user must grant before an account is created.
    pub required_permissions: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    /// Run the moderation bot alongside the HTTP server.
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub moderation_channel_id: Option<String>,
    /// Webhook receiving new-post moderation notices.
    pub moderation_webhook_url: Option<String>,
    /// Webhook receiving announcements for approved posts.
    pub public_webhook_url: Option<String>,
    pub api_url: String,
    pub gateway_url: String,
    /// Base URL the bot uses to reach this server's admin endpoints.
    pub backend_url: Option<String>,
}

impl DiscordConfig {
    /// The configured bot token, treating an empty value as unset.
    pub fn bot_token(&self) -> Option<&str> {
        non_empty(&self.bot_token)
    }

    pub fn moderation_webhook_url(&self) -> Option<&str> {
        non_empty(&self.moderation_webhook_url)
    }

    pub fn public_webhook_url(&self) -> Option<&str> {
        non_empty(&self.public_webhook_url)
    }

    pub fn moderation_channel_id(&self) -> Option<&str> {
        non_empty(&self.moderation_channel_id)
    }

    /// Admin API base, defaulting to the loopback address of this server.
    pub fn backend_url(&self, port: u16) -> String {
        non_empty(&self.backend_url)
            .map(|u| u.trim_end_matches('/').to_owned())
            .unwrap_or_else(|| format!("http://127.0.0.1:{port}/api/v1"))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub popular_limit: u32,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
