//! # gw2style-api
//!
//! REST API layer for gw2style: GW2 API-key login, posts, likes, reports and
//! the bot-only moderation endpoints.

pub mod auth;
pub mod gw2;
pub mod middleware;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use gw2style_common::config::AppConfig;
use gw2style_db::Database;
use gw2style_discord::WebhookClient;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::gw2::Gw2Client;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    /// Guild Wars 2 account API, used at login.
    pub gw2: Gw2Client,
    /// Webhook into the moderation channel. Disabled when no URL is configured.
    pub moderation_hook: WebhookClient,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Database, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let gw2 = Gw2Client::new(&config.gw2)?;
        let moderation_hook = WebhookClient::new(config.discord.moderation_webhook_url())?;
        Ok(Self {
            db,
            config,
            gw2,
            moderation_hook,
            started_at: Instant::now(),
        })
    }
}

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let state = Arc::new(state);

    let api_routes = Router::new()
        .merge(routes::auth::router())
        .merge(routes::health::router())
        .merge(routes::posts::router(&state))
        .merge(routes::likes::router(&state))
        .merge(routes::reports::router(&state))
        .merge(routes::users::router(&state))
        .merge(routes::moderation::router(&state));

    // Cookies carry the session, so the origin is mirrored rather than `*`.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(600));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::compression::CompressionLayer::new())
        .with_state(state)
}
