//! Middleware: session auth, bot auth and security headers.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use gw2style_common::{auth::validate_token, config::AppConfig, error::StyleError};
use sha2::{Digest, Sha256};

use crate::{auth, AppState};

/// Authentication context extracted from the session cookie or bearer token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// GW2 account id
    pub user_id: String,
    /// GW2 account name, also the author name on posts
    pub username: String,
}

impl AuthContext {
    /// Resolve the caller from headers, if a valid session is present.
    pub fn from_headers(headers: &HeaderMap, config: &AppConfig) -> Result<Self, StyleError> {
        let token = auth::token_from_headers(headers, &config.auth.cookie_name)
            .ok_or(StyleError::Unauthorized)?;
        let claims = validate_token(&token, &config.auth.jwt_secret)?;
        Ok(Self {
            user_id: claims.sub,
            username: claims.username,
        })
    }

    /// Optional auth for public endpoints: any failure means anonymous.
    pub fn optional(headers: &HeaderMap, config: &AppConfig) -> Option<Self> {
        Self::from_headers(headers, config).ok()
    }
}

/// Require a valid session and put its [`AuthContext`] in the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StyleError> {
    let auth_ctx = AuthContext::from_headers(request.headers(), &state.config)?;
    request.extensions_mut().insert(auth_ctx);
    Ok(next.run(request).await)
}

/// Only the moderation bot may pass: `Authorization: Bot <discord.bot_token>`.
pub async fn bot_auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StyleError> {
    let Some(expected) = state.config.discord.bot_token() else {
        tracing::warn!("Bot endpoint called but no bot token is configured");
        return Err(StyleError::Unauthorized);
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bot "))
        .ok_or(StyleError::Unauthorized)?;

    if !digests_match(presented.trim(), expected) {
        tracing::warn!("Rejected bot request with a wrong token");
        return Err(StyleError::InvalidToken);
    }

    Ok(next.run(request).await)
}

/// Compare fixed-size digests so the comparison time does not depend on the token.
fn digests_match(a: &str, b: &str) -> bool {
    let (a, b) = (Sha256::digest(a.as_bytes()), Sha256::digest(b.as_bytes()));
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ── Security headers ──────────────────────────────────────────────────────────

/// Security headers for a JSON-only API.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let h = response.headers_mut();

    macro_rules! set {
        ($name:literal, $val:literal) => {
            h.insert(
                header::HeaderName::from_static($name),
                header::HeaderValue::from_static($val),
            );
        };
    }

    set!("x-content-type-options", "nosniff");
    set!("x-frame-options", "DENY");
    set!("referrer-policy", "strict-origin-when-cross-origin");
    set!("content-security-policy", "default-src 'none'; frame-ancestors 'none'");

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_comparison() {
        assert!(digests_match("abc", "abc"));
        assert!(!digests_match("abc", "abd"));
        assert!(!digests_match("", "abc"));
    }
}
