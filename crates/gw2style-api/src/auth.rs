//! Session tokens: issuing JWTs and carrying them in a cookie.
//!
//! Validation lives in `gw2style_common::auth`; this module owns issuance
//! and the cookie / bearer transport.

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use gw2style_common::auth::Claims;
use gw2style_common::config::AuthConfig;
use jsonwebtoken::{encode, EncodingKey, Header};

/// Generate a signed session token for a GW2 account.
pub fn generate_token(
    user_id: &str,
    username: &str,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ttl_secs as i64)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// HttpOnly, SameSite=Strict session cookie holding `token`.
pub fn session_cookie(config: &AuthConfig, token: String) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), token))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(config.token_ttl_secs as i64))
        .build()
}

/// An expired, empty cookie that makes the browser drop the session.
pub fn removal_cookie(config: &AuthConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), ""))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

/// Session token from the request: the cookie first, then `Authorization: Bearer`.
pub fn token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_owned());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw2style_common::auth::validate_token;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            token_ttl_secs: 604_800,
            cookie_name: "jwt_token".into(),
            cookie_secure: false,
        }
    }

    #[test]
    fn issued_token_round_trips_through_validation() {
        let token = generate_token("acc-1", "Fashion.1234", "test-secret", 60).unwrap();
        let claims = validate_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, "acc-1");
        assert_eq!(claims.username, "Fashion.1234");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie(&config(), "abc".into()).to_string();
        assert!(cookie.starts_with("jwt_token=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = removal_cookie(&config()).to_string();
        assert!(cookie.starts_with("jwt_token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());
        assert_eq!(
            token_from_headers(&headers, "jwt_token").as_deref(),
            Some("from-header")
        );

        headers.insert(header::COOKIE, "theme=dark; jwt_token=from-cookie".parse().unwrap());
        assert_eq!(
            token_from_headers(&headers, "jwt_token").as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn missing_or_foreign_scheme_yields_nothing() {
        let mut headers = HeaderMap::new();
        assert!(token_from_headers(&headers, "jwt_token").is_none());
        headers.insert(header::AUTHORIZATION, "Bot abc".parse().unwrap());
        assert!(token_from_headers(&headers, "jwt_token").is_none());
    }
}
