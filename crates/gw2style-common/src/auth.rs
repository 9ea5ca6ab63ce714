//! Shared JWT claims and token validation.
//!
//! Token issuance lives in gw2style-api next to the login route; validation
//! lives here so middleware and handlers can share it.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::StyleError;

/// JWT claims embedded in session tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (GW2 account id)
    pub sub: String,
    /// GW2 account name
    pub username: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Validate and decode an HS256 JWT.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, StyleError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
