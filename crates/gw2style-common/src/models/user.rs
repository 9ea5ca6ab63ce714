//! User model. Accounts come from a GW2 API key; there are no passwords.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation::API_KEY_REGEX;

/// A gw2style account, keyed by the GW2 account id.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// GW2 account id (GUID string)
    pub id: String,

    /// GW2 account name, e.g. `Name.1234`
    pub username: String,

    /// The GW2 API key the user logged in with
    #[serde(skip_serializing)]
    pub api_key: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Login request. The only credential is a GW2 API key.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(rename = "apiKey")]
    #[validate(regex(path = *API_KEY_REGEX, message = "API key is not a valid Guild Wars 2 key"))]
    pub api_key: String,
}

/// Safe user representation for API responses (no API key)
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
        }
    }
}
