//! Login with a Guild Wars 2 API key, and logout.
//!
//! There are no passwords: the API key proves account ownership. The first
//! login checks the key's scopes against the GW2 API and creates the account.

use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use gw2style_common::{
    error::{StyleError, StyleResult},
    models::user::{LoginRequest, User, UserResponse},
    validation::validate_request,
};
use gw2style_db::repository::users;
use serde::Serialize;
use std::sync::Arc;

use crate::{auth, AppState};

/// Auth router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
    user: UserResponse,
}

#[derive(Serialize)]
struct LogoutResponse {
    success: bool,
    message: &'static str,
}

/// POST /api/v1/login
///
/// Known keys log straight in; unknown keys must grant the required scopes.
/// The session token is only ever returned as a cookie.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(mut body): Json<LoginRequest>,
) -> StyleResult<(CookieJar, Json<LoginResponse>)> {
    body.api_key = body.api_key.trim().to_owned();
    validate_request(&body)?;

    let user = match users::find_by_api_key(&state.db.pg, &body.api_key).await? {
        Some(user) => user,
        None => register(&state, &body.api_key).await?,
    };

    let token = auth::generate_token(
        &user.id,
        &user.username,
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_secs,
    )
    .map_err(|e| StyleError::Internal(e.into()))?;

    tracing::info!(user_id = %user.id, username = %user.username, "User logged in");

    let jar = jar.add(auth::session_cookie(&state.config.auth, token));
    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            user: user.into(),
        }),
    ))
}

/// Resolve a new key to its GW2 account and store it.
async fn register(state: &AppState, api_key: &str) -> StyleResult<User> {
    state.gw2.check_permissions(api_key).await?;
    let account = state.gw2.account(api_key).await?;
    let user = users::upsert_user(&state.db.pg, &account.id, &account.name, api_key).await?;
    tracing::info!(user_id = %user.id, username = %user.username, "Account linked from GW2 API key");
    Ok(user)
}

/// POST /api/v1/logout
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    (
        jar.add(auth::removal_cookie(&state.config.auth)),
        Json(LogoutResponse {
            success: true,
            message: "Logged out successfully",
        }),
    )
}
