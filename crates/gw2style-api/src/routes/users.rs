//! The signed-in user: profile, stored API key and liked posts.

use axum::{
    extract::{Extension, State},
    http::header,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use gw2style_common::{
    error::{StyleError, StyleResult},
    models::{post::Post, user::UserResponse},
};
use gw2style_db::repository::{posts, users};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    middleware::{auth_middleware, AuthContext},
    routes::DataResponse,
    AppState,
};

pub fn router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(me))
        .route("/user/apikey", get(api_key))
        .route("/user/liked-posts", get(liked_posts))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

#[derive(Serialize)]
struct MeResponse {
    success: bool,
    user: UserResponse,
}

#[derive(Serialize)]
struct ApiKeyResponse {
    #[serde(rename = "apiKey")]
    api_key: String,
}

/// GET /api/v1/me
///
/// Answered from the session alone.
async fn me(Extension(auth): Extension<AuthContext>) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        user: UserResponse {
            id: auth.user_id,
            username: auth.username,
        },
    })
}

/// GET /api/v1/user/apikey
async fn api_key(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> StyleResult<impl IntoResponse> {
    let user = users::find_by_id(&state.db.pg, &auth.user_id)
        .await?
        .ok_or_else(|| StyleError::not_found("User"))?;

    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Json(ApiKeyResponse {
            api_key: user.api_key,
        }),
    ))
}

/// GET /api/v1/user/liked-posts
///
/// Published posts the user liked, most recent like first.
async fn liked_posts(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> StyleResult<Json<DataResponse<Vec<Post>>>> {
    let ids = users::liked_post_ids(&state.db.pg, &auth.user_id).await?;
    let data = posts::find_published_by_ids(&state.db.pg, &ids).await?;
    Ok(Json(DataResponse::new(data)))
}
