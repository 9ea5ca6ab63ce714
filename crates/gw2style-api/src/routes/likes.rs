//! Like / unlike / like-status for a post. All require a session.

use axum::{
    extract::{Extension, Path, State},
    middleware,
    routing::get,
    Json, Router,
};
use gw2style_common::error::{StyleError, StyleResult};
use gw2style_db::repository::{likes, posts};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    middleware::{auth_middleware, AuthContext},
    AppState,
};

pub fn router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new().route(
        "/posts/{id}/like",
        get(like_status)
            .post(like_post)
            .delete(unlike_post)
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
    )
}

#[derive(Serialize)]
struct LikeResponse {
    success: bool,
    liked: bool,
    likes_count: i32,
}

async fn current_count(state: &AppState, post_id: i64) -> StyleResult<i32> {
    Ok(likes::likes_count(&state.db.pg, post_id).await?.unwrap_or(0))
}

/// POST /api/v1/posts/{id}/like
async fn like_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> StyleResult<Json<LikeResponse>> {
    // Only published posts can be liked.
    match posts::is_published(&state.db.pg, id).await? {
        Some(true) => {}
        _ => return Err(StyleError::not_found("Post")),
    }

    if !likes::like_post(&state.db.pg, id, &auth.user_id).await? {
        return Err(StyleError::AlreadyExists {
            resource: "Like".into(),
        });
    }

    tracing::debug!(post_id = id, user_id = %auth.user_id, "Post liked");
    Ok(Json(LikeResponse {
        success: true,
        liked: true,
        likes_count: current_count(&state, id).await?,
    }))
}

/// DELETE /api/v1/posts/{id}/like
async fn unlike_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> StyleResult<Json<LikeResponse>> {
    if posts::is_published(&state.db.pg, id).await?.is_none() {
        return Err(StyleError::not_found("Post"));
    }

    if !likes::unlike_post(&state.db.pg, id, &auth.user_id).await? {
        return Err(StyleError::not_found("Like"));
    }

    tracing::debug!(post_id = id, user_id = %auth.user_id, "Post unliked");
    Ok(Json(LikeResponse {
        success: true,
        liked: false,
        likes_count: current_count(&state, id).await?,
    }))
}

/// GET /api/v1/posts/{id}/like
async fn like_status(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> StyleResult<Json<LikeResponse>> {
    let likes_count = likes::likes_count(&state.db.pg, id)
        .await?
        .ok_or_else(|| StyleError::not_found("Post"))?;
    let liked = likes::has_liked(&state.db.pg, id, &auth.user_id).await?;

    Ok(Json(LikeResponse {
        success: true,
        liked,
        likes_count,
    }))
}
