//! Post routes: public listings, search, popularity, creation and soft delete.

use axum::{
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use gw2style_common::{
    error::{StyleError, StyleResult},
    models::post::{CreatePostRequest, Post, PostSummary, SearchParams, Timeframe},
    pagination::{PageQuery, PageRequest},
    validation::{parse_tag_list, validate_request},
};
use gw2style_db::repository::posts;
use gw2style_discord::embeds;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    middleware::{auth_middleware, AuthContext},
    routes::{DataResponse, PageResponse},
    AppState,
};

/// Post routes. Creation and deletion require a session.
pub fn router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let authed = middleware::from_fn_with_state(state.clone(), auth_middleware);

    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/search", get(search_posts))
        .route("/posts/popular", get(popular_posts))
        .route("/posts/create", post(create_post).route_layer(authed.clone()))
        .route("/posts/{id}", get(get_post))
        .route("/posts/{id}", delete(delete_post).route_layer(authed))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
    tags: Option<String>,
    author: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PopularQuery {
    timeframe: Option<String>,
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
    message: &'static str,
}

/// GET /api/v1/posts
///
/// Published posts, newest first.
async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> StyleResult<Json<PageResponse<PostSummary>>> {
    let limits = &state.config.limits;
    let page = PageRequest::resolve(&query, limits.default_page_size, limits.max_page_size);

    let (data, total) = posts::list_published(&state.db.pg, page.limit(), page.offset()).await?;

    Ok(Json(PageResponse {
        success: true,
        data,
        pagination: page.pagination(total),
    }))
}

/// GET /api/v1/posts/search?q=&tags=a,b&author=&page=&limit=
async fn search_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> StyleResult<Json<PageResponse<Post>>> {
    let limits = &state.config.limits;
    let page = PageRequest::resolve(
        &PageQuery {
            page: query.page,
            limit: query.limit,
        },
        limits.default_page_size,
        limits.max_page_size,
    );

    let params = SearchParams {
        query: non_blank(query.q),
        tags: parse_tag_list(query.tags.as_deref()),
        author_name: non_blank(query.author),
        limit: page.limit(),
        offset: page.offset(),
    };
    let (data, total) = posts::search(&state.db.pg, &params).await?;

    Ok(Json(PageResponse {
        success: true,
        data,
        pagination: page.pagination(total),
    }))
}

/// GET /api/v1/posts/popular?timeframe=week|month
async fn popular_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PopularQuery>,
) -> StyleResult<Json<DataResponse<Vec<Post>>>> {
    let timeframe = Timeframe::parse(query.timeframe.as_deref());
    let data = posts::popular(
        &state.db.pg,
        timeframe,
        i64::from(state.config.limits.popular_limit),
    )
    .await?;
    Ok(Json(DataResponse::new(data)))
}

/// GET /api/v1/posts/{id}
///
/// Unpublished posts are only visible to their author.
async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> StyleResult<Json<DataResponse<Post>>> {
    let post = posts::find_by_id(&state.db.pg, id)
        .await?
        .ok_or_else(|| StyleError::not_found("Post"))?;

    if !post.published {
        let viewer = AuthContext::optional(&headers, &state.config);
        if viewer.is_none_or(|v| v.username != post.author_name) {
            return Err(StyleError::not_found("Post"));
        }
    }

    Ok(Json(DataResponse::new(post)))
}

/// POST /api/v1/posts/create
///
/// Stores the post unpublished and queues a moderation notice.
async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreatePostRequest>,
) -> StyleResult<(StatusCode, Json<Post>)> {
    validate_request(&body)?;

    let new_post = body.into_new_post(&auth.username);
    let post = posts::create_post(&state.db.pg, &new_post).await?;
    tracing::info!(post_id = post.id, author = %post.author_name, "Post submitted for moderation");

    notify_moderators(&state, &post);

    Ok((StatusCode::CREATED, Json(post)))
}

/// Fire-and-forget: the request never waits on Discord.
fn notify_moderators(state: &AppState, post: &Post) {
    let hook = state.moderation_hook.clone();
    if !hook.is_enabled() {
        tracing::warn!(post_id = post.id, "Moderation webhook not configured, no notice sent");
        return;
    }

    let payload = embeds::moderation_notice(post);
    let post_id = post.id;
    tokio::spawn(async move {
        match hook.send(&payload).await {
            Ok(()) => tracing::info!(post_id, "Moderation notice sent"),
            Err(e) => tracing::error!(post_id, error = %e, "Failed to send moderation notice"),
        }
    });
}

/// DELETE /api/v1/posts/{id}
///
/// Soft delete: the post is unpublished, not removed.
async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> StyleResult<Json<DeleteResponse>> {
    if !posts::unpublish_by_author(&state.db.pg, id, &auth.username).await? {
        return match posts::find_by_id(&state.db.pg, id).await? {
            Some(_) => Err(StyleError::Forbidden),
            None => Err(StyleError::not_found("Post")),
        };
    }

    tracing::info!(post_id = id, author = %auth.username, "Post unpublished by author");
    Ok(Json(DeleteResponse {
        success: true,
        message: "Post deleted successfully",
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
