//! Bot-only moderation endpoints. Called by the Discord moderation bot with
//! `Authorization: Bot <token>`.

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use gw2style_common::{
    error::{StyleError, StyleResult},
    models::moderation::{
        ModerationLog, PublishPostRequest, RejectPostRequest, Report, APPROVED_REASON,
    },
    validation::validate_request,
};
use gw2style_db::repository::moderation::{self, Moderator};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    middleware::bot_auth_middleware,
    routes::{DataResponse, PostAck},
    AppState,
};

const DEFAULT_LOG_LIMIT: i64 = 50;
const MAX_LOG_LIMIT: i64 = 200;

pub fn router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/posts/{id}/publish", post(publish_post))
        .route("/admin/posts/{id}/reject", post(reject_post))
        .route("/admin/reports", get(pending_reports))
        .route("/admin/moderation-log", get(moderation_log))
        .route_layer(middleware::from_fn_with_state(state.clone(), bot_auth_middleware))
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    limit: Option<String>,
}

/// POST /api/v1/admin/posts/{id}/publish
async fn publish_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<PublishPostRequest>,
) -> StyleResult<Json<PostAck>> {
    validate_request(&body)?;
    let moderator = Moderator {
        username: &body.moderator_username,
        discord_id: &body.moderator_discord_id,
    };

    if !moderation::publish_post(&state.db.pg, id, moderator, APPROVED_REASON).await? {
        return Err(StyleError::not_found("Post"));
    }

    tracing::info!(post_id = id, moderator = %body.moderator_username, "Post published");
    Ok(Json(PostAck::new("Post published successfully", id)))
}

/// POST /api/v1/admin/posts/{id}/reject
async fn reject_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<RejectPostRequest>,
) -> StyleResult<Json<PostAck>> {
    validate_request(&body)?;
    let moderator = Moderator {
        username: &body.moderator_username,
        discord_id: &body.moderator_discord_id,
    };

    if !moderation::reject_post(&state.db.pg, id, moderator, body.reason()).await? {
        return Err(StyleError::not_found("Post"));
    }

    tracing::info!(
        post_id = id,
        moderator = %body.moderator_username,
        reason = body.reason(),
        "Post rejected"
    );
    Ok(Json(PostAck::new("Post rejected successfully", id)))
}

/// GET /api/v1/admin/reports
async fn pending_reports(
    State(state): State<Arc<AppState>>,
) -> StyleResult<Json<DataResponse<Vec<Report>>>> {
    let reports = moderation::pending_reports(&state.db.pg).await?;
    Ok(Json(DataResponse::new(reports)))
}

/// GET /api/v1/admin/moderation-log?limit=
async fn moderation_log(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> StyleResult<Json<DataResponse<Vec<ModerationLog>>>> {
    let limit = log_limit(query.limit.as_deref());
    let logs = moderation::moderation_logs(&state.db.pg, limit).await?;
    Ok(Json(DataResponse::new(logs)))
}

fn log_limit(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .min(MAX_LOG_LIMIT)
}
