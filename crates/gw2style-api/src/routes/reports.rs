//! User reports against posts.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    middleware,
    routing::post,
    Json, Router,
};
use gw2style_common::{
    error::{StyleError, StyleResult},
    models::moderation::{CreateReportRequest, ReportReason},
    validation::validate_request,
};
use gw2style_db::repository::{moderation, posts};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    middleware::{auth_middleware, AuthContext},
    AppState,
};

pub fn router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new().route(
        "/posts/{id}/report",
        post(report_post)
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
    )
}

#[derive(Serialize)]
struct ReportResponse {
    success: bool,
    message: &'static str,
    post_id: i64,
    report_id: i64,
}

/// POST /api/v1/posts/{id}/report
async fn report_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(body): Json<CreateReportRequest>,
) -> StyleResult<(StatusCode, Json<ReportResponse>)> {
    validate_request(&body)?;
    let reason: ReportReason = body.reason.parse().map_err(StyleError::validation)?;

    if posts::is_published(&state.db.pg, id).await?.is_none() {
        return Err(StyleError::not_found("Post"));
    }

    let report = moderation::create_report(
        &state.db.pg,
        id,
        &auth.username,
        reason,
        body.description.trim(),
    )
    .await?;

    tracing::info!(post_id = id, report_id = report.id, reason = reason.as_str(), "Post reported");

    Ok((
        StatusCode::CREATED,
        Json(ReportResponse {
            success: true,
            message: "Report submitted successfully",
            post_id: id,
            report_id: report.id,
        }),
    ))
}
