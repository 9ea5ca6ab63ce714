//! Moderation repository: publish/reject with an audit trail, and user reports.

use gw2style_common::models::moderation::{ModerationAction, ModerationLog, Report, ReportReason};
use sqlx::PgPool;

/// Who moderated a post, as recorded in the audit log.
#[derive(Debug, Clone, Copy)]
pub struct Moderator<'a> {
    pub username: &'a str,
    pub discord_id: &'a str,
}

/// Flip the published flag and append the audit row in one transaction.
/// Returns false when the post does not exist.
async fn moderate(
    pool: &PgPool,
    post_id: i64,
    action: ModerationAction,
    moderator: Moderator<'_>,
    reason: &str,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query("UPDATE posts SET published = $2 WHERE id = $1")
        .bind(post_id)
        .bind(action == ModerationAction::Published)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if updated == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        r#"
        INSERT INTO moderation_log (post_id, action, moderator_username, moderator_discord_id, reason, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        "#,
    )
    .bind(post_id)
    .bind(action.as_str())
    .bind(moderator.username)
    .bind(moderator.discord_id)
    .bind(reason)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

pub async fn publish_post(
    pool: &PgPool,
    post_id: i64,
    moderator: Moderator<'_>,
    reason: &str,
) -> Result<bool, sqlx::Error> {
    moderate(pool, post_id, ModerationAction::Published, moderator, reason).await
}

pub async fn reject_post(
    pool: &PgPool,
    post_id: i64,
    moderator: Moderator<'_>,
    reason: &str,
) -> Result<bool, sqlx::Error> {
    moderate(pool, post_id, ModerationAction::Rejected, moderator, reason).await
}

/// File a report against a post.
pub async fn create_report(
    pool: &PgPool,
    post_id: i64,
    reporter_username: &str,
    reason: ReportReason,
    description: &str,
) -> Result<Report, sqlx::Error> {
    sqlx::query_as::<_, Report>(
        r#"
        INSERT INTO reports (post_id, reporter_username, reason, description, status, created_at)
        VALUES ($1, $2, $3, $4, 'pending', NOW())
        RETURNING *
        "#,
    )
    .bind(post_id)
    .bind(reporter_username)
    .bind(reason.as_str())
    .bind(description)
    .fetch_one(pool)
    .await
}

/// Reports nobody has handled yet, oldest first.
pub async fn pending_reports(pool: &PgPool) -> Result<Vec<Report>, sqlx::Error> {
    sqlx::query_as::<_, Report>(
        "SELECT * FROM reports WHERE status = 'pending' ORDER BY created_at ASC",
    )
    .fetch_all(pool)
    .await
}

/// Most recent moderation decisions.
pub async fn moderation_logs(pool: &PgPool, limit: i64) -> Result<Vec<ModerationLog>, sqlx::Error> {
    sqlx::query_as::<_, ModerationLog>(
        "SELECT * FROM moderation_log ORDER BY created_at DESC, id DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
