//! User repository. Accounts are keyed by GW2 account id.

use gw2style_common::models::user::User;
use sqlx::PgPool;

/// Find a user by their GW2 account id.
pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Find the user who last logged in with this API key.
pub async fn find_by_api_key(pool: &PgPool, api_key: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE api_key = $1")
        .bind(api_key)
        .fetch_optional(pool)
        .await
}

/// Create the account, or refresh name and key when the GW2 account is already known.
pub async fn upsert_user(
    pool: &PgPool,
    id: &str,
    username: &str,
    api_key: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, api_key, created_at, updated_at)
        VALUES ($1, $2, $3, NOW(), NOW())
        ON CONFLICT (id) DO UPDATE
            SET username = EXCLUDED.username,
                api_key = EXCLUDED.api_key,
                updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(username)
    .bind(api_key)
    .fetch_one(pool)
    .await
}

/// Ids of every post the user has liked, most recent like first.
pub async fn liked_post_ids(pool: &PgPool, user_id: &str) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT post_id FROM post_likes WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
