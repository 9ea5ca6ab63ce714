//! Likes repository. `post_likes` holds one row per (post, user) and
//! `posts.likes_count` mirrors its size; both change in the same transaction.

use sqlx::PgPool;

/// Like a post. Returns false if the user already liked it.
pub async fn like_post(pool: &PgPool, post_id: i64, user_id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO post_likes (post_id, user_id, created_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (post_id, user_id) DO NOTHING
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        > 0;

    if !inserted {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query("UPDATE posts SET likes_count = likes_count + 1 WHERE id = $1")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

/// Remove a like. Returns false if the user had not liked the post.
pub async fn unlike_post(pool: &PgPool, post_id: i64, user_id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
        > 0;

    if !deleted {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query("UPDATE posts SET likes_count = GREATEST(likes_count - 1, 0) WHERE id = $1")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

pub async fn has_liked(pool: &PgPool, post_id: i64, user_id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM post_likes WHERE post_id = $1 AND user_id = $2)",
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Current like count of a post, `None` if the post does not exist.
pub async fn likes_count(pool: &PgPool, post_id: i64) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT likes_count FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL pointing at a PostgreSQL server"]
    async fn count_tracks_like_rows(pool: PgPool) {
        fixtures::user(&pool, "ACC-1", "Caithe.1234").await;
        fixtures::user(&pool, "ACC-2", "Faolain.6666").await;
        let post = fixtures::post(&pool, "Caithe.1234", "Nightmare court regalia").await;

        assert!(like_post(&pool, post.id, "ACC-1").await.unwrap());
        assert!(like_post(&pool, post.id, "ACC-2").await.unwrap());
        assert_eq!(likes_count(&pool, post.id).await.unwrap(), Some(2));
        assert_eq!(fixtures::like_rows(&pool, post.id).await, 2);

        assert!(unlike_post(&pool, post.id, "ACC-2").await.unwrap());
        assert_eq!(likes_count(&pool, post.id).await.unwrap(), Some(1));
        assert_eq!(fixtures::like_rows(&pool, post.id).await, 1);
        assert!(has_liked(&pool, post.id, "ACC-1").await.unwrap());
        assert!(!has_liked(&pool, post.id, "ACC-2").await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL pointing at a PostgreSQL server"]
    async fn second_like_is_refused_without_counting(pool: PgPool) {
        fixtures::user(&pool, "ACC-1", "Caithe.1234").await;
        let post = fixtures::post(&pool, "Caithe.1234", "Sylvari spring").await;

        assert!(like_post(&pool, post.id, "ACC-1").await.unwrap());
        assert!(!like_post(&pool, post.id, "ACC-1").await.unwrap());
        assert_eq!(likes_count(&pool, post.id).await.unwrap(), Some(1));
        assert_eq!(fixtures::like_rows(&pool, post.id).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL pointing at a PostgreSQL server"]
    async fn unlike_without_like_leaves_count_at_zero(pool: PgPool) {
        fixtures::user(&pool, "ACC-1", "Caithe.1234").await;
        let post = fixtures::post(&pool, "Caithe.1234", "Plain look").await;

        assert!(!unlike_post(&pool, post.id, "ACC-1").await.unwrap());
        assert_eq!(likes_count(&pool, post.id).await.unwrap(), Some(0));

        assert!(like_post(&pool, post.id, "ACC-1").await.unwrap());
        assert!(unlike_post(&pool, post.id, "ACC-1").await.unwrap());
        assert!(!unlike_post(&pool, post.id, "ACC-1").await.unwrap());
        assert_eq!(likes_count(&pool, post.id).await.unwrap(), Some(0));
        assert_eq!(likes_count(&pool, post.id + 1000).await.unwrap(), None);
    }
}
