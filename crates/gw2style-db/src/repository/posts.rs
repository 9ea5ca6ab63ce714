//! Post repository: creation, listings, search and popularity.

use gw2style_common::models::post::{NewPost, Post, PostSummary, SearchParams, Timeframe};
use sqlx::{PgPool, Postgres, QueryBuilder};

const SUMMARY_COLUMNS: &str = "id, title, thumbnail_url, author_name, likes_count";

/// Insert a new post. Posts always start unpublished.
pub async fn create_post(pool: &PgPool, post: &NewPost) -> Result<Post, sqlx::Error> {
    let [image1, image2, image3, image4, image5] = &post.image_urls;
    sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (title, description, thumbnail_url,
                           image1_url, image2_url, image3_url, image4_url, image5_url,
                           equipments, author_name, tags, likes_count, published, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, FALSE, NOW())
        RETURNING *
        "#,
    )
    .bind(&post.title)
    .bind(&post.description)
    .bind(&post.thumbnail_url)
    .bind(image1)
    .bind(image2)
    .bind(image3)
    .bind(image4)
    .bind(image5)
    .bind(&post.equipments)
    .bind(&post.author_name)
    .bind(sqlx::types::Json(&post.tags))
    .fetch_one(pool)
    .await
}

/// Find a post by id, published or not.
pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Whether a post exists and is publicly visible.
pub async fn is_published(pool: &PgPool, id: i64) -> Result<Option<bool>, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT published FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// One page of published posts, newest first, plus the total count.
pub async fn list_published(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PostSummary>, i64), sqlx::Error> {
    let posts = sqlx::query_as::<_, PostSummary>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM posts WHERE published = TRUE ORDER BY id DESC LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE published = TRUE")
        .fetch_one(pool)
        .await?;

    Ok((posts, total))
}

/// Append the search filters shared by the count and page queries.
fn push_search_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &SearchParams) {
    qb.push(" WHERE published = TRUE");

    if let Some(q) = params.query.as_deref().filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", escape_like(q));
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if !params.tags.is_empty() {
        qb.push(" AND tags @> ")
            .push_bind(sqlx::types::Json(params.tags.clone()));
    }

    if let Some(author) = params.author_name.as_deref().filter(|a| !a.is_empty()) {
        qb.push(" AND author_name = ").push_bind(author.to_owned());
    }
}

/// Published posts matching every given filter, newest first.
pub async fn search(pool: &PgPool, params: &SearchParams) -> Result<(Vec<Post>, i64), sqlx::Error> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts");
    push_search_filters(&mut count, params);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut page = QueryBuilder::<Postgres>::new("SELECT * FROM posts");
    push_search_filters(&mut page, params);
    page.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(params.limit)
        .push(" OFFSET ")
        .push_bind(params.offset);
    let posts = page.build_query_as::<Post>().fetch_all(pool).await?;

    Ok((posts, total))
}

/// Most liked published posts in the given window.
pub async fn popular(
    pool: &PgPool,
    timeframe: Timeframe,
    limit: i64,
) -> Result<Vec<Post>, sqlx::Error> {
    let window = match timeframe {
        Timeframe::Week => " AND created_at >= DATE_TRUNC('week', NOW())",
        Timeframe::Month => " AND created_at >= DATE_TRUNC('month', NOW())",
        Timeframe::AllTime => "",
    };
    sqlx::query_as::<_, Post>(&format!(
        "SELECT * FROM posts WHERE published = TRUE{window} ORDER BY likes_count DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Fetch posts by id, keeping only published ones, in the order of `ids`.
pub async fn find_published_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<Post>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut posts = sqlx::query_as::<_, Post>(
        "SELECT * FROM posts WHERE id = ANY($1) AND published = TRUE",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    posts.sort_by_key(|p| ids.iter().position(|id| *id == p.id));
    Ok(posts)
}

/// Soft delete: hide a post again. Only the author may do this.
pub async fn unpublish_by_author(
    pool: &PgPool,
    id: i64,
    author_name: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE posts SET published = FALSE WHERE id = $1 AND author_name = $2")
        .bind(id)
        .bind(author_name)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SearchParams {
        SearchParams {
            limit: 20,
            ..Default::default()
        }
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_cool\\"), "100\\%\\_cool\\\\");
        assert_eq!(escape_like("norn"), "norn");
    }

    #[test]
    fn empty_search_only_filters_published() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts");
        push_search_filters(&mut qb, &params());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM posts WHERE published = TRUE");
    }

    #[test]
    fn every_filter_adds_a_bound_clause() {
        let mut p = params();
        p.query = Some("mesmer".into());
        p.tags = vec!["norn".into(), "heavy".into()];
        p.author_name = Some("Fashion.1234".into());

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM posts");
        push_search_filters(&mut qb, &p);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM posts WHERE published = TRUE \
             AND (title ILIKE $1 OR description ILIKE $2) \
             AND tags @> $3 AND author_name = $4"
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL pointing at a PostgreSQL server"]
    async fn new_posts_stay_out_of_public_listings(pool: PgPool) {
        let hidden = crate::repository::fixtures::post(&pool, "Caithe.1234", "Hidden").await;
        assert!(!hidden.published);
        assert_eq!(hidden.likes_count, 0);
        assert_eq!(hidden.tags, vec!["light"]);

        let (listed, total) = list_published(&pool, 20, 0).await.unwrap();
        assert!(listed.is_empty());
        assert_eq!(total, 0);
        let (found, total) = search(&pool, &params()).await.unwrap();
        assert!(found.is_empty());
        assert_eq!(total, 0);
        assert!(popular(&pool, Timeframe::AllTime, 10).await.unwrap().is_empty());

        sqlx::query("UPDATE posts SET published = TRUE WHERE id = $1")
            .bind(hidden.id)
            .execute(&pool)
            .await
            .unwrap();
        let (listed, total) = list_published(&pool, 20, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(listed[0].id, hidden.id);

        let tagged = SearchParams {
            tags: vec!["light".into()],
            ..params()
        };
        assert_eq!(search(&pool, &tagged).await.unwrap().1, 1);
        let untagged = SearchParams {
            tags: vec!["heavy".into()],
            ..params()
        };
        assert_eq!(search(&pool, &untagged).await.unwrap().1, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL pointing at a PostgreSQL server"]
    async fn only_the_author_can_unpublish(pool: PgPool) {
        let post = crate::repository::fixtures::post(&pool, "Caithe.1234", "Mine").await;
        sqlx::query("UPDATE posts SET published = TRUE WHERE id = $1")
            .bind(post.id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(!unpublish_by_author(&pool, post.id, "Faolain.6666").await.unwrap());
        assert_eq!(is_published(&pool, post.id).await.unwrap(), Some(true));

        assert!(unpublish_by_author(&pool, post.id, "Caithe.1234").await.unwrap());
        assert_eq!(is_published(&pool, post.id).await.unwrap(), Some(false));
        assert!(find_by_id(&pool, post.id).await.unwrap().is_some());
    }
}
