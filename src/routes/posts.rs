use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::posts::PostSummary;
use crate::InnerState;

#[derive(Debug, Deserialize)]
pub struct PostsPaginationParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedPostsResponse {
    pub results: Vec<PostSummary>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PaginationInfo {
    pub total: i64,
    pub pages: i64,
    pub page: i64,
    pub per_page: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Page metadata for a total row count. `per_page` must be >= 1.
fn page_meta(total: i64, page: i64, per_page: i64) -> PaginationInfo {
    let pages = (total + per_page - 1) / per_page;
    PaginationInfo {
        total,
        pages,
        page,
        per_page,
        has_next: page < pages,
        has_prev: page > 1,
    }
}

#[tracing::instrument(name = "List posts", skip(inner))]
pub async fn all_posts(
    State(inner): State<InnerState>,
    Query(params): Query<PostsPaginationParams>,
) -> Result<Json<PaginatedPostsResponse>, AppError> {
    let InnerState { db, .. } = inner;

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(10).max(1).min(100);
    let offset = (page - 1) * per_page;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post")
        .fetch_one(&db)
        .await?;

    // Out-of-range pages simply come back empty.
    let results = sqlx::query_as::<_, PostSummary>(
        r#"
        SELECT video_id, title, user_nickname, play_count, comment_count,
               share_count, create_time, keyword, is_shareable, engagement_rate
        FROM post
        ORDER BY create_time DESC NULLS LAST
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(per_page)
    .bind(offset)
    .fetch_all(&db)
    .await?;

    Ok(Json(PaginatedPostsResponse {
        results,
        pagination: page_meta(total, page, per_page),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_past_the_end_has_no_next() {
        // 5 posts, page 2 at 10 per page
        let meta = page_meta(5, 2, 10);
        assert_eq!(meta.pages, 1);
        assert!(!meta.has_next);
        assert!(meta.has_prev);
    }

    #[test]
    fn first_of_three_pages() {
        let meta = page_meta(25, 1, 10);
        assert_eq!(meta.pages, 3);
        assert!(meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn exact_multiple_does_not_round_up() {
        let meta = page_meta(20, 2, 10);
        assert_eq!(meta.pages, 2);
        assert!(!meta.has_next);
        assert!(meta.has_prev);
    }

    #[test]
    fn empty_table_has_zero_pages() {
        let meta = page_meta(0, 1, 10);
        assert_eq!(meta.pages, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }
}
