use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::InnerState;

/// Distinct non-empty keywords across all stored posts, sorted.
#[tracing::instrument(name = "List keywords", skip(inner))]
pub async fn all_keywords(State(inner): State<InnerState>) -> Result<Json<Vec<String>>, AppError> {
    let InnerState { db, .. } = inner;

    let keywords: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT keyword
        FROM post
        WHERE keyword IS NOT NULL AND btrim(keyword) <> ''
        ORDER BY keyword
        "#,
    )
    .fetch_all(&db)
    .await?;

    Ok(Json(keywords))
}
