use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::posts::NewPost;
use crate::writer::{persist_posts, PersistOutcome};
use crate::InnerState;

#[derive(Debug, Deserialize)]
pub struct ScrapeParams {
    pub keyword: Option<String>,
    pub limit: Option<i64>,
    pub max_posts: Option<usize>,
    pub is_save_to_db: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub results: Vec<NewPost>,
    pub saved_posts: usize,
    pub skipped_posts: usize,
    pub skipped_video_ids: Vec<String>,
    pub failed_video_ids: Vec<String>,
}

/// Pulls search pages from the provider, normalizes them, and optionally
/// persists the batch. Posts already stored under another keyword are kept
/// as-is; first write wins.
#[tracing::instrument(name = "Scrape TikTok search data", skip(inner))]
pub async fn scrap_tiktok_data(
    State(inner): State<InnerState>,
    Query(params): Query<ScrapeParams>,
) -> Result<Json<ScrapeResponse>, AppError> {
    let InnerState { db, provider } = inner;

    let keyword = params.keyword.unwrap_or_default();
    let limit = params.limit.unwrap_or(30).max(1);
    let max_posts = params.max_posts.unwrap_or(200);
    let save_to_db = params.is_save_to_db.unwrap_or(false);

    let raw_videos = provider.search_all(&keyword, limit, max_posts).await?;

    let posts: Vec<NewPost> = raw_videos
        .into_iter()
        .filter_map(|raw| NewPost::from_raw(raw, &keyword))
        .collect();

    let outcome = if save_to_db {
        persist_posts(&db, &posts).await?
    } else {
        PersistOutcome::default()
    };

    Ok(Json(ScrapeResponse {
        saved_posts: outcome.saved,
        skipped_posts: outcome.skipped_video_ids.len(),
        skipped_video_ids: outcome.skipped_video_ids,
        failed_video_ids: outcome.failed_video_ids,
        results: posts,
    }))
}
