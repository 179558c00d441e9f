//! Dedup-and-persist for normalized posts.
//!
//! Every record lands in exactly one bucket: saved, skipped as a duplicate,
//! or failed to write. Inserts are committed in small transactions to bound
//! their size; a per-record savepoint keeps one bad row from poisoning the
//! rest of the batch.

use serde::Serialize;
use sqlx::{Acquire, PgPool, Postgres, Transaction};

use crate::errors::AppError;
use crate::posts::NewPost;

const BATCH_SIZE: usize = 10;

#[derive(Debug, Default, Serialize)]
pub struct PersistOutcome {
    pub saved: usize,
    pub skipped_video_ids: Vec<String>,
    pub failed_video_ids: Vec<String>,
}

enum StageOutcome {
    Saved,
    Duplicate,
}

pub async fn persist_posts(pool: &PgPool, posts: &[NewPost]) -> Result<PersistOutcome, AppError> {
    let mut outcome = PersistOutcome::default();
    let mut tx = pool.begin().await?;
    let mut staged = 0usize;

    for post in posts {
        // Both the dedup check and the insert run under the savepoint, so a
        // failure in either is per-record and the batch keeps going.
        let mut savepoint = tx.begin().await?;
        match stage_post(&mut savepoint, post).await {
            Ok(StageOutcome::Saved) => {
                savepoint.commit().await?;
                outcome.saved += 1;
                staged += 1;
            }
            Ok(StageOutcome::Duplicate) => {
                savepoint.commit().await?;
                outcome.skipped_video_ids.push(post.video_id.clone());
            }
            Err(e) => {
                if let Err(rb) = savepoint.rollback().await {
                    tracing::error!("savepoint rollback failed: {:?}", rb);
                }
                tracing::error!(
                    video_id = %post.video_id,
                    record = ?post,
                    "failed to persist video: {:?}",
                    e
                );
                outcome.failed_video_ids.push(post.video_id.clone());
            }
        }

        if staged == BATCH_SIZE {
            tx.commit().await?;
            tx = pool.begin().await?;
            staged = 0;
        }
    }

    tx.commit().await?;

    tracing::info!(
        saved = outcome.saved,
        skipped = outcome.skipped_video_ids.len(),
        failed = outcome.failed_video_ids.len(),
        "persisted scrape batch"
    );

    Ok(outcome)
}

async fn stage_post(
    tx: &mut Transaction<'_, Postgres>,
    post: &NewPost,
) -> Result<StageOutcome, sqlx::Error> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM post WHERE video_id = $1)")
            .bind(&post.video_id)
            .fetch_one(&mut **tx)
            .await?;

    if exists {
        return Ok(StageOutcome::Duplicate);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO post (
            video_id, region, title, cover_photo, ai_dynamic_cover_photo,
            duration, video_link, size, play_count, comment_count,
            share_count, download_count, create_time, is_live, is_ad,
            is_shareable, engagement_rate, mentioned_users_ids, user_id,
            user_unique_id, user_nickname, user_avatar, keyword
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
            $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
        )
        ON CONFLICT (video_id) DO NOTHING
        "#,
    )
    .bind(&post.video_id)
    .bind(&post.region)
    .bind(&post.title)
    .bind(&post.cover_photo)
    .bind(&post.ai_dynamic_cover_photo)
    .bind(post.duration)
    .bind(&post.video_link)
    .bind(post.size)
    .bind(post.play_count)
    .bind(post.comment_count)
    .bind(post.share_count)
    .bind(post.download_count)
    .bind(post.create_time)
    .bind(post.is_live)
    .bind(post.is_ad)
    .bind(post.is_shareable)
    .bind(post.engagement_rate)
    .bind(&post.mentioned_users_ids)
    .bind(&post.user_id)
    .bind(&post.user_unique_id)
    .bind(&post.user_nickname)
    .bind(&post.user_avatar)
    .bind(&post.keyword)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        // Lost the race to a concurrent ingestion; the unique constraint
        // held and ON CONFLICT swallowed the insert.
        tracing::warn!(video_id = %post.video_id, "concurrent duplicate, skipping");
        return Ok(StageOutcome::Duplicate);
    }

    Ok(StageOutcome::Saved)
}
