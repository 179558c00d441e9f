use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub async fn init_db() -> anyhow::Result<PgPool> {
    let db_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&db_url)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Additive schema setup. Existing tables are left untouched.
pub(crate) async fn create_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS post (
            id BIGSERIAL PRIMARY KEY,
            video_id TEXT UNIQUE NOT NULL,
            region TEXT,
            title TEXT,
            cover_photo TEXT,
            ai_dynamic_cover_photo TEXT,
            duration BIGINT NOT NULL DEFAULT 0,
            video_link TEXT,
            size BIGINT NOT NULL DEFAULT 0,
            play_count BIGINT NOT NULL DEFAULT 0,
            comment_count BIGINT NOT NULL DEFAULT 0,
            share_count BIGINT NOT NULL DEFAULT 0,
            download_count BIGINT NOT NULL DEFAULT 0,
            create_time TIMESTAMP,
            is_live BOOLEAN NOT NULL DEFAULT FALSE,
            is_ad BOOLEAN NOT NULL DEFAULT FALSE,
            is_shareable BOOLEAN NOT NULL DEFAULT FALSE,
            engagement_rate DOUBLE PRECISION NOT NULL DEFAULT 0.0,
            mentioned_users_ids JSONB,
            user_id TEXT,
            user_unique_id TEXT,
            user_nickname TEXT,
            user_avatar TEXT,
            keyword TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("database schema ready");

    Ok(())
}
