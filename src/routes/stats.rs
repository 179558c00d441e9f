use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, QueryBuilder};

use crate::errors::AppError;
use crate::InnerState;

#[derive(Debug, Deserialize)]
pub struct MonthlyStatsParams {
    pub keyword: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct MonthlyCount {
    pub date: String,
    pub count: i64,
}

/// Post counts bucketed by year-month of creation time. Posts without a
/// creation time are excluded. `keyword=all` (or no keyword) means no filter.
#[tracing::instrument(name = "Monthly stats", skip(inner))]
pub async fn monthly_stats(
    State(inner): State<InnerState>,
    Query(params): Query<MonthlyStatsParams>,
) -> Result<Json<Vec<MonthlyCount>>, AppError> {
    let InnerState { db, .. } = inner;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        SELECT to_char(create_time, 'YYYY-MM') AS date, COUNT(*) AS count
        FROM post
        WHERE create_time IS NOT NULL
        "#,
    );

    if let Some(keyword) = params.keyword.as_deref() {
        if !keyword.is_empty() && keyword != "all" {
            builder.push(" AND keyword = ");
            builder.push_bind(keyword.to_string());
        }
    }

    builder.push(" GROUP BY 1 ORDER BY 1");

    let stats = builder
        .build_query_as::<MonthlyCount>()
        .fetch_all(&db)
        .await?;

    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_schema;
    use crate::provider::{TikTokClient, DEFAULT_BASE_URL};
    use axum::extract::State;
    use chrono::{NaiveDate, NaiveDateTime};
    use sqlx::PgPool;

    fn state(pool: PgPool) -> InnerState {
        InnerState {
            db: pool,
            provider: TikTokClient::new("test-key".to_string(), DEFAULT_BASE_URL.to_string()),
        }
    }

    fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    async fn seed(pool: &PgPool) {
        let rows: [(&str, &str, Option<NaiveDateTime>); 4] = [
            ("a", "cats", Some(at(2024, 1, 15))),
            ("b", "cats", Some(at(2024, 1, 20))),
            ("c", "dogs", Some(at(2024, 2, 1))),
            ("d", "cats", None),
        ];
        for (video_id, keyword, create_time) in rows {
            sqlx::query("INSERT INTO post (video_id, keyword, create_time) VALUES ($1, $2, $3)")
                .bind(video_id)
                .bind(keyword)
                .bind(create_time)
                .execute(pool)
                .await
                .unwrap();
        }
    }

    #[sqlx::test]
    async fn posts_without_create_time_are_excluded(pool: PgPool) {
        create_schema(&pool).await.unwrap();
        seed(&pool).await;

        let Json(stats) = monthly_stats(
            State(state(pool)),
            Query(MonthlyStatsParams { keyword: None }),
        )
        .await
        .unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].date, "2024-01");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[1].date, "2024-02");
        assert_eq!(stats[1].count, 1);
        // buckets sum to the number of posts that have a creation time
        assert_eq!(stats.iter().map(|s| s.count).sum::<i64>(), 3);
    }

    #[sqlx::test]
    async fn keyword_filter_and_all_sentinel(pool: PgPool) {
        create_schema(&pool).await.unwrap();
        seed(&pool).await;

        let Json(filtered) = monthly_stats(
            State(state(pool.clone())),
            Query(MonthlyStatsParams {
                keyword: Some("cats".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].date, "2024-01");
        assert_eq!(filtered[0].count, 2);

        let Json(all) = monthly_stats(
            State(state(pool)),
            Query(MonthlyStatsParams {
                keyword: Some("all".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(all.len(), 2);
    }
}
