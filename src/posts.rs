use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use sqlx::FromRow;

/// One video item as the provider's search endpoint returns it. Everything
/// past the envelope is optional; the normalizer decides what survives.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVideo {
    pub video_id: Option<String>,
    pub region: Option<String>,
    pub title: Option<String>,
    pub cover: Option<String>,
    pub ai_dynamic_cover: Option<String>,
    pub duration: Option<i64>,
    pub video_link: Option<String>,
    pub size: Option<i64>,
    pub play_count: Option<i64>,
    pub comment_count: Option<i64>,
    pub share_count: Option<i64>,
    pub download_count: Option<i64>,
    pub create_time: Option<i64>,
    pub is_live: Option<bool>,
    pub is_ad: Option<bool>,
    pub mentioned_users_ids: Option<Value>,
    pub author: Option<RawAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAuthor {
    pub id: Option<String>,
    pub unique_id: Option<String>,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
}

/// Canonical post shape, ready for insertion and for the scrape response.
#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub video_id: String,
    pub region: Option<String>,
    pub title: Option<String>,
    pub cover_photo: Option<String>,
    pub ai_dynamic_cover_photo: Option<String>,
    pub duration: i64,
    pub video_link: Option<String>,
    pub size: i64,
    pub play_count: i64,
    pub comment_count: i64,
    pub share_count: i64,
    pub download_count: i64,
    pub create_time: Option<NaiveDateTime>,
    pub is_live: bool,
    pub is_ad: bool,
    pub is_shareable: bool,
    pub engagement_rate: f64,
    pub mentioned_users_ids: Value,
    pub user_id: Option<String>,
    pub user_unique_id: Option<String>,
    pub user_nickname: Option<String>,
    pub user_avatar: Option<String>,
    pub keyword: String,
}

impl NewPost {
    /// Normalizes one raw provider item. Returns `None` for items without a
    /// video id; those are logged and dropped without aborting the batch.
    pub fn from_raw(raw: RawVideo, keyword: &str) -> Option<NewPost> {
        let video_id = match raw.video_id {
            Some(id) if !id.is_empty() => id,
            _ => {
                tracing::warn!(title = ?raw.title, "skipping video without video_id");
                return None;
            }
        };

        let play_count = raw.play_count.unwrap_or(0);
        let comment_count = raw.comment_count.unwrap_or(0);
        let share_count = raw.share_count.unwrap_or(0);

        let rate = if play_count > 0 {
            (comment_count + share_count) as f64 / play_count as f64
        } else {
            0.0
        };

        // Shareable when engagement is high (>0.5%) or raw reach is large.
        let is_shareable = rate > 0.005 || play_count > 100_000;

        let create_time = raw
            .create_time
            .filter(|secs| *secs > 0)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.naive_utc());

        let author = raw.author;

        Some(NewPost {
            video_id,
            region: raw.region,
            title: raw.title,
            cover_photo: raw.cover,
            ai_dynamic_cover_photo: raw.ai_dynamic_cover,
            duration: raw.duration.unwrap_or(0),
            video_link: raw.video_link,
            size: raw.size.unwrap_or(0),
            play_count,
            comment_count,
            share_count,
            download_count: raw.download_count.unwrap_or(0),
            create_time,
            is_live: raw.is_live.unwrap_or(false),
            is_ad: raw.is_ad.unwrap_or(false),
            is_shareable,
            engagement_rate: round_two(rate * 100.0),
            mentioned_users_ids: raw
                .mentioned_users_ids
                .unwrap_or_else(|| Value::Array(Vec::new())),
            user_id: author.as_ref().and_then(|a| a.id.clone()),
            user_unique_id: author.as_ref().and_then(|a| a.unique_id.clone()),
            user_nickname: author.as_ref().and_then(|a| a.nickname.clone()),
            user_avatar: author.and_then(|a| a.avatar),
            keyword: keyword.to_string(),
        })
    }
}

fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Listing row for `/api/posts`.
#[derive(Debug, Serialize, FromRow, Clone)]
pub struct PostSummary {
    pub video_id: String,
    pub title: Option<String>,
    pub user_nickname: Option<String>,
    pub play_count: i64,
    pub comment_count: i64,
    pub share_count: i64,
    #[serde(serialize_with = "date_only")]
    pub create_time: Option<NaiveDateTime>,
    pub keyword: Option<String>,
    pub is_shareable: bool,
    pub engagement_rate: f64,
}

fn date_only<S: Serializer>(value: &Option<NaiveDateTime>, ser: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(dt) => ser.serialize_str(&dt.format("%Y-%m-%d").to_string()),
        None => ser.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(play: i64, comments: i64, shares: i64) -> RawVideo {
        serde_json::from_value(json!({
            "video_id": "v1",
            "play_count": play,
            "comment_count": comments,
            "share_count": shares,
        }))
        .unwrap()
    }

    #[test]
    fn engagement_rate_is_percentage_rounded_to_two_places() {
        let post = NewPost::from_raw(raw(1000, 50, 25), "cats").unwrap();
        assert_eq!(post.engagement_rate, 7.5);
        assert!(post.is_shareable);
    }

    #[test]
    fn zero_plays_gives_zero_rate() {
        let post = NewPost::from_raw(raw(0, 10, 10), "cats").unwrap();
        assert_eq!(post.engagement_rate, 0.0);
        assert!(!post.is_shareable);
    }

    #[test]
    fn high_play_count_is_shareable_regardless_of_rate() {
        let post = NewPost::from_raw(raw(200_000, 0, 0), "cats").unwrap();
        assert_eq!(post.engagement_rate, 0.0);
        assert!(post.is_shareable);
    }

    #[test]
    fn rate_rounds_half_up_at_two_decimals() {
        // 1 / 3000 plays = 0.0333...% -> 0.03
        let post = NewPost::from_raw(raw(3000, 1, 0), "cats").unwrap();
        assert_eq!(post.engagement_rate, 0.03);
    }

    #[test]
    fn missing_video_id_is_skipped() {
        let raw: RawVideo = serde_json::from_value(json!({"title": "no id"})).unwrap();
        assert!(NewPost::from_raw(raw, "cats").is_none());
    }

    #[test]
    fn missing_fields_default_to_zero_and_false() {
        let raw: RawVideo = serde_json::from_value(json!({"video_id": "v2"})).unwrap();
        let post = NewPost::from_raw(raw, "dogs").unwrap();
        assert_eq!(post.duration, 0);
        assert_eq!(post.size, 0);
        assert_eq!(post.play_count, 0);
        assert_eq!(post.download_count, 0);
        assert!(!post.is_live);
        assert!(!post.is_ad);
        assert_eq!(post.mentioned_users_ids, json!([]));
        assert_eq!(post.keyword, "dogs");
    }

    #[test]
    fn zero_create_time_means_no_timestamp() {
        let raw: RawVideo =
            serde_json::from_value(json!({"video_id": "v3", "create_time": 0})).unwrap();
        let post = NewPost::from_raw(raw, "cats").unwrap();
        assert!(post.create_time.is_none());

        let raw: RawVideo =
            serde_json::from_value(json!({"video_id": "v4", "create_time": 1700000000}))
                .unwrap();
        let post = NewPost::from_raw(raw, "cats").unwrap();
        assert_eq!(
            post.create_time.unwrap().format("%Y-%m-%d").to_string(),
            "2023-11-14"
        );
    }

    #[test]
    fn author_fields_are_flattened() {
        let raw: RawVideo = serde_json::from_value(json!({
            "video_id": "v5",
            "author": {"id": "123", "unique_id": "handle", "nickname": "Nick", "avatar": "http://a"}
        }))
        .unwrap();
        let post = NewPost::from_raw(raw, "cats").unwrap();
        assert_eq!(post.user_id.as_deref(), Some("123"));
        assert_eq!(post.user_unique_id.as_deref(), Some("handle"));
        assert_eq!(post.user_nickname.as_deref(), Some("Nick"));
        assert_eq!(post.user_avatar.as_deref(), Some("http://a"));
    }
}
