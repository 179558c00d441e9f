//! Client for the RapidAPI TikTok search endpoint.
//!
//! One page per request; pagination is an integer cursor the provider hands
//! back implicitly via `hasMore`.

use reqwest::Client;
use serde::Deserialize;

use crate::errors::AppError;
use crate::posts::RawVideo;

pub const DEFAULT_BASE_URL: &str = "https://tiktok-video-no-watermark2.p.rapidapi.com";
const RAPIDAPI_HOST: &str = "tiktok-video-no-watermark2.p.rapidapi.com";

// Fixed search window and ordering, matching the dashboard's usage.
const PUBLISH_TIME: &str = "0";
const SORT_TYPE: &str = "0";

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: SearchData,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchData {
    #[serde(default)]
    pub videos: Vec<RawVideo>,
    #[serde(default, rename = "hasMore")]
    pub has_more: bool,
}

#[derive(Clone)]
pub struct TikTokClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl TikTokClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
            base_url,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("RAPIDAPI_KEY")
            .map_err(|_| anyhow::anyhow!("RAPIDAPI_KEY must be set"))?;
        let base_url = std::env::var("TIKTOK_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self::new(api_key, base_url))
    }

    /// Fetches a single search page. A body that does not parse as the
    /// expected envelope is fatal for the whole ingestion call.
    pub async fn search_page(
        &self,
        keyword: &str,
        count: i64,
        cursor: i64,
    ) -> Result<SearchData, AppError> {
        let url = format!("{}/feed/search", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("keywords", keyword.to_string()),
                ("count", count.to_string()),
                ("cursor", cursor.to_string()),
                ("publish_time", PUBLISH_TIME.to_string()),
                ("sort_type", SORT_TYPE.to_string()),
            ])
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", RAPIDAPI_HOST)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(%status, "provider search error: {}", error_text);
            return Err(AppError::ExternalService(anyhow::anyhow!(
                "Provider search error ({}): {}",
                status,
                error_text
            )));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            tracing::error!("failed to parse provider search response: {:?}", e);
            AppError::ExternalService(
                anyhow::Error::new(e).context("Failed to parse provider search response"),
            )
        })?;

        Ok(body.data)
    }

    /// Walks the cursor until `max_posts` items are collected, the provider
    /// reports no further pages, or a page comes back empty. Whole pages are
    /// kept, so the result may overshoot `max_posts` by less than one page.
    pub async fn search_all(
        &self,
        keyword: &str,
        page_size: i64,
        max_posts: usize,
    ) -> Result<Vec<RawVideo>, AppError> {
        let mut cursor = 0i64;
        let mut collected: Vec<RawVideo> = Vec::new();

        if max_posts == 0 {
            return Ok(collected);
        }

        loop {
            let page = self.search_page(keyword, page_size, cursor).await?;

            if page.videos.is_empty() {
                // An empty page with hasMore=true would otherwise poll forever.
                tracing::info!(keyword, cursor, "no videos returned, stopping pagination");
                break;
            }

            let fetched = page.videos.len();
            collected.extend(page.videos);
            tracing::info!(fetched, total = collected.len(), "fetched provider page");

            if !page.has_more || collected.len() >= max_posts {
                break;
            }
            cursor += 1;
        }

        Ok(collected)
    }
}
