mod keywords;
mod posts;
mod scrape;
mod stats;

pub use keywords::*;
pub use posts::*;
pub use scrape::*;
pub use stats::*;

use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

pub async fn home() -> impl IntoResponse {
    Json(json!({
        "name": "api-tikscout",
        "status": "ok"
    }))
}
