pub mod messages;
pub mod users;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use vibe_db::Database;
use vibe_sentiment::{AiConfig, SentimentClient};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sentiment: SentimentClient,
    pub ai: AiConfig,
}

/// Parse a stored timestamp into UTC. SQLite writes
/// "YYYY-MM-DD HH:MM:SS" without a timezone, so the RFC 3339 parse is
/// followed by a naive-format fallback.
pub(crate) fn parse_created_at(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}': {}", raw, e);
            DateTime::default()
        })
}
