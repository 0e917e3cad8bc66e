use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostMessageRequest {
    pub user: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PostMessageResponse {
    pub id: i64,
    pub text: String,
    pub sentiment: Option<String>,
    pub score: Option<f64>,
}

/// Body returned when the AI backend could not be reached or answered
/// with a non-success status. The message itself is already persisted
/// at this point, so the id is included.
#[derive(Debug, Serialize)]
pub struct SentimentFailureResponse {
    pub id: i64,
    pub text: String,
    pub error: String,
    pub details: String,
}

/// One entry of the global feed. `user` is the owning user's current
/// display name, falling back to the name captured at submit time.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMessage {
    pub id: i64,
    pub text: String,
    pub user: String,
    pub sentiment: Option<String>,
    pub score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessage {
    pub id: i64,
    pub text: String,
    pub sentiment: Option<String>,
    pub score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterUserRequest {
    pub nickname: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub nickname: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Projection used by the all-users listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
}
