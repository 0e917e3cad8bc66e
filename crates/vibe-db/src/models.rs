/// Database row types — these map directly to SQLite rows.
/// Distinct from the vibe-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    /// Normalized lower-case nickname, unique across users.
    pub nickname: String,
    /// Most-recently-submitted original casing.
    pub display_name: Option<String>,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: i64,
    pub user_id: i64,
    /// Name exactly as submitted with the message, kept even if the
    /// user later changes casing.
    pub user_display: String,
    pub text: String,
    pub sentiment_label: Option<String>,
    pub sentiment_score: Option<f64>,
    pub created_at: String,
}

/// Row of the global feed query: the display name is already resolved
/// against the users table, falling back to `user_display`.
pub struct FeedRow {
    pub id: i64,
    pub text: String,
    pub user: String,
    pub sentiment_label: Option<String>,
    pub sentiment_score: Option<f64>,
    pub created_at: String,
}
