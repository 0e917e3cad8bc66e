use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;

use vibe_sentiment::{build_plan, normalize};
use vibe_types::api::{
    FeedMessage, PostMessageRequest, PostMessageResponse, SentimentFailureResponse, UserMessage,
};

use crate::{AppStateInner, parse_created_at};

const MAX_NICKNAME_CHARS: usize = 64;
const MAX_TEXT_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_feed_count")]
    pub count: u32,
}

fn default_feed_count() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
pub struct UserMessagesQuery {
    pub nickname: Option<String>,
    #[serde(default = "default_user_count")]
    pub count: u32,
}

fn default_user_count() -> u32 {
    20
}

/// POST /messages: the whole posting pipeline in one place. Validate,
/// resolve the author, persist, call the AI backend, record the
/// normalized result. The message row is durable from step three on;
/// everything after it can fail without losing the post.
pub async fn post_message(
    State(state): State<Arc<AppStateInner>>,
    Json(req): Json<PostMessageRequest>,
) -> Response {
    if req.user.trim().is_empty() || req.text.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "user and text are required").into_response();
    }
    if req.user.trim().chars().count() > MAX_NICKNAME_CHARS {
        return (StatusCode::BAD_REQUEST, "user must be at most 64 characters").into_response();
    }
    if req.text.chars().count() > MAX_TEXT_CHARS {
        return (StatusCode::BAD_REQUEST, "text must be at most 4000 characters").into_response();
    }

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let submitted_name = req.user.clone();
    let text = req.text.clone();
    let message = match tokio::task::spawn_blocking(move || {
        let user = db.db.resolve_user(&submitted_name)?;
        db.db.insert_message(user.id, &submitted_name, &text)
    })
    .await
    {
        Ok(Ok(message)) => message,
        Ok(Err(e)) => {
            error!("failed to persist message: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let plan = build_plan(&state.ai, &req.text);
    let response = match state.sentiment.execute(&plan, state.ai.token.as_deref()).await {
        Ok(response) => response,
        Err(e) => {
            return (
                StatusCode::BAD_GATEWAY,
                Json(SentimentFailureResponse {
                    id: message.id,
                    text: message.text,
                    error: "AI connection failed".to_string(),
                    details: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    if !response.is_success() {
        // The backend's own status is passed through to the caller.
        let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
        return (
            status,
            Json(SentimentFailureResponse {
                id: message.id,
                text: message.text,
                error: "AI request failed".to_string(),
                details: response.body,
            }),
        )
            .into_response();
    }

    // A body that matches no known shape is not an error: the message
    // stays, sentiment stays unset.
    let sentiment = normalize(state.ai.provider, &response.body);

    let db = state.clone();
    let message_id = message.id;
    let label = sentiment.label.clone();
    let score = sentiment.score;
    let recorded = tokio::task::spawn_blocking(move || {
        db.db.set_message_sentiment(message_id, label.as_deref(), score)
    })
    .await;
    match recorded {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("failed to record sentiment: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    Json(PostMessageResponse {
        id: message.id,
        text: message.text,
        sentiment: sentiment.label,
        score: sentiment.score,
    })
    .into_response()
}

/// GET /messages/all: the newest messages, displayed oldest-first.
pub async fn get_all_messages(
    State(state): State<Arc<AppStateInner>>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let count = query.count;
    let rows = tokio::task::spawn_blocking(move || db.db.list_recent_messages(count))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("feed query failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let messages: Vec<FeedMessage> = rows
        .into_iter()
        .map(|row| FeedMessage {
            id: row.id,
            text: row.text,
            user: row.user,
            sentiment: row.sentiment_label,
            score: row.sentiment_score,
            created_at: parse_created_at(&row.created_at),
        })
        .collect();

    Ok(Json(messages))
}

/// GET /messages?nickname=: one user's messages, newest first. An
/// unknown nickname is an empty list, not an error.
pub async fn get_messages_by_user(
    State(state): State<Arc<AppStateInner>>,
    Query(query): Query<UserMessagesQuery>,
) -> Result<Response, StatusCode> {
    let Some(nickname) = query.nickname.filter(|n| !n.trim().is_empty()) else {
        return Ok((StatusCode::BAD_REQUEST, "nickname is required").into_response());
    };

    let db = state.clone();
    let count = query.count;
    let rows = tokio::task::spawn_blocking(move || {
        let (key, _) = vibe_db::queries::normalize_nickname(&nickname);
        match db.db.get_user_by_nickname(&key)? {
            Some(user) => db.db.list_messages_by_user(user.id, count),
            None => Ok(vec![]),
        }
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("user messages query failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let messages: Vec<UserMessage> = rows
        .into_iter()
        .map(|row| UserMessage {
            id: row.id,
            text: row.text,
            sentiment: row.sentiment_label,
            score: row.sentiment_score,
            created_at: parse_created_at(&row.created_at),
        })
        .collect();

    Ok(Json(messages).into_response())
}
