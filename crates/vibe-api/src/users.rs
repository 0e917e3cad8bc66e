use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;

use vibe_db::models::UserRow;
use vibe_types::api::{RegisterUserRequest, UserResponse, UserSummary};

use crate::{AppStateInner, parse_created_at};

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub nickname: Option<String>,
}

fn to_user_response(row: UserRow) -> UserResponse {
    UserResponse {
        id: row.id,
        nickname: row.nickname,
        display_name: row.display_name,
        created_at: parse_created_at(&row.created_at),
    }
}

/// POST /users: upsert by nickname. Re-registering only refreshes the
/// display casing.
pub async fn register_user(
    State(state): State<Arc<AppStateInner>>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.nickname.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.nickname.trim().chars().count() > 64 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.clone();
    let nickname = req.nickname.clone();
    let user = tokio::task::spawn_blocking(move || db.db.resolve_user(&nickname))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("user upsert failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(to_user_response(user)))
}

/// GET /users/{id}
pub async fn get_user_by_id(
    State(state): State<Arc<AppStateInner>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user = tokio::task::spawn_blocking(move || db.db.get_user_by_id(id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("user lookup failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    match user {
        Some(row) => Ok(Json(to_user_response(row))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// GET /users: point lookup when a nickname is given, otherwise all
/// users ordered by normalized nickname.
pub async fn get_users(
    State(state): State<Arc<AppStateInner>>,
    Query(query): Query<UsersQuery>,
) -> Result<Response, StatusCode> {
    if let Some(nickname) = query.nickname.filter(|n| !n.trim().is_empty()) {
        let db = state.clone();
        let user = tokio::task::spawn_blocking(move || {
            let (key, _) = vibe_db::queries::normalize_nickname(&nickname);
            db.db.get_user_by_nickname(&key)
        })
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("user lookup failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        return match user {
            Some(row) => Ok(Json(to_user_response(row)).into_response()),
            None => Err(StatusCode::NOT_FOUND),
        };
    }

    let db = state.clone();
    let users = tokio::task::spawn_blocking(move || db.db.list_users())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("user listing failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let summaries: Vec<UserSummary> = users
        .into_iter()
        .map(|row| UserSummary {
            id: row.id,
            nickname: row.nickname,
            created_at: parse_created_at(&row.created_at),
        })
        .collect();

    Ok(Json(summaries).into_response())
}
