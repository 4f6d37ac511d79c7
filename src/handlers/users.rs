use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::User;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

// POST /users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, AppError> {
    let db = state.db.lock().unwrap();
    let user = queries::create_user(&db, &req.name, &req.email)?;
    tracing::info!("created user {}", user.id);
    Ok(Json(user))
}

// GET /users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<User>, AppError> {
    let db = state.db.lock().unwrap();
    let user = queries::get_user(&db, id)?
        .ok_or_else(|| AppError::NotFound(format!("user with id={id} not found")))?;
    Ok(Json(user))
}

// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<User>>, AppError> {
    let db = state.db.lock().unwrap();
    Ok(Json(queries::list_users(&db)?))
}

// PATCH /users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    let db = state.db.lock().unwrap();
    let mut user = queries::get_user(&db, id)?
        .ok_or_else(|| AppError::NotFound(format!("user with id={id} not found")))?;

    if let Some(name) = req.name {
        user.name = name;
    }
    if let Some(email) = req.email {
        user.email = email;
    }

    queries::update_user(&db, &user)?;
    Ok(Json(user))
}

// DELETE /users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let db = state.db.lock().unwrap();
    if !queries::delete_user(&db, id)? {
        return Err(AppError::NotFound(format!("user with id={id} not found")));
    }
    tracing::info!("deleted user {id}");
    Ok(StatusCode::NO_CONTENT)
}
