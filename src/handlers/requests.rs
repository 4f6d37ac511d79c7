use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::sharer_id;
use crate::models::ItemRequest;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateRequestBody {
    pub description: String,
}

#[derive(Serialize)]
pub struct RequestResponse {
    pub id: i64,
    pub description: String,
    pub requester_id: i64,
    pub created: String,
    /// Items listed in answer to this request.
    pub items: Vec<AnswerResponse>,
}

#[derive(Serialize)]
pub struct AnswerResponse {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
}

fn to_response(db: &Connection, request: ItemRequest) -> Result<RequestResponse, AppError> {
    let answers = queries::list_items_by_request(db, request.id)?;
    Ok(RequestResponse {
        id: request.id,
        description: request.description,
        requester_id: request.requester_id,
        created: request.created.format("%Y-%m-%dT%H:%M:%S").to_string(),
        items: answers
            .into_iter()
            .map(|item| AnswerResponse {
                id: item.id,
                name: item.name,
                owner_id: item.owner_id,
            })
            .collect(),
    })
}

fn existing_user(db: &Connection, user_id: i64) -> Result<(), AppError> {
    queries::get_user(db, user_id)?
        .ok_or_else(|| AppError::NotFound(format!("user with id={user_id} not found")))?;
    Ok(())
}

// POST /requests
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateRequestBody>,
) -> Result<Json<RequestResponse>, AppError> {
    let user_id = sharer_id(&headers)?;

    let db = state.db.lock().unwrap();
    existing_user(&db, user_id)?;

    let created = Utc::now().naive_utc();
    let request = queries::create_request(&db, user_id, &body.description, &created)?;
    tracing::info!("user {user_id} posted item request {}", request.id);
    to_response(&db, request).map(Json)
}

// GET /requests — the caller's own requests, newest first
pub async fn list_own_requests(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<RequestResponse>>, AppError> {
    let user_id = sharer_id(&headers)?;

    let db = state.db.lock().unwrap();
    existing_user(&db, user_id)?;

    let mut responses = vec![];
    for request in queries::list_requests_by_requester(&db, user_id)? {
        responses.push(to_response(&db, request)?);
    }
    Ok(Json(responses))
}

// GET /requests/all — other users' requests, newest first
pub async fn list_other_requests(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<RequestResponse>>, AppError> {
    let user_id = sharer_id(&headers)?;

    let db = state.db.lock().unwrap();
    existing_user(&db, user_id)?;

    let mut responses = vec![];
    for request in queries::list_requests_of_others(&db, user_id)? {
        responses.push(to_response(&db, request)?);
    }
    Ok(Json(responses))
}

// GET /requests/:id
pub async fn get_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<RequestResponse>, AppError> {
    let user_id = sharer_id(&headers)?;

    let db = state.db.lock().unwrap();
    existing_user(&db, user_id)?;

    let request = queries::get_request(&db, id)?
        .ok_or_else(|| AppError::NotFound(format!("item request with id={id} not found")))?;
    to_response(&db, request).map(Json)
}
