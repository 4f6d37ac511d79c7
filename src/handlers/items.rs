use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::sharer_id;
use crate::models::{Comment, Item};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub request_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub available: Option<bool>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub text: Option<String>,
}

#[derive(Deserialize)]
pub struct NewCommentRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct ItemResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub owner_id: i64,
    pub request_id: Option<i64>,
    pub comments: Vec<CommentResponse>,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub text: String,
    pub author_name: String,
    pub created: NaiveDateTime,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        CommentResponse {
            id: c.id,
            text: c.text,
            author_name: c.author_name,
            created: c.created,
        }
    }
}

fn to_item_response(db: &Connection, item: Item) -> Result<ItemResponse, AppError> {
    let comments = queries::list_comments_by_item(db, item.id)?;
    Ok(ItemResponse {
        id: item.id,
        name: item.name,
        description: item.description,
        available: item.available,
        owner_id: item.owner_id,
        request_id: item.request_id,
        comments: comments.into_iter().map(Into::into).collect(),
    })
}

fn existing_user(db: &Connection, user_id: i64) -> Result<(), AppError> {
    queries::get_user(db, user_id)?
        .ok_or_else(|| AppError::NotFound(format!("user with id={user_id} not found")))?;
    Ok(())
}

// POST /items
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateItemRequest>,
) -> Result<Json<Item>, AppError> {
    let owner_id = sharer_id(&headers)?;

    let db = state.db.lock().unwrap();
    existing_user(&db, owner_id)?;

    if let Some(request_id) = req.request_id {
        queries::get_request(&db, request_id)?.ok_or_else(|| {
            AppError::NotFound(format!("item request with id={request_id} not found"))
        })?;
    }

    let item = queries::create_item(
        &db,
        owner_id,
        &req.name,
        &req.description,
        req.available,
        req.request_id,
    )?;
    tracing::info!("user {owner_id} listed item {}", item.id);
    Ok(Json(item))
}

// PATCH /items/:id
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<Item>, AppError> {
    let user_id = sharer_id(&headers)?;

    let db = state.db.lock().unwrap();
    let mut item = queries::get_item(&db, id)?
        .ok_or_else(|| AppError::NotFound(format!("item with id={id} not found")))?;

    if item.owner_id != user_id {
        return Err(AppError::Forbidden(
            "only the owner can update an item".into(),
        ));
    }

    if let Some(name) = req.name {
        item.name = name;
    }
    if let Some(description) = req.description {
        item.description = description;
    }
    if let Some(available) = req.available {
        item.available = available;
    }

    queries::update_item(&db, &item)?;
    Ok(Json(item))
}

// GET /items/:id
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ItemResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let item = queries::get_item(&db, id)?
        .ok_or_else(|| AppError::NotFound(format!("item with id={id} not found")))?;
    to_item_response(&db, item).map(Json)
}

// GET /items — the caller's own listings
pub async fn list_own_items(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    let owner_id = sharer_id(&headers)?;

    let db = state.db.lock().unwrap();
    let mut responses = vec![];
    for item in queries::list_items_by_owner(&db, owner_id)? {
        responses.push(to_item_response(&db, item)?);
    }
    Ok(Json(responses))
}

// GET /items/search?text=
pub async fn search_items(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Item>>, AppError> {
    let user_id = sharer_id(&headers)?;

    let db = state.db.lock().unwrap();
    existing_user(&db, user_id)?;

    let text = query.text.unwrap_or_default();
    if text.is_empty() {
        return Ok(Json(vec![]));
    }

    Ok(Json(queries::search_items(&db, &text)?))
}

// POST /items/:id/comment
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<NewCommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let user_id = sharer_id(&headers)?;

    let db = state.db.lock().unwrap();
    existing_user(&db, user_id)?;
    queries::get_item(&db, id)?
        .ok_or_else(|| AppError::NotFound(format!("item with id={id} not found")))?;

    let now = Utc::now().naive_utc();
    if !queries::has_completed_booking(&db, user_id, id, &now)? {
        return Err(AppError::Validation(
            "cannot comment without a completed booking".into(),
        ));
    }

    let comment_id = queries::create_comment(&db, id, user_id, &req.text, &now)?;
    let comment = queries::get_comment(&db, comment_id)?.ok_or_else(|| {
        AppError::Database(anyhow::anyhow!("comment {comment_id} missing after insert"))
    })?;
    tracing::info!("user {user_id} commented on item {id}");
    Ok(Json(comment.into()))
}
