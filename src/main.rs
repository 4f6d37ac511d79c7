use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use shareit::config::AppConfig;
use shareit::db;
use shareit::db::store::SqliteStore;
use shareit::handlers;
use shareit::services::BookingEngine;
use shareit::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let db = Arc::new(Mutex::new(conn));

    let store = Arc::new(SqliteStore::new(Arc::clone(&db)));
    let bookings = BookingEngine::new(store.clone(), store.clone(), store);

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        bookings,
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/users", post(handlers::users::create_user))
        .route("/users", get(handlers::users::list_users))
        .route("/users/:id", get(handlers::users::get_user))
        .route("/users/:id", patch(handlers::users::update_user))
        .route("/users/:id", delete(handlers::users::delete_user))
        .route("/items", post(handlers::items::create_item))
        .route("/items", get(handlers::items::list_own_items))
        .route("/items/search", get(handlers::items::search_items))
        .route("/items/:id", get(handlers::items::get_item))
        .route("/items/:id", patch(handlers::items::update_item))
        .route("/items/:id/comment", post(handlers::items::create_comment))
        .route("/requests", post(handlers::requests::create_request))
        .route("/requests", get(handlers::requests::list_own_requests))
        .route("/requests/all", get(handlers::requests::list_other_requests))
        .route("/requests/:id", get(handlers::requests::get_request))
        .route("/bookings", post(handlers::bookings::create_booking))
        .route("/bookings", get(handlers::bookings::list_bookings_as_booker))
        .route(
            "/bookings/owner",
            get(handlers::bookings::list_bookings_as_owner),
        )
        .route("/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/bookings/:id",
            patch(handlers::bookings::update_booking_status),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
