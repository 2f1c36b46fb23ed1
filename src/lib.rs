//! Icebreaker: phones join a party game, draw cards and get paired; a shared screen shows
//! it all live over WebSockets.

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod game;
pub mod http;
pub mod telemetry;
pub mod util;
pub mod ws;

use crate::http::routes::{self, AppState};

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let origins = state
        .config
        .allowed_origins()
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok());

    Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/qr", get(routes::qr))
        .route("/start-pairing", get(routes::start_pairing))
        .route("/reset", get(routes::reset))
        .route("/simulate-all-confirmed", get(routes::simulate_all_confirmed))
        .route("/ws", get(ws::connection::ws_handler))
        // client pages
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/mobile", ServeFile::new(static_dir.join("mobile.html")))
        .route_service("/admin", ServeFile::new(static_dir.join("admin.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
                .allow_origin(AllowOrigin::list(origins)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
