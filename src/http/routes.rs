//! HTTP routes: client pages, QR code, health and the admin triggers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use parking_lot::Mutex;
use qrcode::render::svg;
use qrcode::QrCode;
use serde::Serialize;

use crate::config::Config;
use crate::game::Session;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<Session>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, session: Session) -> Self {
        Self { session: Arc::new(Mutex::new(session)), config: Arc::new(config) }
    }
}

fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

pub async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
pub struct QrResponse {
    pub mobile_url: String,
    pub qr_code_svg: String,
}

pub async fn qr(State(state): State<AppState>) -> Result<Json<QrResponse>, (StatusCode, String)> {
    let mobile_url = state.config.mobile_url();
    tracing::debug!(%mobile_url, "generating qr code");
    let code = QrCode::new(mobile_url.as_bytes()).map_err(|err| {
        tracing::error!(%err, "qr code generation failed");
        internal_error(err)
    })?;
    let qr_code_svg = code.render::<svg::Color>().min_dimensions(240, 240).build();
    Ok(Json(QrResponse { mobile_url, qr_code_svg }))
}

// The admin triggers are plain GETs with no authentication.

pub async fn start_pairing(State(state): State<AppState>) -> impl IntoResponse {
    tracing::warn!(endpoint = "start-pairing", "unauthenticated admin request");
    let outcome = state.session.lock().start_pairing(&mut rand::thread_rng());
    match outcome {
        Ok(groups) => (StatusCode::OK, format!("Pairing and reveal started: {} groups.", groups)).into_response(),
        Err(err) => (StatusCode::CONFLICT, err.to_string()).into_response(),
    }
}

pub async fn reset(State(state): State<AppState>) -> impl IntoResponse {
    tracing::warn!(endpoint = "reset", "unauthenticated admin request");
    state.session.lock().reset();
    "Game reset. All participants and cards reset, clients notified."
}

pub async fn simulate_all_confirmed(State(state): State<AppState>) -> impl IntoResponse {
    tracing::warn!(endpoint = "simulate-all-confirmed", "unauthenticated admin request");
    let report = state.session.lock().simulate_all_confirmed();
    format!(
        "Simulation complete. Confirmed {} participants, assigned {} cards, {} left unconfirmed.",
        report.confirmed, report.cards_assigned, report.left_unconfirmed
    )
}
