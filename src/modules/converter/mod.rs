use axum::Router;
use axum::routing::{delete, get, post};
use crate::state::AppState;

pub mod controller;
pub mod dto;
pub mod error;
pub mod handler;
pub mod model;
pub mod service;
pub mod session;

#[cfg(test)]
pub mod testing;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(handler::upload_video))
        .route("/start", post(handler::start_conversion))
        .route("/status", get(handler::get_status))
        .route("/download", get(handler::download_video))
        .route("/preview", get(handler::preview_upload))
        .route("/formats", get(handler::list_formats))
        .route("/session", delete(handler::end_session))
}
