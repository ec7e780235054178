//! Scrape-facing HTTP handlers.
//!
//! - `/forward?target=<vm>&port=<port>` : raw exporter payload
//! - `/discover`                        : file_sd style target listing

pub mod discover;
pub mod error;
pub mod forward;
pub mod limits;

use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}};

use crate::app_state::AppState;

pub async fn not_found(State(app): State<AppState>) -> Response {
    let response = (
        StatusCode::NOT_FOUND,
        "the only valid URIs in this service are /forward and /discover\n",
    )
        .into_response();
    app.record_request("unknown", response.status());
    response
}
