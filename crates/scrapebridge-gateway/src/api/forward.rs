use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::api::error::error_response;
use crate::app_state::AppState;
use crate::context::forward_target;

/// Both fields are optional here so a missing parameter gets our own 400.
#[derive(Debug, Default, Deserialize)]
pub struct ForwardQuery {
    pub target: Option<String>,
    pub port: Option<String>,
}

pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub async fn forward(State(app): State<AppState>, Query(q): Query<ForwardQuery>) -> Response {
    let response = match forward_target(&app.cfg().bridge, q.target.as_deref(), q.port.as_deref()) {
        Err(e) => error_response(&e),
        Ok(target) => {
            tracing::debug!(channel = %target, "metrics request");
            match app.query(target).await {
                Ok(payload) => (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, METRICS_CONTENT_TYPE),
                        (header::CONNECTION, "close"),
                    ],
                    payload,
                )
                    .into_response(),
                Err(e) => error_response(&e),
            }
        }
    };
    app.record_request("forward", response.status());
    response
}
