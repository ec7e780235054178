use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use scrapebridge_core::error::{BridgeError, Result};

use crate::api::error::error_response;
use crate::app_state::AppState;
use crate::context::discovery_target;

/// One target group in Prometheus `http_sd` / `file_sd` shape.
#[derive(Debug, Serialize)]
pub struct TargetGroup {
    pub targets: Vec<String>,
}

/// Newline-delimited VM listing -> names, blank lines dropped.
pub fn parse_listing(payload: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(payload)
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(str::to_owned)
        .collect()
}

pub fn render_groups(payload: &[u8]) -> Result<Vec<u8>> {
    let groups = [TargetGroup {
        targets: parse_listing(payload),
    }];
    serde_json::to_vec(&groups)
        .map_err(|e| BridgeError::Internal(format!("discovery json encode failed: {e}")))
}

pub async fn discover(State(app): State<AppState>) -> Response {
    let target = discovery_target(&app.cfg().bridge);
    let response = match app.query(target).await.and_then(|payload| render_groups(&payload)) {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::CONNECTION, "close"),
            ],
            body,
        )
            .into_response(),
        Err(e) => error_response(&e),
    };
    app.record_request("discover", response.status());
    response
}
