use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

/// Approximate on-wire size of the request line and header block.
pub fn header_bytes(req: &Request) -> usize {
    let line = req.method().as_str().len() + req.uri().to_string().len() + "  HTTP/1.1\r\n".len();
    let headers: usize = req
        .headers()
        .iter()
        .map(|(name, value)| name.as_str().len() + value.len() + ": \r\n".len())
        .sum();
    line + headers
}

/// Reject oversized request heads with 431 before any handler runs.
pub async fn limit_header_bytes(State(app): State<AppState>, req: Request, next: Next) -> Response {
    let size = header_bytes(&req);
    let max = app.cfg().gateway.max_header_bytes;
    if size <= max {
        return next.run(req).await;
    }

    tracing::debug!(size, max, "request header too large");
    let response = (
        StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
        [(header::CONNECTION, "close")],
        "request header too large\n",
    )
        .into_response();
    app.record_request("rejected", response.status());
    response
}
