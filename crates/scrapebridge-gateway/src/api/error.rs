use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use scrapebridge_core::error::{BridgeError, ClientCode};

pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::BadRequest => StatusCode::BAD_REQUEST,
        ClientCode::Refused => StatusCode::FORBIDDEN,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Plain-text error body: the error message and a newline.
pub fn error_response(e: &BridgeError) -> Response {
    (
        status_for(e.client_code()),
        [(header::CONNECTION, "close")],
        format!("{e}\n"),
    )
        .into_response()
}
