//! Success envelope shared by every route.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use carefund_shared::types::{PageMeta, PageResponse};

/// `{ "success": true, "message", "data", "pagination"? }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// Always true for this type.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Payload.
    pub data: T,
    /// Present on list responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageMeta>,
}

fn respond<T: Serialize>(
    status: StatusCode,
    message: impl Into<String>,
    data: T,
    pagination: Option<PageMeta>,
) -> Response {
    (
        status,
        Json(Envelope {
            success: true,
            message: message.into(),
            data,
            pagination,
        }),
    )
        .into_response()
}

/// 200 with `data`.
pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    respond(StatusCode::OK, message, data, None)
}

/// 201 with the created resource.
pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    respond(StatusCode::CREATED, message, data, None)
}

/// 200 with one page of items and its pagination block.
pub fn page<T: Serialize>(message: impl Into<String>, page: PageResponse<T>) -> Response {
    respond(StatusCode::OK, message, page.data, Some(page.meta))
}
