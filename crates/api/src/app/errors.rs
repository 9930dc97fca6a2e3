use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use videopalace_core::DomainError;
use videopalace_infra::{CatalogWriteError, StoreError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidArgument(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_argument", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::InvalidArgument(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_argument", msg),
        other => {
            tracing::error!(error = %other, "store operation failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", other.to_string())
        }
    }
}

pub fn catalog_write_error_to_response(err: CatalogWriteError) -> axum::response::Response {
    match err {
        CatalogWriteError::Validation(e) => domain_error_to_response(e),
        CatalogWriteError::Store(e) => store_error_to_response(e),
        CatalogWriteError::Synchronization { item, source } => (
            StatusCode::BAD_GATEWAY,
            axum::Json(json!({
                "error": "synchronization_failed",
                "message": source.to_string(),
                "itemId": item.id,
            })),
        )
            .into_response(),
    }
}

pub fn not_found() -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", "not found")
}
