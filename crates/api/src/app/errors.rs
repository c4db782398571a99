use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::json;

use orderflow_core::DomainError;
use orderflow_infra::{Receipt, StoreError, WorkflowError};

pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    match err {
        WorkflowError::Domain(e) => domain_error_to_response(e),
        WorkflowError::Store(StoreError::NotFound { .. }) => {
            json_error(StatusCode::NOT_FOUND, "not_found", "not found")
        }
        WorkflowError::Store(e @ (StoreError::Duplicate { .. } | StoreError::DuplicateNumber { .. })) => {
            json_error(StatusCode::CONFLICT, e.code(), e.to_string())
        }
        WorkflowError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.code(), e.to_string())
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = match &err {
        DomainError::Unauthorized => StatusCode::UNAUTHORIZED,
        DomainError::NotFound => StatusCode::NOT_FOUND,
        DomainError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
        DomainError::Validation(_) | DomainError::InvalidId(_) => StatusCode::BAD_REQUEST,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
    };
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// `201 {success, id, number?}` for a created record.
pub fn created(receipt: Receipt) -> axum::response::Response {
    let mut body = json!({ "success": true, "id": receipt.id });
    if let Some(number) = receipt.number {
        body["number"] = json!(number);
    }
    (StatusCode::CREATED, axum::Json(body)).into_response()
}

/// `200 {success, data}`.
pub fn ok<T: Serialize>(data: T) -> axum::response::Response {
    (
        StatusCode::OK,
        axum::Json(json!({ "success": true, "data": data })),
    )
        .into_response()
}

/// Map a workflow result to `ok` or the matching error response.
pub fn respond<T: Serialize>(result: Result<T, WorkflowError>) -> axum::response::Response {
    match result {
        Ok(data) => ok(data),
        Err(e) => workflow_error_to_response(e),
    }
}
