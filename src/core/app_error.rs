use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::domain::coupon::CouponError;

/// Standard response envelope used by every handler in the service.
#[derive(Serialize, ToSchema)]
pub struct StdResponse<T, M> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T, M> IntoResponse for StdResponse<T, M>
where
    T: Serialize,
    M: Serialize,
{
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Resource not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    /// Missing/invalid required field. Recoverable, blocks the specific action.
    #[error("{0}")]
    Validation(String),

    /// Coupon rejection. Does not block checkout, only removes the discount.
    #[error(transparent)]
    CouponRejected(#[from] CouponError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    ForbiddenResource(String),

    #[error("{0} is unreachable")]
    ServiceUnreachable(String),

    /// Mostly reached through transaction plumbing; handlers that want a
    /// finer status match on the diesel error themselves first.
    #[error("Database error")]
    Database(#[from] diesel::result::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) | AppError::CouponRejected(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::ForbiddenResource(_) => StatusCode::FORBIDDEN,
            AppError::ServiceUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {:?}", self);
        }

        let body = StdResponse::<(), String> {
            data: None,
            message: Some(self.to_string()),
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aliases::DieselError;

    // `AsyncConnection::transaction` requires the closure error type to
    // absorb diesel errors; the handlers run their transactions with
    // `AppError`, so this bound has to hold.
    #[test]
    fn absorbs_diesel_errors_for_transactions() {
        fn requires<E: From<DieselError>>() {}
        requires::<AppError>();
    }

    #[test]
    fn database_errors_are_internal_and_opaque() {
        let err = AppError::from(DieselError::RollbackTransaction);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Database error");
    }
}
