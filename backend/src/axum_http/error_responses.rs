use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::usecases::{
    checkout::CheckoutError, refunds::RefundError, subscription_sync::SyncError,
    subscriptions::SubscriptionError,
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(_) => {
                // Don't leak internal error detail to client
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::InvalidWebhook(_) => AppError::BadRequest(err.to_string()),
            SyncError::SubscriptionNotFound => AppError::NotFound(err.to_string()),
            SyncError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::InvalidPrice(_) | CheckoutError::MissingEmail => {
                AppError::BadRequest(err.to_string())
            }
            CheckoutError::DivisionNotFound | CheckoutError::CustomerNotFound => {
                AppError::NotFound(err.to_string())
            }
            CheckoutError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

impl From<SubscriptionError> for AppError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::SubscriptionNotFound => AppError::NotFound(err.to_string()),
            SubscriptionError::InvalidState(_) => AppError::Conflict(err.to_string()),
            SubscriptionError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

impl From<RefundError> for AppError {
    fn from(err: RefundError) -> Self {
        match err {
            RefundError::NotFound(_) => AppError::NotFound(err.to_string()),
            RefundError::WindowExpired => AppError::BadRequest(err.to_string()),
            RefundError::NotRefundable(_) => AppError::Conflict(err.to_string()),
            RefundError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn use_case_errors_keep_their_status() {
        let cases: Vec<(AppError, StatusCode)> = vec![
            (
                SyncError::InvalidWebhook("bad".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (CheckoutError::DivisionNotFound.into(), StatusCode::NOT_FOUND),
            (
                SubscriptionError::InvalidState("canceled".into()).into(),
                StatusCode::CONFLICT,
            ),
            (CheckoutError::CustomerNotFound.into(), StatusCode::NOT_FOUND),
            (RefundError::WindowExpired.into(), StatusCode::BAD_REQUEST),
            (
                RefundError::NotRefundable("subscription already ended".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                RefundError::Internal(anyhow!("db down")).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
