use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("No wallet address on file")]
    NoWallet,

    #[error("Unpaid tips total {total} is below the minimum payout of {minimum}")]
    BelowMinimum { total: f64, minimum: f64 },

    #[error("{service} error: {message}")]
    Upstream { service: &'static str, message: String },

    /// Funds moved at the gateway but the ledger write failed. Must never be
    /// retried automatically and must never be swallowed.
    #[error("Reconciliation required for gateway payment {payment_id}: {message}")]
    Reconciliation { payment_id: String, message: String },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NoWallet => StatusCode::BAD_REQUEST,
            AppError::BelowMinimum { .. } => StatusCode::BAD_REQUEST,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Reconciliation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Reconciliation { payment_id, message } = self {
            tracing::error!(
                payment_id = %payment_id,
                "RECONCILIATION REQUIRED: gateway payment succeeded but ledger write failed: {}",
                message
            );
        }

        let status = self.status_code();
        HttpResponse::build(status).json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }))
    }
}

impl AppError {
    /// Maps a unique-constraint violation to `Conflict`, leaving every other
    /// database failure untouched. The constraint is the source of truth for
    /// duplicate detection; callers insert first and interpret the rejection.
    pub fn conflict_on_unique(err: sqlx::Error, conflict_msg: &str) -> AppError {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(conflict_msg.to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rejections_map_to_meaningful_status_codes() {
        assert_eq!(
            AppError::Validation("missing field".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict("already flagged".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::NotFound("podcast 7".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::NoWallet.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::BelowMinimum { total: 1.5, minimum: 3.0 }.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn upstream_and_reconciliation_are_distinct_server_side_failures() {
        let upstream = AppError::Upstream {
            service: "pi-gateway",
            message: "approve returned 500".into(),
        };
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);

        let reconciliation = AppError::Reconciliation {
            payment_id: "pay_123".into(),
            message: "tips update failed".into(),
        };
        assert_eq!(
            reconciliation.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
