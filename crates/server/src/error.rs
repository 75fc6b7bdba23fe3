//! Unified error handling.
//!
//! Pages return [`AppError`], which renders a plain status page. JSON actions
//! return [`ActionError`], which always answers with an `ActionResult` body so
//! the browser script can show the message.

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use hire_purchase_core::ActionResult;
use hire_purchase_core::ledger::PaymentRuleError;
use hire_purchase_core::pricing::PricingError;

use crate::db::RepositoryError;
use crate::services::{AuthError, ServiceError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A payment rule was violated.
    #[error(transparent)]
    Rule(#[from] PaymentRuleError),

    /// Purchase terms could not be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(e) => match e {
                AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials
                | AuthError::TokenExpired
                | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::NoMembership(_) => StatusCode::FORBIDDEN,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenCreation => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Rule(PaymentRuleError::AlreadyConfirmed | PaymentRuleError::AlreadyRejected) => {
                StatusCode::CONFLICT
            }
            Self::Rule(_) | Self::Pricing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to the user.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            return "Internal server error".to_string();
        }
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => capitalize(msg),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }

    /// Log the error: server errors go to Sentry, the rest are warnings.
    fn report(&self, context: &'static str) {
        if self.status().is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "{context}"
            );
        } else {
            tracing::warn!(error = %self, status = %self.status(), "{context}");
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Repository(e) => Self::Database(e),
            ServiceError::Rule(e) => Self::Rule(e),
            ServiceError::Pricing(e) => Self::Pricing(e),
            ServiceError::Schedule(e) => Self::BadRequest(e.to_string()),
            ServiceError::Auth(e) => Self::Auth(e),
            ServiceError::NotFound(what) => Self::NotFound(capitalize(what)),
            ServiceError::Forbidden(msg) => Self::Forbidden(msg),
            ServiceError::Validation(msg) => Self::BadRequest(msg),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report("Request error");
        (self.status(), self.public_message()).into_response()
    }
}

// =============================================================================
// Actions
// =============================================================================

/// Error answer of a JSON action: `{"success": false, "error": "..."}`.
#[derive(Debug)]
pub struct ActionError {
    pub status: StatusCode,
    pub message: String,
}

impl ActionError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<AppError> for ActionError {
    fn from(e: AppError) -> Self {
        e.report("Action failed");
        Self {
            status: e.status(),
            message: e.public_message(),
        }
    }
}

impl From<ServiceError> for ActionError {
    fn from(e: ServiceError) -> Self {
        AppError::from(e).into()
    }
}

impl From<RepositoryError> for ActionError {
    fn from(e: RepositoryError) -> Self {
        AppError::from(e).into()
    }
}

impl From<JsonRejection> for ActionError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!(error = %rejection.body_text(), "Rejected action body");
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        (self.status, Json(ActionResult::<()>::err(self.message))).into_response()
    }
}

/// JSON body extractor whose rejection is an `ActionResult`.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ActionError))]
pub struct ActionJson<T>(pub T);

/// Result type of JSON action handlers.
pub type ActionResponse<T = ()> = Result<Json<ActionResult<T>>, ActionError>;

/// Set the Sentry user context for the signed-in user.
pub fn set_sentry_user(user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hire_purchase_core::Money;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("purchase HP-1".to_string());
        assert_eq!(err.to_string(), "Not found: purchase HP-1");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Rule(PaymentRuleError::AlreadyConfirmed)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption("bad row 7".to_string()));
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::Auth(AuthError::TokenCreation);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_rule_messages_are_shown() {
        let err = AppError::Rule(PaymentRuleError::ExceedsOutstanding {
            amount: Money::from_major(1200),
            outstanding: Money::from_major(1000),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.public_message(),
            "payment of 1200.00 exceeds the outstanding balance of 1000.00"
        );
    }

    #[test]
    fn test_service_errors_map_to_statuses() {
        let err = AppError::from(ServiceError::NotFound("customer"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "Customer not found");

        let err = AppError::from(ServiceError::Forbidden("not yours".to_string()));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.public_message(), "not yours");
    }

    #[tokio::test]
    async fn test_action_error_body() {
        let response = ActionError::bad_request("amount is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "error": "amount is required" })
        );
    }
}
