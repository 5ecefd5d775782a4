//! Error types for TuneDeck
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// OAuth callback arrived without an authorization code (400)
    #[error("No authorization code provided")]
    NoCodeProvided,

    /// Authorization code exchange with the identity provider failed (401)
    #[error("Authorization code exchange failed")]
    Exchange(String),

    /// Fetching the user profile from the identity provider failed (502)
    #[error("Profile fetch failed")]
    ProfileFetch(String),

    /// The identity provider did not return an email address (401)
    #[error("Identity provider returned no email address")]
    MissingEmail,

    /// Registration with an email that already has an account (400)
    #[error("An account with this email already exists")]
    DuplicateEmail,

    /// Password mismatch or unknown email; deliberately indistinguishable (401)
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No session cookie on a restricted request (401)
    #[error("Authentication required")]
    TokenMissing,

    /// Session cookie present but expired, malformed, or wrongly signed (401)
    #[error("Invalid session token")]
    TokenInvalid(String),

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500, fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Short machine-readable code for this error.
    ///
    /// Used as the `error` query parameter on browser redirects, in JSON
    /// error bodies, and as the metrics label, so the three stay consistent.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "NotFound",
            AppError::NoCodeProvided => "NoCodeProvided",
            AppError::Exchange(_) => "ExchangeError",
            AppError::ProfileFetch(_) => "ProfileFetchError",
            AppError::MissingEmail => "MissingEmailError",
            AppError::DuplicateEmail => "DuplicateEmailError",
            AppError::InvalidCredentials => "InvalidCredentials",
            AppError::TokenMissing => "TokenMissing",
            AppError::TokenInvalid(_) => "TokenInvalid",
            AppError::Validation(_) => "ValidationError",
            AppError::Database(_) => "DatabaseError",
            AppError::HttpClient(_) => "HttpClientError",
            AppError::Config(_) => "ConfigError",
            AppError::Internal(_) => "InternalError",
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body. Provider error bodies and database detail
    /// are logged server-side and never echoed to the client.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::NoCodeProvided => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Exchange(detail) => {
                tracing::warn!(%detail, "OAuth code exchange failed");
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::ProfileFetch(detail) => {
                tracing::warn!(%detail, "Provider profile fetch failed");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::MissingEmail => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::DuplicateEmail => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::TokenMissing => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::TokenInvalid(reason) => {
                tracing::debug!(%reason, "Session token rejected");
                (StatusCode::UNAUTHORIZED, "Invalid session token".to_string())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Database(error) => {
                tracing::error!(%error, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::HttpClient(error) => {
                tracing::warn!(%error, "Upstream HTTP request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Upstream request failed".to_string(),
                )
            }
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Internal(error) => {
                tracing::error!(%error, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.code()]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
