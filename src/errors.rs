//! Errors for AIS monitor
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Missing required parameters: {}", .0.join(", "))]
    MissingParameter(Vec<&'static str>),

    #[error("Invalid polygon: {0}")]
    InvalidGeometry(String),

    #[error("Invalid date range: {0}")]
    InvalidTimeRange(String),

    #[error("Invalid MMSI")]
    InvalidMmsi(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Database migration error")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Serialization error")]
    SerdeError(#[from] serde_json::Error),

    #[error("IO error")]
    IoError(#[from] std::io::Error),
}

impl MonitorError {
    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter(_)
                | Self::InvalidGeometry(_)
                | Self::InvalidTimeRange(_)
                | Self::InvalidMmsi(_)
        )
    }

    fn status(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        // Backend failures carry the underlying cause for operators
        match &self {
            Self::DatabaseError(e) => body["details"] = e.to_string().into(),
            Self::MigrationError(e) => body["details"] = e.to_string().into(),
            _ => {}
        }

        (status, axum::Json(body)).into_response()
    }
}
