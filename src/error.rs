use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Crate-wide error type.
///
/// Backend failures are never converted into empty result sets; every
/// handler and store operation propagates this type so the caller can tell
/// "no data" apart from "read failed".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Google authentication failed: {0}")]
    Auth(String),

    #[error("Spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No record with id {0}")]
    RecordNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify a non-success Sheets API response by HTTP status.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Error::Auth(message),
            404 => Error::SpreadsheetNotFound(message),
            _ => Error::Api { status, message },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::RecordNotFound(_) => StatusCode::NOT_FOUND,
            Error::Auth(_)
            | Error::SpreadsheetNotFound(_)
            | Error::Api { .. }
            | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
