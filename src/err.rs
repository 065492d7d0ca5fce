#![allow(non_snake_case)]

use axum::http::StatusCode;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::Serialize;

pub const MAINTENANCE_MESSAGE: &str = "Our server is under maintenance. Please try again later!";

pub async fn handler404(path: Uri) -> (StatusCode, Json<Error>) {
    (
        StatusCode::NOT_FOUND,
        Json(Error::NotFound {
            message: format!("Invalid path: {}", path),
        }),
    )
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Maybe<T> {
    Nothing(Error),
    Fine(Success<T>),
}

pub fn Fine<V>(v: V) -> Maybe<V>
where
    V: Serialize,
{
    Maybe::Fine(Success::of(v))
}

pub fn Nothing<V>(err: Error) -> Maybe<V> {
    Maybe::Nothing(err)
}

#[derive(Debug, Clone, Serialize)]
pub struct Success<V> {
    success: bool,
    #[serde(flatten)]
    value: V,
}

impl<T> IntoResponse for Maybe<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match self {
            Maybe::Nothing(err) => Json::into_response(Json(err)),
            Maybe::Fine(success) => Json::into_response(Json(success)),
        }
    }
}

impl<V: Serialize> Success<V> {
    pub fn of(value: V) -> Self {
        Self {
            success: true,
            value,
        }
    }
}

/// Request-scoped failure taxonomy. `Validation` and `NotFound` are recovered
/// into user-facing messages at the handler boundary, `Unavailable` becomes
/// the generic maintenance message, everything else is a 5xx.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "error")]
pub enum Error {
    NotFound { message: String },
    Validation { message: String },
    InvalidPayload { message: String },
    UnknownProgram { message: String },
    MissingCredentials { message: String },
    AdminDoesNotExist { message: String },
    AuthenticationFailure { message: String },
    Unavailable { message: String },
    InternalError { kind: &'static str, message: String },
    Unknown { message: String },
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl Error {
    pub fn unknown<S: Into<String>>(msg: S) -> Error {
        Error::Unknown {
            message: msg.into(),
        }
    }

    pub fn unavailable() -> Error {
        Error::Unavailable {
            message: MAINTENANCE_MESSAGE.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            Error::UnknownProgram { .. } => StatusCode::CONFLICT,
            Error::MissingCredentials { .. } => StatusCode::BAD_REQUEST,
            Error::AdminDoesNotExist { .. } => StatusCode::NOT_FOUND,
            Error::AuthenticationFailure { .. } => StatusCode::UNAUTHORIZED,
            Error::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Unknown { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound {
                message: "Requested row was not found!".to_string(),
            },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => {
                log::error!("Storage unavailable: {}", err);
                Error::unavailable()
            }
            other => {
                log::error!("Database failure: {}", other);
                Error::InternalError {
                    kind: "DatabaseError",
                    message: other.to_string(),
                }
            }
        }
    }
}

impl From<pbkdf2::password_hash::Error> for Error {
    fn from(err: pbkdf2::password_hash::Error) -> Self {
        Self::InternalError {
            kind: "PasswordHashError",
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Unknown {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Sample {
        value: i32,
    }

    #[test]
    fn success_envelope_flattens_value() {
        let json = serde_json::to_value(Fine(Sample { value: 7 })).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["value"], 7);
    }

    #[test]
    fn error_envelope_is_tagged() {
        let json = serde_json::to_value(Nothing::<Sample>(Error::NotFound {
            message: "gone".to_string(),
        }))
        .unwrap();
        assert_eq!(json["error"], "NotFound");
        assert_eq!(json["message"], "gone");
        assert!(json.get("success").is_none());
    }

    #[test]
    fn row_not_found_is_not_found() {
        let err = Error::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn io_failure_is_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::from(sqlx::Error::Io(io));
        match err {
            Error::Unavailable { message } => assert_eq!(message, MAINTENANCE_MESSAGE),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[test]
    fn pool_timeout_is_unavailable() {
        let err = Error::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, Error::Unavailable { .. }));
    }

    #[test]
    fn status_mapping() {
        let not_found = Error::NotFound {
            message: String::new(),
        };
        let bad_action = Error::InvalidPayload {
            message: String::new(),
        };
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(bad_action.status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::unavailable().status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            Error::UnknownProgram {
                message: String::new()
            }
            .status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn error_response_carries_status() {
        let response = Error::unavailable().into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
