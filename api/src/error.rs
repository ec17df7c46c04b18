use std::collections::HashMap;

use axum::{Json, http::StatusCode, response::IntoResponse};
use diesel_async::pooled_connection::deadpool::PoolError;
use serde::Serialize;
use serde_json::Value;

/// Errors that know which status code they should be answered with.
pub trait ApiRequestError: std::error::Error {
    fn status_code(&self) -> StatusCode;
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("could not get a database connection: {0}")]
    Pool(#[from] PoolError),
}

impl Serialize for ServerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("message", &self.to_string())?;
        map.end()
    }
}

#[derive(Debug)]
pub enum AppError {
    ServerError {
        error: ServerError,

        #[cfg(debug_assertions)]
        backtrace: Option<backtrace::Backtrace>,
    },
    Request {
        msg: String,
        status: StatusCode,
    },
    Unhandled(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,

    message: String,

    #[cfg(debug_assertions)]
    #[serde(skip_serializing_if = "Option::is_none")]
    debug_info: Option<HashMap<&'static str, Value>>,
}

fn code_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
        StatusCode::FORBIDDEN => "FORBIDDEN",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::CONFLICT => "CONFLICT",
        StatusCode::UNPROCESSABLE_ENTITY => "UNPROCESSABLE",
        _ => "ERR",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status_code, error_response) = match self {
            AppError::ServerError {
                error,
                #[cfg(debug_assertions)]
                backtrace,
            } => {
                tracing::error!(%error, "Request failed with server error");

                #[cfg(debug_assertions)]
                let debug_info = {
                    let frames_info = backtrace
                        .as_ref()
                        .map(filter_backtrace)
                        .unwrap_or_default();
                    Some(HashMap::from([
                        (
                            "backtrace",
                            serde_json::to_value(&frames_info).unwrap_or_default(),
                        ),
                        ("error", serde_json::to_value(&error).unwrap_or_default()),
                    ]))
                };

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        code: "SERVER_ERR",
                        message: "Internal server error".into(),
                        #[cfg(debug_assertions)]
                        debug_info,
                    },
                )
            }
            AppError::Request { msg, status } => (
                status,
                ErrorResponse {
                    code: code_for(status),
                    message: msg,
                    #[cfg(debug_assertions)]
                    debug_info: None,
                },
            ),
            AppError::Unhandled(e) => {
                tracing::error!(error = %e, "Unhandled error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        code: "ERR",
                        message: e,
                        #[cfg(debug_assertions)]
                        debug_info: None,
                    },
                )
            }
        };

        (status_code, Json(error_response)).into_response()
    }
}

impl From<ServerError> for AppError {
    fn from(error: ServerError) -> Self {
        AppError::ServerError {
            error,

            #[cfg(debug_assertions)]
            backtrace: Some(backtrace::Backtrace::new()),
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(e: diesel::result::Error) -> Self {
        ServerError::from(e).into()
    }
}

impl From<PoolError> for AppError {
    fn from(e: PoolError) -> Self {
        ServerError::from(e).into()
    }
}

impl From<&'static str> for AppError {
    fn from(e: &'static str) -> Self {
        AppError::Unhandled(e.into())
    }
}

impl From<String> for AppError {
    fn from(e: String) -> Self {
        AppError::Unhandled(e)
    }
}

impl From<(&'static str, StatusCode)> for AppError {
    fn from((msg, status): (&'static str, StatusCode)) -> Self {
        AppError::Request {
            msg: msg.into(),
            status,
        }
    }
}

impl From<(String, StatusCode)> for AppError {
    fn from((msg, status): (String, StatusCode)) -> Self {
        AppError::Request { msg, status }
    }
}

impl From<crate::identity::AuthenticationError> for AppError {
    fn from(e: crate::identity::AuthenticationError) -> Self {
        AppError::Request {
            msg: e.to_string(),
            status: e.status_code(),
        }
    }
}

#[derive(Serialize, Debug)]
struct FrameInfo {
    name: String,
    loc: String,
}

fn filter_backtrace(backtrace: &backtrace::Backtrace) -> Vec<FrameInfo> {
    const MODULE_PREFIX: &str = concat!(env!("CARGO_PKG_NAME"), "::");
    let mut frames_info: Vec<FrameInfo> = Vec::new();

    for frame in backtrace.frames() {
        for symbol in frame.symbols() {
            if let (Some(name), Some(filename), Some(lineno)) = (
                symbol.name().map(|n| n.to_string()),
                symbol.filename().map(|f| f.to_owned()),
                symbol.lineno(),
            ) {
                if name.contains(MODULE_PREFIX) {
                    frames_info.push(FrameInfo {
                        name,
                        loc: format!("{}:{}", filename.display(), lineno),
                    });
                }
            }
        }
    }

    frames_info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AuthenticationError;

    #[test]
    fn request_errors_keep_their_status() {
        let err: AppError = ("Invalid Subscription", StatusCode::BAD_REQUEST).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err: AppError = (String::from("nope"), StatusCode::FORBIDDEN).into();
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn database_errors_are_internal() {
        let err: AppError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, AppError::ServerError { .. }));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn authentication_errors_map_to_their_codes() {
        let err: AppError = AuthenticationError::Unauthorized.into();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);

        let err: AppError = AuthenticationError::NoCookie.into();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn unhandled_strings_are_internal() {
        let err: AppError = "missing author".into();
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn codes_follow_status() {
        assert_eq!(code_for(StatusCode::NOT_FOUND), "NOT_FOUND");
        assert_eq!(code_for(StatusCode::IM_A_TEAPOT), "ERR");
    }
}
