use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::JsonResponse;

pub const NOT_OWNER_MESSAGE: &str = "You are not authorized to perform this action";

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    NotAuthorized(&'static str),
    #[error("You are not authorized to perform this action")]
    Forbidden,
    /// The request body, path or query could not be parsed.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("internal server error")]
    ServerError,
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Error body. Validation failures carry a list, everything else a single message.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum RequestErrorJson {
    Single { error: String },
    Many { errors: Vec<String> },
}

impl RequestErrorJson {
    pub fn new(error: &str) -> RequestErrorJson {
        RequestErrorJson::Single {
            error: error.to_string(),
        }
    }
}

impl From<JsonRejection> for RequestError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for RequestError {
    fn from(rejection: PathRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for RequestError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        self.to_json_response().into_response()
    }
}

impl RequestError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    /// True when the underlying database error is a UNIQUE constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            RequestError::DatabaseError(sqlx::Error::Database(e)) => {
                e.message().contains("UNIQUE constraint failed")
            }
            _ => false,
        }
    }

    pub fn to_json_response(&self) -> JsonResponse<RequestErrorJson> {
        let (status_code, json) = match self {
            RequestError::NotFound(message) => {
                (StatusCode::NOT_FOUND, RequestErrorJson::new(message))
            }
            RequestError::NotAuthorized(message) => {
                (StatusCode::UNAUTHORIZED, RequestErrorJson::new(message))
            }
            RequestError::Forbidden => (
                StatusCode::FORBIDDEN,
                RequestErrorJson::new(NOT_OWNER_MESSAGE),
            ),
            RequestError::Rejected { status, message } => {
                tracing::debug!(%status, reason = %message, "Rejected request");
                (*status, RequestErrorJson::new(message))
            }
            RequestError::Validation(messages) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                RequestErrorJson::Many {
                    errors: messages.clone(),
                },
            ),
            RequestError::ServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                RequestErrorJson::new("Internal Server Error"),
            ),
            RequestError::DatabaseError(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    RequestErrorJson::new("Internal Server Error"),
                )
            }
            RequestError::Internal(e) => {
                tracing::error!(error = ?e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    RequestErrorJson::new("Internal Server Error"),
                )
            }
        };
        (status_code, Json(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_render_as_a_list() {
        let (status, Json(body)) =
            RequestError::validation("Title can't be blank").to_json_response();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value, serde_json::json!({ "errors": ["Title can't be blank"] }));
    }

    #[test]
    fn forbidden_uses_single_error_message() {
        let (status, Json(body)) = RequestError::Forbidden.to_json_response();
        assert_eq!(status, StatusCode::FORBIDDEN);
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value, serde_json::json!({ "error": NOT_OWNER_MESSAGE }));
    }

    #[test]
    fn not_found_keeps_message() {
        let (status, Json(body)) = RequestError::NotFound("Post not found").to_json_response();
        assert_eq!(status, StatusCode::NOT_FOUND);
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value["error"], "Post not found");
    }

    #[test]
    fn rejection_keeps_status_and_renders_json() {
        let error = RequestError::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: "Failed to parse the request body as JSON".to_owned(),
        };
        let (status, Json(body)) = error.to_json_response();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "error": "Failed to parse the request body as JSON" })
        );
    }
}
