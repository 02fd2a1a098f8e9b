use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::repository::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => {
                tracing::debug!("Not found: {}", what);
                AppError::NotFound
            }
            RepositoryError::InvalidInput(msg) => AppError::BadRequest(msg),
            RepositoryError::InvalidVoteValue(_) => {
                AppError::BadRequest("invalid vote value".to_string())
            }
            RepositoryError::AlreadyExists(_) => AppError::Conflict(err.to_string()),
            RepositoryError::InvalidCredentials => AppError::Unauthorized,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Multipart(e) => (e.status(), e.body_text()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn response_status(err: AppError) -> StatusCode {
        let response = err.into_response();
        response.status()
    }

    fn repo_status(err: RepositoryError) -> StatusCode {
        response_status(err.into())
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(response_status(AppError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            repo_status(RepositoryError::NotFound("post 7".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn unauthorized_returns_401() {
        assert_eq!(
            response_status(AppError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            repo_status(RepositoryError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn bad_input_returns_400() {
        assert_eq!(
            repo_status(RepositoryError::InvalidInput("oops".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            repo_status(RepositoryError::InvalidVoteValue("2".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn taken_names_return_409() {
        let err: AppError = RepositoryError::AlreadyExists("email".into()).into();
        assert!(matches!(&err, AppError::Conflict(msg) if msg == "email is already taken"));
        assert_eq!(response_status(err), StatusCode::CONFLICT);
    }

    #[test]
    fn storage_and_invariant_failures_return_500() {
        assert_eq!(
            repo_status(RepositoryError::Sql(rusqlite::Error::QueryReturnedNoRows)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            repo_status(RepositoryError::Conflict("stored vote 3".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            response_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn internal_detail_is_not_exposed() {
        let response = AppError::Internal("disk I/O error at /var/db".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Internal server error");
    }
}
