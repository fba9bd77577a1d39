use axum::{
    extract::rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kanban_core::KanbanError;
use serde::Serialize;

/// Wire form of every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub message: String,
    pub status_code: u16,
}

/// Boundary wrapper that renders a [`KanbanError`] as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub KanbanError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<KanbanError> for ApiError {
    fn from(err: KanbanError) -> Self {
        Self(err)
    }
}

macro_rules! bad_request_from {
    ($($rejection:ty),+) => {
        $(impl From<$rejection> for ApiError {
            fn from(rejection: $rejection) -> Self {
                Self(KanbanError::BadRequest(rejection.body_text()))
            }
        })+
    };
}

bad_request_from!(JsonRejection, PathRejection, QueryRejection, BytesRejection);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.0.status_code();
        let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if self.0.is_client_error() {
            tracing::debug!(status = status_code, error = %self.0, "request rejected");
            self.0.to_string()
        } else {
            tracing::error!(error = %self.0, "request failed");
            "internal server error".to_string()
        };

        (
            status,
            Json(ErrorEnvelope {
                message,
                status_code,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: KanbanError) -> (StatusCode, serde_json::Value) {
        let response = ApiError(err).into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_client_errors_keep_their_message() {
        let (status, body) = render(KanbanError::Forbidden("not a member".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status_code"], 403);
        assert_eq!(body["message"], "Forbidden: not a member");
    }

    #[tokio::test]
    async fn test_internal_errors_are_masked() {
        let (status, body) = render(KanbanError::Internal("disk on fire".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status_code"], 500);
        assert_eq!(body["message"], "internal server error");
    }
}
