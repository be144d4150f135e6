use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use customer_api_core::{ServiceError, StatusClass, Translation};
use tracing::{error, warn};

/// Boundary error for customer handlers. Every failure is translated into a
/// failure envelope exactly once, here.
#[derive(Debug)]
pub struct AppError(ServiceError);

impl From<ServiceError> for AppError {
    fn from(error: ServiceError) -> Self {
        Self(error)
    }
}

pub fn status_code(status: StatusClass) -> StatusCode {
    match status {
        StatusClass::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        StatusClass::InvalidInput => StatusCode::BAD_REQUEST,
        StatusClass::MissingResource => StatusCode::NOT_FOUND,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let translation = Translation::from_error(&self.0);
        let status = status_code(translation.status);
        let message = translation.message().unwrap_or_default();

        match translation.status {
            StatusClass::InternalError => error!(
                event_name = "http.customer.internal_error",
                status = status.as_u16(),
                error = %message,
                "customer request failed"
            ),
            StatusClass::InvalidInput | StatusClass::MissingResource => warn!(
                event_name = "http.customer.rejected",
                status = status.as_u16(),
                error = %message,
                "customer request rejected"
            ),
        }

        (status, Json(translation.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use axum::{http::StatusCode, response::IntoResponse};
    use customer_api_core::{ApiError, ServiceError, StoreError};

    use super::AppError;

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn recognized_errors_keep_their_status_and_message() {
        let (status, body) =
            body_json(ServiceError::from(ApiError::bad_request("bad input")).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"status": "failure", "message": "bad input"}));

        let (status, _) =
            body_json(ServiceError::from(ApiError::no_result_found("gone")).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            body_json(ServiceError::from(ApiError::Generic("oops".to_string())).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn store_failures_surface_raw_message_as_internal_error() {
        let store = StoreError::new(io::Error::new(io::ErrorKind::Other, "disk on fire"));

        let (status, body) = body_json(ServiceError::from(store).into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "disk on fire");
        assert_eq!(body["status"], "failure");
    }
}
