use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use draw_core::DrawError;

/// HTTP face of a [`DrawError`].
#[derive(Debug)]
pub struct ApiError(pub DrawError);

impl From<DrawError> for ApiError {
    fn from(err: DrawError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        let err = &self.0;
        if err.is_validation() {
            return StatusCode::BAD_REQUEST;
        }
        if err.is_capacity() {
            return match err {
                DrawError::StoreFull => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::FORBIDDEN,
            };
        }
        match err {
            DrawError::NotFound => StatusCode::NOT_FOUND,
            DrawError::AlreadyDrawn => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.0.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_errors_are_distinct_from_not_found() {
        assert_eq!(ApiError(DrawError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError(DrawError::EventFull).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError(DrawError::StoreFull).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let err = ApiError(DrawError::TooLong {
            field: "wish",
            max: 500,
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError(DrawError::ExpectedOutOfRange(2)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(DrawError::InsufficientParticipants(2)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(DrawError::AlreadyDrawn).status(),
            StatusCode::CONFLICT
        );
    }
}
