use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("{0}")]
    Decode(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Date service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => PipelineError::UnsupportedFormat(e.to_string()),
            image::ImageError::IoError(e) => PipelineError::Io(e),
            other => PipelineError::Decode(other.to_string()),
        }
    }
}

impl ResponseError for PipelineError {
    fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::UnsupportedFormat(_) | PipelineError::Decode(_) => {
                StatusCode::BAD_REQUEST
            }
            PipelineError::Inference(_) | PipelineError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PipelineError::ServiceUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string()))
    }
}
