use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use busnet::BusNetError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON body of every failed request.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError(pub BusNetError);

impl From<BusNetError> for ApiError {
    fn from(e: BusNetError) -> Self {
        ApiError(e)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            BusNetError::NotFound { .. } => StatusCode::NOT_FOUND,
            BusNetError::NoRouteFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BusNetError::InvalidTopology(_)
            | BusNetError::InvalidDensity(_)
            | BusNetError::InvalidHour(_)
            | BusNetError::InvalidParameter { .. }
            | BusNetError::InvalidStop(_) => StatusCode::BAD_REQUEST,
            BusNetError::EngineUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            BusNetError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.0.kind().to_string(),
            message: self.0.to_string(),
        })
    }
}
