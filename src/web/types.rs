// src/web/types.rs
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct AnalyzeProfileRequest {
    #[serde(rename = "profileUrl", default)]
    pub profile_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct HealthResponse {
    pub success: bool,
    pub status: &'static str,
}

/// Error half of every handler result
pub type ApiError = (Status, Json<ErrorResponse>);

impl<T> DataResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

pub fn api_error(status: Status, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(error)))
}
