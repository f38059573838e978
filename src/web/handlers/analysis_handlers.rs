// src/web/handlers/analysis_handlers.rs
use crate::error::AnalysisError;
use crate::profile_analysis::{AnalysisResult, ProfileAnalyzer};
use crate::web::types::{api_error, AnalyzeProfileRequest, ApiError, DataResponse};

use rocket::http::Status;
use rocket::serde::json::{Error as JsonError, Json};
use rocket::State;
use tracing::{error, info, warn};

pub async fn analyze_profile_handler(
    request: Result<Json<AnalyzeProfileRequest>, JsonError<'_>>,
    analyzer: &State<ProfileAnalyzer>,
) -> Result<Json<DataResponse<AnalysisResult>>, ApiError> {
    let request = request.map_err(|e| {
        warn!("Rejected analysis request body: {}", e);
        api_error(Status::BadRequest, "Request body must be JSON with a profileUrl field")
    })?;

    let profile_url = match request.profile_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => return Err(api_error(Status::BadRequest, "Profile URL is required")),
    };

    info!("Received analysis request for {}", profile_url);

    match analyzer.analyze_profile(&profile_url).await {
        Ok(result) => {
            info!("Returning analysis for {}", profile_url);
            Ok(Json(DataResponse::success(result)))
        }
        Err(e) => {
            log_failure(&profile_url, &e);
            Err(api_error(e.status(), e.public_message()))
        }
    }
}

fn log_failure(profile_url: &str, err: &AnalysisError) {
    error!(
        error.kind = err.kind(),
        error.message = %err,
        error.debug = ?err,
        timeout = err.is_timeout(),
        "Profile analysis failed for {}",
        profile_url
    );
}
