// src/web/mod.rs

pub mod handlers;
pub mod types;

pub use types::*;

use crate::core::ConfigManager;
use crate::profile_analysis::{AnalysisResult, ProfileAnalyzer};
use anyhow::{Context, Result};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::{Error as JsonError, Json};
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use tracing::{info, warn};

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

#[post("/analyze", data = "<request>")]
pub async fn analyze_profile(
    request: Result<Json<AnalyzeProfileRequest>, JsonError<'_>>,
    analyzer: &State<ProfileAnalyzer>,
) -> Result<Json<DataResponse<AnalysisResult>>, ApiError> {
    handlers::analyze_profile_handler(request, analyzer).await
}

#[get("/health")]
pub async fn health() -> Json<HealthResponse> {
    handlers::health_handler().await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<ErrorResponse> {
    Json(ErrorResponse::new("Invalid request format"))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<ErrorResponse> {
    Json(ErrorResponse::new("Resource not found"))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<ErrorResponse> {
    Json(ErrorResponse::new("Internal server error"))
}

/// Assemble the application with the given analyzer as managed state
pub fn build_rocket(analyzer: ProfileAnalyzer) -> Rocket<Build> {
    rocket::build()
        .attach(Cors)
        .manage(analyzer)
        .register(
            "/api",
            catchers![bad_request, not_found, internal_error],
        )
        .mount("/api", routes![analyze_profile, health, options])
}

pub async fn start_web_server(config: ConfigManager) -> Result<()> {
    let analyzer = ProfileAnalyzer::from_config(&config)
        .context("Failed to initialize profile analyzer")?;

    if config.llm.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; analysis requests will fail until it is configured");
    }

    let figment = rocket::Config::figment()
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port));

    info!("Starting profile analyzer API server");
    info!(
        "Listening on http://{}:{}",
        config.server.address, config.server.port
    );
    info!("Model: {} via {}", config.llm.model, config.llm.base_url);

    build_rocket(analyzer)
        .configure(figment)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket server failed: {}", e))?;

    Ok(())
}
