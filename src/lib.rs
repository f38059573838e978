//! Freelancer profile analyzer: renders a marketplace profile page, extracts
//! its content and asks a language model for structured recommendations.

pub mod core;
pub mod error;
pub mod profile_analysis;
pub mod utils;
pub mod web;

pub use error::AnalysisError;
pub use profile_analysis::{AnalysisResult, ProfileAnalyzer};
pub use web::{build_rocket, start_web_server};
