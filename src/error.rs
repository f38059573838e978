// src/error.rs
use rocket::http::Status;
use thiserror::Error;

/// Failures of the profile analysis pipeline.
///
/// The payload of each variant is internal detail for the logs; clients only
/// ever see [`AnalysisError::public_message`].
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Profile content not found: {0}")]
    ContentNotFound(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Incomplete profile: {0}")]
    IncompleteProfile(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Failed to parse analysis: {0}")]
    AnalysisParseFailed(String),

    #[error("Analysis returned no meaningful content: {0}")]
    EmptyAnalysis(String),

    #[error("Browser error: {0}")]
    BrowserError(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    /// Variant name, used as the error code in logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::UpstreamUnavailable(_) => "UpstreamUnavailable",
            Self::ContentNotFound(_) => "ContentNotFound",
            Self::MalformedResponse(_) => "MalformedResponse",
            Self::Timeout(_) => "Timeout",
            Self::IncompleteProfile(_) => "IncompleteProfile",
            Self::ExtractionFailed(_) => "ExtractionFailed",
            Self::ConfigurationError(_) => "ConfigurationError",
            Self::AnalysisParseFailed(_) => "AnalysisParseFailed",
            Self::EmptyAnalysis(_) => "EmptyAnalysis",
            Self::BrowserError(_) => "BrowserError",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub fn status(&self) -> Status {
        match self {
            Self::InvalidInput(_) => Status::BadRequest,
            Self::Timeout(_) => Status::GatewayTimeout,
            _ => Status::InternalServerError,
        }
    }

    /// Message safe to hand to API callers
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => msg.clone(),
            Self::UpstreamUnavailable(_) => {
                "The profile page could not be loaded. Please try again later.".to_string()
            }
            Self::ContentNotFound(_) => {
                "The profile page did not contain any profile content. Check that the profile is public.".to_string()
            }
            Self::MalformedResponse(_) => {
                "The profile page returned incomplete content.".to_string()
            }
            Self::Timeout(_) => "Timed out while loading the profile page.".to_string(),
            Self::IncompleteProfile(_) => {
                "Could not read the profile name and title from the page.".to_string()
            }
            Self::ExtractionFailed(_) => "Failed to extract profile data.".to_string(),
            Self::ConfigurationError(_) => {
                "The analysis service is not configured correctly.".to_string()
            }
            Self::AnalysisParseFailed(_) => {
                "The analysis service returned an unreadable response.".to_string()
            }
            Self::EmptyAnalysis(_) => {
                "The analysis service did not return usable recommendations.".to_string()
            }
            Self::BrowserError(_) => "Failed to start the page renderer.".to_string(),
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AnalysisError::Timeout(format!("model request timed out: {}", err))
        } else {
            AnalysisError::UpstreamUnavailable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AnalysisError::InvalidInput("x".into()).status(),
            Status::BadRequest
        );
        assert_eq!(
            AnalysisError::Timeout("x".into()).status(),
            Status::GatewayTimeout
        );
        assert_eq!(
            AnalysisError::EmptyAnalysis("x".into()).status(),
            Status::InternalServerError
        );
        assert_eq!(
            AnalysisError::ConfigurationError("x".into()).status(),
            Status::InternalServerError
        );
    }

    #[test]
    fn test_public_message_hides_detail() {
        let err = AnalysisError::AnalysisParseFailed("<raw model text>".into());
        assert!(!err.public_message().contains("<raw model text>"));
        assert_eq!(err.kind(), "AnalysisParseFailed");
    }
}
