// src/profile_analysis/prompt.rs
use super::types::{JobType, ProfileRecord};
use crate::error::{AnalysisError, Result};
use serde::Serialize;

/// Jobs beyond this count are dropped from the summary
pub const MAX_SUMMARY_JOBS: usize = 5;

pub const SYSTEM_INSTRUCTION: &str = "You are an expert freelance marketplace profile consultant. \
You always respond with a single valid JSON object and never include explanations, markdown or code fences.";

/// Size-bounded view of a profile that is sent to the model
#[derive(Debug, Serialize, PartialEq)]
pub struct ProfileSummary<'a> {
    pub title: &'a str,
    pub bio: &'a str,
    pub location: &'a str,
    pub hourly_rate: &'a str,
    pub job_success: &'a str,
    pub total_earnings: &'a str,
    pub total_jobs: u32,
    pub total_hours: u32,
    pub skills: &'a [String],
    pub recent_jobs: Vec<JobSummary<'a>>,
    pub portfolio_titles: Vec<&'a str>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct JobSummary<'a> {
    pub title: &'a str,
    pub rating: Option<f64>,
    pub job_type: JobType,
    pub amount: &'a str,
}

impl<'a> ProfileSummary<'a> {
    /// Jobs are listed newest first on the profile page, so the first
    /// entries are the most recent ones.
    pub fn from_record(record: &'a ProfileRecord) -> Self {
        Self {
            title: &record.basic_info.title,
            bio: &record.basic_info.bio,
            location: &record.basic_info.location,
            hourly_rate: &record.metrics.hourly_rate,
            job_success: &record.metrics.job_success,
            total_earnings: &record.metrics.total_earnings,
            total_jobs: record.metrics.total_jobs,
            total_hours: record.metrics.total_hours,
            skills: &record.skills,
            recent_jobs: record
                .jobs
                .iter()
                .take(MAX_SUMMARY_JOBS)
                .map(|job| JobSummary {
                    title: &job.title,
                    rating: job.rating.as_ref().and_then(|r| r.score),
                    job_type: job.job_type,
                    amount: &job.amount,
                })
                .collect(),
            portfolio_titles: record.portfolio.iter().map(|p| p.title.as_str()).collect(),
        }
    }
}

/// Build the full analysis prompt for a profile
pub fn build_prompt(record: &ProfileRecord) -> Result<String> {
    let summary = ProfileSummary::from_record(record);
    let summary_json = serde_json::to_string_pretty(&summary).map_err(|e| {
        AnalysisError::ExtractionFailed(format!("failed to serialize profile summary: {}", e))
    })?;

    Ok(format!(
        r#"Analyze this freelancer profile and give concrete, actionable recommendations to win more clients.

PROFILE DATA:
{}

Respond with ONLY a JSON object of exactly this shape:
{{
  "profile_overview": {{
    "overall_score": number from 0 to 100,
    "market_fit_score": number from 0 to 100,
    "hourly_rate": {{
      "current": number (current hourly rate in USD),
      "recommended_range": string (for example "$50-$65"),
      "market_average": number (average rate in USD for this title and skill set)
    }}
  }},
  "bio_analysis": {{
    "recommended_length": string (for example "150-250 words"),
    "score": number from 0 to 100,
    "strengths": [string, ...],
    "weaknesses": [string, ...],
    "improvement_suggestions": {{
      "opening_statement": {{ "current": string, "recommended": string, "reason": string }},
      "value_proposition": {{ "current": string, "recommended": string, "reason": string }},
      "call_to_action": {{ "current": string, "recommended": string, "reason": string }}
    }}
  }},
  "improvements": {{
    "high_priority": [{{ "area": string, "current": string, "recommended": string, "impact": string }}, ...],
    "quick_wins": [{{ "title": string, "actions": [string, ...] }}, ...],
    "long_term": {{
      "30_days": [string, ...],
      "60_days": [string, ...],
      "90_days": [string, ...]
    }}
  }}
}}

Every list must contain at least one item. Return only the JSON object, with no text before or after it."#,
        summary_json
    ))
}
