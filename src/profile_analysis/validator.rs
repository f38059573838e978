// src/profile_analysis/validator.rs
//! Turns the model's free-form answer into a fully populated [`AnalysisResult`].
//!
//! The model output is untrusted: every leaf is read explicitly and coerced to
//! its default when missing or of the wrong type. Fields that can be derived
//! from the extracted profile are always taken from the profile.

use super::types::{
    AnalysisResult, BioAnalysis, BioSuggestions, HourlyRateAnalysis, Improvements, LongTermPlan,
    PriorityImprovement, ProfileOverview, ProfileRecord, QuickWin, Suggestion,
};
use crate::error::{AnalysisError, Result};
use crate::utils::{clamp_score, parse_number, word_count};
use serde_json::Value;
use tracing::error;

static NULL: Value = Value::Null;

/// Slice from the first `{` to the last `}`, dropping fences and commentary
pub fn extract_json_payload(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

pub fn parse_model_response(raw: &str) -> Result<Value> {
    let payload = extract_json_payload(raw).ok_or_else(|| {
        error!(raw_response = %raw, "Model response contains no JSON object");
        AnalysisError::AnalysisParseFailed("no JSON object in model response".to_string())
    })?;

    serde_json::from_str(payload).map_err(|e| {
        error!(raw_response = %raw, "Failed to parse model response as JSON: {}", e);
        AnalysisError::AnalysisParseFailed(e.to_string())
    })
}

/// Rebuild the analysis field by field and reject content-free results
pub fn normalize_analysis(value: &Value, record: &ProfileRecord) -> Result<AnalysisResult> {
    let result = rebuild(value, record);

    if !result.is_meaningful() {
        return Err(AnalysisError::EmptyAnalysis(format!(
            "empty sections: {}",
            empty_sections(&result).join(", ")
        )));
    }

    Ok(result)
}

fn rebuild(value: &Value, record: &ProfileRecord) -> AnalysisResult {
    let overview = field(value, "profile_overview");
    let rate = field(overview, "hourly_rate");
    let bio = field(value, "bio_analysis");
    let suggestions = field(bio, "improvement_suggestions");
    let improvements = field(value, "improvements");
    let long_term = field(improvements, "long_term");

    let current_rate = match number(rate, "current") {
        Some(rate) if rate > 0.0 => rate,
        _ => parse_number(&record.metrics.hourly_rate),
    };

    let current_bio = record.basic_info.bio.clone();

    AnalysisResult {
        profile_overview: ProfileOverview {
            overall_score: score(overview, "overall_score"),
            job_success_score: clamp_score(parse_number(&record.metrics.job_success)),
            market_fit_score: score(overview, "market_fit_score"),
            hourly_rate: HourlyRateAnalysis {
                current: current_rate,
                recommended_range: text(rate, "recommended_range"),
                market_average: number(rate, "market_average").unwrap_or(0.0),
            },
        },
        bio_analysis: BioAnalysis {
            word_count: word_count(&current_bio),
            current_bio,
            recommended_length: text(bio, "recommended_length"),
            score: score(bio, "score"),
            strengths: text_list(bio, "strengths"),
            weaknesses: text_list(bio, "weaknesses"),
            improvement_suggestions: BioSuggestions {
                opening_statement: suggestion(field(suggestions, "opening_statement")),
                value_proposition: suggestion(field(suggestions, "value_proposition")),
                call_to_action: suggestion(field(suggestions, "call_to_action")),
            },
        },
        improvements: Improvements {
            high_priority: objects(improvements, "high_priority")
                .map(|item| PriorityImprovement {
                    area: text(item, "area"),
                    current: text(item, "current"),
                    recommended: text(item, "recommended"),
                    impact: text(item, "impact"),
                })
                .collect(),
            quick_wins: objects(improvements, "quick_wins")
                .map(|item| QuickWin {
                    title: text(item, "title"),
                    actions: text_list(item, "actions"),
                })
                .collect(),
            long_term: LongTermPlan {
                days_30: text_list(long_term, "30_days"),
                days_60: text_list(long_term, "60_days"),
                days_90: text_list(long_term, "90_days"),
            },
        },
    }
}

fn empty_sections(result: &AnalysisResult) -> Vec<&'static str> {
    let checks = [
        ("strengths", result.bio_analysis.strengths.is_empty()),
        ("weaknesses", result.bio_analysis.weaknesses.is_empty()),
        ("high_priority", result.improvements.high_priority.is_empty()),
        ("quick_wins", result.improvements.quick_wins.is_empty()),
        ("long_term.30_days", result.improvements.long_term.days_30.is_empty()),
    ];
    checks
        .into_iter()
        .filter(|(_, empty)| *empty)
        .map(|(name, _)| name)
        .collect()
}

fn field<'a>(value: &'a Value, key: &str) -> &'a Value {
    value.get(key).unwrap_or(&NULL)
}

fn text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn number(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => Some(parse_number(s)),
        _ => None,
    }
}

fn score(value: &Value, key: &str) -> f64 {
    clamp_score(number(value, key).unwrap_or(0.0))
}

fn text_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn objects<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|item| item.is_object())
}

fn suggestion(value: &Value) -> Suggestion {
    Suggestion {
        current: text(value, "current"),
        recommended: text(value, "recommended"),
        reason: text(value, "reason"),
    }
}
