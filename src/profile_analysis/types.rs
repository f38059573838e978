// src/profile_analysis/types.rs
use serde::{Deserialize, Serialize};

// ===== Extracted profile =====

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileRecord {
    pub basic_info: BasicInfo,
    pub metrics: ProfileMetrics,
    pub skills: Vec<String>,
    pub jobs: Vec<Job>,
    pub portfolio: Vec<PortfolioItem>,
    /// Snapshot the record was built from, kept for diagnostics only
    #[serde(skip)]
    pub raw_html: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BasicInfo {
    pub name: String,
    pub title: String,
    pub location: String,
    pub bio: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileMetrics {
    pub hourly_rate: String,
    pub job_success: String,
    pub total_earnings: String,
    pub total_jobs: u32,
    pub total_hours: u32,
    pub response_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub title: String,
    pub rating: Option<JobRating>,
    pub timeframe: Timeframe,
    pub amount: String,
    pub job_type: JobType,
    pub hours: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRating {
    pub score: Option<f64>,
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timeframe {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Hourly,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioItem {
    pub title: String,
    pub image: Option<String>,
    pub description: String,
}

impl ProfileRecord {
    /// True when every secondary section came back empty, which usually
    /// means the page markup no longer matches the selectors.
    pub fn is_degraded(&self) -> bool {
        self.metrics == ProfileMetrics::default()
            && self.skills.is_empty()
            && self.jobs.is_empty()
            && self.portfolio.is_empty()
    }
}

// ===== Analysis output =====

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub profile_overview: ProfileOverview,
    pub bio_analysis: BioAnalysis,
    pub improvements: Improvements,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileOverview {
    pub overall_score: f64,
    pub job_success_score: f64,
    pub market_fit_score: f64,
    pub hourly_rate: HourlyRateAnalysis,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HourlyRateAnalysis {
    pub current: f64,
    pub recommended_range: String,
    pub market_average: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BioAnalysis {
    pub current_bio: String,
    pub word_count: usize,
    pub recommended_length: String,
    pub score: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub improvement_suggestions: BioSuggestions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BioSuggestions {
    pub opening_statement: Suggestion,
    pub value_proposition: Suggestion,
    pub call_to_action: Suggestion,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub current: String,
    pub recommended: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Improvements {
    pub high_priority: Vec<PriorityImprovement>,
    pub quick_wins: Vec<QuickWin>,
    pub long_term: LongTermPlan,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriorityImprovement {
    pub area: String,
    pub current: String,
    pub recommended: String,
    pub impact: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuickWin {
    pub title: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LongTermPlan {
    #[serde(rename = "30_days")]
    pub days_30: Vec<String>,
    #[serde(rename = "60_days")]
    pub days_60: Vec<String>,
    #[serde(rename = "90_days")]
    pub days_90: Vec<String>,
}

impl AnalysisResult {
    /// A result only counts when every key recommendation list has content
    pub fn is_meaningful(&self) -> bool {
        !self.bio_analysis.strengths.is_empty()
            && !self.bio_analysis.weaknesses.is_empty()
            && !self.improvements.high_priority.is_empty()
            && !self.improvements.quick_wins.is_empty()
            && !self.improvements.long_term.days_30.is_empty()
    }
}
