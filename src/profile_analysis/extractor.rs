// src/profile_analysis/extractor.rs
//! Selector rules that turn a rendered profile page into a [`ProfileRecord`].
//!
//! Every field has an ordered list of selectors; the first one that yields
//! non-empty text wins. Missing secondary fields fall back to empty values so
//! one absent metric never fails the whole extraction.

use super::types::{
    BasicInfo, Job, JobRating, JobType, PortfolioItem, ProfileMetrics, ProfileRecord, Timeframe,
};
use crate::error::{AnalysisError, Result};
use crate::utils::{first_number, normalize_text, parse_count};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Elements whose presence means the profile has actually rendered
pub const CONTENT_MARKERS: [&str; 3] = [
    "[data-test='freelancer-title']",
    "[data-test='profile-overview']",
    "h1[itemprop='name']",
];

const NAME_SELECTORS: &[&str] = &[
    "h1[itemprop='name']",
    "[data-test='freelancer-name']",
    ".profile-name",
];
const TITLE_SELECTORS: &[&str] = &[
    "[data-test='freelancer-title']",
    "h2.profile-title",
    ".freelancer-title",
];
const LOCATION_SELECTORS: &[&str] = &[
    "[data-test='freelancer-location']",
    "[itemprop='address']",
    ".profile-location",
];
const BIO_SELECTORS: &[&str] = &[
    "[data-test='profile-overview']",
    ".profile-overview",
    "[itemprop='description']",
];

const HOURLY_RATE_SELECTORS: &[&str] = &["[data-test='hourly-rate']", ".profile-rate"];
const JOB_SUCCESS_SELECTORS: &[&str] = &["[data-test='job-success-score']", ".job-success-score"];
const EARNINGS_SELECTORS: &[&str] = &["[data-test='total-earnings']", ".stat-earnings"];
const TOTAL_JOBS_SELECTORS: &[&str] = &["[data-test='total-jobs']", ".stat-jobs"];
const TOTAL_HOURS_SELECTORS: &[&str] = &["[data-test='total-hours']", ".stat-hours"];
const RESPONSE_TIME_SELECTORS: &[&str] = &["[data-test='response-time']", ".response-time"];

const SKILL_SELECTOR: &str = "[data-test='skill'], .skill-name";

const JOB_SELECTOR: &str = "[data-test='job-tile'], .assignment-item";
const JOB_TITLE_SELECTORS: &[&str] = &["[data-test='job-title']", ".assignment-title", "h4"];
const JOB_RATING_SELECTORS: &[&str] = &["[data-test='job-rating']", ".rating-score"];
const JOB_FEEDBACK_SELECTORS: &[&str] = &["[data-test='job-feedback']", ".feedback-text"];
const JOB_DATES_SELECTORS: &[&str] = &["[data-test='job-dates']", ".assignment-dates"];
const JOB_AMOUNT_SELECTORS: &[&str] = &["[data-test='job-amount']", ".assignment-amount"];
const JOB_HOURS_SELECTORS: &[&str] = &["[data-test='job-hours']", ".assignment-hours"];

const PORTFOLIO_SELECTOR: &str = "[data-test='portfolio-item'], .portfolio-tile";
const PORTFOLIO_TITLE_SELECTORS: &[&str] =
    &["[data-test='portfolio-title']", ".portfolio-title", "h4"];
const PORTFOLIO_DESCRIPTION_SELECTORS: &[&str] = &[
    "[data-test='portfolio-description']",
    ".portfolio-description",
    "p",
];

const HOURLY_MARKERS: [&str; 3] = ["/hr", "/hour", "hourly"];
const TIMEFRAME_SEPARATORS: [&str; 3] = [" - ", "–", "—"];
const OPEN_ENDED: &str = "Present";

/// Parse raw HTML into a profile record.
///
/// Fails with `IncompleteProfile` when name or title are missing, since the
/// rest of the pipeline has nothing to anchor on without them.
pub fn extract_profile(html: &str) -> Result<ProfileRecord> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let basic_info = BasicInfo {
        name: first_text(root, NAME_SELECTORS)?.unwrap_or_default(),
        title: first_text(root, TITLE_SELECTORS)?.unwrap_or_default(),
        location: first_text(root, LOCATION_SELECTORS)?.unwrap_or_default(),
        bio: first_text(root, BIO_SELECTORS)?.unwrap_or_default(),
    };

    if basic_info.name.is_empty() || basic_info.title.is_empty() {
        return Err(AnalysisError::IncompleteProfile(format!(
            "name present: {}, title present: {}",
            !basic_info.name.is_empty(),
            !basic_info.title.is_empty()
        )));
    }

    let record = ProfileRecord {
        basic_info,
        metrics: extract_metrics(root)?,
        skills: all_texts(root, SKILL_SELECTOR)?,
        jobs: extract_jobs(root)?,
        portfolio: extract_portfolio(root)?,
        raw_html: html.to_string(),
    };

    if record.is_degraded() {
        warn!(
            "Profile for '{}' has no metrics, skills, jobs or portfolio; page markup may have changed",
            record.basic_info.name
        );
    }

    debug!(
        "Extracted profile '{}': {} skills, {} jobs, {} portfolio items",
        record.basic_info.name,
        record.skills.len(),
        record.jobs.len(),
        record.portfolio.len()
    );

    Ok(record)
}

fn extract_metrics(root: ElementRef<'_>) -> Result<ProfileMetrics> {
    let text = |selectors: &[&str]| -> Result<String> {
        Ok(first_text(root, selectors)?.unwrap_or_default())
    };

    Ok(ProfileMetrics {
        hourly_rate: text(HOURLY_RATE_SELECTORS)?,
        job_success: text(JOB_SUCCESS_SELECTORS)?,
        total_earnings: text(EARNINGS_SELECTORS)?,
        total_jobs: parse_count(&text(TOTAL_JOBS_SELECTORS)?).unwrap_or(0),
        total_hours: parse_count(&text(TOTAL_HOURS_SELECTORS)?).unwrap_or(0),
        response_time: text(RESPONSE_TIME_SELECTORS)?,
    })
}

fn extract_jobs(root: ElementRef<'_>) -> Result<Vec<Job>> {
    let selector = compile(JOB_SELECTOR)?;
    let mut jobs = Vec::new();

    for tile in root.select(&selector) {
        let Some(title) = first_text(tile, JOB_TITLE_SELECTORS)? else {
            continue;
        };

        let score = first_text(tile, JOB_RATING_SELECTORS)?.and_then(|s| first_number(&s));
        let feedback = first_text(tile, JOB_FEEDBACK_SELECTORS)?;
        let rating = if score.is_some() || feedback.is_some() {
            Some(JobRating {
                score,
                feedback: feedback.unwrap_or_default(),
            })
        } else {
            None
        };

        let amount = first_text(tile, JOB_AMOUNT_SELECTORS)?.unwrap_or_default();

        jobs.push(Job {
            title,
            rating,
            timeframe: parse_timeframe(&first_text(tile, JOB_DATES_SELECTORS)?.unwrap_or_default()),
            job_type: infer_job_type(&amount),
            amount,
            hours: first_text(tile, JOB_HOURS_SELECTORS)?.and_then(|h| parse_count(&h)),
        });
    }

    Ok(jobs)
}

fn extract_portfolio(root: ElementRef<'_>) -> Result<Vec<PortfolioItem>> {
    let selector = compile(PORTFOLIO_SELECTOR)?;
    let image_selector = compile("img")?;
    let mut items = Vec::new();

    for tile in root.select(&selector) {
        let Some(title) = first_text(tile, PORTFOLIO_TITLE_SELECTORS)? else {
            continue;
        };

        let image = tile.select(&image_selector).find_map(|img| {
            img.value()
                .attr("src")
                .or_else(|| img.value().attr("data-src"))
                .map(str::to_string)
        });

        items.push(PortfolioItem {
            title,
            image,
            description: first_text(tile, PORTFOLIO_DESCRIPTION_SELECTORS)?.unwrap_or_default(),
        });
    }

    Ok(items)
}

/// Split a date-range such as `"Mar 2023 - Jun 2023"`; a missing end means
/// the engagement is still running.
pub fn parse_timeframe(text: &str) -> Timeframe {
    let text = normalize_text(text);

    for separator in TIMEFRAME_SEPARATORS {
        if let Some((start, end)) = text.split_once(separator) {
            let end = end.trim();
            return Timeframe {
                start: start.trim().to_string(),
                end: if end.is_empty() {
                    OPEN_ENDED.to_string()
                } else {
                    end.to_string()
                },
            };
        }
    }

    Timeframe {
        start: text,
        end: OPEN_ENDED.to_string(),
    }
}

pub fn infer_job_type(amount: &str) -> JobType {
    let lower = amount.to_lowercase();
    if HOURLY_MARKERS.iter().any(|marker| lower.contains(marker)) {
        JobType::Hourly
    } else {
        JobType::Fixed
    }
}

fn compile(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| AnalysisError::ExtractionFailed(format!("invalid selector '{}': {:?}", css, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn first_text(scope: ElementRef<'_>, selectors: &[&str]) -> Result<Option<String>> {
    for css in selectors {
        let selector = compile(css)?;
        if let Some(text) = scope
            .select(&selector)
            .map(element_text)
            .find(|text| !text.is_empty())
        {
            return Ok(Some(text));
        }
    }
    Ok(None)
}

fn all_texts(scope: ElementRef<'_>, css: &str) -> Result<Vec<String>> {
    let selector = compile(css)?;
    Ok(scope
        .select(&selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_HTML: &str = include_str!("../../tests/fixtures/profile.html");

    #[test]
    fn test_extract_basic_info_and_metrics() {
        let record = extract_profile(PROFILE_HTML).unwrap();

        assert_eq!(record.basic_info.name, "Jane Doe");
        assert_eq!(record.basic_info.title, "Senior Rust & Backend Engineer");
        assert_eq!(record.basic_info.location, "Lisbon, Portugal");
        assert!(record.basic_info.bio.starts_with("I build fast, reliable backend systems."));
        assert!(!record.basic_info.bio.contains('\n'));

        assert_eq!(record.metrics.hourly_rate, "$45.00/hr");
        assert_eq!(record.metrics.job_success, "98% Job Success");
        assert_eq!(record.metrics.total_earnings, "$100K+ earned");
        assert_eq!(record.metrics.total_jobs, 37);
        assert_eq!(record.metrics.total_hours, 1204);
        assert_eq!(record.metrics.response_time, "Responds within 2 hours");
        assert_eq!(record.raw_html, PROFILE_HTML);
    }

    #[test]
    fn test_extract_skills_in_order() {
        let record = extract_profile(PROFILE_HTML).unwrap();
        assert_eq!(
            record.skills,
            vec!["Rust", "PostgreSQL", "Tokio", "Kubernetes", "Rust"]
        );
    }

    #[test]
    fn test_extract_jobs() {
        let record = extract_profile(PROFILE_HTML).unwrap();
        assert_eq!(record.jobs.len(), 6);

        let first = &record.jobs[0];
        assert_eq!(first.title, "Payment gateway rewrite");
        assert_eq!(first.job_type, JobType::Hourly);
        assert_eq!(first.hours, Some(320));
        assert_eq!(first.timeframe.start, "Mar 2024");
        assert_eq!(first.timeframe.end, "Jun 2024");
        let rating = first.rating.as_ref().unwrap();
        assert_eq!(rating.score, Some(5.0));
        assert_eq!(rating.feedback, "Outstanding work, delivered early.");

        let second = &record.jobs[1];
        assert_eq!(second.job_type, JobType::Fixed);
        assert_eq!(second.amount, "$2,500.00");
        assert_eq!(second.timeframe.end, "Present");
        assert!(second.rating.is_none());
        assert_eq!(second.hours, None);
    }

    #[test]
    fn test_extract_portfolio() {
        let record = extract_profile(PROFILE_HTML).unwrap();
        assert_eq!(record.portfolio.len(), 2);
        assert_eq!(record.portfolio[0].title, "Realtime trading engine");
        assert_eq!(
            record.portfolio[0].image.as_deref(),
            Some("https://cdn.example.com/engine.png")
        );
        assert_eq!(record.portfolio[1].image, None);
    }

    #[test]
    fn test_missing_title_is_incomplete() {
        let html = "<html><body><h1 itemprop=\"name\">Jane Doe</h1></body></html>";
        match extract_profile(html) {
            Err(AnalysisError::IncompleteProfile(_)) => {}
            other => panic!("expected IncompleteProfile, got {:?}", other),
        }
    }

    #[test]
    fn test_secondary_fields_default_when_missing() {
        let html = r#"<html><body>
            <h1 itemprop="name">Sam</h1>
            <h2 data-test="freelancer-title">Data Analyst</h2>
        </body></html>"#;
        let record = extract_profile(html).unwrap();
        assert_eq!(record.metrics.total_jobs, 0);
        assert!(record.metrics.hourly_rate.is_empty());
        assert!(record.jobs.is_empty());
        assert!(record.is_degraded());
    }

    #[test]
    fn test_parse_timeframe() {
        let range = parse_timeframe("Jan 2023 - Mar 2023");
        assert_eq!(range.start, "Jan 2023");
        assert_eq!(range.end, "Mar 2023");

        let dash = parse_timeframe("Jan 2023 – ");
        assert_eq!(dash.end, "Present");

        let single = parse_timeframe("  Feb 2022 ");
        assert_eq!(single.start, "Feb 2022");
        assert_eq!(single.end, "Present");
    }

    #[test]
    fn test_infer_job_type() {
        assert_eq!(infer_job_type("$45.00/hr"), JobType::Hourly);
        assert_eq!(infer_job_type("Hourly: $30"), JobType::Hourly);
        assert_eq!(infer_job_type("$500.00"), JobType::Fixed);
        assert_eq!(infer_job_type(""), JobType::Fixed);
    }
}
