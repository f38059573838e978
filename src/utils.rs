// src/utils.rs
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("valid number pattern"));

/// Trim, drop line breaks and collapse whitespace runs to a single space
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First number found in a display string, e.g. `"$45.00/hr"` -> `45.0`
pub fn first_number(text: &str) -> Option<f64> {
    NUMBER_RE
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
}

/// Lenient numeric parse: anything unparsable becomes 0
pub fn parse_number(text: &str) -> f64 {
    first_number(text).unwrap_or(0.0)
}

/// Lenient integer parse for counts such as `"1,204 hours"`
pub fn parse_count(text: &str) -> Option<u32> {
    first_number(text).map(|n| n.round() as u32)
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Clamp a score into the 0..=100 range
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}
