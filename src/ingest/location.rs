// src/ingest/location.rs
//! US-state location filter applied at the source boundary (`target_states`).

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ingest::types::JobRecord;

const US_STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC",
];

const STATE_NAMES: &[(&str, &str)] = &[
    ("alabama", "AL"),
    ("alaska", "AK"),
    ("arizona", "AZ"),
    ("arkansas", "AR"),
    ("california", "CA"),
    ("colorado", "CO"),
    ("connecticut", "CT"),
    ("delaware", "DE"),
    ("florida", "FL"),
    ("georgia", "GA"),
    ("hawaii", "HI"),
    ("idaho", "ID"),
    ("illinois", "IL"),
    ("indiana", "IN"),
    ("iowa", "IA"),
    ("kansas", "KS"),
    ("kentucky", "KY"),
    ("louisiana", "LA"),
    ("maine", "ME"),
    ("maryland", "MD"),
    ("massachusetts", "MA"),
    ("michigan", "MI"),
    ("minnesota", "MN"),
    ("mississippi", "MS"),
    ("missouri", "MO"),
    ("montana", "MT"),
    ("nebraska", "NE"),
    ("nevada", "NV"),
    ("new hampshire", "NH"),
    ("new jersey", "NJ"),
    ("new mexico", "NM"),
    ("new york", "NY"),
    ("north carolina", "NC"),
    ("north dakota", "ND"),
    ("ohio", "OH"),
    ("oklahoma", "OK"),
    ("oregon", "OR"),
    ("pennsylvania", "PA"),
    ("rhode island", "RI"),
    ("south carolina", "SC"),
    ("south dakota", "SD"),
    ("tennessee", "TN"),
    ("texas", "TX"),
    ("utah", "UT"),
    ("vermont", "VT"),
    ("virginia", "VA"),
    ("washington", "WA"),
    ("west virginia", "WV"),
    ("wisconsin", "WI"),
    ("wyoming", "WY"),
    ("district of columbia", "DC"),
];

const CITIES: &[(&str, &str)] = &[
    ("boston", "MA"),
    ("cambridge", "MA"),
    ("worcester", "MA"),
    ("new york", "NY"),
    ("nyc", "NY"),
    ("brooklyn", "NY"),
    ("manhattan", "NY"),
    ("albany", "NY"),
    ("philadelphia", "PA"),
    ("pittsburgh", "PA"),
    ("harrisburg", "PA"),
    ("newark", "NJ"),
    ("jersey city", "NJ"),
    ("trenton", "NJ"),
    ("princeton", "NJ"),
];

static RE_ABBREV: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,\s]\s*([A-Z]{2})(?:[,\s)]|$)").expect("state abbrev regex"));

static RE_STATE_NAMES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let mut names: Vec<&(&str, &str)> = STATE_NAMES.iter().collect();
    // longest first so "west virginia" wins over "virginia"
    names.sort_by_key(|(n, _)| std::cmp::Reverse(n.len()));
    names
        .into_iter()
        .map(|(n, abbr)| {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(n))).expect("state name regex");
            (re, *abbr)
        })
        .collect()
});

static RE_DESC_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)(?:location|based in|office)[:\s]+([^\n]+)").expect("description location regex")
});

static RE_US_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(us|usa|united states)\b").expect("us mention regex"));

/// Resolve a free-form location ("Boston, MA", "Remote - New Jersey") to a
/// two-letter US state code.
pub fn extract_us_state(location: &str) -> Option<&'static str> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return None;
    }

    let upper = format!(" {}", trimmed.to_ascii_uppercase());
    for caps in RE_ABBREV.captures_iter(&upper) {
        if let Some(m) = caps.get(1) {
            if let Some(code) = US_STATES.iter().copied().find(|s| *s == m.as_str()) {
                return Some(code);
            }
        }
    }

    let lower = trimmed.to_lowercase();
    for (re, abbr) in RE_STATE_NAMES.iter() {
        if re.is_match(&lower) {
            return Some(*abbr);
        }
    }

    CITIES
        .iter()
        .find(|(city, _)| lower.contains(city))
        .map(|(_, abbr)| *abbr)
}

#[derive(Debug, Clone)]
pub struct LocationFilter {
    targets: BTreeSet<String>,
}

impl LocationFilter {
    /// `None` when no targets are configured.
    pub fn new<S: AsRef<str>>(states: &[S]) -> Option<Self> {
        let targets: BTreeSet<String> = states
            .iter()
            .map(|s| s.as_ref().trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        (!targets.is_empty()).then_some(Self { targets })
    }

    fn is_target(&self, location: &str) -> bool {
        extract_us_state(location).is_some_and(|s| self.targets.contains(s))
    }

    pub fn accepts(&self, record: &JobRecord) -> bool {
        let description = record.description.as_deref().unwrap_or_default();

        let mut candidates: Vec<&str> = Vec::new();
        if let Some(loc) = record.location.as_deref().filter(|l| !l.trim().is_empty()) {
            candidates.push(loc);
        }
        candidates.extend(
            RE_DESC_LOCATION
                .captures_iter(description)
                .filter_map(|c| c.get(1).map(|m| m.as_str())),
        );

        if candidates.is_empty() {
            let lower = description.to_lowercase();
            let remote = ["remote", "work from home", "telecommute"]
                .iter()
                .any(|t| lower.contains(t));
            return remote && RE_US_MENTION.is_match(description);
        }

        candidates.into_iter().any(|loc| self.is_target(loc))
    }
}
