// src/ingest/filter.rs
//! Recency and keyword rules applied to the gathered working set.
//!
//! Matching is plain case-insensitive substring search over `title` and
//! `description`; there is no tokenization, so `"intern"` also matches
//! `"international"`.

use chrono::{DateTime, Duration, Utc};

use crate::ingest::types::JobRecord;

/// Resolved filter rules for one run. Keywords match case-insensitively
/// however they were written; empty lists impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRules {
    pub max_age_days: Option<u32>,
    pub job_titles: Vec<String>,
    pub include_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
}

impl FilterRules {
    /// Union `extra` into `include_keywords`, keeping configured entries first.
    pub fn with_extra_keywords<S: AsRef<str>>(mut self, extra: &[S]) -> Self {
        let mut merged = std::mem::take(&mut self.include_keywords);
        merged.extend(extra.iter().map(|s| s.as_ref().to_string()));
        self.include_keywords = normalize_keywords(merged);
        self
    }
}

/// Trim, lowercase and drop empties; first occurrence wins on duplicates.
pub fn normalize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for k in keywords {
        let k = k.as_ref().trim().to_lowercase();
        if !k.is_empty() && !out.contains(&k) {
            out.push(k);
        }
    }
    out
}

/// `haystack` is already lowercased; needles may not be.
fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| {
        let n = n.trim();
        !n.is_empty() && haystack.contains(n.to_lowercase().as_str())
    })
}

fn passes_date(record: &JobRecord, max_age_days: Option<u32>, now: DateTime<Utc>) -> bool {
    match (max_age_days, record.posted_date) {
        // a cutoff before chrono's minimum keeps everything
        (Some(days), Some(posted)) => Duration::try_days(i64::from(days))
            .and_then(|d| now.checked_sub_signed(d))
            .map_or(true, |cutoff| posted >= cutoff),
        // unknown date (or no cutoff) is never penalized
        _ => true,
    }
}

/// Evaluate all rules against one record.
/// Order: exclude, date cutoff, title allow-list, include keywords.
pub fn passes(record: &JobRecord, rules: &FilterRules, now: DateTime<Utc>) -> bool {
    let title = record.title.to_lowercase();
    let description = record
        .description
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    if !rules.exclude_keywords.is_empty()
        && (contains_any(&title, &rules.exclude_keywords)
            || contains_any(&description, &rules.exclude_keywords))
    {
        return false;
    }

    if !passes_date(record, rules.max_age_days, now) {
        return false;
    }

    if !rules.job_titles.is_empty() && !contains_any(&title, &rules.job_titles) {
        return false;
    }

    if !rules.include_keywords.is_empty()
        && !contains_any(&title, &rules.include_keywords)
        && !contains_any(&description, &rules.include_keywords)
    {
        return false;
    }

    true
}

/// Stable filter: retained records keep their input order. The input is not modified.
pub fn filter_records(records: &[JobRecord], rules: &FilterRules, now: DateTime<Utc>) -> Vec<JobRecord> {
    records
        .iter()
        .filter(|r| passes(r, rules, now))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn keywords_are_trimmed_lowercased_and_deduped() {
        let out = normalize_keywords([" CRISPR ", "", "crispr", "Biotech"]);
        assert_eq!(out, vec!["crispr".to_string(), "biotech".to_string()]);
    }

    #[test]
    fn extra_keywords_are_unioned_not_replacing() {
        let rules = FilterRules {
            include_keywords: vec!["research".into()],
            ..Default::default()
        }
        .with_extra_keywords(&["Assay", "research"]);
        assert_eq!(
            rules.include_keywords,
            vec!["research".to_string(), "assay".to_string()]
        );
    }

    #[test]
    fn cutoff_boundary_is_inclusive() {
        let mut r = JobRecord::new("Scientist", "u", "s");
        r.posted_date = Some(now() - Duration::days(7));
        let rules = FilterRules {
            max_age_days: Some(7),
            ..Default::default()
        };
        assert!(passes(&r, &rules, now()));

        r.posted_date = Some(now() - Duration::days(7) - Duration::seconds(1));
        assert!(!passes(&r, &rules, now()));
    }

    #[test]
    fn huge_cutoff_keeps_everything() {
        let mut r = JobRecord::new("Scientist", "u", "s");
        r.posted_date = Some(Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap());
        let rules = FilterRules {
            max_age_days: Some(u32::MAX),
            ..Default::default()
        };
        assert!(passes(&r, &rules, now()));
    }

    #[test]
    fn mixed_case_rules_match_without_normalizing() {
        let include = FilterRules {
            include_keywords: vec!["Research".into()],
            ..Default::default()
        };
        assert!(passes(&JobRecord::new("Research Scientist", "u", "s"), &include, now()));

        let exclude = FilterRules {
            exclude_keywords: vec![" Intern ".into()],
            ..Default::default()
        };
        assert!(!passes(&JobRecord::new("Scientist Intern", "u", "s"), &exclude, now()));

        let titles = FilterRules {
            job_titles: vec!["SCIENTIST".into()],
            ..Default::default()
        };
        assert!(passes(&JobRecord::new("Senior Scientist", "u", "s"), &titles, now()));
    }

    #[test]
    fn substring_match_is_not_word_bounded() {
        let r = JobRecord::new("International Sales", "u", "s");
        let rules = FilterRules {
            exclude_keywords: vec!["intern".into()],
            ..Default::default()
        };
        assert!(!passes(&r, &rules, now()));
    }
}
