// src/ingest/providers/aggregator.rs
//! Multi-board search through a JobSpy-compatible HTTP endpoint.
//!
//! One GET per (search term, location) pair; the endpoint answers with a JSON
//! array of rows, or `{"jobs": [...]}`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use crate::error::{FetchError, SourceError};
use crate::ingest::config::AggregatorSite;
use crate::ingest::dates::{extract_json_ld_posted, parse_posted_date, sane_posted};
use crate::ingest::fetcher::Fetcher;
use crate::ingest::normalize_text;
use crate::ingest::providers::{all_failed, record_parse_metrics};
use crate::ingest::types::{JobRecord, SourceProvider};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Rows {
    Bare(Vec<Row>),
    Wrapped { jobs: Vec<Row> },
}

#[derive(Debug, Default, Deserialize)]
struct Row {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    job_url: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    date_posted: Option<String>,
    #[serde(default)]
    job_function: Option<String>,
    #[serde(default)]
    benefits: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Search URL for one (term, location) query.
pub fn query_url(site: &AggregatorSite, term: &str, location: Option<&str>) -> Result<Url, FetchError> {
    let results = site.results_wanted.to_string();
    let hours = site.hours_old.to_string();
    let boards = site.job_sites.join(",");

    let mut params: Vec<(&str, &str)> = vec![("search_term", term)];
    if let Some(loc) = location {
        params.push(("location", loc));
    }
    params.extend([
        ("site_name", boards.as_str()),
        ("results_wanted", results.as_str()),
        ("hours_old", hours.as_str()),
        ("country_indeed", site.country.as_str()),
    ]);

    Url::parse_with_params(&site.endpoint, &params).map_err(|e| FetchError::InvalidUrl {
        url: site.endpoint.clone(),
        reason: e.to_string(),
    })
}

/// Decode one response body into records.
pub fn parse_rows(body: &str, source: &str, now: DateTime<Utc>) -> Result<Vec<JobRecord>, SourceError> {
    let rows = match serde_json::from_str::<Rows>(body)
        .map_err(|e| SourceError::Parse(format!("aggregator response: {e}")))?
    {
        Rows::Bare(r) | Rows::Wrapped { jobs: r } => r,
    };

    let out = rows
        .into_iter()
        .filter_map(|row| {
            let title = normalize_text(row.title.as_deref().unwrap_or_default());
            let url = non_empty(row.job_url)?;
            if title.is_empty() {
                return None;
            }

            let raw_description = non_empty(row.description);
            let posted = non_empty(row.date_posted)
                .and_then(|d| parse_posted_date(&d, now))
                .or_else(|| {
                    raw_description
                        .as_deref()
                        .and_then(|d| extract_json_ld_posted(d, now))
                })
                .and_then(|dt| sane_posted(dt, now, None));

            let mut description = raw_description.map(|d| normalize_text(&d)).unwrap_or_default();
            if let Some(f) = non_empty(row.job_function) {
                description.push_str(&format!(" Functions: {f}"));
            }
            if let Some(b) = non_empty(row.benefits) {
                description.push_str(&format!(" Benefits: {b}"));
            }

            let mut rec = JobRecord::new(title, url, source);
            rec.company = non_empty(row.company);
            rec.location = non_empty(row.location);
            rec.description = Some(description.trim().to_string()).filter(|d| !d.is_empty());
            rec.posted_date = posted;
            Some(rec)
        })
        .collect();
    Ok(out)
}

pub struct AggregatorProvider {
    name: String,
    site: AggregatorSite,
    fetcher: Arc<dyn Fetcher>,
}

impl AggregatorProvider {
    pub fn new(name: String, site: AggregatorSite, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            name,
            site,
            fetcher,
        }
    }

    /// Every (term, location) pair; no locations means one unscoped query per term.
    fn queries(&self) -> Vec<(String, Option<String>)> {
        let mut terms: Vec<String> = self
            .site
            .search_terms
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            terms.push(String::new());
        }
        let locations: Vec<Option<String>> = {
            let l: Vec<Option<String>> = self
                .site
                .locations
                .iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .map(Some)
                .collect();
            if l.is_empty() {
                vec![None]
            } else {
                l
            }
        };

        terms
            .iter()
            .flat_map(|t| locations.iter().map(move |l| (t.clone(), l.clone())))
            .collect()
    }
}

#[async_trait]
impl SourceProvider for AggregatorProvider {
    async fn fetch_latest(&self) -> Result<Vec<JobRecord>, SourceError> {
        let queries = self.queries();
        let mut out = Vec::new();
        let mut failures = 0usize;
        let mut last_err = None;

        for (term, location) in &queries {
            let url = query_url(&self.site, term, location.as_deref())?;
            let body = match self.fetcher.get(url.as_str()).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(
                        target: "ingest",
                        source = %self.name,
                        %term,
                        location = location.as_deref().unwrap_or("-"),
                        error = %e,
                        "aggregator query failed"
                    );
                    failures += 1;
                    last_err = Some(e);
                    continue;
                }
            };
            let t0 = std::time::Instant::now();
            let mut rows = parse_rows(&body, &self.name, Utc::now())?;
            record_parse_metrics(t0, rows.len());
            out.append(&mut rows);
        }

        match last_err {
            Some(e) if failures == queries.len() => Err(all_failed(failures, e)),
            _ => Ok(out),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn site() -> AggregatorSite {
        AggregatorSite {
            endpoint: "http://127.0.0.1:8000/jobs".into(),
            search_terms: vec!["research associate".into()],
            locations: vec![],
            job_sites: vec!["indeed".into(), "linkedin".into()],
            results_wanted: 25,
            hours_old: 72,
            country: "USA".into(),
        }
    }

    #[test]
    fn query_url_encodes_params() {
        let url = query_url(&site(), "research associate", Some("Boston, MA")).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("search_term".into(), "research associate".into())));
        assert!(pairs.contains(&("location".into(), "Boston, MA".into())));
        assert!(pairs.contains(&("site_name".into(), "indeed,linkedin".into())));
        assert!(pairs.contains(&("hours_old".into(), "72".into())));
    }

    #[test]
    fn json_ld_date_is_a_fallback() {
        let body = r#"[{"title":"Scientist I","job_url":"https://b.test/1",
            "description":"<script>{\"datePosted\":\"2024-03-05\"}</script> Cell culture",
            "date_posted":null}]"#;
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let out = parse_rows(body, "agg", now).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].posted_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn far_future_date_is_unknown() {
        let body = r#"[{"title":"Scientist I","job_url":"https://b.test/1","date_posted":"2031-01-01"},
            {"title":"Scientist II","job_url":"https://b.test/2","date_posted":"2019-06-01"}]"#;
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let out = parse_rows(body, "agg", now).unwrap();
        assert_eq!(out[0].posted_date, None);
        assert_eq!(
            out[1].posted_date,
            Some(Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn wrapped_rows_and_missing_urls() {
        let body = r#"{"jobs":[{"title":"A","job_url":""},{"title":"B","job_url":"https://b.test/2","company":"Acme"}]}"#;
        let out = parse_rows(body, "agg", Utc::now()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].company.as_deref(), Some("Acme"));
    }
}
