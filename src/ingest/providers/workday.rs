// src/ingest/providers/workday.rs
//! Workday career sites via their JSON search API
//! (`{origin}/wday/cxs/{tenant}/{site}/jobs`).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::error::{FetchError, SourceError};
use crate::ingest::config::WorkdaySite;
use crate::ingest::dates::{parse_posted_date, sane_posted};
use crate::ingest::fetcher::Fetcher;
use crate::ingest::normalize_text;
use crate::ingest::providers::{all_failed, record_parse_metrics};
use crate::ingest::types::{JobRecord, SourceProvider};

const PAGE_SIZE: u32 = 20;
const LANGUAGE_SEGMENTS: &[&str] = &["en", "en-us", "en-gb", "de", "fr"];
/// `postedOn` older than this is treated as unknown.
const MAX_POSTED_AGE_DAYS: i64 = 365;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default, rename = "jobPostings")]
    job_postings: Vec<Posting>,
}

#[derive(Debug, Deserialize)]
struct Posting {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "externalPath")]
    external_path: Option<String>,
    #[serde(default, rename = "locationsText")]
    locations_text: Option<String>,
    #[serde(default, rename = "postedOn")]
    posted_on: Option<String>,
    #[serde(default, rename = "bulletFields")]
    bullet_fields: Vec<String>,
}

/// `https://acme.wd5.myworkdayjobs.com/en-US/Careers` →
/// `https://acme.wd5.myworkdayjobs.com/wday/cxs/acme/Careers/jobs`
pub fn api_url(career_url: &str) -> Result<String, FetchError> {
    let invalid = |reason: &str| FetchError::InvalidUrl {
        url: career_url.to_string(),
        reason: reason.to_string(),
    };
    let parsed = Url::parse(career_url.trim()).map_err(|e| invalid(&e.to_string()))?;
    let host = parsed.host_str().ok_or_else(|| invalid("missing host"))?;
    let tenant = host.split('.').next().unwrap_or(host);

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    let site = segments
        .iter()
        .rev()
        .find(|s| !LANGUAGE_SEGMENTS.contains(&s.to_ascii_lowercase().as_str()))
        .ok_or_else(|| invalid("missing career site segment"))?;

    Ok(format!(
        "{}/wday/cxs/{tenant}/{site}/jobs",
        parsed.origin().ascii_serialization()
    ))
}

/// `pfizer_careers` → `Pfizer`, `bristol_myers` → `Bristol Myers`.
pub fn company_from_source(source: &str) -> String {
    source
        .replace("_careers", "")
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn search_payload(term: &str) -> serde_json::Value {
    json!({
        "appliedFacets": {},
        "limit": PAGE_SIZE,
        "offset": 0,
        "searchText": term,
    })
}

fn job_url(career_url: &str, external_path: Option<&str>) -> String {
    match external_path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) => format!(
            "{}/{}",
            career_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
        None => career_url.trim().to_string(),
    }
}

/// Decode one search response page.
pub fn parse_search_response(
    body: &str,
    site: &WorkdaySite,
    source: &str,
    now: DateTime<Utc>,
) -> Result<Vec<JobRecord>, SourceError> {
    let resp: SearchResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::Parse(format!("workday response: {e}")))?;
    tracing::debug!(target: "ingest", %source, total = resp.total, page = resp.job_postings.len(), "workday page");

    let company = site
        .company
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| company_from_source(source));

    let out = resp
        .job_postings
        .into_iter()
        .filter_map(|p| {
            let title = normalize_text(p.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                return None;
            }
            let mut rec = JobRecord::new(
                title,
                job_url(&site.workday_url, p.external_path.as_deref()),
                source,
            );
            rec.company = Some(company.clone());
            rec.location = p.locations_text.map(|l| normalize_text(&l)).filter(|l| !l.is_empty());
            rec.posted_date = p
                .posted_on
                .as_deref()
                .and_then(|d| parse_posted_date(d, now))
                .and_then(|dt| sane_posted(dt, now, Some(MAX_POSTED_AGE_DAYS)));
            let bullets = normalize_text(&p.bullet_fields.join(" | "));
            rec.description = Some(bullets).filter(|b| !b.is_empty());
            Some(rec)
        })
        .collect();
    Ok(out)
}

pub struct WorkdayProvider {
    name: String,
    site: WorkdaySite,
    fetcher: Arc<dyn Fetcher>,
}

impl WorkdayProvider {
    pub fn new(name: String, site: WorkdaySite, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            name,
            site,
            fetcher,
        }
    }

    fn terms(&self) -> Vec<&str> {
        let terms: Vec<&str> = self
            .site
            .search_terms
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            vec![""]
        } else {
            terms
        }
    }
}

#[async_trait]
impl SourceProvider for WorkdayProvider {
    async fn fetch_latest(&self) -> Result<Vec<JobRecord>, SourceError> {
        let api = api_url(&self.site.workday_url)?;
        let terms = self.terms();

        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        let mut failures = 0usize;
        let mut last_err = None;

        for term in &terms {
            let body = match self.fetcher.post_json(&api, &search_payload(term)).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(target: "ingest", source = %self.name, term = %term, error = %e, "workday search failed");
                    failures += 1;
                    last_err = Some(e);
                    continue;
                }
            };
            let t0 = std::time::Instant::now();
            let page = parse_search_response(&body, &self.site, &self.name, Utc::now())?;
            record_parse_metrics(t0, page.len());
            out.extend(page.into_iter().filter(|r| seen.insert(r.url.clone())));
        }

        match last_err {
            Some(e) if failures == terms.len() => Err(all_failed(failures, e)),
            _ => Ok(out),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
