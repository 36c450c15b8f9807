// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use job_harvest::ingest::fetcher::Fetcher;
use job_harvest::{FetchError, JobRecord};

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}")).expect("fixture")
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn record(url: &str, title: &str, date: Option<DateTime<Utc>>) -> JobRecord {
    let mut r = JobRecord::new(title, url, "test");
    r.posted_date = date;
    r
}

/// Canned responses keyed by URL (GET) or `url#searchText` (POST).
/// Anything not registered answers HTTP 404.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.insert(key.into(), body.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, key: String, url: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(key.clone());
        self.responses
            .get(&key)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        self.answer(url.to_string(), url)
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<String, FetchError> {
        let term = body["searchText"].as_str().unwrap_or_default();
        self.answer(format!("{url}#{term}"), url)
    }
}
