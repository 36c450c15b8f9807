// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::ingest::fetcher::FetcherSettings;
use crate::ingest::filter::{normalize_keywords, FilterRules};
use crate::storage::OutputFormat;

pub const ENV_CONFIG_PATH: &str = "JOB_HARVEST_CONFIG";
pub const DEFAULT_TOML_PATH: &str = "config/jobs.toml";
pub const DEFAULT_JSON_PATH: &str = "config/jobs.json";

fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_max_pages() -> u32 {
    1
}
fn default_job_sites() -> Vec<String> {
    vec!["indeed".to_string()]
}
fn default_results_wanted() -> u32 {
    50
}
fn default_hours_old() -> u32 {
    168
}
fn default_country() -> String {
    "USA".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default, alias = "keywords")]
    pub include_keywords: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default)]
    pub job_titles: Vec<String>,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Date cutoff in days; absent means no cutoff.
    #[serde(default)]
    pub days_back: Option<u32>,
    #[serde(default)]
    pub sleep_seconds: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            days_back: None,
            sleep_seconds: 0.0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Two-letter US state codes; empty keeps every location.
    #[serde(default)]
    pub target_states: Vec<String>,
    #[serde(default)]
    pub detail_page: Option<DetailPageConfig>,
    #[serde(flatten)]
    pub kind: SiteKind,
}

impl SiteConfig {
    /// Selector for detail enrichment, when enabled and configured.
    pub fn detail_selector(&self) -> Option<&str> {
        self.detail_page
            .as_ref()
            .filter(|d| d.enabled)
            .and_then(|d| d.description_selector.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailPageConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub description_selector: Option<String>,
}

/// Known site types. Resolved once per run into a provider (see `providers::build_sources`).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SiteKind {
    Generic(GenericSite),
    Workday(WorkdaySite),
    Aggregator(AggregatorSite),
}

impl SiteKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Generic(_) => "generic",
            Self::Workday(_) => "workday",
            Self::Aggregator(_) => "aggregator",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenericSite {
    #[serde(default)]
    pub base_url: Option<String>,
    pub start_urls: Vec<String>,
    /// Only the first page of each start URL is fetched.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    pub list_item_selector: String,
    pub title_selector: String,
    pub url_selector: String,
    #[serde(default)]
    pub url_attr: Option<String>,
    #[serde(default)]
    pub company_selector: Option<String>,
    #[serde(default)]
    pub location_selector: Option<String>,
    #[serde(default)]
    pub date_selector: Option<String>,
    #[serde(default)]
    pub date_attr: Option<String>,
    #[serde(default)]
    pub description_selector: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkdaySite {
    pub workday_url: String,
    /// Empty means a single unfiltered search.
    #[serde(default)]
    pub search_terms: Vec<String>,
    #[serde(default)]
    pub company: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorSite {
    pub endpoint: String,
    #[serde(default)]
    pub search_terms: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default = "default_job_sites")]
    pub job_sites: Vec<String>,
    #[serde(default = "default_results_wanted")]
    pub results_wanted: u32,
    #[serde(default = "default_hours_old")]
    pub hours_old: u32,
    #[serde(default = "default_country")]
    pub country: String,
}

impl AppConfig {
    /// Configured rules plus ad-hoc keywords, normalized once for the run.
    pub fn resolve_rules<S: AsRef<str>>(&self, extra_keywords: &[S]) -> FilterRules {
        FilterRules {
            max_age_days: self.schedule.days_back,
            job_titles: normalize_keywords(&self.job_titles),
            include_keywords: normalize_keywords(&self.include_keywords),
            exclude_keywords: normalize_keywords(&self.exclude_keywords),
        }
        .with_extra_keywords(extra_keywords)
    }

    pub fn fetcher_settings(&self) -> FetcherSettings {
        FetcherSettings {
            timeout: Duration::from_secs(self.schedule.timeout_secs.max(1)),
            sleep_seconds: self.schedule.sleep_seconds.max(0.0),
            ..FetcherSettings::default()
        }
    }

    pub fn enabled_sites(&self) -> impl Iterator<Item = &SiteConfig> {
        self.sites.iter().filter(|s| s.enabled)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::NoSites);
        }
        for (index, site) in self.sites.iter().enumerate() {
            if site.name.trim().is_empty() {
                return Err(ConfigError::EmptySiteName { index });
            }
            let invalid = |reason: String| ConfigError::InvalidSite {
                site: site.name.clone(),
                reason,
            };

            if let Some(sel) = site.detail_selector() {
                check_selector(sel).map_err(invalid)?;
            }

            match &site.kind {
                SiteKind::Generic(g) => {
                    if g.start_urls.iter().all(|u| u.trim().is_empty()) {
                        return Err(invalid("at least one start_url is required".into()));
                    }
                    let required = [&g.list_item_selector, &g.title_selector, &g.url_selector];
                    let optional = [
                        &g.company_selector,
                        &g.location_selector,
                        &g.date_selector,
                        &g.description_selector,
                    ];
                    for sel in required
                        .into_iter()
                        .map(String::as_str)
                        .chain(optional.into_iter().flatten().map(String::as_str))
                    {
                        check_selector(sel).map_err(invalid)?;
                    }
                }
                SiteKind::Workday(w) => {
                    url::Url::parse(&w.workday_url)
                        .map_err(|e| invalid(format!("workday_url: {e}")))?;
                }
                SiteKind::Aggregator(a) => {
                    url::Url::parse(&a.endpoint).map_err(|e| invalid(format!("endpoint: {e}")))?;
                }
            }
        }
        Ok(())
    }

    fn cleaned(mut self) -> Self {
        self.include_keywords = clean_list(self.include_keywords);
        self.exclude_keywords = clean_list(self.exclude_keywords);
        self.job_titles = clean_list(self.job_titles);
        self
    }
}

fn check_selector(sel: &str) -> std::result::Result<(), String> {
    scraper::Selector::parse(sel)
        .map(|_| ())
        .map_err(|e| format!("invalid selector `{sel}`: {e}"))
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg = parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load config using env var + fallbacks:
/// 1) $JOB_HARVEST_CONFIG
/// 2) config/jobs.toml
/// 3) config/jobs.json
pub fn load_config_default() -> Result<AppConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_config_from(&p);
        }
    }
    Err(anyhow!(
        "no config found (set {ENV_CONFIG_PATH} or create {DEFAULT_TOML_PATH})"
    ))
}

pub fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    let cfg = match hint_ext {
        "toml" => toml::from_str::<AppConfig>(s).context("invalid TOML config")?,
        "json" => serde_json::from_str::<AppConfig>(s).context("invalid JSON config")?,
        _ => match toml::from_str::<AppConfig>(s) {
            Ok(c) => c,
            Err(_) => serde_json::from_str::<AppConfig>(s)
                .map_err(|_| anyhow!("unsupported config format"))?,
        },
    };
    Ok(cfg.cleaned())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|it| it.trim().to_string())
        .filter(|it| !it.is_empty())
        .collect()
}
