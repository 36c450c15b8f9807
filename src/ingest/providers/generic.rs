// src/ingest/providers/generic.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::SourceError;
use crate::ingest::config::GenericSite;
use crate::ingest::dates::parse_posted_date;
use crate::ingest::fetcher::Fetcher;
use crate::ingest::normalize_text;
use crate::ingest::providers::{all_failed, record_parse_metrics};
use crate::ingest::types::{JobRecord, SourceProvider};

struct Selectors {
    item: Selector,
    title: Selector,
    url: Selector,
    company: Option<Selector>,
    location: Option<Selector>,
    date: Option<Selector>,
    description: Option<Selector>,
}

fn compile(sel: &str) -> Result<Selector, SourceError> {
    Selector::parse(sel).map_err(|e| SourceError::Parse(format!("selector `{sel}`: {e}")))
}

fn compile_opt(sel: Option<&String>) -> Result<Option<Selector>, SourceError> {
    sel.map(|s| compile(s)).transpose()
}

impl Selectors {
    fn compile(site: &GenericSite) -> Result<Self, SourceError> {
        Ok(Self {
            item: compile(&site.list_item_selector)?,
            title: compile(&site.title_selector)?,
            url: compile(&site.url_selector)?,
            company: compile_opt(site.company_selector.as_ref())?,
            location: compile_opt(site.location_selector.as_ref())?,
            date: compile_opt(site.date_selector.as_ref())?,
            description: compile_opt(site.description_selector.as_ref())?,
        })
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<Vec<_>>().join(" "))
}

fn field(item: ElementRef<'_>, sel: Option<&Selector>) -> Option<String> {
    let el = item.select(sel?).next()?;
    Some(text_of(el)).filter(|t| !t.is_empty())
}

fn attr_of(item: ElementRef<'_>, sel: &Selector, attr: &str) -> Option<String> {
    let el = item.select(sel).next()?;
    el.value()
        .attr(attr)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Attribute when configured and present, element text otherwise.
fn attr_or_text(item: ElementRef<'_>, sel: &Selector, attr: Option<&str>) -> Option<String> {
    if let Some(v) = attr.and_then(|a| attr_of(item, sel, a)) {
        return Some(v);
    }
    let el = item.select(sel).next()?;
    Some(text_of(el)).filter(|t| !t.is_empty())
}

fn resolve_url(base: Option<&Url>, href: &str) -> Option<String> {
    match Url::parse(href) {
        Ok(abs) => Some(abs.to_string()),
        Err(_) => base?.join(href).ok().map(|u| u.to_string()),
    }
}

/// Parse one listing page. Items without a title or URL are skipped.
pub fn parse_listing_page(
    html: &str,
    site: &GenericSite,
    source: &str,
    page_url: &str,
    now: DateTime<Utc>,
) -> Result<Vec<JobRecord>, SourceError> {
    let sels = Selectors::compile(site)?;
    let base = site
        .base_url
        .as_deref()
        .and_then(|b| Url::parse(b).ok())
        .or_else(|| Url::parse(page_url).ok());
    let url_attr = site.url_attr.as_deref().unwrap_or("href");

    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    for item in doc.select(&sels.item) {
        let Some(title) = field(item, Some(&sels.title)) else {
            continue;
        };
        let Some(url) = attr_of(item, &sels.url, url_attr)
            .and_then(|href| resolve_url(base.as_ref(), &href))
        else {
            continue;
        };

        let mut rec = JobRecord::new(title, url, source);
        rec.company = field(item, sels.company.as_ref());
        rec.location = field(item, sels.location.as_ref());
        rec.description = field(item, sels.description.as_ref());
        rec.posted_date = sels
            .date
            .as_ref()
            .and_then(|s| attr_or_text(item, s, site.date_attr.as_deref()))
            .and_then(|raw| parse_posted_date(&raw, now));
        out.push(rec);
    }
    Ok(out)
}

/// CSS-selector driven listing pages.
pub struct GenericSiteProvider {
    name: String,
    site: GenericSite,
    fetcher: Arc<dyn Fetcher>,
}

impl GenericSiteProvider {
    pub fn new(name: String, site: GenericSite, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            name,
            site,
            fetcher,
        }
    }
}

#[async_trait]
impl SourceProvider for GenericSiteProvider {
    async fn fetch_latest(&self) -> Result<Vec<JobRecord>, SourceError> {
        let mut out = Vec::new();
        let mut failures = 0usize;
        let mut last_err = None;

        let urls: Vec<&str> = self
            .site
            .start_urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .collect();

        for url in &urls {
            let html = match self.fetcher.get(url).await {
                Ok(h) => h,
                Err(e) => {
                    tracing::warn!(target: "ingest", source = %self.name, %url, error = %e, "start url failed");
                    failures += 1;
                    last_err = Some(e);
                    continue;
                }
            };
            let t0 = std::time::Instant::now();
            let mut page = parse_listing_page(&html, &self.site, &self.name, url, Utc::now())?;
            record_parse_metrics(t0, page.len());
            tracing::debug!(target: "ingest", source = %self.name, %url, items = page.len(), "page parsed");
            out.append(&mut page);
        }

        match last_err {
            Some(e) if failures == urls.len() => Err(all_failed(failures, e)),
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

    fn site() -> GenericSite {
        GenericSite {
            base_url: Some("https://careers.example.test/".into()),
            start_urls: vec!["https://careers.example.test/jobs".into()],
            max_pages: 1,
            list_item_selector: "div.job".into(),
            title_selector: "h3".into(),
            url_selector: "a".into(),
            url_attr: None,
            company_selector: Some(".company".into()),
            location_selector: Some(".loc".into()),
            date_selector: Some("time".into()),
            date_attr: Some("datetime".into()),
            description_selector: None,
        }
    }

    #[test]
    fn relative_links_resolve_against_base_url() {
        let html = r#"<div class="job"><h3>Research Associate</h3>
            <a href="/jobs/42">apply</a><span class="loc">Boston, MA</span>
            <time datetime="2024-03-01">Mar 1</time></div>"#;
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let out = parse_listing_page(html, &site(), "board", "https://careers.example.test/jobs", now)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://careers.example.test/jobs/42");
        assert_eq!(out[0].location.as_deref(), Some("Boston, MA"));
        assert_eq!(out[0].company, None);
        assert_eq!(
            out[0].posted_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn items_missing_title_or_link_are_skipped() {
        let html = r#"<div class="job"><a href="/x">no title</a></div>
            <div class="job"><h3>No link</h3></div>"#;
        let out = parse_listing_page(html, &site(), "board", "https://careers.example.test/", Utc::now())
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn bad_selector_is_a_parse_error() {
        let mut s = site();
        s.title_selector = "h3[[".into();
        let err = parse_listing_page("<div></div>", &s, "board", "https://x.test/", Utc::now())
            .unwrap_err();
        assert!(err.is_parse());
    }
}
