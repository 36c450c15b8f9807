// tests/providers_aggregator.rs
mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::{fixture, MockFetcher};
use job_harvest::ingest::config::AggregatorSite;
use job_harvest::ingest::providers::aggregator::{parse_rows, query_url};
use job_harvest::ingest::providers::AggregatorProvider;
use job_harvest::{SourceError, SourceProvider};

fn site(terms: &[&str], locations: &[&str]) -> AggregatorSite {
    AggregatorSite {
        endpoint: "http://127.0.0.1:8000/search".into(),
        search_terms: terms.iter().map(|s| s.to_string()).collect(),
        locations: locations.iter().map(|s| s.to_string()).collect(),
        job_sites: vec!["indeed".into(), "linkedin".into()],
        results_wanted: 50,
        hours_old: 168,
        country: "USA".into(),
    }
}

#[test]
fn rows_fixture_maps_to_records() {
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
    let out = parse_rows(&fixture("aggregator_rows.json"), "boards", now).unwrap();

    assert_eq!(out.len(), 2, "row without job_url is dropped");
    assert_eq!(out[0].company.as_deref(), Some("Contoso Pharma"));
    assert_eq!(out[0].posted_date, Some(Utc.with_ymd_and_hms(2024, 3, 7, 0, 0, 0).unwrap()));

    let second = &out[1];
    assert_eq!(
        second.posted_date,
        Some(Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap())
    );
    assert_eq!(
        second.description.as_deref(),
        Some("Analyze NGS data. Functions: Research")
    );
}

#[test]
fn non_json_body_is_parse_error() {
    let err = parse_rows("Internal Server Error", "boards", Utc::now()).unwrap_err();
    assert!(err.is_parse());
}

#[tokio::test]
async fn one_query_per_term_and_location_with_failed_queries_skipped() {
    let s = site(&["qc analyst", "bioinformatics"], &["Boston, MA", "Newark, NJ"]);
    let ok = query_url(&s, "bioinformatics", Some("Newark, NJ")).unwrap();
    let fetcher = Arc::new(MockFetcher::new().with(ok.as_str(), fixture("aggregator_rows.json")));
    let provider = AggregatorProvider::new("boards".into(), s, fetcher.clone());

    let out = provider.fetch_latest().await.unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(fetcher.calls().len(), 4);
    assert_eq!(fetcher.calls()[3], ok.as_str());
}

#[tokio::test]
async fn every_query_failing_fails_the_source() {
    let provider = AggregatorProvider::new(
        "boards".into(),
        site(&["a", "b"], &[]),
        Arc::new(MockFetcher::new()),
    );
    assert!(matches!(
        provider.fetch_latest().await,
        Err(SourceError::AllRequestsFailed { attempts: 2 })
    ));
}
