// tests/filter_rules.rs
mod common;

use chrono::Duration;
use common::{at, record};
use job_harvest::ingest::filter::{filter_records, passes};
use job_harvest::FilterRules;

fn all_rules() -> FilterRules {
    FilterRules {
        max_age_days: Some(7),
        job_titles: vec!["scientist".into()],
        include_keywords: vec!["assay".into()],
        exclude_keywords: vec!["senior".into()],
    }
}

#[test]
fn each_rule_rejects_on_its_own() {
    let now = at(2024, 1, 15);
    let mut ok = record("u", "Scientist I", Some(now - Duration::days(1)));
    ok.description = Some("Develop ASSAY workflows".into());
    assert!(passes(&ok, &all_rules(), now));

    let mut stale = ok.clone();
    stale.posted_date = Some(now - Duration::days(8));
    assert!(!passes(&stale, &all_rules(), now));

    let mut wrong_title = ok.clone();
    wrong_title.title = "Research Associate".into();
    assert!(!passes(&wrong_title, &all_rules(), now));

    let mut no_keyword = ok.clone();
    no_keyword.description = Some("Develop cell lines".into());
    assert!(!passes(&no_keyword, &all_rules(), now));

    let mut excluded = ok.clone();
    excluded.title = "Senior Scientist".into();
    assert!(!passes(&excluded, &all_rules(), now));
}

#[test]
fn exclude_beats_include_and_title() {
    let rules = FilterRules {
        job_titles: vec!["scientist".into()],
        include_keywords: vec!["scientist".into()],
        exclude_keywords: vec!["intern".into()],
        ..Default::default()
    };
    let r = record("u", "Scientist Intern", None);
    assert!(!passes(&r, &rules, at(2024, 1, 15)));

    let mut by_desc = record("u", "Scientist", None);
    by_desc.description = Some("Summer internship program".into());
    assert!(!passes(&by_desc, &rules, at(2024, 1, 15)));
}

#[test]
fn unknown_date_passes_any_cutoff() {
    let r = record("u", "Anything", None);
    for days in [0, 1, 30, 3650] {
        let rules = FilterRules {
            max_age_days: Some(days),
            ..Default::default()
        };
        assert!(passes(&r, &rules, at(2024, 1, 15)));
    }
}

#[test]
fn include_keyword_may_come_from_description_only() {
    let rules = FilterRules {
        include_keywords: vec!["crispr".into()],
        ..Default::default()
    };
    let mut r = record("u", "Research Associate", None);
    assert!(!passes(&r, &rules, at(2024, 1, 15)));
    r.description = Some("Hands-on CRISPR screening".into());
    assert!(passes(&r, &rules, at(2024, 1, 15)));
}

#[test]
fn empty_rules_keep_everything_in_order() {
    let input = vec![
        record("c", "C", Some(at(2020, 1, 1))),
        record("a", "A", None),
        record("b", "B", Some(at(2024, 1, 1))),
    ];
    let out = filter_records(&input, &FilterRules::default(), at(2024, 1, 15));
    assert_eq!(out, input);
}

#[test]
fn filter_keeps_relative_order_of_survivors() {
    let rules = FilterRules {
        include_keywords: vec!["bio".into()],
        ..Default::default()
    };
    let input = vec![
        record("1", "Biologist", None),
        record("2", "Accountant", None),
        record("3", "Bioinformatician", None),
    ];
    let urls: Vec<String> = filter_records(&input, &rules, at(2024, 1, 15))
        .into_iter()
        .map(|r| r.url)
        .collect();
    assert_eq!(urls, vec!["1", "3"]);
}
