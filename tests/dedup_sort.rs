// tests/dedup_sort.rs
mod common;

use common::{at, record};
use job_harvest::ingest::dedup::{dedupe, dedupe_and_sort};
use job_harvest::ingest::filter_dedup_sort;
use job_harvest::FilterRules;

#[test]
fn dedupe_and_sort_is_idempotent() {
    let mut described = record("b", "B", Some(at(2024, 1, 3)));
    described.description = Some("details".into());
    let input = vec![
        record("a", "A", None),
        record("b", "B", Some(at(2024, 1, 3))),
        record("c", "C", Some(at(2024, 1, 9))),
        described,
        record("a", "A again", Some(at(2023, 12, 1))),
        record("d", "D", None),
    ];
    let once = dedupe_and_sort(input);
    let twice = dedupe_and_sort(once.clone());
    assert_eq!(once, twice);
}

#[test]
fn described_copy_wins_whatever_its_position() {
    let plain = record("a", "Research Scientist", Some(at(2024, 1, 10)));
    let mut rich = plain.clone();
    rich.description = Some("...".into());

    let (out, dropped) = dedupe(vec![plain.clone(), rich.clone()]);
    assert_eq!(dropped, 1);
    assert_eq!(out, vec![rich.clone()]);

    let (out, _) = dedupe(vec![rich.clone(), plain]);
    assert_eq!(out, vec![rich]);
}

#[test]
fn known_dates_descend_then_unknowns_in_input_order() {
    let out = dedupe_and_sort(vec![
        record("u1", "first unknown", None),
        record("k1", "old", Some(at(2023, 5, 1))),
        record("u2", "second unknown", None),
        record("k2", "new", Some(at(2024, 2, 1))),
        record("k3", "mid", Some(at(2023, 11, 1))),
    ]);

    let known: Vec<_> = out.iter().take_while(|r| r.posted_date.is_some()).collect();
    assert_eq!(known.len(), 3);
    for pair in known.windows(2) {
        assert!(pair[0].posted_date >= pair[1].posted_date);
    }
    assert!(out[3..].iter().all(|r| r.posted_date.is_none()));
    assert_eq!(out[3].url, "u1");
    assert_eq!(out[4].url, "u2");
}

#[test]
fn research_scenario() {
    let a = record("a", "Research Scientist", Some(at(2024, 1, 10)));
    let mut a_rich = a.clone();
    a_rich.description = Some("...".into());
    let b = record("b", "Sales Rep", Some(at(2024, 1, 12)));

    let rules = FilterRules {
        include_keywords: vec!["research".into()],
        ..Default::default()
    };
    let (kept, filtered_out, duplicates) =
        filter_dedup_sort(vec![a, a_rich.clone(), b], &rules, at(2024, 1, 15));

    assert_eq!(kept, vec![a_rich]);
    assert_eq!(filtered_out, 1);
    assert_eq!(duplicates, 1);
}
