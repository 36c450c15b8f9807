// src/ingest/dedup.rs
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::ingest::types::JobRecord;

/// Higher is better: (has description, has posted date).
fn quality(r: &JobRecord) -> (bool, bool) {
    (r.has_description(), r.posted_date.is_some())
}

/// Collapse records sharing a `url` (exact string match), keeping the best copy:
/// non-empty description first, then known posted date, then first seen.
/// The kept copy takes the position of the first occurrence of its url.
pub fn dedupe(records: Vec<JobRecord>) -> (Vec<JobRecord>, usize) {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut out: Vec<JobRecord> = Vec::with_capacity(records.len());
    let mut dropped = 0usize;

    for r in records {
        match index.get(&r.url) {
            Some(&i) => {
                dropped += 1;
                if quality(&r) > quality(&out[i]) {
                    out[i] = r;
                }
            }
            None => {
                index.insert(r.url.clone(), out.len());
                out.push(r);
            }
        }
    }

    (out, dropped)
}

/// Most recent first; unknown dates after all known ones. Stable.
pub fn sort_by_recency(records: &mut [JobRecord]) {
    records.sort_by(|a, b| match (a.posted_date, b.posted_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

pub fn dedupe_and_sort(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let (mut out, _) = dedupe(records);
    sort_by_recency(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn url_compare_is_case_sensitive() {
        let a = JobRecord::new("A", "https://x.test/Job/1", "s");
        let b = JobRecord::new("A", "https://x.test/job/1", "s");
        let (out, dropped) = dedupe(vec![a, b]);
        assert_eq!(out.len(), 2);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn known_date_beats_unknown_when_descriptions_tie() {
        let a = JobRecord::new("A", "u", "first");
        let mut b = JobRecord::new("A", "u", "second");
        b.posted_date = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let (out, dropped) = dedupe(vec![a, b]);
        assert_eq!(dropped, 1);
        assert_eq!(out[0].source, "second");
    }

    #[test]
    fn whitespace_description_counts_as_empty() {
        let mut a = JobRecord::new("A", "u", "first");
        a.description = Some("   ".into());
        let b = JobRecord::new("A", "u", "second");
        let (out, _) = dedupe(vec![a, b]);
        assert_eq!(out[0].source, "first");
    }
}
