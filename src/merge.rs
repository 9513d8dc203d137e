//! Identity assignment, recency-based deduplication, and fuzzy linking
//! against the curated master dataset.
//!
//! Exact-identity merging is commutative and associative per identity
//! bucket: the surviving record depends only on the candidate set, never on
//! arrival order. Fuzzy linking is an O(n·m) full scan against the master —
//! deliberate at this dataset's scale (low hundreds of rows per side); do
//! not reuse it where the pair count grows much beyond that.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{MasterRecord, MergeStatus, MissionRecord};

/// Deterministic identity over the record's key fields.
pub fn identity(record: &MissionRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.mission_name.to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(record.country.to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(record.start_date.as_bytes());
    hasher.update(b"|");
    hasher.update(record.source.as_bytes());
    hex::encode(hasher.finalize())
}

/// Merge candidates into the canonical per-identity map.
///
/// Unseen identity → insert. Seen identity → the strictly more recent
/// `last_updated` wins; ties keep the stored record.
pub fn merge_all<I>(records: I) -> BTreeMap<String, MissionRecord>
where
    I: IntoIterator<Item = MissionRecord>,
{
    let mut merged: BTreeMap<String, MissionRecord> = BTreeMap::new();
    for record in records {
        let id = identity(&record);
        match merged.get(&id) {
            Some(existing) if record.last_updated <= existing.last_updated => {
                debug!(identity = %id, "duplicate identity, keeping stored record");
            }
            _ => {
                merged.insert(id, record);
            }
        }
    }
    merged
}

/// Normalized edit-distance ratio in [0, 1] over lowercased input.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&a.trim().to_lowercase(), &b.trim().to_lowercase())
}

/// Outcome counts of a master reconciliation pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkOutcome {
    pub updated: usize,
    pub added: usize,
}

/// Fuzzy-link scraped records against the curated master set.
///
/// For each incoming record the best of name-vs-name and country-vs-country
/// similarity over every master row decides the link. Above the threshold
/// the master row is overwritten by the incoming fields and marked
/// `updated-by-merge`; otherwise the record is appended as `added-by-merge`.
pub fn link_master(
    master: &mut Vec<MasterRecord>,
    incoming: &[MissionRecord],
    threshold: f64,
) -> LinkOutcome {
    let mut outcome = LinkOutcome::default();

    for record in incoming {
        let mut best: Option<(usize, f64)> = None;
        for (idx, row) in master.iter().enumerate() {
            let score = similarity(&record.mission_name, &row.mission_name)
                .max(similarity(&record.country, &row.country));
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((idx, score));
            }
        }

        match best {
            Some((idx, score)) if score > threshold => {
                overwrite_row(&mut master[idx], record, MergeStatus::Updated);
                outcome.updated += 1;
            }
            _ => {
                let mut row = MasterRecord {
                    mission_name: String::new(),
                    country: String::new(),
                    start_date: String::new(),
                    end_date: String::new(),
                    personnel_total: String::new(),
                    cost_total: String::new(),
                    mission_type: String::new(),
                    mandate: String::new(),
                    notes: String::new(),
                    document_link: String::new(),
                    status: MergeStatus::Curated,
                };
                overwrite_row(&mut row, record, MergeStatus::Added);
                master.push(row);
                outcome.added += 1;
            }
        }
    }

    outcome
}

fn overwrite_row(row: &mut MasterRecord, record: &MissionRecord, status: MergeStatus) {
    row.mission_name = record.mission_name.clone();
    row.country = record.country.clone();
    row.start_date = record.start_date.clone();
    row.end_date = record.end_date.clone();
    row.personnel_total = record.personnel_total.to_string();
    row.cost_total = record.cost_total.to_string();
    row.mission_type = record.mission_type.clone();
    row.mandate = record.mandate.clone();
    row.notes = record.notes.clone();
    row.document_link = record.document_link.clone();
    row.status = status;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(name: &str, country: &str, updated: &str) -> MissionRecord {
        let ts = NaiveDate::parse_from_str(updated, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        let mut r = MissionRecord::with_provenance("eeas", "en", "", ts);
        r.mission_name = name.to_string();
        r.country = country.to_string();
        r.start_date = "2013-02-18".to_string();
        r
    }

    #[test]
    fn identity_ignores_name_and_country_case() {
        let a = record("EUTM Mali", "Mali", "2023-01-01");
        let b = record("eutm mali", "MALI", "2023-06-01");
        assert_eq!(identity(&a), identity(&b));
    }

    #[test]
    fn identity_separates_sources() {
        let a = record("EUTM Mali", "Mali", "2023-01-01");
        let mut b = a.clone();
        b.source = "difesa".to_string();
        assert_ne!(identity(&a), identity(&b));
    }

    #[test]
    fn more_recent_record_wins_regardless_of_order() {
        let older = record("EUTM Mali", "Mali", "2023-01-01");
        let newer = record("EUTM Mali", "Mali", "2023-06-01");

        let forward = merge_all(vec![older.clone(), newer.clone()]);
        let backward = merge_all(vec![newer.clone(), older.clone()]);

        assert_eq!(forward.len(), 1);
        for merged in [forward, backward] {
            let kept = merged.values().next().unwrap();
            assert_eq!(kept.last_updated, newer.last_updated);
        }
    }

    #[test]
    fn tie_keeps_stored_record() {
        let mut first = record("UNIFIL", "Lebanon", "2023-01-01");
        first.notes = "first".to_string();
        let mut second = record("UNIFIL", "Lebanon", "2023-01-01");
        second.notes = "second".to_string();

        let merged = merge_all(vec![first, second]);
        assert_eq!(merged.values().next().unwrap().notes, "first");
    }

    #[test]
    fn distinct_identities_are_all_kept() {
        let merged = merge_all(vec![
            record("EUTM Mali", "Mali", "2023-01-01"),
            record("UNIFIL", "Lebanon", "2023-01-01"),
            record("KFOR", "Kosovo", "2023-01-01"),
        ]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn similarity_separates_near_and_far_names() {
        assert!(similarity("EUTM Mali", "EUTM-Mali") > 0.8);
        assert!(similarity("EUTM Mali", "UNIFIL") <= 0.8);
        assert!((similarity("UNIFIL", "unifil") - 1.0).abs() < 1e-9);
    }

    fn master_row(name: &str, country: &str) -> MasterRecord {
        MasterRecord {
            mission_name: name.to_string(),
            country: country.to_string(),
            start_date: "2006".to_string(),
            end_date: String::new(),
            personnel_total: "1000".to_string(),
            cost_total: String::new(),
            mission_type: String::new(),
            mandate: String::new(),
            notes: "curated".to_string(),
            document_link: String::new(),
            status: MergeStatus::Curated,
        }
    }

    #[test]
    fn link_overwrites_best_fuzzy_match_and_marks_it() {
        let mut master = vec![master_row("EUTM-Mali", "Mali"), master_row("UNIFIL", "Lebanon")];
        let mut incoming = record("EUTM Mali", "Mali", "2023-06-01");
        incoming.personnel_total = 580;

        let outcome = link_master(&mut master, &[incoming], 0.8);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.added, 0);
        assert_eq!(master[0].mission_name, "EUTM Mali");
        assert_eq!(master[0].personnel_total, "580");
        assert_eq!(master[0].status, MergeStatus::Updated);
        assert_eq!(master[1].status, MergeStatus::Curated);
    }

    #[test]
    fn link_appends_unmatched_records() {
        let mut master = vec![master_row("UNIFIL", "Lebanon")];
        let incoming = record("Operazione Mare Sicuro", "Italia", "2023-06-01");

        let outcome = link_master(&mut master, &[incoming], 0.8);
        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.added, 1);
        assert_eq!(master.len(), 2);
        assert_eq!(master[1].status, MergeStatus::Added);
    }
}
