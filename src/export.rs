//! Tabular exports: the canonical dataset, fetch metadata, and the master
//! CSV round-trip used by `reconcile`.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::models::{FetchResult, MasterRecord, MergeStatus, MissionRecord};
use crate::tabular;

const RECORD_COLUMNS: [&str; 14] = [
    "mission_name",
    "country",
    "start_date",
    "end_date",
    "personnel_total",
    "cost_total",
    "mission_type",
    "mandate",
    "notes",
    "document_link",
    "source",
    "language",
    "last_updated",
    "category",
];

const METADATA_COLUMNS: [&str; 8] = [
    "filename",
    "original_url",
    "download_date",
    "file_size",
    "content_type",
    "source_domain",
    "content_hash",
    "retrieval_method",
];

const MASTER_COLUMNS: [&str; 11] = [
    "mission_name",
    "country",
    "start_date",
    "end_date",
    "personnel_total",
    "cost_total",
    "mission_type",
    "mandate",
    "notes",
    "document_link",
    "merge_status",
];

fn record_row(record: &MissionRecord) -> Vec<String> {
    vec![
        record.mission_name.clone(),
        record.country.clone(),
        record.start_date.clone(),
        record.end_date.clone(),
        record.personnel_total.to_string(),
        record.cost_total.to_string(),
        record.mission_type.clone(),
        record.mandate.clone(),
        record.notes.clone(),
        record.document_link.clone(),
        record.source.clone(),
        record.language.clone(),
        record.last_updated.to_rfc3339(),
        record.category.clone(),
    ]
}

/// Write the canonical record set as CSV.
pub fn write_records(path: &Path, records: &[&MissionRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create dataset export: {}", path.display()))?;
    let mut w = BufWriter::new(file);
    tabular::write_row(&mut w, &owned(&RECORD_COLUMNS))?;
    for record in records {
        tabular::write_row(&mut w, &record_row(record))?;
    }
    w.flush()?;
    Ok(())
}

/// Read a dataset export back into records (used by `reconcile`).
pub fn read_records(path: &Path) -> Result<Vec<MissionRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
    let mut rows = tabular::parse_rows(&text).into_iter();
    let header = rows
        .next()
        .ok_or_else(|| anyhow::anyhow!("dataset has no header row: {}", path.display()))?;
    let index = column_index(&header);

    let mut records = Vec::new();
    for row in rows {
        let get = |name: &str| cell(&row, &index, name);
        let last_updated = chrono::DateTime::parse_from_rfc3339(&get("last_updated"))
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now());
        let mut record = MissionRecord::with_provenance(
            &get("source"),
            &get("language"),
            &get("document_link"),
            last_updated,
        );
        record.mission_name = get("mission_name");
        record.country = get("country");
        record.start_date = get("start_date");
        record.end_date = get("end_date");
        record.personnel_total = get("personnel_total").parse().unwrap_or(0);
        record.cost_total = get("cost_total").parse().unwrap_or(0.0);
        record.mission_type = get("mission_type");
        record.mandate = get("mandate");
        record.notes = get("notes");
        record.category = get("category");
        records.push(record);
    }
    Ok(records)
}

/// Write the companion fetch-metadata CSV.
pub fn write_fetch_metadata(path: &Path, results: &[FetchResult]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create metadata export: {}", path.display()))?;
    let mut w = BufWriter::new(file);
    tabular::write_row(&mut w, &owned(&METADATA_COLUMNS))?;
    for result in results {
        tabular::write_row(
            &mut w,
            &[
                result.filename(),
                result.url.clone(),
                result.fetched_at.to_rfc3339(),
                result.size.to_string(),
                result.content_type.clone(),
                result.source_domain.clone(),
                result.content_hash.clone(),
                result.method.as_str().to_string(),
            ],
        )?;
    }
    w.flush()?;
    Ok(())
}

/// Load the curated master dataset. A `merge_status` column is optional on
/// input; rows without one are curated.
pub fn read_master(path: &Path) -> Result<Vec<MasterRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read master dataset: {}", path.display()))?;
    let mut rows = tabular::parse_rows(&text).into_iter();
    let header = rows
        .next()
        .ok_or_else(|| anyhow::anyhow!("master has no header row: {}", path.display()))?;
    let index = column_index(&header);

    let mut master = Vec::new();
    for row in rows {
        let get = |name: &str| cell(&row, &index, name);
        master.push(MasterRecord {
            mission_name: get("mission_name"),
            country: get("country"),
            start_date: get("start_date"),
            end_date: get("end_date"),
            personnel_total: get("personnel_total"),
            cost_total: get("cost_total"),
            mission_type: get("mission_type"),
            mandate: get("mandate"),
            notes: get("notes"),
            document_link: get("document_link"),
            status: match get("merge_status").as_str() {
                "updated-by-merge" => MergeStatus::Updated,
                "added-by-merge" => MergeStatus::Added,
                _ => MergeStatus::Curated,
            },
        });
    }
    Ok(master)
}

/// Write the reconciled master, provenance marker included.
pub fn write_master(path: &Path, master: &[MasterRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create master export: {}", path.display()))?;
    let mut w = BufWriter::new(file);
    tabular::write_row(&mut w, &owned(&MASTER_COLUMNS))?;
    for row in master {
        tabular::write_row(
            &mut w,
            &[
                row.mission_name.clone(),
                row.country.clone(),
                row.start_date.clone(),
                row.end_date.clone(),
                row.personnel_total.clone(),
                row.cost_total.clone(),
                row.mission_type.clone(),
                row.mandate.clone(),
                row.notes.clone(),
                row.document_link.clone(),
                row.status.as_str().to_string(),
            ],
        )?;
    }
    w.flush()?;
    Ok(())
}

fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

fn column_index(header: &[String]) -> HashMap<String, usize> {
    header
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_lowercase(), i))
        .collect()
}

fn cell(row: &[String], index: &HashMap<String, usize>, name: &str) -> String {
    index
        .get(name)
        .and_then(|&i| row.get(i))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn records_round_trip_through_csv() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("dataset.csv");

        let mut record =
            MissionRecord::with_provenance("eeas", "en", "https://x.org/m.pdf", Utc::now());
        record.mission_name = "EUTM Mali".to_string();
        record.country = "Mali".to_string();
        record.start_date = "2013-02-18".to_string();
        record.personnel_total = 580;
        record.cost_total = 1234.56;
        record.notes = "training, advisory".to_string();
        record.category = "UE-Militare".to_string();

        write_records(&path, &[&record]).unwrap();
        let loaded = read_records(&path).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].mission_name, "EUTM Mali");
        assert_eq!(loaded[0].personnel_total, 580);
        assert!((loaded[0].cost_total - 1234.56).abs() < 1e-9);
        assert_eq!(loaded[0].notes, "training, advisory");
        assert_eq!(loaded[0].category, "UE-Militare");
    }

    #[test]
    fn master_round_trip_preserves_status() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("master.csv");

        let master = vec![MasterRecord {
            mission_name: "UNIFIL".to_string(),
            country: "Lebanon".to_string(),
            start_date: "1978".to_string(),
            end_date: String::new(),
            personnel_total: "1000".to_string(),
            cost_total: String::new(),
            mission_type: String::new(),
            mandate: String::new(),
            notes: String::new(),
            document_link: String::new(),
            status: MergeStatus::Updated,
        }];

        write_master(&path, &master).unwrap();
        let loaded = read_master(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].status, MergeStatus::Updated);
    }

    #[test]
    fn master_without_status_column_is_curated() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("master.csv");
        std::fs::write(&path, "mission_name,country\nUNIFIL,Lebanon\n").unwrap();

        let loaded = read_master(&path).unwrap();
        assert_eq!(loaded[0].status, MergeStatus::Curated);
        assert_eq!(loaded[0].mission_name, "UNIFIL");
    }
}
