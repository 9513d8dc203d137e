//! Core data models used throughout the pipeline.
//!
//! These types represent fetched artifacts and mission records as they flow
//! through acquisition, extraction, normalization, and merging.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// How a document was ultimately retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMethod {
    /// Fetched directly from the source URL.
    Direct,
    /// Recovered from the archival-snapshot service after direct attempts failed.
    Archive,
}

impl RetrievalMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMethod::Direct => "direct",
            RetrievalMethod::Archive => "archive",
        }
    }
}

/// Outcome of a successful document fetch.
///
/// Identity is `content_hash`: two results with the same hash point at the
/// same stored artifact, regardless of the URLs they came from.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: String,
    pub content_hash: String,
    pub size: u64,
    pub content_type: String,
    pub source_domain: String,
    pub fetched_at: DateTime<Utc>,
    pub method: RetrievalMethod,
    /// Path of the stored artifact (existing or newly written).
    pub artifact: PathBuf,
}

impl FetchResult {
    /// Artifact file name, `{first-12-hex-chars-of-hash}{original-extension}`.
    pub fn filename(&self) -> String {
        self.artifact
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// One structured mission record extracted from a single document or page.
///
/// Date fields hold canonical ISO `YYYY-MM-DD` strings, or `""` when the
/// source gave nothing parseable. `category` is empty until the classifier
/// has run.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionRecord {
    pub mission_name: String,
    pub country: String,
    pub start_date: String,
    pub end_date: String,
    pub personnel_total: u32,
    pub cost_total: f64,
    pub mission_type: String,
    pub mandate: String,
    pub notes: String,
    pub document_link: String,
    pub source: String,
    pub language: String,
    pub last_updated: DateTime<Utc>,
    pub category: String,
}

impl MissionRecord {
    /// An empty record carrying only provenance, used as the starting point
    /// for normalization.
    pub fn with_provenance(
        source: &str,
        language: &str,
        document_link: &str,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            mission_name: String::new(),
            country: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            personnel_total: 0,
            cost_total: 0.0,
            mission_type: String::new(),
            mandate: String::new(),
            notes: String::new(),
            document_link: document_link.to_string(),
            source: source.to_string(),
            language: language.to_string(),
            last_updated,
            category: String::new(),
        }
    }
}

/// Provenance marker for a master-dataset row after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    /// Untouched curated row.
    Curated,
    /// Row overwritten by a fuzzy-linked scraped record.
    Updated,
    /// Row appended because no master row matched the scraped record.
    Added,
}

impl MergeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStatus::Curated => "",
            MergeStatus::Updated => "updated-by-merge",
            MergeStatus::Added => "added-by-merge",
        }
    }
}

/// A row of the externally curated master dataset.
///
/// The master's identity scheme differs from the scraped one (hand-assigned
/// rows, free-form values), so all fields stay as text and linking is fuzzy.
#[derive(Debug, Clone)]
pub struct MasterRecord {
    pub mission_name: String,
    pub country: String,
    pub start_date: String,
    pub end_date: String,
    pub personnel_total: String,
    pub cost_total: String,
    pub mission_type: String,
    pub mandate: String,
    pub notes: String,
    pub document_link: String,
    pub status: MergeStatus,
}
