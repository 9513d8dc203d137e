//! Pipeline orchestration.
//!
//! Sources run in parallel with respect to each other; within a source,
//! requests are strictly sequential with a politeness delay. A failing
//! source never takes down the run, it just contributes nothing.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::config::{Config, SourceProfile};
use crate::extract::{self, PatternSet};
use crate::fetch::Fetcher;
use crate::models::{FetchResult, MissionRecord};
use crate::store::{url_extension, ArtifactStore};
use crate::{classify, discover, document, export, merge, normalize};

/// Everything one source contributes to a run.
struct SourceBatch {
    source: String,
    links: usize,
    fetched: Vec<FetchResult>,
    records: Vec<MissionRecord>,
}

/// Run acquisition for the selected sources and write the merged exports.
pub async fn run(config: &Config, source: &str, limit: Option<usize>, dry_run: bool) -> Result<()> {
    let profiles = select_profiles(config, source)?;

    let store = ArtifactStore::open(&config.storage.root)
        .with_context(|| format!("Failed to open store: {}", config.storage.root.display()))?;
    let fetcher = Arc::new(Fetcher::new(config.fetch.clone(), store.clone())?);

    let mut handles = Vec::new();
    for profile in profiles {
        let patterns = extract::resolve_patterns(&config.patterns, profile.pattern_key())
            .with_context(|| format!("source '{}'", profile.name))?;
        let fetcher = Arc::clone(&fetcher);
        let extensions = config.fetch.allowed_extensions.clone();
        let delay = std::time::Duration::from_millis(config.fetch.request_delay_ms);
        handles.push(tokio::spawn(async move {
            process_source(fetcher, profile, patterns, extensions, delay, limit, dry_run).await
        }));
    }

    let mut batches: Vec<SourceBatch> = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Ok(batch)) => batches.push(batch),
            Ok(Err(e)) => warn!(error = %e, "source failed, continuing with the rest"),
            Err(e) => warn!(error = %e, "source task panicked, continuing with the rest"),
        }
    }

    let links: usize = batches.iter().map(|b| b.links).sum();
    let fetched: Vec<FetchResult> = batches.iter().flat_map(|b| b.fetched.clone()).collect();
    let archived = fetched
        .iter()
        .filter(|r| r.method == crate::models::RetrievalMethod::Archive)
        .count();
    let extracted: usize = batches.iter().map(|b| b.records.len()).sum();

    let merged = merge::merge_all(batches.into_iter().flat_map(|b| b.records));
    let mut records: Vec<MissionRecord> = merged.into_values().collect();
    for record in &mut records {
        record.category = classify::classify(record).to_string();
    }
    records.sort_by(|a, b| {
        (a.mission_name.as_str(), a.source.as_str())
            .cmp(&(b.mission_name.as_str(), b.source.as_str()))
    });

    let dataset_path = store.root().join("dataset.csv");
    let metadata_path = store.root().join("fetch_metadata.csv");
    if !dry_run {
        let refs: Vec<&MissionRecord> = records.iter().collect();
        export::write_records(&dataset_path, &refs)?;
        export::write_fetch_metadata(&metadata_path, &fetched)?;
    }

    println!("run");
    println!("  links discovered   {}", links);
    println!("  documents fetched  {}", fetched.len());
    println!("  via archive        {}", archived);
    println!("  records extracted  {}", extracted);
    println!("  records merged     {}", records.len());
    if dry_run {
        println!("  exports            skipped (dry run)");
    } else {
        println!("  dataset            {}", dataset_path.display());
        println!("  fetch metadata     {}", metadata_path.display());
    }
    println!("ok");

    Ok(())
}

fn select_profiles(config: &Config, source: &str) -> Result<Vec<SourceProfile>> {
    if config.sources.is_empty() {
        anyhow::bail!("no sources configured");
    }
    if source == "all" {
        return Ok(config.sources.clone());
    }
    let selected: Vec<SourceProfile> = config
        .sources
        .iter()
        .filter(|p| p.name == source)
        .cloned()
        .collect();
    if selected.is_empty() {
        anyhow::bail!(
            "unknown source '{}' (configured: {})",
            source,
            config
                .sources
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(selected)
}

/// One source, start to finish: discover links, fetch each document in
/// order, extract and normalize records.
async fn process_source(
    fetcher: Arc<Fetcher>,
    profile: SourceProfile,
    patterns: PatternSet,
    allowed_extensions: Vec<String>,
    request_delay: std::time::Duration,
    limit: Option<usize>,
    dry_run: bool,
) -> Result<SourceBatch> {
    let mut links = discover_links(&fetcher, &profile, &allowed_extensions, request_delay).await?;
    if let Some(limit) = limit {
        links.truncate(limit);
    }
    info!(source = %profile.name, links = links.len(), "discovery complete");

    if dry_run {
        for link in &links {
            println!("  {}  {}", profile.name, link);
        }
        return Ok(SourceBatch {
            source: profile.name,
            links: links.len(),
            fetched: Vec::new(),
            records: Vec::new(),
        });
    }

    let mut fetched = Vec::new();
    let mut records = Vec::new();
    for (i, link) in links.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(request_delay).await;
        }
        let result = match fetcher.fetch(link).await {
            Ok(result) => result,
            Err(e) => {
                warn!(source = %profile.name, url = %link, error = %e, "document skipped");
                continue;
            }
        };
        if let Some(record) = record_from_document(&fetcher, &profile, &patterns, &result) {
            records.push(record);
        }
        fetched.push(result);
    }

    if records.iter().any(|r| r.mission_name.is_empty() || r.country.is_empty()) {
        warn!(
            source = %profile.name,
            records = records.len(),
            "batch discarded: record without mission name or country"
        );
        records.clear();
    }

    info!(
        source = %profile.name,
        fetched = fetched.len(),
        records = records.len(),
        "source complete"
    );
    Ok(SourceBatch {
        source: profile.name,
        links: links.len(),
        fetched,
        records,
    })
}

/// Gather candidate document links from the profile's sitemaps and index
/// pages, filtered by extension and de-duplicated in discovery order.
async fn discover_links(
    fetcher: &Fetcher,
    profile: &SourceProfile,
    allowed_extensions: &[String],
    request_delay: std::time::Duration,
) -> Result<Vec<String>> {
    let mut candidates = Vec::new();
    let mut first = true;

    for url in &profile.sitemap_urls {
        if !first {
            tokio::time::sleep(request_delay).await;
        }
        first = false;
        match fetcher.fetch_page(url).await {
            Ok(xml) => candidates.extend(discover::links_from_sitemap(&xml)),
            Err(e) => warn!(source = %profile.name, url = %url, error = %e, "sitemap skipped"),
        }
    }

    for url in &profile.index_urls {
        if !first {
            tokio::time::sleep(request_delay).await;
        }
        first = false;
        let base = match Url::parse(url) {
            Ok(base) => base,
            Err(e) => {
                warn!(source = %profile.name, url = %url, error = %e, "bad index url, skipped");
                continue;
            }
        };
        match fetcher.fetch_page(url).await {
            Ok(html) => candidates.extend(discover::links_from_index(&html, &base)),
            Err(e) => warn!(source = %profile.name, url = %url, error = %e, "index page skipped"),
        }
    }

    let documents = discover::filter_documents(candidates, allowed_extensions);
    let mut seen = BTreeSet::new();
    Ok(documents
        .into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect())
}

/// Read a stored artifact back, pull its text, and extract one record.
/// Returns `None` when the document yields no usable fields.
fn record_from_document(
    fetcher: &Fetcher,
    profile: &SourceProfile,
    patterns: &PatternSet,
    result: &FetchResult,
) -> Option<MissionRecord> {
    let bytes = match fetcher.store().read(&result.artifact) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(url = %result.url, error = %e, "artifact unreadable, skipped");
            return None;
        }
    };
    let text = match document::extract_text(&bytes, &url_extension(&result.url)) {
        Ok(text) => text,
        Err(e) => {
            warn!(url = %result.url, error = %e, "text extraction failed, skipped");
            return None;
        }
    };

    let fields = extract::extract(&text, patterns);
    if fields.values().all(|v| v.is_empty()) {
        info!(url = %result.url, "no recognizable fields, skipped");
        return None;
    }

    let provenance = MissionRecord::with_provenance(
        &profile.name,
        &profile.language,
        &result.url,
        result.fetched_at,
    );
    Some(normalize::normalize(&fields, provenance))
}

/// Reconcile a scraped dataset into the curated master CSV.
pub fn reconcile(
    config: &Config,
    master_path: &Path,
    dataset_path: &Path,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut master = export::read_master(master_path)?;
    let records = export::read_records(dataset_path)?;

    let outcome = merge::link_master(&mut master, &records, config.merge.similarity_threshold);

    let output = output.unwrap_or_else(|| master_path.to_path_buf());
    export::write_master(&output, &master)?;

    println!("reconcile");
    println!("  master rows     {}", master.len());
    println!("  scraped records {}", records.len());
    println!("  rows updated    {}", outcome.updated);
    println!("  rows added      {}", outcome.added);
    println!("  output          {}", output.display());
    println!("ok");

    Ok(())
}
