//! Pattern-driven field extraction.
//!
//! A [`PatternSet`] is an ordered field → regex table, selected per
//! (source, language) pair by the pipeline driver. [`extract`] applies it to
//! raw document text and always returns the complete field shape: a field
//! with no match is present with an empty value, never omitted. Pure, no I/O.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;

/// Fields every pattern set declares, in export order.
pub const RECORD_FIELDS: [&str; 8] = [
    "mission_name",
    "country",
    "start_date",
    "end_date",
    "personnel_total",
    "cost_total",
    "mission_type",
    "mandate",
];

/// A compiled, ordered field → regex table.
#[derive(Debug, Clone)]
pub struct PatternSet {
    fields: Vec<(String, Regex)>,
}

impl PatternSet {
    /// Compile a field → pattern table. All patterns are case-insensitive
    /// and multi-line.
    pub fn compile(table: &BTreeMap<String, String>) -> Result<Self> {
        let mut fields = Vec::with_capacity(table.len());
        for (name, pattern) in table {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .multi_line(true)
                .build()
                .with_context(|| format!("invalid pattern for field '{}'", name))?;
            fields.push((name.clone(), re));
        }
        Ok(Self { fields })
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

/// Apply a pattern set to raw text.
///
/// Takes the first match per field; the first capture group if the pattern
/// has one, the whole match otherwise. Every declared field appears in the
/// result, unmatched ones as `""`.
pub fn extract(text: &str, patterns: &PatternSet) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (name, re) in &patterns.fields {
        let value = re
            .captures(text)
            .map(|caps| {
                caps.get(1)
                    .or_else(|| caps.get(0))
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        out.insert(name.clone(), value);
    }
    out
}

/// Whether a built-in pattern set exists for this key.
pub fn has_builtin_patterns(key: &str) -> bool {
    matches!(key, "en" | "fr" | "it")
}

/// Built-in pattern tables mirroring the institutional document layouts the
/// original per-source scrapers targeted.
pub fn builtin_patterns(key: &str) -> Option<BTreeMap<String, String>> {
    let table: &[(&str, &str)] = match key {
        "en" => &[
            ("mission_name", r"Mission\s*(?:Name)?\s*:\s*([^\n]+)"),
            ("country", r"Country\s*:\s*([^\n]+)"),
            ("start_date", r"Start(?:ing)?\s*Date\s*:\s*([0-9./-]+)"),
            ("end_date", r"End(?:ing)?\s*Date\s*:\s*([0-9./-]+)"),
            ("personnel_total", r"Total\s*Personnel\s*:\s*([^\n]+)"),
            ("cost_total", r"Total\s*Cost\s*:\s*€?\s*([\d.,]+)"),
            ("mission_type", r"Mission\s*Type\s*:\s*([^\n]+)"),
            ("mandate", r"Mandate\s*:\s*([^\n]+)"),
        ],
        "fr" => &[
            ("mission_name", r"Mission\s*:\s*([^\n]+)"),
            ("country", r"Pays\s*:\s*([^\n]+)"),
            ("start_date", r"Date\s*de\s*début\s*:\s*([0-9./-]+)"),
            ("end_date", r"Date\s*de\s*fin\s*:\s*([0-9./-]+)"),
            ("personnel_total", r"Personnel\s*total\s*:\s*([^\n]+)"),
            ("cost_total", r"Coût\s*total\s*:\s*€?\s*([\d.,]+)"),
            ("mission_type", r"Type\s*de\s*mission\s*:\s*([^\n]+)"),
            ("mandate", r"Mandat\s*:\s*([^\n]+)"),
        ],
        "it" => &[
            ("mission_name", r"Missione\s*:\s*([^\n]+)"),
            ("country", r"Paese\s*:\s*([^\n]+)"),
            ("start_date", r"Data\s*(?:di\s*)?inizio\s*:\s*([0-9./-]+)"),
            ("end_date", r"Data\s*(?:di\s*)?fine\s*:\s*([0-9./-]+)"),
            ("personnel_total", r"Personale\s*(?:totale)?\s*:\s*([^\n]+)"),
            ("cost_total", r"Costo\s*(?:totale)?\s*:\s*€?\s*([\d.,]+)"),
            ("mission_type", r"Tipo\s*(?:di\s*)?missione\s*:\s*([^\n]+)"),
            ("mandate", r"Mandato\s*:\s*([^\n]+)"),
        ],
        _ => return None,
    };
    Some(
        table
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

/// Resolve a pattern set: configured table first, built-in fallback.
pub fn resolve_patterns(
    configured: &BTreeMap<String, BTreeMap<String, String>>,
    key: &str,
) -> Result<PatternSet> {
    let table = configured
        .get(key)
        .cloned()
        .or_else(|| builtin_patterns(key))
        .ok_or_else(|| anyhow::anyhow!("no pattern set for key '{}'", key))?;
    PatternSet::compile(&table)
}
