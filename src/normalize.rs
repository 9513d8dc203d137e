//! Field coercion: raw extracted strings into a typed [`MissionRecord`].
//!
//! Coercion only — no new fields, no I/O, no errors. Lossy conversions
//! (unparsable numbers become zero) are a deliberately preserved policy of
//! the source system and are logged so consumers can audit them.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use tracing::warn;

use crate::models::MissionRecord;

/// Accepted date formats, tried in order; first successful parse wins.
const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];

/// Tokens that mean "no value" in the source data.
const PLACEHOLDERS: [&str; 4] = ["nan", "n/a", "none", "-"];

/// Parse a date against the accepted formats; canonical ISO form or empty.
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    String::new()
}

/// Strip non-digits and parse; unparsable values collapse to 0.
pub fn normalize_personnel(raw: &str) -> u32 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.parse::<u32>() {
        Ok(n) => n,
        Err(_) => {
            if !raw.trim().is_empty() {
                warn!(value = raw, "unparsable personnel count, defaulting to 0");
            }
            0
        }
    }
}

/// Parse a monetary amount. Thousands separators are removed; a decimal
/// comma becomes a decimal point, so `"1.234,56"` yields `1234.56`.
/// Unparsable values collapse to 0.0.
pub fn normalize_cost(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let canonical = if cleaned.contains(',') {
        // European convention: dots are thousands separators, the comma is
        // the decimal mark.
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };
    match canonical.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            if !raw.trim().is_empty() {
                warn!(value = raw, "unparsable cost, defaulting to 0.0");
            }
            0.0
        }
    }
}

/// Trim and collapse placeholder tokens to empty.
pub fn clean_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if PLACEHOLDERS.contains(&trimmed.to_lowercase().as_str()) {
        return String::new();
    }
    trimmed.to_string()
}

/// Coerce an extracted field map into a typed record.
///
/// `provenance` supplies the fields the extractor does not produce: source,
/// language, document link, and the retrieval timestamp.
pub fn normalize(fields: &BTreeMap<String, String>, provenance: MissionRecord) -> MissionRecord {
    let mut record = provenance;

    let get = |name: &str| fields.get(name).map(String::as_str).unwrap_or("");

    record.mission_name = clean_text(get("mission_name"));
    record.country = clean_text(get("country"));
    record.start_date = normalize_date(get("start_date"));
    record.end_date = normalize_date(get("end_date"));
    record.personnel_total = normalize_personnel(get("personnel_total"));
    record.cost_total = normalize_cost(get("cost_total"));
    record.mission_type = clean_text(get("mission_type"));
    record.mandate = clean_text(get("mandate"));
    if record.notes.is_empty() {
        record.notes = clean_text(get("notes"));
    }

    // An end date before the start date cannot stand; drop the end date.
    if !record.start_date.is_empty()
        && !record.end_date.is_empty()
        && record.end_date < record.start_date
    {
        warn!(
            mission = %record.mission_name,
            start = %record.start_date,
            end = %record.end_date,
            "end date precedes start date, clearing end date"
        );
        record.end_date.clear();
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provenance() -> MissionRecord {
        MissionRecord::with_provenance("eeas", "en", "https://example.org/m.pdf", Utc::now())
    }

    #[test]
    fn date_formats_tried_in_order() {
        assert_eq!(normalize_date("15/03/2013"), "2013-03-15");
        assert_eq!(normalize_date("2013-03-15"), "2013-03-15");
        assert_eq!(normalize_date("15.03.2013"), "2013-03-15");
        assert_eq!(normalize_date("2013/03/15"), "2013-03-15");
    }

    #[test]
    fn unmatched_date_is_empty_not_an_error() {
        assert_eq!(normalize_date("March 15th, 2013"), "");
        assert_eq!(normalize_date(""), "");
        assert_eq!(normalize_date("32/13/2013"), "");
    }

    #[test]
    fn personnel_strips_surrounding_noise() {
        assert_eq!(normalize_personnel("circa 350 unità"), 350);
        assert_eq!(normalize_personnel("1 200"), 1200);
        assert_eq!(normalize_personnel("unknown"), 0);
        assert_eq!(normalize_personnel(""), 0);
    }

    #[test]
    fn cost_handles_decimal_comma() {
        assert!((normalize_cost("1.234,56") - 1234.56).abs() < 1e-9);
        assert!((normalize_cost("€ 2,5") - 2.5).abs() < 1e-9);
        assert!((normalize_cost("1500.75") - 1500.75).abs() < 1e-9);
        assert_eq!(normalize_cost("gratis"), 0.0);
    }

    #[test]
    fn placeholders_collapse_to_empty() {
        assert_eq!(clean_text("  nan "), "");
        assert_eq!(clean_text("N/A"), "");
        assert_eq!(clean_text("-"), "");
        assert_eq!(clean_text("  EUTM Mali  "), "EUTM Mali");
    }

    #[test]
    fn normalize_builds_complete_record() {
        let mut fields = BTreeMap::new();
        fields.insert("mission_name".to_string(), " EUTM Mali ".to_string());
        fields.insert("country".to_string(), "Mali".to_string());
        fields.insert("start_date".to_string(), "18/02/2013".to_string());
        fields.insert("end_date".to_string(), "nonsense".to_string());
        fields.insert("personnel_total".to_string(), "circa 350 unità".to_string());
        fields.insert("cost_total".to_string(), "1.234,56".to_string());
        fields.insert("mission_type".to_string(), "nan".to_string());

        let record = normalize(&fields, provenance());
        assert_eq!(record.mission_name, "EUTM Mali");
        assert_eq!(record.start_date, "2013-02-18");
        assert_eq!(record.end_date, "");
        assert_eq!(record.personnel_total, 350);
        assert!((record.cost_total - 1234.56).abs() < 1e-9);
        assert_eq!(record.mission_type, "");
        assert_eq!(record.source, "eeas");
    }

    #[test]
    fn inverted_date_range_clears_end_date() {
        let mut fields = BTreeMap::new();
        fields.insert("mission_name".to_string(), "UNIFIL".to_string());
        fields.insert("start_date".to_string(), "2020-06-01".to_string());
        fields.insert("end_date".to_string(), "2019-01-01".to_string());

        let record = normalize(&fields, provenance());
        assert_eq!(record.start_date, "2020-06-01");
        assert_eq!(record.end_date, "");
    }
}
