//! Mission-category tagging.
//!
//! An ordered rule cascade over case-insensitive substring checks, first
//! match wins. Total: every record gets exactly one tag, the last rule being
//! the catch-all.

use crate::models::MissionRecord;

pub const TAG_UE_MILITARE: &str = "UE-Militare";
pub const TAG_UE_CIVILE: &str = "UE-Civile";
pub const TAG_UE_ALTRO: &str = "UE-Altro";
pub const TAG_NATO_DIFESA: &str = "NATO-Difesa";
pub const TAG_ONU_PEACEKEEPING: &str = "ONU-Peacekeeping";
pub const TAG_ONU_OBSERVATION: &str = "ONU-Observation";
pub const TAG_ITA_BILATERALE: &str = "ITA-Bilaterale";
pub const TAG_ITA_UMANITARIA: &str = "ITA-Umanitaria";
pub const TAG_ITA_SICUREZZA: &str = "ITA-Sicurezza";
pub const TAG_ITA_ALTRO: &str = "ITA-Altro";
pub const TAG_MULTILATERALE: &str = "Multilaterale-Ibrida";
pub const TAG_ALTRO: &str = "Altro";

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Assign the category tag for one record.
pub fn classify(record: &MissionRecord) -> &'static str {
    let source = record.source.to_lowercase();
    let mission_type = record.mission_type.to_lowercase();
    let name = record.mission_name.to_lowercase();
    let notes = record.notes.to_lowercase();
    let mandate = record.mandate.to_lowercase();

    // 1. EU track.
    if source.contains("eeas")
        || contains_any(&mission_type, &["csdp", "pesd"])
        || name.contains("eu")
    {
        if contains_any(&mission_type, &["milit"])
            || contains_any(&name, &["eutm", "navfor", "eunavfor"])
        {
            return TAG_UE_MILITARE;
        }
        if contains_any(&mission_type, &["civ"])
            || contains_any(&name, &["eupol", "eubam", "eulex"])
        {
            return TAG_UE_CIVILE;
        }
        return TAG_UE_ALTRO;
    }

    // 2. Defense-alliance track.
    if source.contains("nato") || contains_any(&name, &["kfor", "isaf", "resolute support"]) {
        return TAG_NATO_DIFESA;
    }

    // 3. UN track.
    if source.contains("onu")
        || source.contains("un")
        || mission_type.contains("peacekeeping")
        || contains_any(&name, &["unifil", "minurso", "unsmis"])
    {
        if contains_any(&name, &["untso", "unmogip"])
            || contains_any(&mission_type, &["observ", "osservazione"])
            || contains_any(&mandate, &["observ", "osservazione"])
        {
            return TAG_ONU_OBSERVATION;
        }
        return TAG_ONU_PEACEKEEPING;
    }

    // 4. National institutions.
    if contains_any(&source, &["camera", "senato", "difesa", "esteri"]) {
        if contains_any(&notes, &["bilateral", "bilaterale"])
            || contains_any(&name, &["misin", "libia", "niger"])
        {
            return TAG_ITA_BILATERALE;
        }
        if contains_any(&mission_type, &["umanit", "sanitar"])
            || contains_any(&name, &["ospedale", "mozambico"])
        {
            return TAG_ITA_UMANITARIA;
        }
        if contains_any(&mission_type, &["antiterrorismo", "marittima"]) || name.contains("golfo") {
            return TAG_ITA_SICUREZZA;
        }
        return TAG_ITA_ALTRO;
    }

    // 5. Jointly run name+source combinations.
    if (name.contains("bosnia") && contains_any(&source, &["nato", "ue"]))
        || (name.contains("althea") && source.contains("nato"))
        || (name.contains("unifil")
            && source.contains("onu")
            && contains_any(&notes, &["ita", "italia"]))
    {
        return TAG_MULTILATERALE;
    }

    // 6. Catch-all.
    TAG_ALTRO
}
