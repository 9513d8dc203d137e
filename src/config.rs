use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub sources: Vec<SourceProfile>,
    /// Pattern-set table: set name (usually a language code) → field → regex.
    /// Missing sets fall back to the built-in tables for `en`, `fr`, `it`.
    #[serde(default)]
    pub patterns: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory for content-addressed artifacts and tabular exports.
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff delay; the delay before attempt n+1 is
    /// `base_delay_ms * 2^n` plus random jitter.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Politeness delay between consecutive requests to the same source.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Snapshot requests are `archive_base_url + original_url`, verbatim.
    #[serde(default = "default_archive_base_url")]
    pub archive_base_url: String,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            archive_base_url: default_archive_base_url(),
            allowed_extensions: default_allowed_extensions(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    2000
}
fn default_archive_base_url() -> String {
    "https://web.archive.org/web/".to_string()
}
fn default_allowed_extensions() -> Vec<String> {
    vec![".pdf".to_string(), ".doc".to_string(), ".docx".to_string()]
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) missioni/0.4".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct MergeConfig {
    /// Fuzzy-link threshold for master reconciliation, in (0, 1].
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn default_similarity_threshold() -> f64 {
    0.8
}

/// Declarative description of one institutional source.
///
/// The pipeline is generic; the only per-source variation is this data.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceProfile {
    pub name: String,
    pub language: String,
    #[serde(default)]
    pub sitemap_urls: Vec<String>,
    #[serde(default)]
    pub index_urls: Vec<String>,
    /// Pattern-set key; defaults to the profile's language.
    #[serde(default)]
    pub pattern_set: Option<String>,
}

impl SourceProfile {
    pub fn pattern_key(&self) -> &str {
        self.pattern_set.as_deref().unwrap_or(&self.language)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.fetch.max_attempts == 0 {
        anyhow::bail!("fetch.max_attempts must be >= 1");
    }

    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be >= 1");
    }

    if !(0.0..=1.0).contains(&config.merge.similarity_threshold) {
        anyhow::bail!("merge.similarity_threshold must be in [0.0, 1.0]");
    }

    for ext in &config.fetch.allowed_extensions {
        if !ext.starts_with('.') {
            anyhow::bail!("fetch.allowed_extensions entries must start with '.': '{}'", ext);
        }
    }

    let mut seen = std::collections::HashSet::new();
    for profile in &config.sources {
        if profile.name.is_empty() {
            anyhow::bail!("source profiles must have a non-empty name");
        }
        if !seen.insert(profile.name.as_str()) {
            anyhow::bail!("duplicate source profile: '{}'", profile.name);
        }
        if profile.sitemap_urls.is_empty() && profile.index_urls.is_empty() {
            anyhow::bail!(
                "source '{}' has neither sitemap_urls nor index_urls",
                profile.name
            );
        }
        let key = profile.pattern_key();
        if !config.patterns.contains_key(key) && !crate::extract::has_builtin_patterns(key) {
            anyhow::bail!(
                "source '{}' references unknown pattern set '{}'",
                profile.name,
                key
            );
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn defaults_applied() {
        let f = write_config("[storage]\nroot = \"/tmp/missioni\"\n");
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.fetch.max_attempts, 3);
        assert_eq!(cfg.fetch.timeout_secs, 30);
        assert_eq!(cfg.fetch.allowed_extensions, vec![".pdf", ".doc", ".docx"]);
        assert!((cfg.merge.similarity_threshold - 0.8).abs() < f64::EPSILON);
        assert!(cfg.sources.is_empty());
    }

    #[test]
    fn rejects_zero_attempts() {
        let f = write_config(
            "[storage]\nroot = \"/tmp/missioni\"\n\n[fetch]\nmax_attempts = 0\n",
        );
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn rejects_duplicate_source_names() {
        let f = write_config(
            r#"[storage]
root = "/tmp/missioni"

[[sources]]
name = "eeas"
language = "en"
sitemap_urls = ["https://example.org/sitemap.xml"]

[[sources]]
name = "eeas"
language = "fr"
sitemap_urls = ["https://example.org/fr/sitemap.xml"]
"#,
        );
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn rejects_unknown_pattern_set() {
        let f = write_config(
            r#"[storage]
root = "/tmp/missioni"

[[sources]]
name = "eeas"
language = "tlh"
sitemap_urls = ["https://example.org/sitemap.xml"]
"#,
        );
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn custom_pattern_set_resolves() {
        let f = write_config(
            r#"[storage]
root = "/tmp/missioni"

[[sources]]
name = "eeas"
language = "tlh"
sitemap_urls = ["https://example.org/sitemap.xml"]

[patterns.tlh]
mission_name = "Mission\\s*:\\s*([^\n]+)"
"#,
        );
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.sources[0].pattern_key(), "tlh");
    }
}
