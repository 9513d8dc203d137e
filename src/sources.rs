use anyhow::Result;

use crate::config::Config;
use crate::extract;

pub fn list_sources(config: &Config) -> Result<()> {
    println!(
        "{:<16} {:<10} {:<10} {:<10} {:<10} PATTERNS",
        "SOURCE", "LANGUAGE", "SITEMAPS", "INDEXES", "SET"
    );
    for profile in &config.sources {
        let key = profile.pattern_key();
        let patterns = if config.patterns.contains_key(key) {
            "configured"
        } else if extract::has_builtin_patterns(key) {
            "built-in"
        } else {
            "MISSING"
        };
        println!(
            "{:<16} {:<10} {:<10} {:<10} {:<10} {}",
            profile.name,
            profile.language,
            profile.sitemap_urls.len(),
            profile.index_urls.len(),
            key,
            patterns
        );
    }

    let storage = if config.storage.root.exists() {
        "OK"
    } else {
        "NOT CREATED (created on first run)"
    };
    println!();
    println!("storage root: {} [{}]", config.storage.root.display(), storage);

    Ok(())
}
