//! Link discovery: seed sitemaps and index pages → candidate document URLs.
//!
//! Both discovery paths are lenient: a malformed sitemap or index page
//! yields an empty list and a warning, never an error — a bad listing page
//! must not take its source down.

use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

/// Every `<loc>` text value of an XML sitemap.
///
/// Malformed XML yields an empty vec.
pub fn links_from_sitemap(xml: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_loc = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                in_loc = e.local_name().as_ref() == b"loc";
            }
            Ok(quick_xml::events::Event::Text(te)) if in_loc => {
                let text = te.unescape().unwrap_or_default();
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    urls.push(trimmed.to_string());
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"loc" {
                    in_loc = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, "malformed sitemap, discarding");
                return Vec::new();
            }
            _ => {}
        }
        buf.clear();
    }
    urls
}

/// Every anchor `href` of an HTML page, resolved to an absolute URL.
///
/// The HTML parser is lenient, so malformed markup degrades to fewer links
/// rather than an error. Unresolvable hrefs are dropped.
pub fn links_from_index(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .map(|u| u.to_string())
        .collect()
}

/// Keep only URLs whose path ends in an allowed document extension.
///
/// Non-matching URLs are not errors — they are simply not documents.
pub fn filter_documents(urls: Vec<String>, allowed_extensions: &[String]) -> Vec<String> {
    urls.into_iter()
        .filter(|url| {
            let lower = url.to_lowercase();
            allowed_extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.org/missions/eutm-mali.pdf</loc></url>
  <url><loc>https://example.org/missions/unifil.docx</loc></url>
  <url><loc>https://example.org/missions/index.html</loc></url>
</urlset>"#;

    #[test]
    fn sitemap_loc_values_are_collected() {
        let urls = links_from_sitemap(SITEMAP);
        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0], "https://example.org/missions/eutm-mali.pdf");
    }

    #[test]
    fn malformed_sitemap_yields_empty() {
        assert!(links_from_sitemap("<urlset><url></wrong></urlset>").is_empty());
        assert!(links_from_sitemap("not xml at all").is_empty());
    }

    #[test]
    fn index_links_resolve_against_base() {
        let base = Url::parse("https://example.org/docs/").unwrap();
        let html = r#"<html><body>
            <a href="report.pdf">annual report</a>
            <a href="/absolute/brief.docx">brief</a>
            <a href="https://other.org/x.doc">external</a>
            <a>no href</a>
        </body></html>"#;
        let urls = links_from_index(html, &base);
        assert_eq!(
            urls,
            vec![
                "https://example.org/docs/report.pdf",
                "https://example.org/absolute/brief.docx",
                "https://other.org/x.doc",
            ]
        );
    }

    #[test]
    fn extension_filter_is_case_insensitive_and_silent() {
        let allowed = vec![".pdf".to_string(), ".docx".to_string()];
        let urls = vec![
            "https://example.org/a.PDF".to_string(),
            "https://example.org/b.docx".to_string(),
            "https://example.org/c.html".to_string(),
            "https://example.org/d".to_string(),
        ];
        let kept = filter_documents(urls, &allowed);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|u| !u.ends_with(".html")));
    }
}
