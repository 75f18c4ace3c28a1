//! OKX DEX API documentation pages.
//!
//! Each page holds one or more `.doc-content` sections; the section's first
//! `<h1>` names the method and the whole section becomes its Markdown doc.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, info, warn};

use super::fetch::DocFetcher;
use super::markdown::element_to_markdown;

static DOC_CONTENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".doc-content").expect("Invalid doc-content selector"));
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("Invalid h1 selector"));

/// Adds the sections of one page to `methods`, returns how many were added.
/// Repeated names get `_1`, `_2`, ... suffixes.
pub fn extract_dex_sections(html: &str, methods: &mut BTreeMap<String, String>) -> usize {
    let document = Html::parse_document(html);
    let mut added = 0;

    for section in document.select(&DOC_CONTENT) {
        let Some(heading) = section.select(&H1).next() else {
            warn!("Section without h1 heading");
            continue;
        };

        let title = heading.text().collect::<String>();
        let name = title.trim().trim_matches('#').trim();
        if name.is_empty() {
            warn!("Section with empty h1 heading");
            continue;
        }

        let unique = unique_name(methods, name);
        methods.insert(unique, element_to_markdown(section));
        added += 1;
    }

    added
}

fn unique_name(methods: &BTreeMap<String, String>, name: &str) -> String {
    let mut candidate = name.to_string();
    let mut counter = 1;
    while methods.contains_key(&candidate) {
        candidate = format!("{}_{}", name, counter);
        counter += 1;
    }
    candidate
}

/// Fetches every page in order, sleeping `delay` between requests.
/// Failed pages are logged and skipped.
pub async fn scrape_okx_dex(
    fetcher: &dyn DocFetcher,
    urls: &[String],
    delay: Duration,
) -> BTreeMap<String, String> {
    let mut methods = BTreeMap::new();

    for (i, url) in urls.iter().enumerate() {
        info!("Fetching DEX doc {}/{}: {}", i + 1, urls.len(), url);

        match fetcher.fetch_text(url).await {
            Ok(html) => {
                let added = extract_dex_sections(&html, &mut methods);
                if added == 0 {
                    warn!("No doc-content sections in {}", url);
                }
            }
            Err(e) => error!("Failed to fetch {}: {}", url, e),
        }

        if i + 1 < urls.len() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    info!("Extracted {} DEX methods", methods.len());
    methods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::fetch::testing::StubFetcher;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<html><body>
        <div class="doc-content">
            <h1># Get Quotes</h1>
            <p>Returns the best quote for a swap.</p>
        </div>
        <div class="doc-content"><h1>   </h1><p>ignored</p></div>
        <div class="doc-content"><h2>no title</h2></div>
    </body></html>"#;

    #[test]
    fn test_sections_and_duplicates() {
        let mut methods = BTreeMap::new();
        assert_eq!(extract_dex_sections(PAGE, &mut methods), 1);
        assert_eq!(extract_dex_sections(PAGE, &mut methods), 1);
        assert_eq!(extract_dex_sections(PAGE, &mut methods), 1);

        assert_eq!(
            methods.keys().cloned().collect::<Vec<_>>(),
            vec!["Get Quotes", "Get Quotes_1", "Get Quotes_2"]
        );
        assert_eq!(
            methods["Get Quotes"],
            "# \\# Get Quotes\n\nReturns the best quote for a swap."
        );
    }

    #[tokio::test]
    async fn test_scrape_skips_failed_pages() {
        let fetcher = StubFetcher::default().with_page("https://dex.test/quote", PAGE);
        let urls = vec![
            "https://dex.test/missing".to_string(),
            "https://dex.test/quote".to_string(),
        ];

        let methods = scrape_okx_dex(&fetcher, &urls, Duration::ZERO).await;
        assert_eq!(methods.len(), 1);
        assert!(methods.contains_key("Get Quotes"));
        assert_eq!(fetcher.requested.lock().unwrap().len(), 2);
    }
}
