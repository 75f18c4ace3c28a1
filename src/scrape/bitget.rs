/*!
# Bitget Documentation Crawler

The Bitget API reference is a chain of pages linked by a "next page"
button. The crawler follows that chain from a start page, extracts title
and content with configurable CSS selectors and converts the content to
Markdown. Endpoints mentioned in a page (`GET /api/v2/...`) map to that
page's Markdown.
*/

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

use super::endpoint_table::Endpoint;
use super::fetch::DocFetcher;
use super::markdown::element_to_markdown;
use crate::config::CrawlConfig;
use crate::core::{write_json_pretty, DocsError, Result};

static PAGE_ENDPOINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(GET|POST|DELETE|PUT|PATCH)\s+(/api/[\w\-/{}.]+)").expect("Invalid endpoint regex")
});
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// One crawled documentation page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrawledPage {
    pub url: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
    pub crawled_at: DateTime<Utc>,
}

/// Compiled selectors of a crawl configuration
#[derive(Debug)]
pub struct PageSelectors {
    title: Selector,
    content: Selector,
    next: Selector,
}

impl PageSelectors {
    pub fn from_config(config: &CrawlConfig) -> Result<Self> {
        Ok(Self {
            title: parse_selector(&config.title_selector)?,
            content: parse_selector(&config.content_selector)?,
            next: parse_selector(&config.next_selector)?,
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| DocsError::Selector(selector.to_string()))
}

/// Extracts one page; the next link is resolved against `page_url`.
pub fn extract_page(html: &str, page_url: &Url, selectors: &PageSelectors) -> CrawledPage {
    let document = Html::parse_document(html);

    let title = document
        .select(&selectors.title)
        .next()
        .map(|el| SPACES.replace_all(el.text().collect::<String>().trim(), " ").into_owned())
        .unwrap_or_default();

    let content = document
        .select(&selectors.content)
        .next()
        .map(element_to_markdown)
        .unwrap_or_default();

    let next_page = document
        .select(&selectors.next)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:"))
        .and_then(|href| match page_url.join(href) {
            Ok(next) => Some(next.to_string()),
            Err(e) => {
                warn!("Ignoring next link '{}' on {}: {}", href, page_url, e);
                None
            }
        });

    CrawledPage {
        url: page_url.to_string(),
        title,
        content,
        next_page,
        crawled_at: Utc::now(),
    }
}

/// Follows next-page links from the configured start page.
///
/// Stops when a page has no next link, links back to a visited page,
/// fails to load, or `max_pages` is reached. Only an invalid start URL or
/// selector is an error; pages crawled before a failure are kept.
pub async fn crawl_docs(fetcher: &dyn DocFetcher, config: &CrawlConfig) -> Result<Vec<CrawledPage>> {
    let selectors = PageSelectors::from_config(config)?;
    let mut current = Url::parse(&config.start_url)
        .map_err(|e| DocsError::Config(format!("Invalid crawl start URL '{}': {}", config.start_url, e)))?;

    let delay = Duration::from_millis(config.delay_ms);
    let mut visited = HashSet::new();
    let mut pages = Vec::new();

    info!("Crawling docs from {}", current);
    while pages.len() < config.max_pages {
        if !visited.insert(current.to_string()) {
            warn!("Link cycle detected at {}, stopping", current);
            break;
        }

        let html = match fetcher.fetch_text(current.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                error!("Failed to crawl {}: {}", current, e);
                break;
            }
        };

        let page = extract_page(&html, &current, &selectors);
        info!("Crawled page {}: {}", pages.len() + 1, page.title);
        let next = page.next_page.clone();
        pages.push(page);

        let Some(next) = next else {
            info!("No next page, crawl finished");
            break;
        };
        current = match Url::parse(&next) {
            Ok(url) => url,
            Err(e) => {
                warn!("Invalid next page URL {}: {}", next, e);
                break;
            }
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    info!("Crawl finished with {} pages", pages.len());
    Ok(pages)
}

/// Writes the crawled pages to `bitget_docs_<timestamp>.json` in `dir`.
pub fn save_crawl_results(dir: &Path, pages: &[CrawledPage]) -> Result<PathBuf> {
    let path = dir.join(format!("bitget_docs_{}.json", Utc::now().format("%Y%m%d_%H%M%S")));
    let bytes = write_json_pretty(&path, &pages)?;
    info!("Saved {} crawled pages to {} ({} bytes)", pages.len(), path.display(), bytes);
    Ok(path)
}

/// Maps `"METHOD /api/..."` keys to the Markdown of the first page
/// mentioning them.
pub fn endpoint_docs(pages: &[CrawledPage]) -> BTreeMap<String, String> {
    let mut docs = BTreeMap::new();
    for page in pages {
        for caps in PAGE_ENDPOINT.captures_iter(&page.content) {
            let endpoint = Endpoint::new(caps[1].to_uppercase(), caps[2].trim_end_matches('.'));
            docs.entry(endpoint.key()).or_insert_with(|| page.content.clone());
        }
    }
    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::fetch::testing::StubFetcher;
    use pretty_assertions::assert_eq;

    fn crawl_config(start: &str) -> CrawlConfig {
        CrawlConfig {
            enabled: true,
            start_url: start.to_string(),
            max_pages: 10,
            delay_ms: 0,
            ..CrawlConfig::default()
        }
    }

    fn page(title: &str, body: &str, next: Option<&str>) -> String {
        let next = next
            .map(|href| format!(r#"<a class="next-page" href="{}">Next</a>"#, href))
            .unwrap_or_default();
        format!(
            "<html><body><h1>{}</h1><article><h2>{}</h2><p>{}</p></article>{}</body></html>",
            title, title, body, next
        )
    }

    #[tokio::test]
    async fn test_follows_next_links() {
        let fetcher = StubFetcher::default()
            .with_page(
                "https://docs.test/api/intro",
                &page("Intro", "Welcome", Some("/api/tickers")),
            )
            .with_page(
                "https://docs.test/api/tickers",
                &page("Get Tickers", "HTTP Request: GET /api/v2/spot/market/tickers", Some("orders")),
            )
            .with_page(
                "https://docs.test/api/orders",
                &page("Place Order", "POST /api/v2/spot/trade/place-order", None),
            );

        let pages = crawl_docs(&fetcher, &crawl_config("https://docs.test/api/intro"))
            .await
            .unwrap();

        let titles: Vec<_> = pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Intro", "Get Tickers", "Place Order"]);
        assert_eq!(pages[1].next_page.as_deref(), Some("https://docs.test/api/orders"));
        assert_eq!(pages[0].content, "## Intro\n\nWelcome");

        let docs = endpoint_docs(&pages);
        assert_eq!(
            docs.keys().cloned().collect::<Vec<_>>(),
            vec!["GET /api/v2/spot/market/tickers", "POST /api/v2/spot/trade/place-order"]
        );
        assert!(docs["GET /api/v2/spot/market/tickers"].starts_with("## Get Tickers"));
    }

    #[tokio::test]
    async fn test_stops_on_cycle_and_failure() {
        let fetcher = StubFetcher::default()
            .with_page("https://docs.test/a", &page("A", "a", Some("/b")))
            .with_page("https://docs.test/b", &page("B", "b", Some("/a")));
        let pages = crawl_docs(&fetcher, &crawl_config("https://docs.test/a")).await.unwrap();
        assert_eq!(pages.len(), 2);

        let fetcher = StubFetcher::default().with_page("https://docs.test/a", &page("A", "a", Some("/gone")));
        let pages = crawl_docs(&fetcher, &crawl_config("https://docs.test/a")).await.unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[tokio::test]
    async fn test_respects_max_pages() {
        let fetcher = StubFetcher::default()
            .with_page("https://docs.test/1", &page("1", "x", Some("/2")))
            .with_page("https://docs.test/2", &page("2", "x", Some("/3")));
        let config = CrawlConfig {
            max_pages: 1,
            ..crawl_config("https://docs.test/1")
        };
        let pages = crawl_docs(&fetcher, &config).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(fetcher.requested.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_crawl_results() {
        let fetcher = StubFetcher::default().with_page("https://docs.test/a", &page("A", "GET /api/v2/a", None));
        let pages = crawl_docs(&fetcher, &crawl_config("https://docs.test/a")).await.unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let path = save_crawl_results(&dir.path().join("crawl"), &pages).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("bitget_docs_") && name.ends_with(".json"));

        let saved: Vec<CrawledPage> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, pages);
    }

    #[test]
    fn test_invalid_selector() {
        let config = CrawlConfig {
            title_selector: "h1[".to_string(),
            ..CrawlConfig::default()
        };
        assert!(matches!(PageSelectors::from_config(&config), Err(DocsError::Selector(_))));
    }
}
