//! OKX API reference page.
//!
//! The page is one long document; each endpoint lives under an `<h3>` and
//! the siblings that follow it up to the next `<h3>`.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::debug;

use super::endpoint_table::{Endpoint, HTTP_METHODS};

static H3: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").expect("Invalid h3 selector"));

static ENDPOINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(GET|POST|DELETE|PUT|PATCH)\s+(/api/v\d+/[\w\-/{}]+)")
        .expect("Invalid endpoint regex")
});

const V5_PREFIX: &str = "/api/v5/";
const MAX_METHOD_GAP: usize = 20;
const MIN_PATH_LEN: usize = 8;

/// Maps `"GET /api/v5/market/tickers"` keys to the full text of the
/// section documenting them. A repeated key keeps the longer section.
pub fn extract_okx_docs(html: &str) -> BTreeMap<String, String> {
    let document = Html::parse_document(html);
    let mut docs: BTreeMap<String, String> = BTreeMap::new();

    for heading in document.select(&H3) {
        let mut lines = vec![element_text(&heading)];
        let mut endpoints: Vec<Endpoint> = Vec::new();

        for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
            if sibling.value().name() == "h3" {
                break;
            }
            let text = element_text(&sibling);
            if let Some(endpoint) = find_endpoint(&text) {
                if !endpoints.contains(&endpoint) {
                    endpoints.push(endpoint);
                }
            }
            lines.push(text);
        }

        if endpoints.is_empty() {
            continue;
        }

        let content = lines.join("\n");
        for endpoint in endpoints {
            let key = endpoint.key();
            let longer = docs.get(&key).map_or(true, |existing| content.len() > existing.len());
            if longer {
                docs.insert(key, content.clone());
            }
        }
    }

    debug!("OKX endpoint docs: {}", docs.len());
    docs
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Locates `METHOD /api/...` in free text.
pub fn find_endpoint(text: &str) -> Option<Endpoint> {
    let candidate = ENDPOINT
        .captures(text)
        .map(|caps| Endpoint::new(caps[1].to_uppercase(), &caps[2]))
        .or_else(|| scan_endpoint(text))?;

    let valid = HTTP_METHODS.contains(&candidate.method.as_str()) && candidate.path.starts_with("/api/");
    valid.then_some(candidate)
}

/// Fallback for endpoints split by markup: a method name followed closely
/// by a `/api/v5/` path.
fn scan_endpoint(text: &str) -> Option<Endpoint> {
    for method in HTTP_METHODS {
        let Some(method_at) = text.find(method) else {
            continue;
        };
        let after = &text[method_at..];
        let Some(path_at) = after.find(V5_PREFIX) else {
            continue;
        };
        if path_at > MAX_METHOD_GAP {
            continue;
        }

        let path: String = after[path_at..]
            .chars()
            .take_while(|c| !c.is_whitespace() && !"\"'`<>()[]{}".contains(*c))
            .collect();
        if path.len() > MIN_PATH_LEN {
            return Some(Endpoint::new(method, path));
        }
    }
    None
}
