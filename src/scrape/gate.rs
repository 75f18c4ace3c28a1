//! Gate API reference page (`apiHtmlText.html`).

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use tracing::debug;

use super::endpoint_table::HTTP_METHODS;

static BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".content-block__cont").expect("Invalid block selector"));
static CODE: Lazy<Selector> = Lazy::new(|| Selector::parse("code").expect("Invalid code selector"));

/// Maps `"GET /spot/tickers"` style keys to the text of the content block
/// documenting that endpoint.
pub fn extract_gate_docs(html: &str) -> BTreeMap<String, String> {
    let document = Html::parse_document(html);
    let mut docs = BTreeMap::new();

    for block in document.select(&BLOCK) {
        let endpoint = block.select(&CODE).find_map(|code| {
            let text = code.text().collect::<String>().trim().to_string();
            let is_endpoint =
                HTTP_METHODS.iter().any(|m| text.starts_with(m)) && text.contains('/');
            is_endpoint.then_some(text)
        });

        if let Some(key) = endpoint {
            let content = block.text().collect::<String>().trim().to_string();
            docs.insert(key, content);
        }
    }

    debug!("Gate endpoint docs: {}", docs.len());
    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_blocks() {
        let html = r#"<html><body>
            <div class="content-block__cont">
                <h2>List tickers</h2>
                <code>currency_pair</code>
                <p><code>GET /spot/tickers</code></p>
                <p>Return details of a specific currency pair</p>
            </div>
            <div class="content-block__cont">
                <p>No endpoint here <code>GET</code></p>
            </div>
            <div class="content-block__cont">
                <code>POST /spot/orders</code> Create an order
            </div>
        </body></html>"#;

        let docs = extract_gate_docs(html);
        assert_eq!(docs.len(), 2);
        let tickers = &docs["GET /spot/tickers"];
        assert!(tickers.starts_with("List tickers"));
        assert!(tickers.contains("Return details"));
        assert!(docs["POST /spot/orders"].ends_with("Create an order"));
    }
}
