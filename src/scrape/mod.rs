/*!
# Documentation Sources

Extractors for the places exchange documentation comes from:

- [`endpoint_table`]: Markdown function → endpoint tables of the client libraries
- [`gate`], [`okx`]: saved API reference HTML pages
- [`bybit`]: `.mdx` sources of the v5 docs
- [`okx_dex`]: DEX API pages fetched over HTTP
- [`bitget`]: page-by-page crawl of the Bitget reference
- [`markdown`]: HTML to Markdown rendering shared by the fetchers

Remote content goes through the [`DocFetcher`] trait.
*/

pub mod bitget;
pub mod bybit;
pub mod endpoint_table;
pub mod fetch;
pub mod gate;
pub mod markdown;
pub mod okx;
pub mod okx_dex;

pub use bitget::{crawl_docs, endpoint_docs, save_crawl_results, CrawledPage};
pub use bybit::extract_bybit_docs;
pub use endpoint_table::{parse_endpoint_table, Endpoint, HTTP_METHODS};
pub use fetch::{DocFetcher, HttpFetcher};
pub use gate::extract_gate_docs;
pub use markdown::html_to_markdown;
pub use okx::extract_okx_docs;
pub use okx_dex::scrape_okx_dex;
