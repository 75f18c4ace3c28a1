/*!
# Exchange Docs

Documentation service for the SDKs of cryptocurrency exchanges. Offline
scrapers and a TypeScript declaration extractor build one JSON data file per
exchange; an MCP server answers method-list and method-detail queries from
those files.

## Supported exchanges

Gate, Bybit, OKX, OKX DEX API, Binance and Bitget. Every exchange gets two
MCP tools: `<prefix>_methods` and `<prefix>_method_detail`.

## Architecture

```text
Exchange Docs
├── Core           - Error type, source positions, file helpers
├── Dts            - .d.ts lexer, parser, JSDoc, type resolution, method extraction
├── Scrape         - Endpoint tables, HTML/MDX/site scrapers, HTML to Markdown
├── Generate       - Merging of scraped docs and declarations into offline data
├── Offline data   - Data file model and storage
├── Adapter        - Read-only lookup per exchange, adapter registry
└── MCP server     - Line-delimited JSON-RPC over stdio
```

## Usage

### CLI
```bash
# Regenerate the data files
exchange-docs generate --all --output-dir ./data

# Inspect the data
exchange-docs methods okx
exchange-docs doc bybit getKline --pretty

# Run the MCP server
exchange-docs serve --data-dir ./data
```

### Library
```rust,no_run
use exchange_docs::adapter::{AdapterRegistry, ExchangeAdapter};
use exchange_docs::exchange::ExchangeId;

let registry = AdapterRegistry::load(std::path::Path::new("./data"), &ExchangeId::ALL)?;
if let Some(okx) = registry.get(ExchangeId::Okx) {
    println!("{} methods", okx.list_methods().len());
}
# Ok::<(), exchange_docs::DocsError>(())
```
*/

pub mod adapter;
pub mod cli_common;
pub mod config;
pub mod core;
pub mod dts;
pub mod exchange;
pub mod generate;
pub mod mcp_server;
pub mod offline_data;
pub mod scrape;

pub use adapter::{AdapterRegistry, ExchangeAdapter, OfflineAdapter};
pub use config::ServiceConfig;
pub use core::{DocsError, Result};
pub use exchange::ExchangeId;
pub use generate::Generator;
pub use mcp_server::McpServer;
pub use offline_data::{MethodEntry, MethodInfo, OfflineData};

use std::collections::BTreeMap;
use std::path::Path;

/// Extracts the methods of a single declaration file with default options
pub fn extract_declarations<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, MethodInfo>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(DocsError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "declaration file not found"),
        ));
    }
    Ok(dts::extract_methods(
        &[path.to_path_buf()],
        &[],
        &dts::ExtractOptions::default(),
    ))
}
