use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::merge::{merge_by_declaration, merge_by_endpoint, merge_pages, MergeStats};
use crate::config::{ServiceConfig, SourceConfig};
use crate::core::{read_text_file, DocsError, Result};
use crate::dts::extract_methods;
use crate::exchange::ExchangeId;
use crate::offline_data::{data_file_path, save_offline_data, MethodInfo, OfflineData};
use crate::scrape::{self, DocFetcher, Endpoint};

/// Result of one successful generation
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub exchange: ExchangeId,
    pub path: PathBuf,
    pub methods: usize,
    pub documented: usize,
    pub reflected: usize,
    pub bytes: usize,
    pub elapsed: Duration,
}

/// Builds offline data files from the configured sources
pub struct Generator {
    config: ServiceConfig,
    fetcher: Arc<dyn DocFetcher>,
    output_dir: PathBuf,
    crawl: bool,
}

impl Generator {
    pub fn new(config: ServiceConfig, fetcher: Arc<dyn DocFetcher>) -> Self {
        let output_dir = config.server.data_dir.clone();
        Self {
            config,
            fetcher,
            output_dir,
            crawl: false,
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Forces the documentation crawl for exchanges that have one configured
    pub fn with_crawl(mut self, crawl: bool) -> Self {
        self.crawl = crawl;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Generates and writes the data file of one exchange.
    pub async fn generate(&self, id: ExchangeId) -> Result<GenerateReport> {
        let start = Instant::now();
        info!("{}: generating offline data", id.display_name());

        let data = self.build(id).await?;
        let path = data_file_path(&self.output_dir, id.as_str());
        let bytes = save_offline_data(&path, &data)?;

        Ok(GenerateReport {
            exchange: id,
            path,
            methods: data.method_count(),
            documented: data.documented_count(),
            reflected: data.reflected_count(),
            bytes,
            elapsed: start.elapsed(),
        })
    }

    /// Generates exchanges one after another. `on_done` sees every outcome
    /// as soon as it is known.
    pub async fn generate_all<F>(
        &self,
        ids: &[ExchangeId],
        mut on_done: F,
    ) -> Vec<(ExchangeId, Result<GenerateReport>)>
    where
        F: FnMut(ExchangeId, &Result<GenerateReport>),
    {
        let mut outcomes = Vec::with_capacity(ids.len());
        for &id in ids {
            let outcome = self.generate(id).await;
            if let Err(e) = &outcome {
                error!("{}: generation failed: {}", id.display_name(), e);
            }
            on_done(id, &outcome);
            outcomes.push((id, outcome));
        }
        outcomes
    }

    /// Gathers the sources of one exchange and merges them, without writing.
    pub async fn build(&self, id: ExchangeId) -> Result<OfflineData> {
        let source = self.config.source(id);

        let (methods, readme) = match id {
            ExchangeId::Gate | ExchangeId::Okx => {
                let (readme, endpoints, docs, infos) = tokio::join!(
                    self.readme(&source),
                    self.endpoint_table(&source),
                    self.html_docs(id, &source),
                    self.declarations(&source),
                );
                let (methods, stats) = merge_by_endpoint(&endpoints?, &docs, &infos?);
                log_stats(id, &stats);
                (methods, readme?)
            }
            ExchangeId::Bybit => {
                let (readme, docs, infos) = tokio::join!(
                    self.readme(&source),
                    self.mdx_docs(&source),
                    self.declarations(&source),
                );
                let (methods, stats) = merge_by_declaration(infos?, |name| docs.get(name).cloned());
                log_stats(id, &stats);
                (methods, readme?)
            }
            ExchangeId::Binance => {
                let (readme, infos) = tokio::join!(self.readme(&source), self.declarations(&source));
                let (methods, _) = merge_by_declaration(infos?, |_| None);
                (methods, readme?)
            }
            ExchangeId::Bitget => {
                let (readme, infos, crawled) = tokio::join!(
                    self.readme(&source),
                    self.declarations(&source),
                    self.crawled_docs(&source),
                );
                let (endpoints, docs) = crawled?;
                let (methods, stats) = merge_by_declaration(infos?, |name| {
                    endpoints.get(name).and_then(|endpoint| docs.get(&endpoint.key()).cloned())
                });
                if !docs.is_empty() {
                    log_stats(id, &stats);
                }
                (methods, readme?)
            }
            ExchangeId::OkxDex => {
                let delay = Duration::from_millis(self.config.scraper.request_delay_ms);
                let (readme, pages) = tokio::join!(
                    self.readme(&source),
                    scrape::scrape_okx_dex(self.fetcher.as_ref(), &source.doc_urls, delay),
                );
                (merge_pages(pages), readme?)
            }
        };

        info!("{}: {} methods collected", id.display_name(), methods.len());
        Ok(OfflineData {
            methods,
            readme,
            example: Vec::new(),
            generated_at: Some(Utc::now()),
        })
    }

    async fn readme(&self, source: &SourceConfig) -> Result<String> {
        match &source.readme_url {
            Some(url) => {
                let readme = self.fetcher.fetch_text(url).await?;
                info!("README fetched from {} ({} bytes)", url, readme.len());
                Ok(readme)
            }
            None => Ok(String::new()),
        }
    }

    async fn endpoint_table(&self, source: &SourceConfig) -> Result<BTreeMap<String, Endpoint>> {
        let Some(url) = &source.endpoint_list_url else {
            warn!("No endpoint list configured");
            return Ok(BTreeMap::new());
        };
        let markdown = self.fetcher.fetch_text(url).await?;
        let endpoints = scrape::parse_endpoint_table(&markdown);
        info!("Endpoint table: {} functions", endpoints.len());
        Ok(endpoints)
    }

    async fn declarations(&self, source: &SourceConfig) -> Result<BTreeMap<String, MethodInfo>> {
        let files: Vec<PathBuf> = source
            .declaration_files
            .iter()
            .map(|path| self.config.declaration_path(path))
            .collect();
        if files.is_empty() {
            return Ok(BTreeMap::new());
        }
        for missing in files.iter().filter(|path| !path.is_file()) {
            warn!("Declaration file not found: {}", missing.display());
        }

        let roots: Vec<PathBuf> = source
            .type_roots
            .iter()
            .map(|path| self.config.declaration_path(path))
            .collect();
        let options = source.extract_options(self.config.scraper.max_type_depth);

        let methods =
            tokio::task::spawn_blocking(move || extract_methods(&files, &roots, &options)).await?;
        Ok(methods)
    }

    /// Saved API reference HTML of gate and okx; a missing file is logged
    /// and yields no docs.
    async fn html_docs(&self, id: ExchangeId, source: &SourceConfig) -> BTreeMap<String, String> {
        let Some(path) = source.api_html.clone() else {
            return BTreeMap::new();
        };

        let task = tokio::task::spawn_blocking(move || {
            let html = read_text_file(&path)?;
            Ok::<_, DocsError>(match id {
                ExchangeId::Okx => scrape::extract_okx_docs(&html),
                _ => scrape::extract_gate_docs(&html),
            })
        });

        match task.await {
            Ok(Ok(docs)) => {
                info!("Endpoint docs: {}", docs.len());
                docs
            }
            Ok(Err(e)) => {
                error!("Failed to read API reference: {}", e);
                BTreeMap::new()
            }
            Err(e) => {
                error!("API reference extraction failed: {}", e);
                BTreeMap::new()
            }
        }
    }

    async fn mdx_docs(&self, source: &SourceConfig) -> BTreeMap<String, String> {
        let Some(dir) = source.docs_dir.clone() else {
            return BTreeMap::new();
        };
        if !dir.is_dir() {
            error!("Docs directory not found: {}", dir.display());
            return BTreeMap::new();
        }

        match tokio::task::spawn_blocking(move || scrape::extract_bybit_docs(&dir)).await {
            Ok(docs) => docs,
            Err(e) => {
                error!("Docs extraction failed: {}", e);
                BTreeMap::new()
            }
        }
    }

    /// Endpoint table plus crawled endpoint docs, when the crawl is on.
    async fn crawled_docs(
        &self,
        source: &SourceConfig,
    ) -> Result<(BTreeMap<String, Endpoint>, BTreeMap<String, String>)> {
        let crawl = match &source.crawl {
            Some(crawl) if crawl.enabled || self.crawl => crawl,
            _ => return Ok((BTreeMap::new(), BTreeMap::new())),
        };

        let endpoints = self.endpoint_table(source).await?;
        let docs = match scrape::crawl_docs(self.fetcher.as_ref(), crawl).await {
            Ok(pages) => {
                if !pages.is_empty() {
                    if let Err(e) = scrape::save_crawl_results(&self.output_dir, &pages) {
                        warn!("Could not save crawled pages: {}", e);
                    }
                }
                scrape::endpoint_docs(&pages)
            }
            Err(e) => {
                error!("Documentation crawl failed: {}", e);
                BTreeMap::new()
            }
        };
        Ok((endpoints, docs))
    }
}

fn log_stats(id: ExchangeId, stats: &MergeStats) {
    info!(
        "{}: {} methods matched a doc, {} without doc",
        id.display_name(),
        stats.matched,
        stats.missing
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;
    use crate::offline_data::load_offline_data;
    use crate::scrape::fetch::testing::StubFetcher;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const TABLE: &str = "| Function | AUTH | HTTP Method | Endpoint |\n\
| -------- | :------: | :------: | -------- |\n\
| [getSpotTicker()](src/RestClient.ts#L10) |  | GET | `/spot/tickers` |\n\
| [submitSpotOrder()](src/RestClient.ts#L20) | :closed_lock_with_key: | POST | `/spot/orders` |\n";

    const GATE_DTS: &str = r#"
export declare class RestClient {
    /**
     * List tickers
     * @param params Query parameters
     */
    getSpotTicker(params?: { currency_pair?: string }): Promise<string[]>;
    submitSpotOrder(params: { text: string }): Promise<object>;
    private _sign;
}
"#;

    const GATE_HTML: &str = r#"<html><body>
        <div class="content-block__cont"><h2>List tickers</h2><code>GET /spot/tickers</code></div>
    </body></html>"#;

    fn gate_config(root: &Path) -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.scraper.declaration_root = root.join("node_modules");
        config.sources.insert(
            "gate".to_string(),
            SourceConfig {
                readme_url: Some("https://raw.test/gate/README.md".to_string()),
                endpoint_list_url: Some("https://raw.test/gate/endpoints.md".to_string()),
                api_html: Some(root.join("gate.html")),
                declaration_files: vec![PathBuf::from("gateio-api/RestClient.d.ts")],
                skip_underscore: true,
                ..SourceConfig::default()
            },
        );
        config
    }

    fn write_gate_sources(root: &Path) {
        let lib = root.join("node_modules/gateio-api");
        fs::create_dir_all(&lib).unwrap();
        fs::write(lib.join("RestClient.d.ts"), GATE_DTS).unwrap();
        fs::write(root.join("gate.html"), GATE_HTML).unwrap();
    }

    #[tokio::test]
    async fn test_generate_gate() {
        let dir = TempDir::new().unwrap();
        write_gate_sources(dir.path());

        let fetcher = StubFetcher::default()
            .with_page("https://raw.test/gate/README.md", "# gateio-api")
            .with_page("https://raw.test/gate/endpoints.md", TABLE);
        let generator = Generator::new(gate_config(dir.path()), Arc::new(fetcher))
            .with_output_dir(dir.path().join("data"));

        let report = generator.generate(ExchangeId::Gate).await.unwrap();
        assert_eq!(report.methods, 2);
        assert_eq!(report.documented, 1);
        assert_eq!(report.path, dir.path().join("data/gate-offline-data.json"));

        let data = load_offline_data(&report.path).unwrap();
        assert_eq!(data.readme, "# gateio-api");
        assert_eq!(data.reflected_count(), 2);

        let ticker = &data.methods["getSpotTicker"];
        assert!(ticker.doc.starts_with("List tickers"));
        let info = ticker.method_info.as_ref().unwrap();
        assert_eq!(info.method_comment, "List tickers");
        assert_eq!(info.params[0].comment, "Query parameters");
        assert_eq!(data.methods["submitSpotOrder"].doc, "");
    }

    #[tokio::test]
    async fn test_missing_html_degrades() {
        let dir = TempDir::new().unwrap();
        write_gate_sources(dir.path());
        fs::remove_file(dir.path().join("gate.html")).unwrap();

        let fetcher = StubFetcher::default()
            .with_page("https://raw.test/gate/README.md", "# gateio-api")
            .with_page("https://raw.test/gate/endpoints.md", TABLE);
        let generator = Generator::new(gate_config(dir.path()), Arc::new(fetcher));

        let data = generator.build(ExchangeId::Gate).await.unwrap();
        assert_eq!(data.method_count(), 2);
        assert_eq!(data.documented_count(), 0);
    }

    #[tokio::test]
    async fn test_readme_failure_fails_exchange() {
        let dir = TempDir::new().unwrap();
        write_gate_sources(dir.path());

        let fetcher = StubFetcher::default().with_page("https://raw.test/gate/endpoints.md", TABLE);
        let generator = Generator::new(gate_config(dir.path()), Arc::new(fetcher))
            .with_output_dir(dir.path().join("data"));

        let outcomes = generator
            .generate_all(&[ExchangeId::Gate], |_, _| {})
            .await;
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].1.is_err());
        assert!(!dir.path().join("data/gate-offline-data.json").exists());
    }

    #[tokio::test]
    async fn test_okx_dex_pages() {
        let mut config = ServiceConfig::default();
        config.scraper.request_delay_ms = 0;
        config.sources.insert(
            "okx-dex".to_string(),
            SourceConfig {
                doc_urls: vec!["https://dex.test/quote".to_string()],
                ..SourceConfig::default()
            },
        );
        let fetcher = StubFetcher::default().with_page(
            "https://dex.test/quote",
            r#"<div class="doc-content"><h1>Get Quotes</h1><p>Best route.</p></div>"#,
        );

        let data = Generator::new(config, Arc::new(fetcher))
            .build(ExchangeId::OkxDex)
            .await
            .unwrap();
        assert_eq!(data.readme, "");
        assert_eq!(data.methods["Get Quotes"].doc, "# Get Quotes\n\nBest route.");
        assert!(data.methods["Get Quotes"].method_info.is_none());
    }

    #[tokio::test]
    async fn test_bitget_crawl_docs() {
        let dir = TempDir::new().unwrap();
        let lib = dir.path().join("bitget-api");
        fs::create_dir_all(&lib).unwrap();
        fs::write(
            lib.join("rest-client-v2.d.ts"),
            "export declare class RestClientV2 {\n  getSpotTickers(params?: object): Promise<object>;\n  getSpotCandles(params: object): Promise<object>;\n}\n",
        )
        .unwrap();

        let mut config = ServiceConfig::default();
        config.server.data_dir = dir.path().join("data");
        config.scraper.declaration_root = dir.path().to_path_buf();
        config.sources.insert(
            "bitget".to_string(),
            SourceConfig {
                endpoint_list_url: Some("https://raw.test/bitget/endpoints.md".to_string()),
                declaration_files: vec![PathBuf::from("bitget-api/rest-client-v2.d.ts")],
                skip_underscore: true,
                crawl: Some(CrawlConfig {
                    start_url: "https://docs.test/spot/tickers".to_string(),
                    delay_ms: 0,
                    ..CrawlConfig::default()
                }),
                ..SourceConfig::default()
            },
        );

        let table = "| Function | AUTH | HTTP Method | Endpoint |\n\
| [getSpotTickers()](src/rest-client-v2.ts#L1) |  | GET | `/api/v2/spot/market/tickers` |\n";
        let fetcher = Arc::new(
            StubFetcher::default()
                .with_page("https://raw.test/bitget/endpoints.md", table)
                .with_page(
                    "https://docs.test/spot/tickers",
                    "<html><body><h1>Get Tickers</h1><article><p>GET /api/v2/spot/market/tickers</p></article></body></html>",
                ),
        );

        // crawl disabled in config: no doc, no requests
        let data = Generator::new(config.clone(), fetcher.clone())
            .build(ExchangeId::Bitget)
            .await
            .unwrap();
        assert_eq!(data.method_count(), 2);
        assert_eq!(data.documented_count(), 0);
        assert!(fetcher.requested.lock().unwrap().is_empty());

        let data = Generator::new(config, fetcher.clone())
            .with_crawl(true)
            .build(ExchangeId::Bitget)
            .await
            .unwrap();
        assert_eq!(data.methods["getSpotTickers"].doc, "GET /api/v2/spot/market/tickers");
        assert_eq!(data.methods["getSpotCandles"].doc, "");

        let saved: Vec<_> = fs::read_dir(dir.path().join("data"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].starts_with("bitget_docs_"));
    }
}
