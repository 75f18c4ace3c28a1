/*!
# Service Configuration

Configuration for the server and the offline generator. Loaded from TOML
or YAML (chosen by file extension); every field has a default, and the
defaults reproduce the documentation sources the data files were built
from.

Resolution order: explicit path → `EXCHANGE_DOCS_CONFIG` →
`<config dir>/exchange-docs/config.toml` → built-in defaults.
`EXCHANGE_DOCS_DATA_DIR` overrides the data directory in every case.

A `[sources.<exchange>]` table replaces the built-in source settings of
that exchange as a whole.
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::DocsError;
use crate::dts::{ExtractOptions, KeyStyle, DEFAULT_MAX_DEPTH};
use crate::exchange::ExchangeId;

pub const CONFIG_ENV: &str = "EXCHANGE_DOCS_CONFIG";
pub const DATA_DIR_ENV: &str = "EXCHANGE_DOCS_DATA_DIR";

const RAW_GITHUB: &str = "https://raw.githubusercontent.com/tiagosiebler";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Per-exchange sources, keyed by exchange id (`gate`, `okx-dex`, ...)
    #[serde(default = "default_sources")]
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directory holding `<exchange>-offline-data.json`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Exchanges exposed as tools, in registration order
    #[serde(default = "default_enabled")]
    pub enabled: Vec<ExchangeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Pause between sequential page requests
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Root that relative declaration paths are resolved against
    #[serde(default = "default_declaration_root")]
    pub declaration_root: PathBuf,

    #[serde(default = "default_max_type_depth")]
    pub max_type_depth: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme_url: Option<String>,

    /// Markdown endpoint-function table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_list_url: Option<String>,

    /// Saved API documentation page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_html: Option<PathBuf>,

    /// Directory of MDX documentation sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_dir: Option<PathBuf>,

    /// Declaration files to extract methods from (relative to `declaration_root`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub declaration_files: Vec<PathBuf>,

    /// Extra files or directories used only for type lookup
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_roots: Vec<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class_filter: Vec<String>,

    #[serde(default = "default_true")]
    pub skip_underscore: bool,

    #[serde(default)]
    pub promise_only: bool,

    #[serde(default)]
    pub key_style: KeyStyle,

    /// Documentation pages scraped one after another
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doc_urls: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crawl: Option<CrawlConfig>,
}

/// Page-by-page documentation crawl following "next page" links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default)]
    pub enabled: bool,

    pub start_url: String,

    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default = "default_crawl_delay_ms")]
    pub delay_ms: u64,

    #[serde(default = "default_title_selector")]
    pub title_selector: String,

    #[serde(default = "default_content_selector")]
    pub content_selector: String,

    #[serde(default = "default_next_selector")]
    pub next_selector: String,
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_enabled() -> Vec<ExchangeId> {
    ExchangeId::ALL.to_vec()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("exchange-docs/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_delay_ms() -> u64 {
    100
}

fn default_declaration_root() -> PathBuf {
    PathBuf::from("node_modules")
}

fn default_max_type_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_max_pages() -> usize {
    50
}

fn default_crawl_delay_ms() -> u64 {
    1000
}

fn default_title_selector() -> String {
    "h1".to_string()
}

fn default_content_selector() -> String {
    "article".to_string()
}

fn default_next_selector() -> String {
    "a.next-page, a[rel='next']".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            enabled: default_enabled(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            request_delay_ms: default_request_delay_ms(),
            declaration_root: default_declaration_root(),
            max_type_depth: default_max_type_depth(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start_url: String::new(),
            max_pages: default_max_pages(),
            delay_ms: default_crawl_delay_ms(),
            title_selector: default_title_selector(),
            content_selector: default_content_selector(),
            next_selector: default_next_selector(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scraper: ScraperConfig::default(),
            sources: default_sources(),
        }
    }
}

fn readme_url(repo: &str) -> Option<String> {
    Some(format!("{}/{}/refs/heads/master/README.md", RAW_GITHUB, repo))
}

fn endpoint_list_url(repo: &str) -> Option<String> {
    Some(format!(
        "{}/{}/refs/heads/master/docs/endpointFunctionList.md",
        RAW_GITHUB, repo
    ))
}

const OKX_DEX_PAGES: &[&str] = &[
    "dex-use-swap-solana-quick-start",
    "dex-use-swap-solana-advance-control",
    "dex-use-swap-quick-start",
    "dex-use-swap-sui-quick-start",
    "dex-use-swap-ton-quick-start",
    "dex-swap-api-introduction",
    "dex-api-reference",
    "dex-api-addfee",
    "dex-smart-contract",
    "dex-error-code",
    "dex-aggregation-faq",
    "dex-onchain-gateway-api-introduction",
    "dex-onchain-gateway-reference",
    "dex-onchain-gateway-error-code",
    "dex-market-price-reference",
    "dex-market-price-error-code",
    "dex-websocket",
    "dex-index-price-reference",
    "dex-index-price-chains",
    "dex-index-price",
    "dex-historical-index-price",
    "dex-index-price-error-code",
    "dex-balance-reference",
    "dex-balance-error-code",
    "dex-tx-history-reference",
    "dex-tx-history-error-code",
    "dex-sdk-introduction",
    "dex-sdk-evm",
    "dex-sdk-solana",
    "dex-sdk-sui",
    "private-key-wallet-javascript-sdk",
    "private-key-wallet-go-sdk",
];

/// Built-in sources of one exchange
pub fn default_source(id: ExchangeId) -> SourceConfig {
    match id {
        ExchangeId::Gate => SourceConfig {
            readme_url: readme_url("gateio-api"),
            endpoint_list_url: endpoint_list_url("gateio-api"),
            api_html: Some(PathBuf::from("sources/gate/apiHtmlText.html")),
            declaration_files: vec![PathBuf::from("gateio-api/dist/mjs/RestClient.d.ts")],
            type_roots: vec![PathBuf::from("gateio-api/dist/mjs/types")],
            ..SourceConfig::base()
        },
        ExchangeId::Bybit => SourceConfig {
            readme_url: readme_url("bybit-api"),
            endpoint_list_url: endpoint_list_url("bybit-api"),
            docs_dir: Some(PathBuf::from("sources/bybit/bybit-docs/v5")),
            declaration_files: vec![PathBuf::from("bybit-api/lib/rest-client-v5.d.ts")],
            type_roots: vec![PathBuf::from("bybit-api/lib/types")],
            class_filter: vec!["RestClientV5".to_string()],
            ..SourceConfig::base()
        },
        ExchangeId::Okx => SourceConfig {
            readme_url: readme_url("okx-api"),
            endpoint_list_url: endpoint_list_url("okx-api"),
            api_html: Some(PathBuf::from("sources/okx/apiHtmlText.html")),
            declaration_files: vec![PathBuf::from("okx-api/lib/rest-client.d.ts")],
            type_roots: vec![PathBuf::from("okx-api/lib/types")],
            ..SourceConfig::base()
        },
        ExchangeId::OkxDex => SourceConfig {
            doc_urls: OKX_DEX_PAGES
                .iter()
                .map(|page| format!("https://web3.okx.com/zh-hans/build/dev-docs/dex-api/{}", page))
                .collect(),
            ..SourceConfig::base()
        },
        ExchangeId::Binance => SourceConfig {
            readme_url: readme_url("binance"),
            declaration_files: vec![
                PathBuf::from("binance/lib/usdm-client.d.ts"),
                PathBuf::from("binance/lib/main-client.d.ts"),
                PathBuf::from("binance/lib/coinm-client.d.ts"),
            ],
            type_roots: vec![PathBuf::from("binance/lib/types")],
            promise_only: true,
            key_style: KeyStyle::FileStem,
            ..SourceConfig::base()
        },
        ExchangeId::Bitget => SourceConfig {
            readme_url: readme_url("bitget-api"),
            endpoint_list_url: endpoint_list_url("bitget-api"),
            declaration_files: vec![PathBuf::from("bitget-api/lib/rest-client-v2.d.ts")],
            type_roots: vec![PathBuf::from("bitget-api/lib/types")],
            crawl: Some(CrawlConfig {
                start_url: "https://www.bitget.com/zh-CN/api-doc/uta/intro".to_string(),
                ..CrawlConfig::default()
            }),
            ..SourceConfig::base()
        },
    }
}

fn default_sources() -> BTreeMap<String, SourceConfig> {
    ExchangeId::ALL
        .iter()
        .map(|id| (id.as_str().to_string(), default_source(*id)))
        .collect()
}

impl SourceConfig {
    /// Empty source with the serde defaults applied
    fn base() -> Self {
        Self {
            skip_underscore: true,
            ..Default::default()
        }
    }

    /// Extraction options for this exchange's declaration files
    pub fn extract_options(&self, max_depth: usize) -> ExtractOptions {
        ExtractOptions {
            class_filter: self.class_filter.clone(),
            skip_underscore: self.skip_underscore,
            promise_only: self.promise_only,
            key_style: self.key_style,
            max_depth,
        }
    }
}

impl ServiceConfig {
    /// Parses TOML; missing exchange sources get their defaults.
    pub fn from_toml_str(content: &str) -> crate::core::Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.fill_missing_sources();
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> crate::core::Result<Self> {
        let mut config: Self = serde_yaml::from_str(content)?;
        config.fill_missing_sources();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML or YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_toml_str(&content)
        };
        config.with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    /// Default user config location, `<config dir>/exchange-docs/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("exchange-docs").join("config.toml"))
    }

    /// Resolves the effective configuration (see module docs for the order)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let user_path = Self::user_config_path().filter(|p| p.is_file());

        let mut config = match explicit.map(Path::to_path_buf).or(env_path).or(user_path) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load_from_file(&path)?
            }
            None => Self::default(),
        };

        if let Some(data_dir) = std::env::var_os(DATA_DIR_ENV) {
            config.server.data_dir = PathBuf::from(data_dir);
        }

        Ok(config)
    }

    fn fill_missing_sources(&mut self) {
        for id in ExchangeId::ALL {
            self.sources
                .entry(id.as_str().to_string())
                .or_insert_with(|| default_source(id));
        }
    }

    /// Rejects unknown source keys and unusable scraper settings
    pub fn validate(&self) -> crate::core::Result<()> {
        for key in self.sources.keys() {
            key.parse::<ExchangeId>()
                .map_err(|_| DocsError::Config(format!("Unknown exchange in [sources]: {}", key)))?;
        }
        if self.scraper.timeout_secs == 0 {
            return Err(DocsError::Config("scraper.timeout_secs must be positive".to_string()));
        }
        if self.scraper.max_type_depth == 0 {
            return Err(DocsError::Config("scraper.max_type_depth must be positive".to_string()));
        }
        Ok(())
    }

    pub fn source(&self, id: ExchangeId) -> SourceConfig {
        self.sources
            .get(id.as_str())
            .cloned()
            .unwrap_or_else(|| default_source(id))
    }

    /// Resolves a declaration path against `scraper.declaration_root`
    pub fn declaration_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.scraper.declaration_root.join(path)
        }
    }

    pub fn is_enabled(&self, id: ExchangeId) -> bool {
        self.server.enabled.contains(&id)
    }
}
