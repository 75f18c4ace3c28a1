/*!
# Exchange Docs CLI

Builds the offline documentation data of the supported exchanges, serves it
over MCP and inspects it from the terminal.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use exchange_docs::adapter::{AdapterRegistry, ExchangeAdapter};
use exchange_docs::cli_common::{
    self, exchange_progress, format_duration, format_file_size, print_error, print_header, print_info,
    print_success, print_warning, spinner, OutputFormat, OutputWriter,
};
use exchange_docs::config::ServiceConfig;
use exchange_docs::core::{write_json_pretty, DocsError};
use exchange_docs::dts::{extract_methods, ExtractOptions, KeyStyle, DEFAULT_MAX_DEPTH};
use exchange_docs::exchange::ExchangeId;
use exchange_docs::generate::Generator;
use exchange_docs::offline_data::{data_file_path, load_offline_data};
use exchange_docs::scrape::{DocFetcher, HttpFetcher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "exchange-docs",
    version = env!("CARGO_PKG_VERSION"),
    author = "Exchange Docs Team",
    about = "Offline documentation of cryptocurrency exchange SDKs, served over MCP"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server on stdin/stdout
    Serve {
        /// Directory with the offline data files
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Scrape documentation and regenerate offline data files
    Generate {
        /// Exchanges to generate (gate, bybit, okx, okx-dex, binance, bitget)
        exchanges: Vec<ExchangeId>,

        /// Generate every exchange
        #[arg(long, conflicts_with = "exchanges")]
        all: bool,

        /// Output directory (defaults to server.data_dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Crawl the Bitget documentation site as well
        #[arg(long)]
        crawl: bool,
    },

    /// List the methods of one exchange
    Methods {
        exchange: ExchangeId,

        /// Output format (text, json, table)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the stored documentation of one method
    Doc {
        exchange: ExchangeId,

        method: String,

        /// Pretty-print the JSON entry
        #[arg(long)]
        pretty: bool,
    },

    /// Summary of the offline data files
    Info {
        /// Output format (text, json, table)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Extract method definitions from TypeScript declaration files
    InspectDts {
        /// Declaration files (`.d.ts`)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Extra files or directories used only to resolve types
        #[arg(long = "type-root")]
        type_roots: Vec<PathBuf>,

        /// Only these classes
        #[arg(long = "class")]
        classes: Vec<String>,

        /// Only methods returning a Promise
        #[arg(long)]
        promise_only: bool,

        /// Key methods as `<file stem>.<method>`
        #[arg(long)]
        prefix_keys: bool,

        /// Keep methods starting with an underscore
        #[arg(long)]
        include_private: bool,

        /// Maximum depth of expanded types
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Write the result to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write the default configuration
    Init {
        /// Target file (defaults to the user config path)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration as TOML
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Serve { .. }) {
        cli_common::init_server_logging()?;
    } else {
        cli_common::init_logging(cli.verbose)?;
    }

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ServiceConfig::resolve(cli.config.as_deref())?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Serve { data_dir } => {
            if let Some(data_dir) = data_dir {
                config.server.data_dir = data_dir;
            }
            serve_command(&config).await
        }
        Commands::Generate {
            exchanges,
            all,
            output_dir,
            crawl,
        } => generate_command(config, exchanges, all, output_dir, crawl).await,
        Commands::Methods { exchange, format } => methods_command(&config, exchange, format),
        Commands::Doc {
            exchange,
            method,
            pretty,
        } => doc_command(&config, exchange, &method, pretty),
        Commands::Info { format } => info_command(&config, format),
        Commands::InspectDts {
            files,
            type_roots,
            classes,
            promise_only,
            prefix_keys,
            include_private,
            max_depth,
            output,
        } => {
            let options = ExtractOptions {
                class_filter: classes,
                skip_underscore: !include_private,
                promise_only,
                key_style: if prefix_keys { KeyStyle::FileStem } else { KeyStyle::Method },
                max_depth,
            };
            inspect_dts_command(&files, &type_roots, &options, output)
        }
        Commands::Config { command } => match command {
            ConfigCommands::Init { path, force } => config_init_command(path, force),
            ConfigCommands::Show => {
                print!("{}", config.to_toml_string()?);
                Ok(())
            }
        },
    }
}

async fn serve_command(config: &ServiceConfig) -> Result<()> {
    info!("Loading offline data from {}", config.server.data_dir.display());
    let registry = AdapterRegistry::from_config(config).context("Failed to load offline data")?;
    exchange_docs::mcp_server::run_stdio(registry)
        .await
        .context("MCP server failed")
}

async fn generate_command(
    config: ServiceConfig,
    exchanges: Vec<ExchangeId>,
    all: bool,
    output_dir: Option<PathBuf>,
    crawl: bool,
) -> Result<()> {
    print_header(
        "exchange-docs generate",
        env!("CARGO_PKG_VERSION"),
        "Scraping SDK documentation into offline data files",
    );

    let ids = if all || exchanges.is_empty() {
        ExchangeId::ALL.to_vec()
    } else {
        exchanges
    };

    let fetcher: Arc<dyn DocFetcher> = Arc::new(HttpFetcher::new(&config.scraper)?);
    let mut generator = Generator::new(config, fetcher).with_crawl(crawl);
    if let Some(dir) = output_dir {
        generator = generator.with_output_dir(dir);
    }
    print_info(&format!("Output directory: {}", generator.output_dir().display()));

    let start = Instant::now();
    let pb = exchange_progress(ids.len() as u64)?;
    let outcomes = generator
        .generate_all(&ids, |id, outcome| {
            match outcome {
                Ok(report) => pb.println(format!(
                    "{} {}: {} methods ({} documented, {} with type info), {} in {}",
                    "✅".green(),
                    id.display_name(),
                    report.methods,
                    report.documented,
                    report.reflected,
                    format_file_size(report.bytes as u64),
                    format_duration(report.elapsed)
                )),
                Err(e) => pb.println(format!("{} {}: {}", "❌".red(), id.display_name(), e.to_string().red())),
            }
            pb.set_message(id.display_name());
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();

    let failed: Vec<String> = outcomes
        .iter()
        .filter(|(_, outcome)| outcome.is_err())
        .map(|(id, _)| id.as_str().to_string())
        .collect();

    if failed.is_empty() {
        print_success(&format!(
            "Generated {} exchange(s) in {}",
            outcomes.len(),
            format_duration(start.elapsed())
        ));
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Generation failed for {} of {} exchange(s): {}",
            failed.len(),
            outcomes.len(),
            failed.join(", ")
        ))
    }
}

fn load_registry(config: &ServiceConfig, id: ExchangeId) -> Result<AdapterRegistry> {
    AdapterRegistry::load(&config.server.data_dir, &[id])
        .with_context(|| format!("Failed to load offline data of {}", id.display_name()))
}

fn methods_command(config: &ServiceConfig, id: ExchangeId, format: OutputFormat) -> Result<()> {
    let registry = load_registry(config, id)?;
    let adapter = registry
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("{} is not registered", id.display_name()))?;
    let methods = adapter.list_methods();

    let mut writer = OutputWriter::stdout(format);
    match format {
        OutputFormat::Json => writer.write_object(&methods)?,
        OutputFormat::Text | OutputFormat::Table => {
            writer.write_header(&format!("{} ({} methods)", adapter.display_name(), methods.len()))?;
            let rows = methods
                .into_iter()
                .map(|m| vec![m.method, m.description.unwrap_or_default()])
                .collect();
            writer.write_table(&["method", "description"], rows)?;
        }
    }
    writer.flush()
}

fn doc_command(config: &ServiceConfig, id: ExchangeId, method: &str, pretty: bool) -> Result<()> {
    let registry = load_registry(config, id)?;
    let adapter = registry
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("{} is not registered", id.display_name()))?;

    match adapter.get_doc(method) {
        Ok(entry) => {
            let mut writer = OutputWriter::stdout(OutputFormat::Json).with_pretty(pretty);
            writer.write_object(entry)?;
            writer.flush()
        }
        Err(DocsError::MethodNotFound { suggestions, .. }) if !suggestions.is_empty() => {
            print_warning(&format!("Did you mean: {}?", suggestions.join(", ")));
            Err(anyhow::anyhow!("Method {} not found for {}", method, adapter.display_name()))
        }
        Err(e) => Err(e.into()),
    }
}

fn info_command(config: &ServiceConfig, format: OutputFormat) -> Result<()> {
    let mut rows = Vec::new();

    for id in ExchangeId::ALL {
        let path = data_file_path(&config.server.data_dir, id.as_str());
        let enabled = if config.is_enabled(id) { "yes" } else { "no" };

        let row = if path.is_file() {
            let data = load_offline_data(&path)?;
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            vec![
                id.as_str().to_string(),
                enabled.to_string(),
                data.method_count().to_string(),
                data.documented_count().to_string(),
                data.reflected_count().to_string(),
                format_file_size(size),
                data.generated_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        } else {
            vec![
                id.as_str().to_string(),
                enabled.to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "missing".to_string(),
                "-".to_string(),
            ]
        };
        rows.push(row);
    }

    let mut writer = OutputWriter::stdout(format);
    writer.write_header(&format!("Offline data in {}", config.server.data_dir.display()))?;
    writer.write_table(
        &["exchange", "enabled", "methods", "documented", "typed", "size", "generated"],
        rows,
    )?;
    writer.flush()
}

fn inspect_dts_command(
    files: &[PathBuf],
    type_roots: &[PathBuf],
    options: &ExtractOptions,
    output: Option<PathBuf>,
) -> Result<()> {
    for file in files {
        cli_common::validate_path(file, "Declaration file")?;
    }

    let pb = spinner(format!("Parsing {} declaration file(s)...", files.len()))?;
    let methods = extract_methods(files, type_roots, options);
    pb.finish_and_clear();

    if methods.is_empty() {
        print_warning("No methods found");
    }

    match output {
        Some(path) => {
            let bytes = write_json_pretty(&path, &methods)?;
            print_success(&format!(
                "{} methods written to {} ({})",
                methods.len(),
                path.display(),
                format_file_size(bytes as u64)
            ));
        }
        None => {
            let mut writer = OutputWriter::stdout(OutputFormat::Json).with_pretty(true);
            writer.write_object(&methods)?;
            writer.flush()?;
        }
    }
    Ok(())
}

fn config_init_command(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => ServiceConfig::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine the user config directory"))?,
    };

    if path.exists() && !force {
        return Err(anyhow::anyhow!(
            "{} already exists, use --force to overwrite",
            path.display()
        ));
    }
    ServiceConfig::default().save_to_file(&path)?;
    print_success(&format!("Default configuration written to {}", path.display()));
    Ok(())
}
