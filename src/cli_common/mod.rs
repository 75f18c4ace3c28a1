//! Shared helpers of the command-line binaries
//!
//! - logging setup (always on stderr; stdout carries command output or MCP messages)
//! - colored status lines
//! - output formatting and progress bars

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

pub mod output;
pub mod progress;

pub use output::{OutputFormat, OutputWriter};
pub use progress::{exchange_progress, spinner};

fn env_filter(default_level: tracing::Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.as_str()))
}

/// Logging for the CLI. `RUST_LOG` wins over the default level; `verbose`
/// adds debug output on top of it.
pub fn init_logging(verbose: bool) -> Result<()> {
    let mut filter = env_filter(tracing::Level::INFO);
    if verbose {
        filter = filter.add_directive(tracing::Level::DEBUG.into());
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// Logging for the MCP server: stderr without ANSI colors
pub fn init_server_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(tracing::Level::INFO))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

pub fn print_header(name: &str, version: &str, description: &str) {
    println!("{} {} - {}", "🔧".blue(), name.bold().blue(), version.dimmed());
    println!("{}\n", description.dimmed());
}

pub fn print_success(message: &str) {
    println!("{} {}", "✅".green(), message.green());
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠️".yellow(), message.yellow());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "❌".red(), message.red());
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ️".blue(), message);
}

pub fn validate_path(path: &Path, description: &str) -> Result<()> {
    if !path.exists() {
        return Err(anyhow::anyhow!("{} does not exist: {}", description, path.display()));
    }
    Ok(())
}

/// `1536` → `1.50 KB`
pub fn format_file_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_file_size(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn test_format_duration() {
        use std::time::Duration;

        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_millis(2250)), "2.250s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
    }

    #[test]
    fn test_paths() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("data").join("offline");

        assert!(validate_path(&nested, "Data directory").is_err());
        std::fs::create_dir_all(&nested).unwrap();
        assert!(validate_path(&nested, "Data directory").is_ok());
    }
}
