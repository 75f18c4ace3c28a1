/*!
# Error System

Library-wide error type. Binaries wrap it in `anyhow` with context;
the MCP layer maps it onto JSON-RPC error codes.
*/

use std::path::PathBuf;
use thiserror::Error;

use super::position::Position;

pub type Result<T> = std::result::Result<T, DocsError>;

#[derive(Error, Debug)]
pub enum DocsError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("Lexical error at {position}: unexpected character '{text}'")]
    Lex { position: Position, text: String },

    #[error("Parse error at {position}: {message}")]
    Parse { position: Position, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown exchange: {0}")]
    UnknownExchange(String),

    #[error("Method {method} not found for {exchange}")]
    MethodNotFound {
        exchange: String,
        method: String,
        suggestions: Vec<String>,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParams(String),

    #[error("Invalid CSS selector '{0}'")]
    Selector(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl DocsError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocsError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn http(url: impl Into<String>, message: impl ToString) -> Self {
        DocsError::Http {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn parse(position: Position, message: impl Into<String>) -> Self {
        DocsError::Parse {
            position,
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for DocsError {
    fn from(e: toml::de::Error) -> Self {
        DocsError::Config(e.to_string())
    }
}

impl From<serde_yaml::Error> for DocsError {
    fn from(e: serde_yaml::Error) -> Self {
        DocsError::Config(e.to_string())
    }
}

impl From<tokio::task::JoinError> for DocsError {
    fn from(e: tokio::task::JoinError) -> Self {
        DocsError::Task(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DocsError::parse(Position::new(4, 2, 30), "expected ';'");
        assert_eq!(err.to_string(), "Parse error at 4:2: expected ';'");

        let err = DocsError::MethodNotFound {
            exchange: "Bybit".to_string(),
            method: "getKlines".to_string(),
            suggestions: vec!["getKline".to_string()],
        };
        assert_eq!(err.to_string(), "Method getKlines not found for Bybit");
    }

    #[test]
    fn test_config_error_from_toml() {
        let err: DocsError = toml::from_str::<toml::Value>("a = ").unwrap_err().into();
        assert!(matches!(err, DocsError::Config(_)));
    }
}
