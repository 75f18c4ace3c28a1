//! File system helpers: encoding-aware text reading and JSON writing.
use std::fs;
use std::path::Path;

use serde::Serialize;

use super::errors::{DocsError, Result};

/// Reads a text file (declaration file, saved HTML page, MDX doc) as UTF-8.
///
/// UTF-16 files are recognized by their BOM; bytes that are not valid UTF-8
/// fall back to Windows-1252, which is what saved browser pages usually are.
pub fn read_text_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| DocsError::io(path, e))?;
    Ok(decode_text(&bytes))
}

pub fn decode_text(bytes: &[u8]) -> String {
    let content = match bytes {
        [0xFF, 0xFE, ..] => {
            let (decoded, _, had_errors) = encoding_rs::UTF_16LE.decode(bytes);
            if had_errors {
                tracing::warn!("Errors detected while decoding UTF-16LE text");
            }
            decoded.into_owned()
        }
        [0xFE, 0xFF, ..] => {
            let (decoded, _, had_errors) = encoding_rs::UTF_16BE.decode(bytes);
            if had_errors {
                tracing::warn!("Errors detected while decoding UTF-16BE text");
            }
            decoded.into_owned()
        }
        _ => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => {
                tracing::debug!("UTF-8 decoding failed, trying Windows-1252");
                let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
                decoded.into_owned()
            }
        },
    };

    strip_bom(&content).to_string()
}

/// Removes a leading U+FEFF.
pub fn strip_bom(input: &str) -> &str {
    input.strip_prefix('\u{FEFF}').unwrap_or(input)
}

/// Writes `value` as pretty JSON, creating parent directories.
/// Returns the number of bytes written.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| DocsError::io(parent, e))?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, &json).map_err(|e| DocsError::io(path, e))?;
    Ok(json.len())
}
