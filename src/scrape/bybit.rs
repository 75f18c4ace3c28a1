//! Bybit v5 documentation sources (`.mdx` files with SDK code tabs).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::core::read_text_file;

static NODE_TAB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<TabItem value="Node"[\s\S]*?```n4js[\s\S]*?```"#).expect("Invalid Node tab regex")
});

static CLIENT_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)client\s*\.\s*([a-zA-Z0-9_]+)\s*\(").expect("Invalid client call regex"));

/// Method name demonstrated by the Node.js tab of one doc page.
pub fn method_from_mdx(content: &str) -> Option<String> {
    let section = NODE_TAB.find(content)?.as_str();
    if !section.contains("bybit-api") {
        return None;
    }
    CLIENT_CALL.captures(section).map(|caps| caps[1].to_string())
}

/// Walks `docs_dir` and maps SDK method names to their whole doc page.
/// Files are visited in path order; a later page for the same method wins.
pub fn extract_bybit_docs(docs_dir: &Path) -> BTreeMap<String, String> {
    let mut docs = BTreeMap::new();

    let walker = WalkDir::new(docs_dir).sort_by_file_name().into_iter();
    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "mdx") {
            continue;
        }

        let content = match read_text_file(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        if let Some(method) = method_from_mdx(&content) {
            debug!("{} -> {}", path.display(), method);
            docs.insert(method, content);
        }
    }

    debug!("Bybit method docs: {}", docs.len());
    docs
}
