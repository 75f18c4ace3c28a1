//! Markdown endpoint-function tables published next to the client libraries.
//!
//! ```text
//! | Function | AUTH | HTTP Method | Endpoint |
//! | -------- | :------: | :------: | -------- |
//! | [getServerTime()](src/rest-client.ts#L120) |  | GET | `/v5/market/time` |
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

pub const HTTP_METHODS: [&str; 5] = ["GET", "POST", "DELETE", "PUT", "PATCH"];

static ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\|\s*\[(\w+)\(\)\]\([^)]+\)\s*\|\s*[^|]*\|\s*(GET|POST|DELETE|PUT|PATCH)\s*\|\s*`([^`]+)`\s*\|")
        .expect("Invalid endpoint row regex")
});

/// HTTP method and path of one client function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: String,
    pub path: String,
}

impl Endpoint {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }

    /// Doc lookup key, `"GET /api/v5/market/tickers"`
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Parses the first `| Function` table (up to the next blank line).
/// A later row for the same function replaces an earlier one.
pub fn parse_endpoint_table(markdown: &str) -> BTreeMap<String, Endpoint> {
    let mut map = BTreeMap::new();

    let Some(start) = markdown.find("| Function") else {
        return map;
    };
    let table = &markdown[start..];
    let table = match table.find("\n\n") {
        Some(end) => &table[..end],
        None => table,
    };

    for line in table.lines() {
        if let Some(caps) = ROW.captures(line.trim_end_matches('\r')) {
            map.insert(caps[1].to_string(), Endpoint::new(&caps[2], &caps[3]));
        }
    }

    map
}
