//! Merge rules that combine endpoint tables, doc sources and declaration
//! records into offline method entries.

use std::collections::BTreeMap;

use crate::offline_data::{MethodEntry, MethodInfo};
use crate::scrape::Endpoint;

/// Doc coverage of a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub matched: usize,
    pub missing: usize,
}

impl MergeStats {
    fn record(&mut self, found: bool) {
        if found {
            self.matched += 1;
        } else {
            self.missing += 1;
        }
    }
}

/// One entry per endpoint-table function. The doc is looked up by
/// `"METHOD path"`, the method info by function name.
pub fn merge_by_endpoint(
    endpoints: &BTreeMap<String, Endpoint>,
    endpoint_docs: &BTreeMap<String, String>,
    infos: &BTreeMap<String, MethodInfo>,
) -> (BTreeMap<String, MethodEntry>, MergeStats) {
    let mut stats = MergeStats::default();
    let methods = endpoints
        .iter()
        .map(|(name, endpoint)| {
            let doc = endpoint_docs.get(&endpoint.key());
            stats.record(doc.is_some());
            let entry = MethodEntry::new(doc.cloned().unwrap_or_default(), infos.get(name).cloned());
            (name.clone(), entry)
        })
        .collect();
    (methods, stats)
}

/// One entry per declaration method; `doc_for` receives the method key.
pub fn merge_by_declaration<F>(
    infos: BTreeMap<String, MethodInfo>,
    doc_for: F,
) -> (BTreeMap<String, MethodEntry>, MergeStats)
where
    F: Fn(&str) -> Option<String>,
{
    let mut stats = MergeStats::default();
    let methods = infos
        .into_iter()
        .map(|(key, info)| {
            let doc = doc_for(&key);
            stats.record(doc.is_some());
            (key, MethodEntry::new(doc.unwrap_or_default(), Some(info)))
        })
        .collect();
    (methods, stats)
}

/// Scraped pages become entries without method info.
pub fn merge_pages(pages: BTreeMap<String, String>) -> BTreeMap<String, MethodEntry> {
    pages
        .into_iter()
        .map(|(name, doc)| (name, MethodEntry::new(doc, None)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn info(name: &str) -> MethodInfo {
        MethodInfo {
            class_name: "RestClient".to_string(),
            method_name: name.to_string(),
            ..MethodInfo::default()
        }
    }

    #[test]
    fn test_merge_by_endpoint() {
        let endpoints = BTreeMap::from([
            ("getTickers".to_string(), Endpoint::new("GET", "/spot/tickers")),
            ("submitOrder".to_string(), Endpoint::new("POST", "/spot/orders")),
        ]);
        let docs = BTreeMap::from([("GET /spot/tickers".to_string(), "List tickers".to_string())]);
        let infos = BTreeMap::from([("submitOrder".to_string(), info("submitOrder"))]);

        let (methods, stats) = merge_by_endpoint(&endpoints, &docs, &infos);
        assert_eq!(stats, MergeStats { matched: 1, missing: 1 });
        assert_eq!(methods["getTickers"], MethodEntry::new("List tickers", None));
        assert_eq!(methods["submitOrder"].doc, "");
        assert_eq!(methods["submitOrder"].method_info, Some(info("submitOrder")));
    }

    #[test]
    fn test_merge_by_declaration() {
        let infos = BTreeMap::from([
            ("getKline".to_string(), info("getKline")),
            ("getTickers".to_string(), info("getTickers")),
        ]);
        let (methods, stats) =
            merge_by_declaration(infos, |key| (key == "getKline").then(|| "kline doc".to_string()));

        assert_eq!(stats, MergeStats { matched: 1, missing: 1 });
        assert_eq!(methods["getKline"].doc, "kline doc");
        assert!(methods.values().all(|entry| entry.method_info.is_some()));
    }
}
