use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::ExchangeAdapter;
use crate::core::{DocsError, Result};
use crate::exchange::ExchangeId;
use crate::offline_data::{MethodEntry, OfflineData};

static FRONT_MATTER_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"---[\s\S]*?\ntitle:\s*([^\n]+)\n").expect("Invalid front matter regex"));

const MAX_SUGGESTIONS: usize = 5;
const MIN_SHARED_PREFIX: usize = 3;

/// One row of a method listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSummary {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Where a listed method's description comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionSource {
    /// JSDoc description of the reflected method
    MethodComment,
    /// Front-matter `title:` of the doc, else the method comment
    DocTitleThenComment,
    /// `"<display name> method: <name>"`
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadmeSource {
    Stored,
    /// Generated from the method count
    Synthesized,
}

/// Per-exchange presentation rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeProfile {
    pub id: ExchangeId,
    pub description: DescriptionSource,
    pub readme: ReadmeSource,
}

impl ExchangeProfile {
    pub fn for_exchange(id: ExchangeId) -> Self {
        let description = match id {
            ExchangeId::Gate | ExchangeId::Okx | ExchangeId::Bitget => DescriptionSource::MethodComment,
            ExchangeId::Bybit | ExchangeId::Binance => DescriptionSource::DocTitleThenComment,
            ExchangeId::OkxDex => DescriptionSource::Fixed,
        };
        let readme = match id {
            ExchangeId::OkxDex => ReadmeSource::Synthesized,
            _ => ReadmeSource::Stored,
        };
        Self {
            id,
            description,
            readme,
        }
    }

    pub fn display_name(&self) -> String {
        self.id.display_name()
    }
}

/// Adapter over one exchange's offline data
#[derive(Debug, Clone)]
pub struct OfflineAdapter {
    profile: ExchangeProfile,
    data: OfflineData,
}

impl OfflineAdapter {
    pub fn new(profile: ExchangeProfile, data: OfflineData) -> Self {
        Self { profile, data }
    }

    /// Adapter with no methods, used when the data file is missing
    pub fn empty(id: ExchangeId) -> Self {
        Self::new(ExchangeProfile::for_exchange(id), OfflineData::default())
    }

    pub fn profile(&self) -> &ExchangeProfile {
        &self.profile
    }

    pub fn data(&self) -> &OfflineData {
        &self.data
    }

    fn describe(&self, name: &str, entry: &MethodEntry) -> Option<String> {
        let comment = || {
            entry
                .method_info
                .as_ref()
                .map(|info| info.method_comment.trim())
                .filter(|comment| !comment.is_empty())
                .map(str::to_string)
        };

        match self.profile.description {
            DescriptionSource::MethodComment => comment(),
            DescriptionSource::DocTitleThenComment => doc_title(&entry.doc).or_else(comment),
            DescriptionSource::Fixed => Some(format!("{} method: {}", self.profile.display_name(), name)),
        }
    }

    /// Up to five close method names: substring matches first, then names
    /// sharing a prefix, both case-insensitive.
    pub fn suggestions(&self, method: &str) -> Vec<String> {
        let query = method.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let mut found: Vec<String> = self
            .data
            .methods
            .keys()
            .filter(|key| {
                let key = key.to_lowercase();
                key.contains(&query) || query.contains(&key)
            })
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect();

        if found.len() < MAX_SUGGESTIONS {
            let mut by_prefix: Vec<(usize, &String)> = self
                .data
                .methods
                .keys()
                .filter(|key| !found.contains(*key))
                .map(|key| (shared_prefix_len(&key.to_lowercase(), &query), key))
                .filter(|(shared, _)| *shared >= MIN_SHARED_PREFIX)
                .collect();
            by_prefix.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

            let room = MAX_SUGGESTIONS - found.len();
            found.extend(by_prefix.into_iter().take(room).map(|(_, key)| key.clone()));
        }

        found
    }
}

impl ExchangeAdapter for OfflineAdapter {
    fn id(&self) -> ExchangeId {
        self.profile.id
    }

    fn list_methods(&self) -> Vec<MethodSummary> {
        self.data
            .methods
            .iter()
            .map(|(name, entry)| MethodSummary {
                method: name.clone(),
                description: self.describe(name, entry),
            })
            .collect()
    }

    fn get_doc(&self, method: &str) -> Result<&MethodEntry> {
        self.data
            .methods
            .get(method)
            .ok_or_else(|| DocsError::MethodNotFound {
                exchange: self.profile.display_name(),
                method: method.to_string(),
                suggestions: self.suggestions(method),
            })
    }

    fn get_readme(&self) -> String {
        match self.profile.readme {
            ReadmeSource::Stored => self.data.readme.clone(),
            ReadmeSource::Synthesized => format!(
                "# {name} Documentation\n\nThis adapter provides access to {name} methods and documentation.\n\nAvailable methods: {count}",
                name = self.profile.display_name(),
                count = self.data.method_count()
            ),
        }
    }
}

/// First front-matter `title:` of a doc page
pub fn doc_title(doc: &str) -> Option<String> {
    FRONT_MATTER_TITLE
        .captures(doc)
        .map(|caps| caps[1].trim().to_string())
        .filter(|title| !title.is_empty())
}

fn shared_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}
