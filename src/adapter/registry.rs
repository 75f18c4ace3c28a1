use std::path::Path;
use tracing::{info, warn};

use super::{ExchangeAdapter, ExchangeProfile, OfflineAdapter};
use crate::config::ServiceConfig;
use crate::core::Result;
use crate::exchange::ExchangeId;
use crate::offline_data::{data_file_path, load_offline_data};

/// Adapters in tool registration order
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn ExchangeAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the data files of the enabled exchanges from `data_dir`.
    ///
    /// A missing file registers an empty adapter so the tool table stays the
    /// same; a file that cannot be parsed is an error.
    pub fn load(data_dir: &Path, enabled: &[ExchangeId]) -> Result<Self> {
        let mut registry = Self::new();

        for id in ExchangeId::ALL.into_iter().filter(|id| enabled.contains(id)) {
            let path = data_file_path(data_dir, id.as_str());
            let adapter = if path.is_file() {
                let data = load_offline_data(&path)?;
                info!("{}: {} methods loaded", id.display_name(), data.method_count());
                OfflineAdapter::new(ExchangeProfile::for_exchange(id), data)
            } else {
                warn!(
                    "{}: data file {} not found, registering without methods",
                    id.display_name(),
                    path.display()
                );
                OfflineAdapter::empty(id)
            };
            registry.register(Box::new(adapter));
        }

        Ok(registry)
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        Self::load(&config.server.data_dir, &config.server.enabled)
    }

    /// Adds an adapter, replacing one registered for the same exchange
    pub fn register(&mut self, adapter: Box<dyn ExchangeAdapter>) {
        match self.adapters.iter().position(|a| a.id() == adapter.id()) {
            Some(index) => self.adapters[index] = adapter,
            None => self.adapters.push(adapter),
        }
    }

    pub fn get(&self, id: ExchangeId) -> Option<&dyn ExchangeAdapter> {
        self.adapters.iter().find(|a| a.id() == id).map(|a| a.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ExchangeAdapter> {
        self.adapters.iter().map(|a| a.as_ref())
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DocsError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_and_present() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("okx-offline-data.json"),
            r##"{"methods": [{"name": "getTickers", "doc": "GET /api/v5/market/tickers", "methodInfo": {}}], "readme": "# okx-api"}"##,
        )
        .unwrap();

        let registry = AdapterRegistry::load(dir.path(), &[ExchangeId::Okx, ExchangeId::Gate]).unwrap();
        let ids: Vec<_> = registry.iter().map(|a| a.id()).collect();
        assert_eq!(ids, vec![ExchangeId::Gate, ExchangeId::Okx]);

        let okx = registry.get(ExchangeId::Okx).unwrap();
        assert_eq!(okx.get_readme(), "# okx-api");
        assert!(okx.get_doc("getTickers").unwrap().method_info.is_none());

        assert!(registry.get(ExchangeId::Gate).unwrap().list_methods().is_empty());
        assert!(registry.get(ExchangeId::Bybit).is_none());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("gate-offline-data.json"), "{ not json").unwrap();

        let result = AdapterRegistry::load(dir.path(), &[ExchangeId::Gate]);
        assert!(matches!(result, Err(DocsError::Json(_))));
    }
}
