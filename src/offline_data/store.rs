//! Reading and writing offline data files in a data directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::model::OfflineData;
use crate::core::{read_text_file, write_json_pretty, Result};

/// `<data_dir>/<exchange id>-offline-data.json`
pub fn data_file_path(data_dir: &Path, exchange_id: &str) -> PathBuf {
    data_dir.join(format!("{}-offline-data.json", exchange_id))
}

pub fn load_offline_data(path: &Path) -> Result<OfflineData> {
    let content = read_text_file(path)?;
    let data: OfflineData = serde_json::from_str(&content)?;
    debug!(
        "Loaded {} methods from {}",
        data.method_count(),
        path.display()
    );
    Ok(data)
}

/// Writes pretty JSON and returns the size in bytes.
pub fn save_offline_data(path: &Path, data: &OfflineData) -> Result<usize> {
    let size = write_json_pretty(path, data)?;
    info!(
        "Offline data saved to {} ({:.2} KB)",
        path.display(),
        size as f64 / 1024.0
    );
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline_data::model::MethodEntry;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = data_file_path(dir.path(), "gate");
        assert!(path.ends_with("gate-offline-data.json"));

        let mut data = OfflineData {
            readme: "# gateio-api".to_string(),
            ..Default::default()
        };
        data.methods
            .insert("getSpotTicker".to_string(), MethodEntry::new("GET /spot/tickers", None));

        let size = save_offline_data(&path, &data).unwrap();
        assert!(size > 0);
        assert_eq!(load_offline_data(&path).unwrap(), data);
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = data_file_path(dir.path(), "okx");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_offline_data(&path).is_err());
    }
}
