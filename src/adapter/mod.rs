/*!
# Exchange Adapters

Read-only lookup over the offline data of each exchange. Every adapter
lists its methods, returns the stored entry of one method and provides the
SDK README shown next to the method list.
*/

pub mod offline;
pub mod registry;

pub use offline::{doc_title, DescriptionSource, ExchangeProfile, MethodSummary, OfflineAdapter, ReadmeSource};
pub use registry::AdapterRegistry;

use crate::core::Result;
use crate::exchange::ExchangeId;
use crate::offline_data::MethodEntry;

pub trait ExchangeAdapter: Send + Sync {
    fn id(&self) -> ExchangeId;

    /// Methods in key order
    fn list_methods(&self) -> Vec<MethodSummary>;

    /// Stored entry of `method`; unknown names are `DocsError::MethodNotFound`
    fn get_doc(&self, method: &str) -> Result<&MethodEntry>;

    fn get_readme(&self) -> String;

    fn display_name(&self) -> String {
        self.id().display_name()
    }
}
