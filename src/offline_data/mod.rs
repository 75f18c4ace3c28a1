/*!
# Offline Data

JSON produced once by the `generate` pipeline and consumed read-only by the
adapters. Methods are stored as an object keyed by method name; the reader
also accepts the older array form.
*/

pub mod model;
pub mod store;

pub use model::{MethodEntry, MethodInfo, OfflineData, ParamInfo, PropertyShape, TypeShape};
pub use store::{data_file_path, load_offline_data, save_offline_data};
