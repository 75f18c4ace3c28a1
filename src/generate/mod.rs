/*!
# Offline Data Generation

Builds `<exchange>-offline-data.json` for one exchange at a time. The
independent inputs of an exchange (README, endpoint table, saved API
reference, declaration files, remote pages) are gathered concurrently,
declaration parsing runs on a blocking thread, and the results are merged
by the rules in [`merge`].

Failures of the README or of the endpoint table fail the exchange; a doc
source that cannot be read degrades to empty docs with an error log.
*/

pub mod merge;
pub mod pipeline;

pub use merge::{merge_by_declaration, merge_by_endpoint, merge_pages, MergeStats};
pub use pipeline::{GenerateReport, Generator};
