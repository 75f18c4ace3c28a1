/*!
# Core Module

Error type, source positions and file helpers shared by the extractors,
the generator and the server.
*/

pub mod errors;
pub mod fs_utils;
pub mod position;

pub use errors::{DocsError, Result};
pub use fs_utils::{decode_text, read_text_file, write_json_pretty};
pub use position::{Position, Span};
