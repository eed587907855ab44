/// Storage primitives
///
/// - `flat_file`: line-level operations on one delimited text file
/// - `document`: in-process JSON document collections for the alternate backend

pub mod document;
pub mod flat_file;

pub use document::DocumentStore;
pub use flat_file::{FlatFile, StoreError, StoreResult};
