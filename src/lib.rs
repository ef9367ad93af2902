//! Phrasebank Library
//!
//! Keeps a catalog of per-group, per-language voice phrases in SQLite and
//! reconciles it with the audio files sitting under the audio root. This
//! library exposes the internal modules for testing and potential reuse.

pub mod asset_scan;
pub mod browse;
pub mod catalog_store;
pub mod config;
pub mod reconciler;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use browse::CatalogBrowser;
pub use catalog_store::{CatalogStore, Language, SqliteCatalogStore};
pub use reconciler::{Reconciler, ScanStats};
