mod models;
mod schema;
mod store;
mod trait_def;

pub use models::*;
pub use schema::PHRASEBANK_VERSIONED_SCHEMAS;
pub use store::SqliteCatalogStore;
pub use trait_def::CatalogStore;
