//! Card catalogue: entities, source decoding, and the storage contract.

pub mod mapper;
pub mod memory;
pub mod model;
pub mod payload;
pub mod postgres;
pub mod source;
pub mod store;

pub use memory::MemoryCatalog;
pub use model::CardConflictPolicy;
pub use postgres::PgCatalog;
pub use store::CatalogStore;
