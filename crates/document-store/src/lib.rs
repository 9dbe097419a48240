pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::BasketId;
pub use document::{Document, Version};
pub use error::{Result, StoreError};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use store::{DocumentStore, DocumentStoreExt, SaveOptions};
