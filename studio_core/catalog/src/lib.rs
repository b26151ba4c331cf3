pub mod error;
pub mod registry;
pub mod store;

pub use error::CatalogError;
pub use registry::{list, lookup, CatalogFilter, ALL_CONNECTORS, UPLOAD_KIND};
pub use store::{ClaimStatus, ConnectionEntry, ConnectionStore};
