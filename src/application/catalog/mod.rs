mod catalog_service;
mod errors;
mod snapshot;

pub use catalog_service::{CatalogConfig, LendingCatalog};
pub use errors::{CatalogError, ErrorKind, Result};
pub use snapshot::{CatalogSnapshot, SNAPSHOT_SCHEMA_VERSION, SnapshotRestoreError};
