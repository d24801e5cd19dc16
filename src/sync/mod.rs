//! Form collection schema synchronization

pub mod diff;
pub mod synchronizer;

pub use diff::{SchemaDiff, normalize_fields};
pub use synchronizer::{SchemaSynchronizer, SyncReport};
