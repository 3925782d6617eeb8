//! Backend adapter contract consumed by the lifecycle core.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::meta::EphemeralMeta;

/// The narrow interface the core needs from a storage backend.
///
/// Implementations translate these calls into real storage operations
/// (content-addressed blobs, directory listings, deletes). The core never
/// reaches around this trait.
///
/// Contract:
/// - `save_meta` must apply [`crate::validate::validate_save`] before
///   touching storage; a rejected record is never written.
/// - `on_expire` removes every file associated with the record's identity.
///   Delete-with-verification retries against eventually-consistent storage
///   belong to the adapter; the core only requests deletion once per expired
///   record per sweep and observes the outcome.
#[async_trait]
pub trait MetaStore: Send + Sync {
    /// Enumerate candidate records. Absent entries are tolerated; the sweep
    /// skips them without counting an error.
    async fn list_metas(&self) -> Result<Vec<Option<EphemeralMeta>>, StoreError>;

    /// Persist one record.
    async fn save_meta(&self, meta: &EphemeralMeta) -> Result<(), StoreError>;

    /// Delete the files behind one expired record.
    async fn on_expire(&self, meta: &EphemeralMeta) -> Result<(), StoreError>;
}
