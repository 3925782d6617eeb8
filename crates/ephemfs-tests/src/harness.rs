//! In-memory backend adapter for lifecycle tests.
//!
//! Behaves like a tiny content-addressed backend: records live under their
//! canonical meta file name, saves pass through the core's validation gate,
//! and expiry removes the record. Failure injection knobs cover the two
//! paths the core reacts to: enumeration failures (scheduler circuit
//! breaker) and expire-callback failures (sweep error surfacing).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use ephemfs_core::{
    meta_file_name, validate_save, EphemeralMeta, MetaStore, StoreError,
};

#[derive(Default)]
struct Inner {
    metas: HashMap<String, EphemeralMeta>,
    expired_ids: Vec<String>,
    list_calls: u64,
    fail_next_lists: u32,
    fail_expire_ids: HashSet<String>,
}

/// In-memory [`MetaStore`] with scriptable failures.
#[derive(Default)]
pub struct MemoryMetaStore {
    inner: Mutex<Inner>,
}

impl MemoryMetaStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` `list_metas` calls fail.
    pub fn fail_next_lists(&self, n: u32) {
        self.lock().fail_next_lists = n;
    }

    /// Make `on_expire` fail for the given record id.
    pub fn fail_expire_for(&self, id: &str) {
        self.lock().fail_expire_ids.insert(id.to_string());
    }

    /// Ids passed to `on_expire` so far, in call order.
    pub fn expired_ids(&self) -> Vec<String> {
        self.lock().expired_ids.clone()
    }

    /// Number of `list_metas` calls so far.
    pub fn list_calls(&self) -> u64 {
        self.lock().list_calls
    }

    /// Whether a record is still present.
    pub fn contains(&self, id: &str) -> bool {
        self.lock().metas.contains_key(&meta_file_name(id))
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().metas.len()
    }

    /// True when no records are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().metas.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MetaStore for MemoryMetaStore {
    async fn list_metas(&self) -> Result<Vec<Option<EphemeralMeta>>, StoreError> {
        let mut inner = self.lock();
        inner.list_calls += 1;
        if inner.fail_next_lists > 0 {
            inner.fail_next_lists -= 1;
            return Err(StoreError::Backend("injected list failure".to_string()));
        }
        Ok(inner.metas.values().cloned().map(Some).collect())
    }

    async fn save_meta(&self, meta: &EphemeralMeta) -> Result<(), StoreError> {
        let file = meta_file_name(&meta.id);
        validate_save(meta, &file)?;
        self.lock().metas.insert(file, meta.clone());
        Ok(())
    }

    async fn on_expire(&self, meta: &EphemeralMeta) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.expired_ids.push(meta.id.clone());
        if inner.fail_expire_ids.contains(&meta.id) {
            return Err(StoreError::Backend(format!(
                "injected expire failure for {}",
                meta.id
            )));
        }
        inner.metas.remove(&meta_file_name(&meta.id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ephemfs_core::ValidateError;

    #[tokio::test]
    async fn test_save_and_list() {
        let store = MemoryMetaStore::new();
        let meta = EphemeralMeta::new("s1", 100, 100);
        store.save_meta(&meta).await.unwrap();

        let listed = store.list_metas().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].as_ref().unwrap().id, "s1");
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_id() {
        let store = MemoryMetaStore::new();
        let meta = EphemeralMeta::new("../escape", 100, 100);
        let err = store.save_meta(&meta).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validate(ValidateError::InvalidId(_))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_injected_list_failures_are_consumed() {
        let store = MemoryMetaStore::new();
        store.fail_next_lists(2);
        assert!(store.list_metas().await.is_err());
        assert!(store.list_metas().await.is_err());
        assert!(store.list_metas().await.is_ok());
        assert_eq!(store.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_expire_removes_record() {
        let store = MemoryMetaStore::new();
        let meta = EphemeralMeta::new("s1", 100, 100);
        store.save_meta(&meta).await.unwrap();
        store.on_expire(&meta).await.unwrap();
        assert!(!store.contains("s1"));
        assert_eq!(store.expired_ids(), vec!["s1"]);
    }

    #[tokio::test]
    async fn test_injected_expire_failure_keeps_record() {
        let store = MemoryMetaStore::new();
        let meta = EphemeralMeta::new("s1", 100, 100);
        store.save_meta(&meta).await.unwrap();
        store.fail_expire_for("s1");
        assert!(store.on_expire(&meta).await.is_err());
        assert!(store.contains("s1"));
    }
}
