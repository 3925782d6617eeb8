//! Expiry-scanning garbage collection.
//!
//! One sweep enumerates the candidate set through the backend adapter,
//! judges each record against a single `now` snapshot, and requests deletion
//! of the expired ones. Deletions are strictly sequential: at most one
//! expire callback is in flight at any time within a sweep.

use tracing::{debug, warn};

use crate::clock::MonotonicClock;
use crate::error::{GcError, StoreError};
use crate::expiry::is_expired;
use crate::meta::EphemeralMeta;
use crate::store::MetaStore;

/// Counters from one GC sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Entries the backend handed to this sweep, absent slots included.
    pub scanned: usize,
    /// Records judged expired in this sweep.
    pub expired: usize,
    /// Absent entries skipped without counting as errors.
    pub skipped: usize,
}

/// Split one enumeration into expired records and counters against a single
/// `now` snapshot.
///
/// Consumes the iterator incrementally, so a lazily produced enumeration is
/// never materialized here; only the expired subset is collected.
pub fn sweep_expired<I>(records: I, now_ms: u64) -> (Vec<EphemeralMeta>, GcStats)
where
    I: IntoIterator<Item = Option<EphemeralMeta>>,
{
    let mut stats = GcStats::default();
    let mut expired = Vec::new();
    for entry in records {
        stats.scanned += 1;
        match entry {
            None => stats.skipped += 1,
            Some(meta) => {
                if is_expired(Some(&meta), now_ms) {
                    stats.expired += 1;
                    expired.push(meta);
                }
            }
        }
    }
    (expired, stats)
}

/// One full GC sweep over the adapter's candidate set.
///
/// `now` is snapshotted once at the start; every expiry decision in the run
/// uses that single value, so a sweep can never be split by a mid-run clock
/// advance. A failing expire callback does not abort the remainder of the
/// sweep: every expired record is attempted, and the first failure is
/// surfaced afterwards as [`GcError::Expire`] with the expired count intact.
pub async fn run_gc(store: &dyn MetaStore, clock: &MonotonicClock) -> Result<GcStats, GcError> {
    let now_ms = clock.now_ms();
    let records = store.list_metas().await.map_err(GcError::List)?;
    let (expired, stats) = sweep_expired(records, now_ms);

    let mut failed = 0usize;
    let mut first_error: Option<StoreError> = None;

    for meta in &expired {
        if let Err(err) = store.on_expire(meta).await {
            warn!(id = %meta.id, error = %err, "expire callback failed");
            failed += 1;
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
    }

    debug!(
        scanned = stats.scanned,
        expired = stats.expired,
        skipped = stats.skipped,
        "GC sweep complete"
    );

    match first_error {
        Some(source) => Err(GcError::Expire {
            expired: stats.expired,
            failed,
            source,
        }),
        None => Ok(stats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ClockConfig, WallClock};
    use crate::error::StoreError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const T: u64 = 1_000_000;

    struct FixedWallClock(u64);

    impl WallClock for FixedWallClock {
        fn wall_ms(&self) -> u64 {
            self.0
        }
    }

    fn clock_at(now: u64) -> MonotonicClock {
        MonotonicClock::with_source(ClockConfig::default(), Box::new(FixedWallClock(now)))
    }

    #[derive(Default)]
    struct RecordingStore {
        records: Vec<Option<EphemeralMeta>>,
        expired_ids: Mutex<Vec<String>>,
        fail_expire_for: Option<String>,
        fail_list: bool,
    }

    #[async_trait]
    impl MetaStore for RecordingStore {
        async fn list_metas(&self) -> Result<Vec<Option<EphemeralMeta>>, StoreError> {
            if self.fail_list {
                return Err(StoreError::Backend("listing unavailable".to_string()));
            }
            Ok(self.records.clone())
        }

        async fn save_meta(&self, _meta: &EphemeralMeta) -> Result<(), StoreError> {
            Ok(())
        }

        async fn on_expire(&self, meta: &EphemeralMeta) -> Result<(), StoreError> {
            self.expired_ids.lock().unwrap().push(meta.id.clone());
            if self.fail_expire_for.as_deref() == Some(meta.id.as_str()) {
                return Err(StoreError::Backend("delete refused".to_string()));
            }
            Ok(())
        }
    }

    fn rec(id: &str, expires_at: Option<u64>) -> EphemeralMeta {
        let mut meta = EphemeralMeta::new(id, T - 50_000, T - 50_000);
        meta.expires_at = expires_at;
        meta
    }

    #[tokio::test]
    async fn test_empty_set_expires_nothing() {
        let store = RecordingStore::default();
        let stats = run_gc(&store, &clock_at(T)).await.unwrap();
        assert_eq!(stats.expired, 0);
        assert!(store.expired_ids.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counts_expired_and_live() {
        let store = RecordingStore {
            records: vec![
                Some(rec("old1", Some(T - 1))),
                Some(rec("old2", Some(T))),
                Some(rec("live1", Some(T + 1))),
                Some(rec("forever", None)),
            ],
            ..Default::default()
        };
        let stats = run_gc(&store, &clock_at(T)).await.unwrap();
        assert_eq!(stats.scanned, 4);
        assert_eq!(stats.expired, 2);
        assert_eq!(*store.expired_ids.lock().unwrap(), vec!["old1", "old2"]);
    }

    #[tokio::test]
    async fn test_absent_entries_skipped() {
        let store = RecordingStore {
            records: vec![None, Some(rec("old", Some(T - 1))), None],
            ..Default::default()
        };
        let stats = run_gc(&store, &clock_at(T)).await.unwrap();
        assert_eq!(stats.scanned, 3);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.expired, 1);
    }

    #[tokio::test]
    async fn test_list_failure_surfaces() {
        let store = RecordingStore {
            fail_list: true,
            ..Default::default()
        };
        let err = run_gc(&store, &clock_at(T)).await.unwrap_err();
        assert!(matches!(err, GcError::List(_)));
    }

    #[tokio::test]
    async fn test_callback_failure_does_not_abort_sweep() {
        let store = RecordingStore {
            records: vec![
                Some(rec("a", Some(T - 3))),
                Some(rec("b", Some(T - 2))),
                Some(rec("c", Some(T - 1))),
            ],
            fail_expire_for: Some("a".to_string()),
            ..Default::default()
        };
        let err = run_gc(&store, &clock_at(T)).await.unwrap_err();
        // All three were attempted and the count survives in the error.
        assert_eq!(*store.expired_ids.lock().unwrap(), vec!["a", "b", "c"]);
        match err {
            GcError::Expire {
                expired, failed, ..
            } => {
                assert_eq!(expired, 3);
                assert_eq!(failed, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_run_gc_follows_sweep_classification() {
        let records = vec![
            None,
            Some(rec("gone", Some(T - 100))),
            Some(rec("live", Some(T + 100))),
            Some(rec("keeper", None)),
        ];
        let (expired, sweep_stats) = sweep_expired(records.clone(), T);

        let store = RecordingStore {
            records,
            ..Default::default()
        };
        let stats = run_gc(&store, &clock_at(T)).await.unwrap();

        // One classifier: the run's counters and callback order are exactly
        // what the sweep core decides.
        assert_eq!(stats, sweep_stats);
        let ids: Vec<String> = expired.iter().map(|m| m.id.clone()).collect();
        assert_eq!(*store.expired_ids.lock().unwrap(), ids);
    }

    #[test]
    fn test_sweep_expired_lazy_iterator() {
        let records = (0..100u64).map(|i| {
            if i % 10 == 0 {
                None
            } else {
                Some(rec(&format!("r{i}"), Some(if i < 50 { T - 1 } else { T + 1 })))
            }
        });
        let (expired, stats) = sweep_expired(records, T);
        assert_eq!(stats.scanned, 100);
        assert_eq!(stats.skipped, 10);
        assert_eq!(stats.expired, expired.len());
        assert_eq!(stats.expired, 45);
    }
}
