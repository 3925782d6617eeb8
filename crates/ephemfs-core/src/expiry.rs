//! Pure expiry and visibility predicates.
//!
//! All three predicates take a single `now_ms` snapshot; callers decide the
//! clock. Bounds are inclusive on both sides: a record expires exactly at
//! `expires_at` and unlocks exactly at `unlock_at`.

use crate::meta::EphemeralMeta;
use crate::validate::timestamp_in_range;

/// True when the record is absent or its expiry time has passed.
///
/// A missing `expires_at`, or one outside `[0, now + 100 years]`, never
/// expires the record.
pub fn is_expired(meta: Option<&EphemeralMeta>, now_ms: u64) -> bool {
    let Some(meta) = meta else { return true };
    match meta.expires_at {
        Some(at) if timestamp_in_range(at, now_ms) => at <= now_ms,
        _ => false,
    }
}

/// True when the record exists and its unlock time has passed.
///
/// A missing `unlock_at`, or one outside `[0, now + 100 years]`, counts as
/// already unlocked.
pub fn is_unlocked(meta: Option<&EphemeralMeta>, now_ms: u64) -> bool {
    let Some(meta) = meta else { return false };
    match meta.unlock_at {
        Some(at) if timestamp_in_range(at, now_ms) => at <= now_ms,
        _ => true,
    }
}

/// Unlocked and not expired.
pub fn is_visible(meta: Option<&EphemeralMeta>, now_ms: u64) -> bool {
    is_unlocked(meta, now_ms) && !is_expired(meta, now_ms)
}
