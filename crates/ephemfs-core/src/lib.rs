#![warn(missing_docs)]

//! EphemFS lifecycle core: records that unlock at one time and are deleted at another.
//!
//! Write path: Record → Validate (id + path components) → Backend adapter → Store
//! Read path:  Store → Decode (skip malformed) → Expiry predicates → GC sweep → Delete
//!
//! The storage backend itself lives outside this crate and is reached only
//! through the [`MetaStore`] adapter contract.

pub mod clock;
pub mod error;
pub mod expiry;
pub mod gc;
pub mod meta;
pub mod scheduler;
pub mod store;
pub mod validate;

pub use clock::{ClockConfig, MonotonicClock, SystemWallClock, WallClock};
pub use error::{GcError, StoreError, ValidateError};
pub use expiry::{is_expired, is_unlocked, is_visible};
pub use gc::{run_gc, sweep_expired, GcStats};
pub use meta::{decode_meta, encode_meta, EphemeralMeta, MetaOutcome, SkipReason, MAX_META_BYTES};
pub use scheduler::{GcScheduler, SchedulerConfig, MAX_CONSECUTIVE_FAILURES};
pub use store::MetaStore;
pub use validate::{
    meta_file_name, sanitize_path_component, timestamp_in_range, validate_id, validate_save,
    HUNDRED_YEARS_MS, MAX_COMPONENT_LEN,
};
