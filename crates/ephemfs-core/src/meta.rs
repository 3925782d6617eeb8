//! Ephemeral record metadata and its JSON codec.
//!
//! Decoding a stored record never throws: every record comes back as an
//! explicit [`MetaOutcome`], and malformed ones are dropped from the
//! candidate set with a diagnostic rather than aborting the listing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::validate::{timestamp_in_range, validate_id};

/// Largest serialized record accepted for decoding (5 MiB).
pub const MAX_META_BYTES: usize = 5 * 1024 * 1024;

/// Metadata governing visibility and expiry of one ephemeral record.
///
/// Timestamps are integer milliseconds since the Unix epoch. `created_at`
/// and `updated_at` are owned by the record's writer; the core does not
/// enforce any ordering between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EphemeralMeta {
    /// Record identifier, `[A-Za-z0-9_-]{1,255}`.
    pub id: String,
    /// Creation time set by the record's owner.
    #[serde(default)]
    pub created_at: u64,
    /// Last-update time set by the record's owner.
    #[serde(default)]
    pub updated_at: u64,
    /// Time before which the record is not visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_at: Option<u64>,
    /// Time at or after which the record is expired and must be deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// Extra keys tolerated and carried through unexamined.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EphemeralMeta {
    /// Create a record with no unlock or expiry time.
    pub fn new(id: impl Into<String>, created_at: u64, updated_at: u64) -> Self {
        Self {
            id: id.into(),
            created_at,
            updated_at,
            unlock_at: None,
            expires_at: None,
            extra: Map::new(),
        }
    }

    /// Set the unlock time.
    pub fn with_unlock_at(mut self, unlock_at: u64) -> Self {
        self.unlock_at = Some(unlock_at);
        self
    }

    /// Set the expiry time.
    pub fn with_expires_at(mut self, expires_at: u64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Result of decoding one stored record.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaOutcome {
    /// Record passed every structural and range check.
    Valid(EphemeralMeta),
    /// Record dropped from the candidate set; the listing continues.
    Skipped(SkipReason),
}

impl MetaOutcome {
    /// Unwrap the valid record, if any.
    pub fn into_valid(self) -> Option<EphemeralMeta> {
        match self {
            MetaOutcome::Valid(meta) => Some(meta),
            MetaOutcome::Skipped(_) => None,
        }
    }
}

/// Why a stored record was dropped during listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Serialized size exceeds [`MAX_META_BYTES`].
    Oversize {
        /// Serialized length in bytes.
        len: usize,
    },
    /// Payload is not valid JSON.
    Unparseable,
    /// Top-level value is not an object.
    NotAnObject,
    /// `id` is missing or not a string.
    MissingId,
    /// `id` fails the character-class or length check.
    BadId,
    /// Named timestamp field is non-numeric, negative, or out of range.
    BadTimestamp {
        /// JSON key of the offending field.
        field: &'static str,
    },
}

impl SkipReason {
    /// One-line description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            SkipReason::Oversize { len } => format!("oversize meta: {len} bytes"),
            SkipReason::Unparseable => "unparseable meta".to_string(),
            SkipReason::NotAnObject => "meta is not an object".to_string(),
            SkipReason::MissingId => "meta has no string id".to_string(),
            SkipReason::BadId => "meta id fails validation".to_string(),
            SkipReason::BadTimestamp { field } => format!("bad timestamp field {field}"),
        }
    }
}

/// Decode one stored record, applying the read-path checks in order:
/// size ceiling, JSON parse, structural shape, id presence and format, then
/// per-field timestamp validation.
///
/// `now_ms` anchors the 100-year upper bound on unlock/expiry times. The
/// size ceiling is checked on the raw byte length before any parsing.
pub fn decode_meta(bytes: &[u8], now_ms: u64) -> MetaOutcome {
    if bytes.len() > MAX_META_BYTES {
        return MetaOutcome::Skipped(SkipReason::Oversize { len: bytes.len() });
    }
    let value: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(_) => return MetaOutcome::Skipped(SkipReason::Unparseable),
    };
    validate_decoded(value, now_ms)
}

/// Apply the read-path checks to an already-parsed JSON value.
pub fn validate_decoded(value: Value, now_ms: u64) -> MetaOutcome {
    let mut obj = match value {
        Value::Object(map) => map,
        _ => return MetaOutcome::Skipped(SkipReason::NotAnObject),
    };

    let id = match obj.get("id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => return MetaOutcome::Skipped(SkipReason::MissingId),
    };
    if !validate_id(&id) {
        return MetaOutcome::Skipped(SkipReason::BadId);
    }

    let created_at = match take_timestamp(&mut obj, "createdAt", None) {
        Ok(ts) => ts.unwrap_or(0),
        Err(reason) => return MetaOutcome::Skipped(reason),
    };
    let updated_at = match take_timestamp(&mut obj, "updatedAt", None) {
        Ok(ts) => ts.unwrap_or(0),
        Err(reason) => return MetaOutcome::Skipped(reason),
    };
    let unlock_at = match take_timestamp(&mut obj, "unlockAt", Some(now_ms)) {
        Ok(ts) => ts,
        Err(reason) => return MetaOutcome::Skipped(reason),
    };
    let expires_at = match take_timestamp(&mut obj, "expiresAt", Some(now_ms)) {
        Ok(ts) => ts,
        Err(reason) => return MetaOutcome::Skipped(reason),
    };
    obj.remove("id");

    MetaOutcome::Valid(EphemeralMeta {
        id,
        created_at,
        updated_at,
        unlock_at,
        expires_at,
        extra: obj,
    })
}

/// Decode a batch of stored records, keeping the valid ones and logging the
/// skipped ones. One bad record never poisons the rest of the listing.
pub fn filter_decoded<I>(entries: I, now_ms: u64) -> Vec<EphemeralMeta>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let mut valid = Vec::new();
    for bytes in entries {
        match decode_meta(&bytes, now_ms) {
            MetaOutcome::Valid(meta) => valid.push(meta),
            MetaOutcome::Skipped(reason) => {
                warn!(reason = %reason.describe(), "skipping malformed stored record");
            }
        }
    }
    valid
}

/// Serialize a record for storage.
pub fn encode_meta(meta: &EphemeralMeta) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(meta)
}

// A present timestamp must be a non-negative finite number; `bound_from`
// additionally caps it at `bound_from + 100 years`. Absent and null both
// count as absent. Removes the field from `obj` so leftovers are pure extras.
fn take_timestamp(
    obj: &mut Map<String, Value>,
    field: &'static str,
    bound_from: Option<u64>,
) -> Result<Option<u64>, SkipReason> {
    let value = match obj.remove(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };
    let number = match value.as_f64() {
        Some(n) if n.is_finite() && n >= 0.0 => n as u64,
        _ => return Err(SkipReason::BadTimestamp { field }),
    };
    if let Some(now_ms) = bound_from {
        if !timestamp_in_range(number, now_ms) {
            return Err(SkipReason::BadTimestamp { field });
        }
    }
    Ok(Some(number))
}
