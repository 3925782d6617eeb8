//! Identifier and path-component validation at the storage trust boundary.
//!
//! Everything that becomes part of a backend path must pass through here
//! before it is persisted or acted upon. Rejection is always explicit; input
//! is never silently truncated or rewritten.

use crate::error::ValidateError;
use crate::meta::EphemeralMeta;

/// Maximum length for record ids and path components.
pub const MAX_COMPONENT_LEN: usize = 255;

/// Upper slack on unlock/expiry timestamps relative to the current time.
pub const HUNDRED_YEARS_MS: u64 = 100 * 365 * 24 * 60 * 60 * 1000;

/// True iff `id` is 1–255 characters drawn from `[A-Za-z0-9_-]`.
///
/// The character class admits no path separators and no `..`, so a valid id
/// can never traverse out of its directory in the backing store.
pub fn validate_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_COMPONENT_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Validate a single path component before it reaches the backing store.
///
/// Rejects empty or over-length input and anything containing `..`, `/`, or
/// `\`. Valid input is returned unchanged.
pub fn sanitize_path_component(component: &str) -> Result<&str, ValidateError> {
    if component.is_empty() || component.chars().count() > MAX_COMPONENT_LEN {
        return Err(ValidateError::InvalidComponent(component.to_string()));
    }
    if component.contains("..") || component.contains('/') || component.contains('\\') {
        return Err(ValidateError::InvalidComponent(component.to_string()));
    }
    Ok(component)
}

/// Write-path gate: the record id and the target meta file name must
/// independently pass sanitization.
///
/// Backend adapters call this from `save_meta` before touching storage; on
/// rejection nothing may be written.
pub fn validate_save(meta: &EphemeralMeta, meta_file: &str) -> Result<(), ValidateError> {
    if !validate_id(&meta.id) {
        return Err(ValidateError::InvalidId(meta.id.clone()));
    }
    sanitize_path_component(meta_file)
        .map_err(|_| ValidateError::InvalidMetaFile(meta_file.to_string()))?;
    Ok(())
}

/// Canonical meta file name for a record id.
pub fn meta_file_name(id: &str) -> String {
    format!("{id}.meta.json")
}

/// True iff `ts` lies within `[0, now + 100 years]`.
pub fn timestamp_in_range(ts: u64, now_ms: u64) -> bool {
    ts <= now_ms.saturating_add(HUNDRED_YEARS_MS)
}
