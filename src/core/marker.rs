//! Inline encrypted-value markers.
//!
//! A marker wraps one provider ciphertext as `ENC[v1:<base64>]` so it can sit
//! in place of a scalar inside a structured document. Whitespace inside the
//! base64 payload is tolerated and stripped on decode.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::core::constants::{MARKER_PREFIX, MARKER_SUFFIX};
use crate::error::{FormatError, Result};

/// Wrap a ciphertext in a marker.
pub fn encode(ciphertext: &[u8]) -> String {
    format!("{}{}{}", MARKER_PREFIX, STANDARD.encode(ciphertext), MARKER_SUFFIX)
}

/// Unwrap a marker into the ciphertext it carries.
///
/// # Errors
///
/// Returns `FormatError::InvalidMarker` if the value is not a marker or the
/// payload is not valid base64.
pub fn decode(value: &str) -> Result<Vec<u8>> {
    let payload = payload(value)
        .ok_or_else(|| FormatError::InvalidMarker("not an ENC[v1:...] value".to_string()))?;

    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| FormatError::InvalidMarker(format!("bad base64 payload: {}", e)).into())
}

/// Whether a scalar is an encrypted marker.
pub fn is_marker(value: &str) -> bool {
    payload(value).is_some()
}

/// The raw payload between prefix and suffix, if `value` is shaped like a
/// marker.
fn payload(value: &str) -> Option<&str> {
    let inner = value
        .strip_prefix(MARKER_PREFIX)?
        .strip_suffix(MARKER_SUFFIX)?;

    let well_formed = !inner.is_empty()
        && inner.chars().all(|c| {
            c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=' || c.is_whitespace()
        });

    well_formed.then_some(inner)
}
