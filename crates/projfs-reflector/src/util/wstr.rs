//! UTF-16 conversions at the ProjFS boundary.

use smallvec::SmallVec;
use windows::core::PCWSTR;

use crate::error::{ProviderError, Result};

/// Inline capacity covering MAX_PATH without touching the heap.
pub type WideBuf = SmallVec<[u16; 260]>;

/// Read a null-terminated engine string into a Rust String.
///
/// A null pointer yields an empty string (the engine passes null for the
/// virtualization root and for absent search expressions). Unpaired
/// surrogates are rejected rather than replaced, since the result is
/// used as a layer path.
///
/// # Arguments
/// * `s` - Wide string pointer owned by the engine
///
/// # Returns
/// UTF-8 string.
///
/// # Safety
/// `s` must be null or point to a null-terminated UTF-16 string that
/// stays valid for the duration of the call.
pub unsafe fn pcwstr_to_string(s: PCWSTR) -> Result<String> {
    if s.is_null() {
        return Ok(String::new());
    }

    let wide: &[u16] = s.as_wide();
    let mut out: String = String::with_capacity(wide.len());
    for decoded in char::decode_utf16(wide.iter().copied()) {
        match decoded {
            Ok(ch) => out.push(ch),
            Err(e) => {
                return Err(ProviderError::PathConversion(format!(
                    "unpaired surrogate 0x{:04X}",
                    e.unpaired_surrogate()
                )))
            }
        }
    }
    Ok(out)
}

/// Convert a Rust string to a null-terminated wide buffer.
///
/// # Arguments
/// * `s` - UTF-8 string
///
/// # Returns
/// Null-terminated wide string, inline for short names.
pub fn string_to_wide(s: &str) -> WideBuf {
    let mut wide: WideBuf = s.encode_utf16().collect();
    wide.push(0);
    wide
}
