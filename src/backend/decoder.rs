//! Frame decoder: one JSON snapshot record per line
//!
//! The wire format is UTF-8 JSON, newline-terminated, one record per line:
//!
//! ```text
//! {"registers": {"a": 1, "p": 0, "pc": 100, "s": 255, "x": 0, "y": 0},
//!  "stack": {"value": "PUSH 1"}, "instructions": {"value": "LDA #1"}}
//! ```
//!
//! Decoding is total over arbitrary input: corrupt lines come back as a
//! [`DecodeError`], never as a partial [`Frame`]. Recovery (discard and
//! bounded retry) is the acquisition loop's job, not the decoder's.

use crate::error::DecodeError;
use crate::types::Frame;

/// JSON pointers of the fields a record must carry to become a Frame
const REQUIRED_FIELDS: [&str; 8] = [
    "/registers/a",
    "/registers/p",
    "/registers/pc",
    "/registers/s",
    "/registers/x",
    "/registers/y",
    "/stack/value",
    "/instructions/value",
];

/// Decode one raw line into a [`Frame`]
///
/// Non-UTF-8 input, JSON syntax errors, and field type mismatches are
/// [`DecodeError::Malformed`]; a structurally valid record lacking a
/// required field is [`DecodeError::MissingField`].
pub fn decode(line: &[u8]) -> Result<Frame, DecodeError> {
    let text = std::str::from_utf8(line).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let record: serde_json::Value =
        serde_json::from_str(text.trim()).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    for field in REQUIRED_FIELDS {
        if record.pointer(field).is_none() {
            return Err(DecodeError::MissingField(field));
        }
    }

    serde_json::from_value(record).map_err(|e| DecodeError::Malformed(e.to_string()))
}
