//! Reversible, non-secret encoding of counters and message text.
//!
//! Values are stored as `FHE-` followed by standard base64. This only keeps
//! plain values out of casual view in the store; anyone can reverse it.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::DecodeError;

pub const OBFUSCATION_TAG: &str = "FHE-";

pub fn obfuscate_number(value: f64) -> String {
    obfuscate_text(&value.to_string())
}

/// Reverse [`obfuscate_number`]. Untagged input is parsed as a plain number
/// so that records written before obfuscation still load.
pub fn deobfuscate_number(encoded: &str) -> Result<f64, DecodeError> {
    let text = match encoded.strip_prefix(OBFUSCATION_TAG) {
        Some(body) => decode_body(body)?,
        None => encoded.to_string(),
    };
    let value = text
        .trim()
        .parse::<f64>()
        .map_err(|_| DecodeError::InvalidNumber(text.clone()))?;
    if value.is_nan() {
        return Err(DecodeError::InvalidNumber(text));
    }
    Ok(value)
}

/// Counter helper: a non-negative whole number stored obfuscated.
pub fn obfuscate_count(value: u32) -> String {
    obfuscate_number(f64::from(value))
}

pub fn deobfuscate_count(encoded: &str) -> Result<u32, DecodeError> {
    let value = deobfuscate_number(encoded)?;
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(DecodeError::InvalidNumber(value.to_string()));
    }
    Ok(value as u32)
}

pub fn obfuscate_text(plain: &str) -> String {
    format!("{OBFUSCATION_TAG}{}", STANDARD.encode(plain.as_bytes()))
}

/// Reverse [`obfuscate_text`]; untagged content is returned unchanged.
pub fn reveal_text(encoded: &str) -> Result<String, DecodeError> {
    match encoded.strip_prefix(OBFUSCATION_TAG) {
        Some(body) => decode_body(body),
        None => Ok(encoded.to_string()),
    }
}

fn decode_body(body: &str) -> Result<String, DecodeError> {
    let bytes = STANDARD
        .decode(body)
        .map_err(|err| DecodeError::Obfuscation(err.to_string()))?;
    String::from_utf8(bytes).map_err(|_| DecodeError::Utf8)
}
