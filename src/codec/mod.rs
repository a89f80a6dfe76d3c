pub mod obfuscate;
pub mod record;

pub use obfuscate::{
    OBFUSCATION_TAG, deobfuscate_count, deobfuscate_number, obfuscate_count, obfuscate_number,
    obfuscate_text, reveal_text,
};
pub use record::{
    DEFAULT_MAX_PARTICIPANTS, decode_event, decode_keys, decode_message, encode_event, encode_keys,
    encode_message,
};

use thiserror::Error;

/// Failure to turn a stored blob back into a record.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("blob is not valid UTF-8")]
    Utf8,

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("bad obfuscated value: {0}")]
    Obfuscation(String),

    #[error("not a valid number: {0}")]
    InvalidNumber(String),
}
