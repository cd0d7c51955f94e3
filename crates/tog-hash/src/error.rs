/// Errors produced while constructing or decoding object identifiers.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid object id length: expected 20 bytes, got {actual}")]
    InvalidLength { actual: usize },

    #[error("invalid hex object id length: expected 40 hex chars, got {actual}")]
    InvalidHexLength { actual: usize },

    #[error("invalid hex digit in object id: {0:?}")]
    InvalidHex(char),
}
