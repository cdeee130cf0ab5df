use thiserror::Error;

#[derive(Debug, PartialEq, Error)]
pub enum HeaderError {
    #[error("Buffer too small: expected {expected} bytes, found {found} bytes")]
    BufferTooSmall { expected: usize, found: usize },

    #[error("Bad checksum")]
    BadChecksum(String),

    #[error("Unsupported {field}: {value:#x}")]
    Unsupported { field: &'static str, value: u32 },

    #[error("Length mismatch: header says {declared} bytes, buffer holds {actual} bytes")]
    LengthMismatch { declared: usize, actual: usize },
}
