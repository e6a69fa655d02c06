//! Error types for the LIFX codec

use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level codec error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("decoding error: {0}")]
    Decoding(#[from] DecodingError),

    /// Hardware address string could not be parsed
    #[error("invalid mac address: {0}")]
    InvalidMacAddress(String),
}

/// A caller-supplied header or payload field does not fit the wire format.
///
/// Raised before any byte is written, so nothing reaches the network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    /// Integer field wider than its declared bit width
    #[error("{field} out of range: {value} (max {max})")]
    FieldOutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// Label longer than the fixed 32-byte field
    #[error("label too long: {0} bytes (max 32)")]
    LabelTooLong(usize),

    /// NUL terminates a label on the wire, so it cannot appear inside one
    #[error("label contains a NUL byte at {0}")]
    LabelContainsNul(usize),

    /// Colour temperature outside what devices accept
    #[error("kelvin out of range: {0} (expected 1500..=9000)")]
    KelvinOutOfRange(u16),

    /// Waveform cycle count must be finite and non-negative
    #[error("invalid waveform cycles: {0}")]
    InvalidCycles(f32),

    /// Header plus payload does not fit the 16-bit size field
    #[error("frame too large: {0} bytes (max 65535)")]
    FrameTooLarge(usize),
}

/// An inbound datagram is not a well-formed frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodingError {
    /// Buffer shorter than the fixed header
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    /// Size field points past the end of the buffer
    #[error("truncated frame: header declares {declared} bytes, have {have}")]
    Truncated { declared: usize, have: usize },

    /// Size field smaller than the header itself
    #[error("invalid frame size: {0}")]
    InvalidSize(u16),

    /// Known message whose payload is shorter than its layout
    #[error("{name} payload too short: need {needed} bytes, have {have}")]
    PayloadTooShort {
        name: &'static str,
        needed: usize,
        have: usize,
    },

    /// Enumerated field carries a value the protocol does not define
    #[error("invalid {field} value: {value}")]
    InvalidField { field: &'static str, value: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DecodingError::Truncated {
            declared: 52,
            have: 40,
        };
        assert_eq!(
            err.to_string(),
            "truncated frame: header declares 52 bytes, have 40"
        );

        let err: Error = EncodingError::LabelTooLong(40).into();
        assert!(err.to_string().contains("label too long"));
    }
}
