//! Error types for the binary codec
//!
//! Every variant is deterministic given its inputs: the same bytes and the
//! same type descriptor always fail the same way, so none of them are
//! retryable.

use thiserror::Error;

/// Errors raised while encoding or decoding schema-described values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Decoding needed more bytes than the input holds
    #[error("Buffer underflow: needed {needed} bytes at offset {offset}, {available} available")]
    BufferUnderflow {
        /// Offset of the read that failed
        offset: usize,
        /// Bytes the read required
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },

    /// A string payload is not valid UTF-8
    #[error("Invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 {
        /// Offset of the string payload (after the length prefix)
        offset: usize,
    },

    /// The type descriptor has no encoder
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Integer does not fit the declared width
    #[error("Value {value} out of range for {ty}")]
    ValueOutOfRange {
        /// Declared type, e.g. `u8`
        ty: &'static str,
        /// Rendered offending value
        value: String,
    },

    /// The value's shape does not match the type descriptor
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Type the descriptor asked for
        expected: String,
        /// Kind of value supplied
        actual: &'static str,
    },

    /// Enum variant name or index is not declared
    #[error("Unknown enum variant {variant}")]
    UnknownVariant {
        /// Variant name (encode) or index (decode)
        variant: String,
    },

    /// Boolean byte other than 0 or 1
    #[error("Invalid bool byte 0x{byte:02X} at offset {offset}")]
    InvalidBool { offset: usize, byte: u8 },

    /// Option tag other than 0 or 1
    #[error("Invalid option tag 0x{tag:02X} at offset {offset}")]
    InvalidOptionTag { offset: usize, tag: u8 },

    /// Fixed-size array supplied with the wrong number of elements
    #[error("Length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Length prefix does not fit its encoding
    #[error("Length {len} exceeds the maximum of {max}")]
    LengthOverflow { len: usize, max: usize },

    /// `Defined` type not present in the registry
    #[error("Undefined type: {0}")]
    UndefinedType(String),

    /// `decode_exact` found bytes after the value
    #[error("Trailing bytes: {remaining} unread after decoding")]
    TrailingBytes { remaining: usize },

    /// Nested `Defined` references went deeper than the codec allows
    #[error("Type nesting exceeds depth limit of {limit}")]
    DepthExceeded { limit: usize },

    /// Compact-length continued past its third byte
    #[error("Compact length overflow at offset {offset}")]
    ShortVecOverflow { offset: usize },

    /// Compact-length encoded with redundant trailing zero groups
    #[error("Non-canonical compact length at offset {offset}")]
    ShortVecNonCanonical { offset: usize },
}

impl CodecError {
    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::BufferUnderflow { .. } | Self::TrailingBytes { .. } => "buffer",
            Self::InvalidUtf8 { .. } | Self::InvalidBool { .. } | Self::InvalidOptionTag { .. } => {
                "malformed"
            }
            Self::ShortVecOverflow { .. } | Self::ShortVecNonCanonical { .. } => "shortvec",
            Self::UnsupportedType(_) | Self::UndefinedType(_) | Self::DepthExceeded { .. } => {
                "schema"
            }
            Self::ValueOutOfRange { .. }
            | Self::TypeMismatch { .. }
            | Self::UnknownVariant { .. }
            | Self::LengthMismatch { .. }
            | Self::LengthOverflow { .. } => "value",
        }
    }

    pub(crate) fn underflow(offset: usize, needed: usize, available: usize) -> Self {
        Self::BufferUnderflow {
            offset,
            needed,
            available,
        }
    }

    pub(crate) fn mismatch(expected: impl Into<String>, actual: &'static str) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual,
        }
    }
}

/// Result alias for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::underflow(4, 8, 2);
        assert_eq!(
            err.to_string(),
            "Buffer underflow: needed 8 bytes at offset 4, 2 available"
        );

        let err = CodecError::ValueOutOfRange {
            ty: "u8",
            value: "256".to_string(),
        };
        assert_eq!(err.to_string(), "Value 256 out of range for u8");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(CodecError::underflow(0, 1, 0).category(), "buffer");
        assert_eq!(CodecError::InvalidUtf8 { offset: 4 }.category(), "malformed");
        assert_eq!(CodecError::ShortVecOverflow { offset: 2 }.category(), "shortvec");
        assert_eq!(CodecError::UndefinedType("Foo".into()).category(), "schema");
    }
}
