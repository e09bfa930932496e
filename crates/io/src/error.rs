//! Error taxonomy for the codec engine.
//!
//! Every sentinel here is a canonical error a decode/encode path can record.
//! Callers that need call-site context pass an annotation closure to the
//! builder primitives; callers that do not simply forward the sentinel with
//! [`keep`].

use thiserror::Error;

use crate::prefix::SeriLengthPrefixType;

/// Result alias used throughout the crate.
pub type IoResult<T> = Result<T, SeriError>;

/// Canonical codec errors.
///
/// The enum is `Clone + PartialEq` so sentinels survive the sticky-error
/// builders and can be matched exactly by callers and tests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeriError {
    /// Raw bytes do not form a valid value of the expected shape.
    #[error("invalid bytes: {0}")]
    InvalidBytes(String),

    /// A discriminant did not match the expected type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Collection has fewer elements than the rules allow.
    #[error("array too small: {count} elements, minimum {min}")]
    ArrayMinViolation { min: u64, count: u64 },

    /// Collection has more elements than the rules allow.
    #[error("array too large: {count} elements, maximum {max}")]
    ArrayMaxViolation { max: u64, count: u64 },

    /// Two elements carry identical serialized bytes.
    #[error("duplicate element at index {index}, first seen at index {first}")]
    UniquenessViolation { index: usize, first: usize },

    /// A type prefix occurred more than once in a type-unique collection.
    #[error("type prefix {prefix:#x} at index {index} occurs more than once")]
    TypeUniquenessViolation { index: usize, prefix: u32 },

    /// Consecutive elements are not in non-decreasing byte order.
    #[error("elements at indices {prev} and {index} violate lexical order")]
    LexicalOrderViolation { prev: usize, index: usize },

    /// The input window is shorter than the read requires.
    #[error("not enough data: need {needed} bytes, {available} available")]
    NotEnoughData { needed: usize, available: usize },

    /// A boolean byte was neither 0 nor 1.
    #[error("invalid bool value {0}")]
    InvalidBoolValue(u8),

    /// A length field is malformed for reasons beyond plain bounds.
    #[error("invalid length: {0}")]
    LengthInvalid(String),

    /// A length field is below the required floor.
    #[error("length {length} below minimum {min}")]
    LengthBelowMin { min: u64, length: u64 },

    /// A length field exceeds the permitted ceiling.
    #[error("length {length} above maximum {max}")]
    LengthAboveMax { max: u64, length: u64 },

    /// A count does not fit the numeric range of the chosen length prefix.
    #[error("count {count} exceeds the range of a {prefix:?} length prefix")]
    LengthPrefixOverflow {
        count: u64,
        prefix: SeriLengthPrefixType,
    },

    /// Bytes remained after a decode that was expected to consume the buffer.
    #[error("{remaining} bytes left over")]
    NotAllConsumed { remaining: usize },

    /// A discriminant resolved to no registered type.
    #[error("unknown type denotation {0:#x}")]
    UnknownType(u32),

    /// A payload's decoder consumed a different byte count than declared.
    #[error("payload length mismatch: declared {declared}, consumed {consumed}")]
    PayloadLengthMismatch { declared: usize, consumed: usize },

    /// A required type prefix never occurred in the collection.
    #[error("required type prefix {0:#x} missing from collection")]
    MustOccurViolation(u32),

    /// Underlying stream failure, stringified to keep the enum `Clone`.
    #[error("stream error: {0}")]
    Io(String),
}

impl SeriError {
    pub fn invalid_bytes(message: impl Into<String>) -> Self {
        Self::InvalidBytes(message.into())
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }

    pub fn length_invalid(message: impl Into<String>) -> Self {
        Self::LengthInvalid(message.into())
    }
}

impl From<std::io::Error> for SeriError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Forwards a canonical sentinel unchanged.
///
/// This is the annotation a call site passes when it has nothing to add:
/// `de.read_num(&mut n, keep)`.
pub fn keep(err: SeriError) -> SeriError {
    err
}

/// Checks that `data` starts with the little-endian `u32` discriminant
/// `expected`.
pub fn check_type(data: &[u8], expected: u32) -> IoResult<()> {
    check_min_length(data, 4)?;
    let found = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    if found != expected {
        return Err(SeriError::type_mismatch(format!(
            "expected type {expected:#x}, found {found:#x}"
        )));
    }
    Ok(())
}

/// Checks that `data` starts with the single-byte discriminant `expected`.
pub fn check_type_byte(data: &[u8], expected: u8) -> IoResult<()> {
    check_min_length(data, 1)?;
    if data[0] != expected {
        return Err(SeriError::type_mismatch(format!(
            "expected type {expected:#x}, found {:#x}",
            data[0]
        )));
    }
    Ok(())
}

/// Checks that `data` is exactly `len` bytes long.
pub fn check_exact_length(data: &[u8], len: usize) -> IoResult<()> {
    if data.len() != len {
        return Err(SeriError::length_invalid(format!(
            "expected exactly {len} bytes, found {}",
            data.len()
        )));
    }
    Ok(())
}

/// Checks that `data` is at least `min` bytes long.
pub fn check_min_length(data: &[u8], min: usize) -> IoResult<()> {
    if data.len() < min {
        return Err(SeriError::NotEnoughData {
            needed: min,
            available: data.len(),
        });
    }
    Ok(())
}
