//! Wire-format prefix enums.
//!
//! A length prefix states how many bytes or elements follow; a type
//! denotation states which concrete type follows in a polymorphic encoding.
//! Both are chosen per field by the call site's schema, never inferred.

use serde::{Deserialize, Serialize};

use crate::error::{IoResult, SeriError};

/// Width of the integer that encodes a collection's element count or a
/// blob's byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriLengthPrefixType {
    Byte,
    Uint16,
    Uint32,
    /// Only the stream API emits this width in practice, but it is accepted
    /// everywhere.
    Uint64,
}

impl SeriLengthPrefixType {
    /// Encoded width of the prefix in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Uint16 => 2,
            Self::Uint32 => 4,
            Self::Uint64 => 8,
        }
    }

    /// Largest count representable at this width.
    pub fn max_count(self) -> u64 {
        match self {
            Self::Byte => u8::MAX as u64,
            Self::Uint16 => u16::MAX as u64,
            Self::Uint32 => u32::MAX as u64,
            Self::Uint64 => u64::MAX,
        }
    }

    /// Little-endian encoding of `count` at this width.
    ///
    /// Fails with [`SeriError::LengthPrefixOverflow`] when the count does
    /// not fit; truncating silently would corrupt the wire format.
    pub fn encode_count(self, count: u64) -> IoResult<Vec<u8>> {
        if count > self.max_count() {
            return Err(SeriError::LengthPrefixOverflow {
                count,
                prefix: self,
            });
        }
        let le = count.to_le_bytes();
        Ok(le[..self.width()].to_vec())
    }

    /// Little-endian decode of a count from the head of `data`.
    pub fn decode_count(self, data: &[u8]) -> IoResult<u64> {
        let width = self.width();
        if data.len() < width {
            return Err(SeriError::NotEnoughData {
                needed: width,
                available: data.len(),
            });
        }
        let mut le = [0u8; 8];
        le[..width].copy_from_slice(&data[..width]);
        Ok(u64::from_le_bytes(le))
    }
}

/// Width of the discriminant written ahead of a polymorphic object's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDenotationType {
    Uint32,
    Byte,
    /// No discriminant on the wire; the selector is invoked with 0.
    None,
}

impl TypeDenotationType {
    /// Encoded width of the discriminant in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::Uint32 => 4,
            Self::Byte => 1,
            Self::None => 0,
        }
    }

    /// Encodes `type_id` at this width.
    ///
    /// `Byte` denotation range-checks the discriminant; `None` encodes
    /// nothing regardless of the value.
    pub fn encode(self, type_id: u32) -> IoResult<Vec<u8>> {
        match self {
            Self::Uint32 => Ok(type_id.to_le_bytes().to_vec()),
            Self::Byte => {
                let byte = u8::try_from(type_id).map_err(|_| {
                    SeriError::type_mismatch(format!(
                        "type id {type_id:#x} does not fit a byte denotation"
                    ))
                })?;
                Ok(vec![byte])
            }
            Self::None => Ok(Vec::new()),
        }
    }

    /// Decodes a discriminant from the head of `data`. `None` yields 0.
    pub fn decode(self, data: &[u8]) -> IoResult<u32> {
        let width = self.width();
        if data.len() < width {
            return Err(SeriError::NotEnoughData {
                needed: width,
                available: data.len(),
            });
        }
        match self {
            Self::Uint32 => Ok(u32::from_le_bytes([data[0], data[1], data[2], data[3]])),
            Self::Byte => Ok(data[0] as u32),
            Self::None => Ok(0),
        }
    }
}
