//! Closed set of fixed-width wire primitives.
//!
//! The trait is sealed: the slice builders and the stream API accept
//! exactly the types enumerated here, and anything else fails to compile.
//! All encodings are little-endian; `bool` is one byte and decodes
//! strictly (0 or 1, nothing else).

use crate::error::{IoResult, SeriError};

mod sealed {
    pub trait Sealed {}
}

/// A numeric or boolean value with a fixed little-endian wire encoding.
pub trait WirePrimitive: sealed::Sealed + Copy {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Encodes into `out`, which must be exactly `WIDTH` bytes.
    fn write_le(self, out: &mut [u8]);

    /// Decodes from `bytes`, which must be at least `WIDTH` bytes.
    fn read_le(bytes: &[u8]) -> IoResult<Self>;
}

macro_rules! impl_wire_primitive {
    ($($t:ty),* $(,)?) => {$(
        impl sealed::Sealed for $t {}

        impl WirePrimitive for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();

            fn write_le(self, out: &mut [u8]) {
                out[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> IoResult<Self> {
                if bytes.len() < Self::WIDTH {
                    return Err(SeriError::NotEnoughData {
                        needed: Self::WIDTH,
                        available: bytes.len(),
                    });
                }
                let mut le = [0u8; Self::WIDTH];
                le.copy_from_slice(&bytes[..Self::WIDTH]);
                Ok(<$t>::from_le_bytes(le))
            }
        }
    )*};
}

impl_wire_primitive!(u8, i8, u16, i16, u32, i32, u64, i64);

impl sealed::Sealed for bool {}

impl WirePrimitive for bool {
    const WIDTH: usize = 1;

    fn write_le(self, out: &mut [u8]) {
        out[0] = self as u8;
    }

    fn read_le(bytes: &[u8]) -> IoResult<Self> {
        if bytes.is_empty() {
            return Err(SeriError::NotEnoughData {
                needed: 1,
                available: 0,
            });
        }
        match bytes[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SeriError::InvalidBoolValue(other)),
        }
    }
}
