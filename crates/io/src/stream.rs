//! Stream-oriented counterpart of the slice builders.
//!
//! These free functions transfer the same wire format over `io::Read`/
//! `io::Write` streams, with seek-based helpers for the two-phase
//! collection write. Blocking semantics, if any, belong to the wrapped
//! stream. The primitive set is the same sealed [`WirePrimitive`] family
//! the builders use, so an unsupported type is a compile error rather than
//! a runtime fault.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{IoResult, SeriError};
use crate::mode::DeserializationMode;
use crate::prefix::{SeriLengthPrefixType, TypeDenotationType};
use crate::primitive::WirePrimitive;
use crate::serializable::Serializable;

/// Reads one fixed-width little-endian primitive.
pub fn read<T: WirePrimitive, R: Read>(stream: &mut R) -> IoResult<T> {
    let mut scratch = [0u8; 8];
    stream.read_exact(&mut scratch[..T::WIDTH])?;
    T::read_le(&scratch[..T::WIDTH])
}

/// Writes one fixed-width little-endian primitive.
pub fn write<T: WirePrimitive, W: Write>(stream: &mut W, value: T) -> IoResult<()> {
    let mut scratch = [0u8; 8];
    value.write_le(&mut scratch[..T::WIDTH]);
    stream.write_all(&scratch[..T::WIDTH])?;
    Ok(())
}

fn read_count<R: Read>(stream: &mut R, prefix: SeriLengthPrefixType) -> IoResult<u64> {
    let mut scratch = [0u8; 8];
    stream.read_exact(&mut scratch[..prefix.width()])?;
    prefix.decode_count(&scratch[..prefix.width()])
}

fn write_count<W: Write>(
    stream: &mut W,
    prefix: SeriLengthPrefixType,
    count: u64,
) -> IoResult<()> {
    let encoded = prefix.encode_count(count)?;
    stream.write_all(&encoded)?;
    Ok(())
}

/// Reads a length-prefixed blob; `max` rejects a hostile declared length
/// before the allocation.
pub fn read_bytes<R: Read>(
    stream: &mut R,
    prefix: SeriLengthPrefixType,
    max: Option<u64>,
) -> IoResult<Vec<u8>> {
    let length = read_count(stream, prefix)?;
    if let Some(max) = max {
        if length > max {
            return Err(SeriError::LengthAboveMax { max, length });
        }
    }
    let mut data = vec![0u8; length as usize];
    stream.read_exact(&mut data)?;
    Ok(data)
}

/// Writes a length-prefixed blob.
pub fn write_bytes_variable<W: Write>(
    stream: &mut W,
    prefix: SeriLengthPrefixType,
    data: &[u8],
) -> IoResult<()> {
    write_count(stream, prefix, data.len() as u64)?;
    stream.write_all(data)?;
    Ok(())
}

/// Reads `length` bytes and decodes them as one `[discriminant][body]`
/// object that must consume the window exactly.
pub fn read_serializable<R: Read>(
    stream: &mut R,
    length: usize,
    denotation: TypeDenotationType,
    selector: &dyn Fn(u32) -> IoResult<Box<dyn Serializable>>,
    mode: DeserializationMode,
) -> IoResult<Box<dyn Serializable>> {
    let mut window = vec![0u8; length];
    stream.read_exact(&mut window)?;
    let type_id = denotation.decode(&window)?;
    let mut instance = selector(type_id)?;
    let body = &window[denotation.width()..];
    let consumed = instance.deserialize(body, mode)?;
    if consumed != body.len() {
        return Err(SeriError::NotAllConsumed {
            remaining: body.len() - consumed,
        });
    }
    Ok(instance)
}

/// Writes the bytes produced by a fixed-size encoder as-is.
pub fn write_fixed_func<W: Write>(
    stream: &mut W,
    encode: impl FnOnce() -> IoResult<Vec<u8>>,
) -> IoResult<()> {
    let encoded = encode()?;
    stream.write_all(&encoded)?;
    Ok(())
}

/// Writes the bytes produced by an encoder behind a length prefix.
pub fn write_variable_func<W: Write>(
    stream: &mut W,
    prefix: SeriLengthPrefixType,
    encode: impl FnOnce() -> IoResult<Vec<u8>>,
) -> IoResult<()> {
    let encoded = encode()?;
    write_bytes_variable(stream, prefix, &encoded)
}

/// Two-phase collection write.
///
/// The element count is often unknown until the callback has run (it may
/// filter), so a placeholder count is written first, `write_fn` emits the
/// elements and reports how many, and the placeholder is then patched in
/// place: remember the start offset, seek back, overwrite, seek forward.
pub fn write_collection<S, F>(
    stream: &mut S,
    prefix: SeriLengthPrefixType,
    write_fn: F,
) -> IoResult<()>
where
    S: Write + Seek,
    F: FnOnce(&mut S) -> IoResult<u64>,
{
    let patch_at = stream.stream_position()?;
    write_count(stream, prefix, 0)?;
    let count = write_fn(stream)?;
    let end = stream.stream_position()?;
    if count > prefix.max_count() {
        return Err(SeriError::LengthPrefixOverflow { count, prefix });
    }
    stream.seek(SeekFrom::Start(patch_at))?;
    write_count(stream, prefix, count)?;
    stream.seek(SeekFrom::Start(end))?;
    #[cfg(feature = "tracing")]
    tracing::trace!(count, patch_at, "patched collection count");
    Ok(())
}

/// Reads a count prefix, then invokes `read_fn(stream, index)` exactly that
/// many times, in encoded order.
pub fn read_collection<S, F>(
    stream: &mut S,
    prefix: SeriLengthPrefixType,
    mut read_fn: F,
) -> IoResult<()>
where
    S: Read,
    F: FnMut(&mut S, u64) -> IoResult<()>,
{
    let count = read_count(stream, prefix)?;
    for index in 0..count {
        read_fn(stream, index)?;
    }
    Ok(())
}

/// Current seek position.
pub fn offset<S: Seek>(stream: &mut S) -> IoResult<u64> {
    Ok(stream.stream_position()?)
}

/// Absolute seek.
pub fn goto<S: Seek>(stream: &mut S, position: u64) -> IoResult<()> {
    stream.seek(SeekFrom::Start(position))?;
    Ok(())
}

/// Relative seek; negative deltas move backward.
pub fn skip<S: Seek>(stream: &mut S, delta: i64) -> IoResult<()> {
    stream.seek(SeekFrom::Current(delta))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_buffer::ByteBuffer;

    #[test]
    fn test_primitive_roundtrip() {
        let mut buf = ByteBuffer::new();
        write(&mut buf, 0xdead_beefu32).unwrap();
        write(&mut buf, true).unwrap();
        write(&mut buf, -7i16).unwrap();

        goto(&mut buf, 0).unwrap();
        assert_eq!(read::<u32, _>(&mut buf).unwrap(), 0xdead_beef);
        assert!(read::<bool, _>(&mut buf).unwrap());
        assert_eq!(read::<i16, _>(&mut buf).unwrap(), -7);
    }

    #[test]
    fn test_bool_strictness_over_stream() {
        let mut buf = ByteBuffer::from_bytes(vec![3]);
        assert_eq!(
            read::<bool, _>(&mut buf).unwrap_err(),
            SeriError::InvalidBoolValue(3)
        );
    }

    #[test]
    fn test_variable_bytes_u64_prefix() {
        let mut buf = ByteBuffer::new();
        write_bytes_variable(&mut buf, SeriLengthPrefixType::Uint64, b"payload").unwrap();
        goto(&mut buf, 0).unwrap();
        let data = read_bytes(&mut buf, SeriLengthPrefixType::Uint64, None).unwrap();
        assert_eq!(data, b"payload");
    }

    #[test]
    fn test_read_bytes_max_guard() {
        let mut buf = ByteBuffer::new();
        write_bytes_variable(&mut buf, SeriLengthPrefixType::Uint32, &[0u8; 100]).unwrap();
        goto(&mut buf, 0).unwrap();
        assert_eq!(
            read_bytes(&mut buf, SeriLengthPrefixType::Uint32, Some(10)).unwrap_err(),
            SeriError::LengthAboveMax {
                max: 10,
                length: 100
            }
        );
    }

    #[test]
    fn test_collection_patch_roundtrip() {
        let values = [10u16, 20, 30];
        let mut buf = ByteBuffer::new();
        write_collection(&mut buf, SeriLengthPrefixType::Uint16, |s| {
            let mut written = 0;
            for v in values {
                write(s, v)?;
                written += 1;
            }
            Ok(written)
        })
        .unwrap();

        // The count field must hold the true element count.
        let bytes = buf.as_slice().to_vec();
        assert_eq!(&bytes[..2], &[3, 0]);

        goto(&mut buf, 0).unwrap();
        let mut decoded = Vec::new();
        read_collection(&mut buf, SeriLengthPrefixType::Uint16, |s, _| {
            decoded.push(read::<u16, _>(s)?);
            Ok(())
        })
        .unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_collection_count_overflow() {
        let mut buf = ByteBuffer::new();
        let err = write_collection(&mut buf, SeriLengthPrefixType::Byte, |s| {
            for _ in 0..300u32 {
                write(s, 0u8)?;
            }
            Ok(300)
        })
        .unwrap_err();
        assert_eq!(
            err,
            SeriError::LengthPrefixOverflow {
                count: 300,
                prefix: SeriLengthPrefixType::Byte
            }
        );
    }

    #[test]
    fn test_write_variable_func() {
        let mut buf = ByteBuffer::new();
        write_variable_func(&mut buf, SeriLengthPrefixType::Byte, || {
            Ok(vec![1, 2, 3])
        })
        .unwrap();
        assert_eq!(buf.as_slice(), &[3, 1, 2, 3]);
    }

    #[test]
    fn test_seek_helpers() {
        let mut buf = ByteBuffer::from_bytes(vec![0, 1, 2, 3, 4, 5]);
        goto(&mut buf, 4).unwrap();
        assert_eq!(offset(&mut buf).unwrap(), 4);
        skip(&mut buf, -2).unwrap();
        assert_eq!(offset(&mut buf).unwrap(), 2);
        assert_eq!(read::<u8, _>(&mut buf).unwrap(), 2);
    }
}
