//! Chainable write builder over a growable in-memory buffer.
//!
//! A `Serializer` is created per encode operation and discarded. Every
//! write returns `&mut Self` so encodings read as one chain; the first
//! failing operation poisons the builder and every later call is a no-op.
//! Nested encoders never need to check for errors mid-chain, only the
//! top-level caller handles the single error `serialize` reports.
//!
//! Fallible operations take an `annotate` closure that receives the
//! canonical sentinel and may wrap it with call-site context; pass
//! [`crate::keep`] to forward it unchanged.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};

use crate::error::{IoResult, SeriError};
use crate::mode::DeserializationMode;
use crate::prefix::{SeriLengthPrefixType, TypeDenotationType};
use crate::primitive::WirePrimitive;
use crate::rules::ArrayRules;
use crate::serializable::Serializable;

/// Sticky-error write builder.
pub struct Serializer {
    buf: BytesMut,
    err: Option<SeriError>,
    mode: DeserializationMode,
}

impl Serializer {
    pub fn new(mode: DeserializationMode) -> Self {
        Self::with_capacity(mode, 0)
    }

    pub fn with_capacity(mode: DeserializationMode, capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            err: None,
            mode,
        }
    }

    /// Bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The poisoning error, if any operation has failed.
    pub fn error(&self) -> Option<&SeriError> {
        self.err.as_ref()
    }

    fn fail(&mut self, err: SeriError) {
        // First error wins; never overwrite.
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    /// Writes a fixed-width little-endian primitive.
    pub fn write_num<T: WirePrimitive>(&mut self, value: T) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        let mut scratch = [0u8; 8];
        value.write_le(&mut scratch[..T::WIDTH]);
        self.buf.put_slice(&scratch[..T::WIDTH]);
        self
    }

    /// Writes a bool as a single 0/1 byte.
    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_num(value)
    }

    pub fn write_byte(&mut self, value: u8) -> &mut Self {
        self.write_num(value)
    }

    /// Appends raw bytes with no prefix; the read side must know the width.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        self.buf.put_slice(bytes);
        self
    }

    /// Writes an element or byte count at the given prefix width.
    ///
    /// A count beyond the prefix's numeric range records
    /// [`SeriError::LengthPrefixOverflow`] instead of truncating.
    pub fn write_slice_length(
        &mut self,
        prefix: SeriLengthPrefixType,
        count: u64,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        match prefix.encode_count(count) {
            Ok(encoded) => {
                self.buf.put_slice(&encoded);
            }
            Err(err) => self.fail(annotate(err)),
        }
        self
    }

    /// Writes a length-prefixed byte blob.
    pub fn write_variable_byte_slice(
        &mut self,
        prefix: SeriLengthPrefixType,
        bytes: &[u8],
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        self.write_slice_length(prefix, bytes.len() as u64, annotate);
        self.write_bytes(bytes)
    }

    /// Writes a length-prefixed array of fixed-width elements (hashes,
    /// keys, signatures), validating each element's bytes against `rules`
    /// before it is appended.
    pub fn write_array_of_n_bytes_slice(
        &mut self,
        prefix: SeriLengthPrefixType,
        width: usize,
        elements: &[&[u8]],
        rules: Option<&ArrayRules>,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        if let Err(err) = self.put_array_of_n_bytes(prefix, width, elements, rules) {
            self.fail(annotate(err));
        }
        self
    }

    fn put_array_of_n_bytes(
        &mut self,
        prefix: SeriLengthPrefixType,
        width: usize,
        elements: &[&[u8]],
        rules: Option<&ArrayRules>,
    ) -> IoResult<()> {
        if let Some(rules) = rules {
            rules.check_bounds(elements.len() as u64)?;
        }
        let mut compiled =
            rules.and_then(|r| r.compile_for(TypeDenotationType::None, self.mode));

        let encoded = prefix.encode_count(elements.len() as u64)?;
        self.buf.put_slice(&encoded);
        for (index, element) in elements.iter().enumerate() {
            if element.len() != width {
                return Err(SeriError::invalid_bytes(format!(
                    "element {index} is {} bytes, expected {width}",
                    element.len()
                )));
            }
            if let Some(compiled) = compiled.as_mut() {
                compiled.element(index, element)?;
            }
            self.buf.put_slice(element);
        }
        if let Some(compiled) = compiled.as_ref() {
            compiled.finish()?;
        }
        Ok(())
    }

    /// Writes one nested object framed as `[discriminant][body]`.
    pub fn write_object(
        &mut self,
        denotation: TypeDenotationType,
        object: &dyn Serializable,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        match self.encode_object(denotation, object) {
            Ok(encoded) => {
                self.buf.put_slice(&encoded);
            }
            Err(err) => self.fail(annotate(err)),
        }
        self
    }

    fn encode_object(
        &self,
        denotation: TypeDenotationType,
        object: &dyn Serializable,
    ) -> IoResult<Vec<u8>> {
        let mut encoded = denotation.encode(object.type_id())?;
        let body = object.serialize(self.mode)?;
        encoded.extend_from_slice(&body);
        Ok(encoded)
    }

    /// Writes a length-prefixed slice of objects, each framed as
    /// `[discriminant][body]`.
    ///
    /// `after_each` runs once per element with its index and serialized
    /// bytes, for post-write bookkeeping such as offset tables.
    pub fn write_slice_of_objects(
        &mut self,
        prefix: SeriLengthPrefixType,
        denotation: TypeDenotationType,
        objects: &[&dyn Serializable],
        mut after_each: Option<&mut dyn FnMut(usize, &[u8])>,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        let result = (|| -> IoResult<()> {
            let encoded = prefix.encode_count(objects.len() as u64)?;
            self.buf.put_slice(&encoded);
            for (index, object) in objects.iter().enumerate() {
                let element = self.encode_object(denotation, *object)?;
                self.buf.put_slice(&element);
                if let Some(callback) = after_each.as_mut() {
                    callback(index, &element);
                }
            }
            Ok(())
        })();
        if let Err(err) = result {
            self.fail(annotate(err));
        }
        self
    }

    /// Writes an optional polymorphic payload: a `u32` total length
    /// followed by `[discriminant][body]`. Absence writes length 0 and
    /// nothing else.
    pub fn write_payload(
        &mut self,
        denotation: TypeDenotationType,
        payload: Option<&dyn Serializable>,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        let Some(payload) = payload else {
            return self.write_num(0u32);
        };
        let result = (|| -> IoResult<()> {
            let encoded = self.encode_object(denotation, payload)?;
            let length = u32::try_from(encoded.len()).map_err(|_| {
                SeriError::LengthPrefixOverflow {
                    count: encoded.len() as u64,
                    prefix: SeriLengthPrefixType::Uint32,
                }
            })?;
            self.buf.put_u32_le(length);
            self.buf.put_slice(&encoded);
            Ok(())
        })();
        if let Err(err) = result {
            self.fail(annotate(err));
        }
        self
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_string(
        &mut self,
        prefix: SeriLengthPrefixType,
        value: &str,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        self.write_variable_byte_slice(prefix, value.as_bytes(), annotate)
    }

    /// Writes a timestamp as little-endian `i64` milliseconds since the
    /// Unix epoch. `None` encodes as wire value 0; the read side maps 0
    /// back to `None`.
    pub fn write_time(&mut self, time: Option<DateTime<Utc>>) -> &mut Self {
        let millis = time.map_or(0, |t| t.timestamp_millis());
        self.write_num(millis)
    }

    /// Runs an inline side effect against the builder, skipped once
    /// poisoned. Useful for capturing offsets mid-chain.
    pub fn apply(&mut self, f: impl FnOnce(&mut Self)) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        f(self);
        self
    }

    /// Poisons the builder with `err()` when `condition` holds.
    pub fn abort_if(
        &mut self,
        condition: bool,
        err: impl FnOnce() -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        if condition {
            self.fail(err());
        }
        self
    }

    /// Finalizes the chain: the poisoning error if one occurred, otherwise
    /// the accumulated bytes.
    pub fn serialize(self) -> IoResult<Bytes> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self.buf.freeze()),
        }
    }
}
