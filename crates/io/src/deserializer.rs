//! Chainable read cursor over an in-memory byte window.
//!
//! Mirrors the [`Serializer`](crate::Serializer): one instance per decode,
//! sticky first error, every operation returns `&mut Self`. Reads advance
//! the cursor; `done`/`finish` report how many bytes were consumed.
//!
//! Length-prefixed reads accept an optional caller-supplied maximum so a
//! malicious oversized length is rejected before any allocation happens.

use chrono::{DateTime, Utc};

use crate::error::{IoResult, SeriError};
use crate::mode::DeserializationMode;
use crate::prefix::{SeriLengthPrefixType, TypeDenotationType};
use crate::primitive::WirePrimitive;
use crate::rules::ArrayRules;
use crate::serializable::Serializable;

/// Sticky-error read cursor.
pub struct Deserializer<'a> {
    data: &'a [u8],
    pos: usize,
    err: Option<SeriError>,
    mode: DeserializationMode,
}

impl<'a> Deserializer<'a> {
    pub fn new(data: &'a [u8], mode: DeserializationMode) -> Self {
        Self {
            data,
            pos: 0,
            err: None,
            mode,
        }
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Bytes still unread.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
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

    fn take(&mut self, n: usize) -> IoResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(SeriError::NotEnoughData {
                needed: n,
                available: self.remaining(),
            });
        }
        let window = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(window)
    }

    /// Advances the cursor by `n` bytes without decoding them.
    pub fn skip(
        &mut self,
        n: usize,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        if let Err(err) = self.take(n) {
            self.fail(annotate(err));
        }
        self
    }

    /// Reads a fixed-width little-endian primitive into `out`.
    pub fn read_num<T: WirePrimitive>(
        &mut self,
        out: &mut T,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        match self.take(T::WIDTH).and_then(T::read_le) {
            Ok(value) => *out = value,
            Err(err) => self.fail(annotate(err)),
        }
        self
    }

    /// Reads one byte as a bool, rejecting anything other than 0 or 1.
    pub fn read_bool(
        &mut self,
        out: &mut bool,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        self.read_num(out, annotate)
    }

    pub fn read_byte(
        &mut self,
        out: &mut u8,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        self.read_num(out, annotate)
    }

    /// Fills `out` with the next `out.len()` bytes.
    pub fn read_bytes(
        &mut self,
        out: &mut [u8],
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        match self.take(out.len()) {
            Ok(window) => out.copy_from_slice(window),
            Err(err) => self.fail(annotate(err)),
        }
        self
    }

    fn read_length(
        &mut self,
        prefix: SeriLengthPrefixType,
        max: Option<u64>,
    ) -> IoResult<u64> {
        let window = self.take(prefix.width())?;
        let length = prefix.decode_count(window)?;
        if let Some(max) = max {
            if length > max {
                return Err(SeriError::LengthAboveMax { max, length });
            }
        }
        Ok(length)
    }

    /// Reads a length-prefixed byte blob into `out`.
    ///
    /// `max` bounds the declared length before any allocation, rejecting a
    /// hostile prefix on a short buffer cheaply.
    pub fn read_variable_byte_slice(
        &mut self,
        prefix: SeriLengthPrefixType,
        out: &mut Vec<u8>,
        max: Option<u64>,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        let result = (|| -> IoResult<()> {
            let length = self.read_length(prefix, max)?;
            let window = self.take(length as usize)?;
            out.clear();
            out.extend_from_slice(window);
            Ok(())
        })();
        if let Err(err) = result {
            self.fail(annotate(err));
        }
        self
    }

    /// Reads a fixed-size array (32/49/64-byte hashes, keys, signatures).
    pub fn read_array_of_n_bytes<const N: usize>(
        &mut self,
        out: &mut [u8; N],
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        self.read_bytes(out.as_mut_slice(), annotate)
    }

    /// Reads a length-prefixed run of fixed-size arrays, checking bounds
    /// and each element's raw bytes against `rules` before the copy.
    pub fn read_slice_of_arrays_of_n_bytes<const N: usize>(
        &mut self,
        prefix: SeriLengthPrefixType,
        out: &mut Vec<[u8; N]>,
        rules: Option<&ArrayRules>,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        let mode = self.mode;
        let result = (|| -> IoResult<()> {
            let count = self.read_length(prefix, None)?;
            if let Some(rules) = rules {
                rules.check_bounds(count)?;
            }
            let mut compiled =
                rules.and_then(|r| r.compile_for(TypeDenotationType::None, mode));

            out.clear();
            for index in 0..count as usize {
                let window = self.take(N)?;
                if let Some(compiled) = compiled.as_mut() {
                    compiled.element(index, window)?;
                }
                let mut element = [0u8; N];
                element.copy_from_slice(window);
                out.push(element);
            }
            if let Some(compiled) = compiled.as_ref() {
                compiled.finish()?;
            }
            Ok(())
        })();
        if let Err(err) = result {
            self.fail(annotate(err));
        }
        self
    }

    fn decode_object(
        &mut self,
        denotation: TypeDenotationType,
        selector: &dyn Fn(u32) -> IoResult<Box<dyn Serializable>>,
    ) -> IoResult<Box<dyn Serializable>> {
        let head = self.take(denotation.width())?;
        let type_id = denotation.decode(head)?;
        let mut instance = selector(type_id)?;
        let consumed = instance.deserialize(&self.data[self.pos..], self.mode)?;
        if consumed > self.remaining() {
            return Err(SeriError::length_invalid(format!(
                "object reported consuming {consumed} bytes with {} available",
                self.remaining()
            )));
        }
        self.pos += consumed;
        Ok(instance)
    }

    /// Type-directed decode of one object framed as `[discriminant][body]`.
    ///
    /// The discriminant is resolved through `selector` to an empty
    /// instance, the instance decodes itself, and the cursor advances by
    /// the byte count it reports.
    pub fn read_object(
        &mut self,
        denotation: TypeDenotationType,
        selector: &dyn Fn(u32) -> IoResult<Box<dyn Serializable>>,
        out: &mut Option<Box<dyn Serializable>>,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        match self.decode_object(denotation, selector) {
            Ok(instance) => *out = Some(instance),
            Err(err) => self.fail(annotate(err)),
        }
        self
    }

    /// Reads a length-prefixed slice of polymorphic objects.
    ///
    /// `rules` is applied to the exact byte span each element consumed,
    /// discriminant included, never to the decoded value.
    pub fn read_slice_of_objects(
        &mut self,
        prefix: SeriLengthPrefixType,
        denotation: TypeDenotationType,
        selector: &dyn Fn(u32) -> IoResult<Box<dyn Serializable>>,
        out: &mut Vec<Box<dyn Serializable>>,
        rules: Option<&ArrayRules>,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        let mode = self.mode;
        let result = (|| -> IoResult<()> {
            let count = self.read_length(prefix, None)?;
            if let Some(rules) = rules {
                rules.check_bounds(count)?;
            }
            let mut compiled = rules.and_then(|r| r.compile_for(denotation, mode));

            out.clear();
            for index in 0..count as usize {
                let start = self.pos;
                let instance = self.decode_object(denotation, selector)?;
                if let Some(compiled) = compiled.as_mut() {
                    compiled.element(index, &self.data[start..self.pos])?;
                }
                out.push(instance);
            }
            if let Some(compiled) = compiled.as_ref() {
                compiled.finish()?;
            }
            Ok(())
        })();
        if let Err(err) = result {
            self.fail(annotate(err));
        }
        self
    }

    /// Reads an `i64` milliseconds timestamp; wire value 0 decodes as
    /// `None` (inverse of [`Serializer::write_time`](crate::Serializer::write_time)).
    pub fn read_time(
        &mut self,
        out: &mut Option<DateTime<Utc>>,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        let mut millis = 0i64;
        self.read_num(&mut millis, annotate);
        if self.err.is_some() {
            return self;
        }
        if millis == 0 {
            *out = None;
        } else {
            match DateTime::from_timestamp_millis(millis) {
                Some(t) => *out = Some(t),
                None => self.fail(SeriError::invalid_bytes(format!(
                    "timestamp {millis} out of range"
                ))),
            }
        }
        self
    }

    /// Reads an optional polymorphic payload: `u32` total length, 0 means
    /// absent.
    ///
    /// A present payload must be at least `min_size` bytes, and the
    /// decoder's reported consumption (discriminant included) must equal
    /// the declared length; any difference is treated as tampering or
    /// corruption.
    pub fn read_payload(
        &mut self,
        denotation: TypeDenotationType,
        selector: &dyn Fn(u32) -> IoResult<Box<dyn Serializable>>,
        min_size: u32,
        out: &mut Option<Box<dyn Serializable>>,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        let result = (|| -> IoResult<()> {
            let declared = {
                let window = self.take(4)?;
                u32::read_le(window)? as usize
            };
            if declared == 0 {
                *out = None;
                return Ok(());
            }
            if declared < min_size as usize {
                return Err(SeriError::LengthBelowMin {
                    min: min_size as u64,
                    length: declared as u64,
                });
            }
            if declared > self.remaining() {
                return Err(SeriError::NotEnoughData {
                    needed: declared,
                    available: self.remaining(),
                });
            }
            let start = self.pos;
            let instance = self.decode_object(denotation, selector)?;
            let consumed = self.pos - start;
            if consumed != declared {
                return Err(SeriError::PayloadLengthMismatch {
                    declared,
                    consumed,
                });
            }
            *out = Some(instance);
            Ok(())
        })();
        if let Err(err) = result {
            self.fail(annotate(err));
        }
        self
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(
        &mut self,
        prefix: SeriLengthPrefixType,
        out: &mut String,
        max: Option<u64>,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        let result = (|| -> IoResult<()> {
            let length = self.read_length(prefix, max)?;
            let window = self.take(length as usize)?;
            let value = std::str::from_utf8(window)
                .map_err(|_| SeriError::invalid_bytes("string is not valid UTF-8"))?;
            out.clear();
            out.push_str(value);
            Ok(())
        })();
        if let Err(err) = result {
            self.fail(annotate(err));
        }
        self
    }

    /// Post-condition check: fails with the leftover byte count when the
    /// buffer was not fully consumed.
    pub fn consumed_all(
        &mut self,
        annotate: impl FnOnce(SeriError) -> SeriError,
    ) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        let remaining = self.remaining();
        if remaining > 0 {
            self.fail(annotate(SeriError::NotAllConsumed { remaining }));
        }
        self
    }

    /// Finalizes the chain, reporting the consumed byte count and the
    /// poisoning error if one occurred.
    pub fn done(self) -> (usize, Option<SeriError>) {
        (self.pos, self.err)
    }

    /// `done` collapsed into a `Result`.
    pub fn finish(self) -> IoResult<usize> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self.pos),
        }
    }
}
