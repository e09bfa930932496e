//! seri-io - binary serialization engine for protocol objects
//!
//! This crate is the wire-format foundation the rest of the stack builds
//! on: message framing, persisted records, and signed payloads all encode
//! and decode through it. It provides the chainable [`Serializer`] and
//! [`Deserializer`] builders over in-memory slices, a parallel [`stream`]
//! API over seekable streams, the [`ArrayRules`] validation engine for
//! serialized collections, and the type-denotation/[`TypeRegistry`]
//! mechanism enabling polymorphic decode.
//!
//! All fixed-width integers are little-endian; booleans are exactly one
//! strict 0/1 byte. Builders carry a sticky error: the first failing
//! operation poisons the instance, later calls are no-ops, and
//! finalization surfaces the original error. Instances are created per
//! encode/decode operation and are not meant to be shared across threads.

pub mod byte_buffer;
pub mod error;
pub mod stream;

mod deserializer;
mod mode;
mod prefix;
mod primitive;
mod rules;
mod serializable;
mod serializer;

pub use byte_buffer::ByteBuffer;
pub use deserializer::Deserializer;
pub use error::{
    check_exact_length, check_min_length, check_type, check_type_byte, keep, IoResult, SeriError,
};
pub use mode::{DeserializationMode, ValidationMode};
pub use prefix::{SeriLengthPrefixType, TypeDenotationType};
pub use primitive::WirePrimitive;
pub use rules::{ArrayRules, CompiledRules, ElementValidator, TypePrefixes};
pub use serializable::{
    Serializable, SerializableExt, SerializableFactory, SerializableSelector, TypeRegistry,
};
pub use serializer::Serializer;
