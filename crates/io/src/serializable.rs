//! The contract domain types implement, and the registry that resolves
//! discriminants to empty instances during polymorphic decode.

use bytes::Bytes;
use hashbrown::HashMap;

use crate::error::{IoResult, SeriError};
use crate::mode::DeserializationMode;

/// Binary encoding contract for protocol objects.
///
/// `deserialize` fills `self` in place from the head of `data` and reports
/// how many bytes it consumed; the caller advances its cursor by exactly
/// that amount. Implementations live outside this crate.
pub trait Serializable: std::fmt::Debug {
    /// Discriminant written ahead of the body in polymorphic encodings.
    fn type_id(&self) -> u32;

    /// Encodes the object into its wire representation.
    fn serialize(&self, mode: DeserializationMode) -> IoResult<Bytes>;

    /// Decodes from the head of `data`, returning the consumed byte count.
    fn deserialize(&mut self, data: &[u8], mode: DeserializationMode) -> IoResult<usize>;
}

/// Resolves a discriminant to an empty instance ready to deserialize into.
///
/// Supplied by the domain layer; an unrecognized discriminant surfaces
/// [`SeriError::UnknownType`].
pub type SerializableSelector<'a> = dyn Fn(u32) -> IoResult<Box<dyn Serializable>> + 'a;

/// Factory producing an empty instance of one concrete type.
pub type SerializableFactory = fn() -> Box<dyn Serializable>;

/// Explicit, externally populated table of discriminant-to-factory
/// mappings.
///
/// Call sites build one of these per protocol surface and hand its
/// [`selector`](TypeRegistry::selector) to the decode operations; there is
/// no global registry.
#[derive(Default)]
pub struct TypeRegistry {
    factories: HashMap<u32, SerializableFactory>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for `type_id`, replacing any previous entry.
    pub fn register(&mut self, type_id: u32, factory: SerializableFactory) -> &mut Self {
        self.factories.insert(type_id, factory);
        self
    }

    /// Produces an empty instance for `type_id`.
    pub fn resolve(&self, type_id: u32) -> IoResult<Box<dyn Serializable>> {
        match self.factories.get(&type_id) {
            Some(factory) => Ok(factory()),
            None => Err(SeriError::UnknownType(type_id)),
        }
    }

    /// A selector closure borrowing this registry, in the shape the decode
    /// operations expect.
    pub fn selector(&self) -> impl Fn(u32) -> IoResult<Box<dyn Serializable>> + '_ {
        move |type_id| self.resolve(type_id)
    }
}

/// Convenience methods for anything `Serializable`.
pub trait SerializableExt: Serializable {
    /// Decodes from `data`, requiring the whole buffer to be consumed.
    fn deserialize_exact(&mut self, data: &[u8], mode: DeserializationMode) -> IoResult<()> {
        let consumed = self.deserialize(data, mode)?;
        if consumed != data.len() {
            return Err(SeriError::NotAllConsumed {
                remaining: data.len() - consumed,
            });
        }
        Ok(())
    }
}

impl<T: Serializable + ?Sized> SerializableExt for T {}
