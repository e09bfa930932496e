//! Bitmask modes steering validation during encode/decode.

use bitflags::bitflags;

bitflags! {
    /// Per-operation mode a call site passes when encoding or decoding.
    ///
    /// `DeserializationMode::empty()` means no validation at all.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DeserializationMode: u8 {
        const PERFORM_VALIDATION = 0b0000_0001;
        const PERFORM_LEXICAL_ORDERING = 0b0000_0010;
    }
}

bitflags! {
    /// Per-collection validation policy bits carried by `ArrayRules`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ValidationMode: u8 {
        /// No two elements may share identical serialized bytes.
        const NO_DUPLICATES = 0b0000_0001;
        /// Elements must appear in non-decreasing byte-lexical order.
        const LEXICAL_ORDERING = 0b0000_0010;
        /// Each type prefix may occur at most once.
        const UNIQUE_TYPE_PREFIX = 0b0000_0100;
        /// Every prefix in `must_occur` has to appear in the collection.
        const MUST_OCCUR = 0b0000_1000;
    }
}
