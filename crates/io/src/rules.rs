//! Collection validation rules.
//!
//! `ArrayRules` is a pure policy object: bounds on the element count plus a
//! bitmask of per-element checks. It carries no mutable state; `compile`
//! assembles the requested checks into a single validator chain for one
//! pass over a collection.
//!
//! All comparisons operate on the raw serialized bytes of each element,
//! never on decoded values. Lexical order is memcmp order.

use hashbrown::{HashMap, HashSet};

use crate::error::{IoResult, SeriError};
use crate::mode::{DeserializationMode, ValidationMode};
use crate::prefix::TypeDenotationType;

/// Per-element check over the element's raw serialized bytes.
///
/// Stateful internally (seen-sets, predecessor buffers) but stateless to
/// callers: feed elements in encoded order, index first.
pub type ElementValidator = Box<dyn FnMut(usize, &[u8]) -> IoResult<()>>;

/// A set of type-prefix discriminants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypePrefixes {
    prefixes: HashSet<u32>,
}

impl TypePrefixes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: u32) -> bool {
        self.prefixes.insert(prefix)
    }

    pub fn contains(&self, prefix: u32) -> bool {
        self.prefixes.contains(&prefix)
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// True when every prefix in `self` also occurs in `other`.
    pub fn is_subset(&self, other: &TypePrefixes) -> bool {
        self.prefixes.is_subset(&other.prefixes)
    }

    /// First prefix of `self` absent from `other`, if any.
    fn first_missing_from(&self, other: &TypePrefixes) -> Option<u32> {
        self.prefixes
            .iter()
            .copied()
            .find(|p| !other.prefixes.contains(p))
    }
}

impl FromIterator<u32> for TypePrefixes {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            prefixes: iter.into_iter().collect(),
        }
    }
}

/// Validation policy for a serialized collection.
///
/// `min`/`max` bound the element count, inclusive on both sides; 0 means
/// "no bound on that side". `validation_mode` selects the per-element
/// checks; `must_occur` lists type prefixes the collection has to contain
/// when [`ValidationMode::MUST_OCCUR`] is set.
#[derive(Debug, Clone, Default)]
pub struct ArrayRules {
    pub min: u64,
    pub max: u64,
    pub must_occur: TypePrefixes,
    pub validation_mode: ValidationMode,
}

impl ArrayRules {
    pub fn new(min: u64, max: u64, validation_mode: ValidationMode) -> Self {
        Self {
            min,
            max,
            must_occur: TypePrefixes::new(),
            validation_mode,
        }
    }

    pub fn with_must_occur(mut self, prefixes: TypePrefixes) -> Self {
        self.must_occur = prefixes;
        self.validation_mode |= ValidationMode::MUST_OCCUR;
        self
    }

    /// Checks `min <= count <= max`, treating 0 as unbounded per side.
    pub fn check_bounds(&self, count: u64) -> IoResult<()> {
        if self.min > 0 && count < self.min {
            return Err(SeriError::ArrayMinViolation {
                min: self.min,
                count,
            });
        }
        if self.max > 0 && count > self.max {
            return Err(SeriError::ArrayMaxViolation {
                max: self.max,
                count,
            });
        }
        Ok(())
    }

    /// No two elements may carry identical serialized bytes.
    ///
    /// O(n) over a seen-set; the error names both the offending index and
    /// the index the bytes were first seen at.
    pub fn unique_validator(&self) -> ElementValidator {
        let mut seen: HashMap<Vec<u8>, usize> = HashMap::new();
        Box::new(move |index, bytes| {
            if let Some(&first) = seen.get(bytes) {
                return Err(SeriError::UniquenessViolation { index, first });
            }
            seen.insert(bytes.to_vec(), index);
            Ok(())
        })
    }

    /// Elements must appear in non-decreasing byte-lexical order.
    pub fn lexical_order_validator(&self) -> ElementValidator {
        let mut prev: Option<(usize, Vec<u8>)> = None;
        Box::new(move |index, bytes| {
            if let Some((prev_index, prev_bytes)) = &prev {
                if bytes < prev_bytes.as_slice() {
                    return Err(SeriError::LexicalOrderViolation {
                        prev: *prev_index,
                        index,
                    });
                }
            }
            prev = Some((index, bytes.to_vec()));
            Ok(())
        })
    }

    /// Fused strictly-ascending check: no duplicates and lexical order in a
    /// single pass, comparing each element only to its predecessor.
    ///
    /// `compile` substitutes this whenever both `NO_DUPLICATES` and
    /// `LEXICAL_ORDERING` are set. Chaining the two simple validators
    /// instead would report an order violation for an equal-valued
    /// out-of-sequence element where this one correctly reports a
    /// duplicate, besides costing a second pass and an extra set.
    pub fn lexical_order_without_dups_validator(&self) -> ElementValidator {
        let mut prev: Option<(usize, Vec<u8>)> = None;
        Box::new(move |index, bytes| {
            if let Some((prev_index, prev_bytes)) = &prev {
                match bytes.cmp(prev_bytes.as_slice()) {
                    std::cmp::Ordering::Less => {
                        return Err(SeriError::LexicalOrderViolation {
                            prev: *prev_index,
                            index,
                        });
                    }
                    std::cmp::Ordering::Equal => {
                        return Err(SeriError::UniquenessViolation {
                            index,
                            first: *prev_index,
                        });
                    }
                    std::cmp::Ordering::Greater => {}
                }
            }
            prev = Some((index, bytes.to_vec()));
            Ok(())
        })
    }

    /// Each type prefix may occur at most once; the discriminant is taken
    /// from the head of every element at the given denotation width.
    pub fn at_most_one_of_each_type_validator(
        &self,
        denotation: TypeDenotationType,
    ) -> ElementValidator {
        let mut seen: HashSet<u32> = HashSet::new();
        Box::new(move |index, bytes| {
            let prefix = denotation.decode(bytes)?;
            if !seen.insert(prefix) {
                return Err(SeriError::TypeUniquenessViolation { index, prefix });
            }
            Ok(())
        })
    }

    /// Assembles the per-element checks selected by `validation_mode` into
    /// one validator chain, scanning the bits in fixed order.
    pub fn compile(&self, denotation: TypeDenotationType) -> CompiledRules {
        let mut chain: Vec<ElementValidator> = Vec::new();

        let dups = self.validation_mode.contains(ValidationMode::NO_DUPLICATES);
        let order = self
            .validation_mode
            .contains(ValidationMode::LEXICAL_ORDERING);
        // The fused validator takes priority over the pair of simple ones.
        if dups && order {
            chain.push(self.lexical_order_without_dups_validator());
        } else if dups {
            chain.push(self.unique_validator());
        } else if order {
            chain.push(self.lexical_order_validator());
        }

        if self
            .validation_mode
            .contains(ValidationMode::UNIQUE_TYPE_PREFIX)
        {
            chain.push(self.at_most_one_of_each_type_validator(denotation));
        }

        let must_occur = if self.validation_mode.contains(ValidationMode::MUST_OCCUR) {
            Some((denotation, self.must_occur.clone()))
        } else {
            None
        };

        CompiledRules {
            chain,
            must_occur,
            seen: TypePrefixes::new(),
        }
    }

    /// Compiles the rules as gated by a per-operation mode.
    ///
    /// Returns `None` when the mode requests no validation at all. The
    /// `LEXICAL_ORDERING` bit only takes effect when the mode also carries
    /// [`DeserializationMode::PERFORM_LEXICAL_ORDERING`]; bounds checks are
    /// not gated here and always run.
    pub fn compile_for(
        &self,
        denotation: TypeDenotationType,
        mode: DeserializationMode,
    ) -> Option<CompiledRules> {
        if !mode.contains(DeserializationMode::PERFORM_VALIDATION) {
            return None;
        }
        let mut effective = self.clone();
        if !mode.contains(DeserializationMode::PERFORM_LEXICAL_ORDERING) {
            effective.validation_mode -= ValidationMode::LEXICAL_ORDERING;
        }
        Some(effective.compile(denotation))
    }
}

/// One-pass validator compiled from `ArrayRules`.
///
/// Call [`CompiledRules::element`] for every element in encoded order, then
/// [`CompiledRules::finish`] once after the last element.
pub struct CompiledRules {
    chain: Vec<ElementValidator>,
    must_occur: Option<(TypeDenotationType, TypePrefixes)>,
    seen: TypePrefixes,
}

impl CompiledRules {
    /// Runs every compiled check against one element's raw bytes.
    pub fn element(&mut self, index: usize, bytes: &[u8]) -> IoResult<()> {
        for check in &mut self.chain {
            check(index, bytes)?;
        }
        if let Some((denotation, _)) = &self.must_occur {
            self.seen.insert(denotation.decode(bytes)?);
        }
        Ok(())
    }

    /// Whole-collection checks that only resolve after the last element.
    pub fn finish(&self) -> IoResult<()> {
        if let Some((_, required)) = &self.must_occur {
            if let Some(missing) = required.first_missing_from(&self.seen) {
                return Err(SeriError::MustOccurViolation(missing));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(validator: &mut ElementValidator, elements: &[&[u8]]) -> IoResult<()> {
        for (i, el) in elements.iter().enumerate() {
            validator(i, el)?;
        }
        Ok(())
    }

    #[test]
    fn test_check_bounds_inclusive() {
        let rules = ArrayRules::new(2, 4, ValidationMode::empty());
        assert!(matches!(
            rules.check_bounds(1),
            Err(SeriError::ArrayMinViolation { min: 2, count: 1 })
        ));
        assert!(rules.check_bounds(2).is_ok());
        assert!(rules.check_bounds(4).is_ok());
        assert!(matches!(
            rules.check_bounds(5),
            Err(SeriError::ArrayMaxViolation { max: 4, count: 5 })
        ));
    }

    #[test]
    fn test_check_bounds_unbounded() {
        let rules = ArrayRules::new(0, 0, ValidationMode::empty());
        assert!(rules.check_bounds(0).is_ok());
        assert!(rules.check_bounds(u64::MAX).is_ok());

        let min_only = ArrayRules::new(3, 0, ValidationMode::empty());
        assert!(min_only.check_bounds(1_000_000).is_ok());
        assert!(min_only.check_bounds(2).is_err());
    }

    #[test]
    fn test_unique_validator_reports_both_indices() {
        let rules = ArrayRules::default();
        let mut v = rules.unique_validator();
        let err = run(&mut v, &[&[1, 2, 3], &[2, 3, 1], &[1, 2, 3]]).unwrap_err();
        assert_eq!(err, SeriError::UniquenessViolation { index: 2, first: 0 });
    }

    #[test]
    fn test_lexical_order_validator() {
        let rules = ArrayRules::default();
        let mut v = rules.lexical_order_validator();
        assert!(run(&mut v, &[&[1, 2, 3], &[2, 3, 1], &[3, 2, 1]]).is_ok());

        let mut v = rules.lexical_order_validator();
        let err = run(&mut v, &[&[2, 1, 1], &[1, 1, 2]]).unwrap_err();
        assert_eq!(err, SeriError::LexicalOrderViolation { prev: 0, index: 1 });
    }

    #[test]
    fn test_lexical_order_allows_equal_elements() {
        let rules = ArrayRules::default();
        let mut v = rules.lexical_order_validator();
        assert!(run(&mut v, &[&[1, 1], &[1, 1]]).is_ok());
    }

    #[test]
    fn test_fused_validator_reports_duplicate_not_order() {
        let rules = ArrayRules::default();
        let mut v = rules.lexical_order_without_dups_validator();
        let err = run(
            &mut v,
            &[&[1, 1, 1], &[1, 1, 2], &[1, 1, 3], &[1, 1, 3]],
        )
        .unwrap_err();
        assert_eq!(err, SeriError::UniquenessViolation { index: 3, first: 2 });
    }

    #[test]
    fn test_fused_validator_reports_order_violation() {
        let rules = ArrayRules::default();
        let mut v = rules.lexical_order_without_dups_validator();
        let err = run(&mut v, &[&[5, 0], &[4, 9]]).unwrap_err();
        assert_eq!(err, SeriError::LexicalOrderViolation { prev: 0, index: 1 });
    }

    #[test]
    fn test_compile_selects_fused_validator() {
        let rules = ArrayRules::new(
            0,
            0,
            ValidationMode::NO_DUPLICATES | ValidationMode::LEXICAL_ORDERING,
        );
        let mut compiled = rules.compile(TypeDenotationType::None);
        compiled.element(0, &[1, 1, 3]).unwrap();
        // A naive unique-then-order chain would call this an order
        // violation; the fused check must call it a duplicate.
        let err = compiled.element(1, &[1, 1, 3]).unwrap_err();
        assert_eq!(err, SeriError::UniquenessViolation { index: 1, first: 0 });
    }

    #[test]
    fn test_at_most_one_of_each_type() {
        let rules = ArrayRules::default();
        let mut v = rules.at_most_one_of_each_type_validator(TypeDenotationType::Byte);
        let err = run(&mut v, &[&[7, 0, 0], &[8, 1, 1], &[7, 2, 2]]).unwrap_err();
        assert_eq!(
            err,
            SeriError::TypeUniquenessViolation { index: 2, prefix: 7 }
        );
    }

    #[test]
    fn test_at_most_one_of_each_type_u32_prefix() {
        let rules = ArrayRules::default();
        let mut v = rules.at_most_one_of_each_type_validator(TypeDenotationType::Uint32);
        let a = [1u8, 0, 0, 0, 0xaa];
        let b = [2u8, 0, 0, 0, 0xbb];
        assert!(run(&mut v, &[&a, &b]).is_ok());
    }

    #[test]
    fn test_must_occur_wiring() {
        let rules = ArrayRules::new(0, 0, ValidationMode::empty())
            .with_must_occur([7u32, 9u32].into_iter().collect());

        let mut compiled = rules.compile(TypeDenotationType::Byte);
        compiled.element(0, &[7, 0]).unwrap();
        compiled.element(1, &[8, 0]).unwrap();
        let err = compiled.finish().unwrap_err();
        assert_eq!(err, SeriError::MustOccurViolation(9));

        let mut compiled = rules.compile(TypeDenotationType::Byte);
        compiled.element(0, &[9, 0]).unwrap();
        compiled.element(1, &[7, 0]).unwrap();
        assert!(compiled.finish().is_ok());
    }

    #[test]
    fn test_compile_for_gates_on_mode() {
        let rules = ArrayRules::new(
            0,
            0,
            ValidationMode::NO_DUPLICATES | ValidationMode::LEXICAL_ORDERING,
        );

        assert!(rules
            .compile_for(TypeDenotationType::None, DeserializationMode::empty())
            .is_none());

        // Validation without the lexical flag degrades to plain uniqueness:
        // out-of-order elements pass as long as they differ.
        let mut compiled = rules
            .compile_for(
                TypeDenotationType::None,
                DeserializationMode::PERFORM_VALIDATION,
            )
            .unwrap();
        compiled.element(0, &[2, 0]).unwrap();
        compiled.element(1, &[1, 0]).unwrap();
        let err = compiled.element(2, &[1, 0]).unwrap_err();
        assert_eq!(err, SeriError::UniquenessViolation { index: 2, first: 1 });

        let mut compiled = rules
            .compile_for(
                TypeDenotationType::None,
                DeserializationMode::PERFORM_VALIDATION
                    | DeserializationMode::PERFORM_LEXICAL_ORDERING,
            )
            .unwrap();
        compiled.element(0, &[2, 0]).unwrap();
        let err = compiled.element(1, &[1, 0]).unwrap_err();
        assert_eq!(err, SeriError::LexicalOrderViolation { prev: 0, index: 1 });
    }

    #[test]
    fn test_type_prefixes_is_subset() {
        let small: TypePrefixes = [1u32, 2].into_iter().collect();
        let big: TypePrefixes = [1u32, 2, 3].into_iter().collect();
        assert!(small.is_subset(&big));
        assert!(!big.is_subset(&small));
        assert!(TypePrefixes::new().is_subset(&small));
    }
}
