//! # Composition Identities
//!
//! Every distinct set of component types gets a small canonical id the first
//! time it is observed. The table is append-only: an id is never reassigned,
//! so two entities with identical components always share an id and an id
//! always denotes the same bit pattern.

use std::collections::HashMap;
use std::fmt;

use super::bits::BitVector;

/// Canonical id of a component composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CompositionId(u32);

impl CompositionId {
    /// The composition with no components. Always registered.
    pub const EMPTY: Self = Self(0);

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the id as an index into per-composition tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for CompositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "composition:{}", self.0)
    }
}

/// Append-only table of compositions.
///
/// Besides the bit pattern, each entry caches the component type indices it
/// contains so that bulk removal does not re-scan the bits.
#[derive(Debug)]
pub struct CompositionResolver {
    /// Bit pattern per id.
    bits: Vec<BitVector>,
    /// Set type indices per id, ascending.
    types: Vec<Vec<usize>>,
    /// Reverse lookup.
    ids: HashMap<BitVector, CompositionId>,
}

impl CompositionResolver {
    /// Creates a table holding only [`CompositionId::EMPTY`].
    #[must_use]
    pub fn new() -> Self {
        let mut ids = HashMap::new();
        ids.insert(BitVector::new(), CompositionId::EMPTY);

        Self {
            bits: vec![BitVector::new()],
            types: vec![Vec::new()],
            ids,
        }
    }

    /// Looks up the id of a bit pattern without allocating one.
    #[must_use]
    pub fn get(&self, bits: &BitVector) -> Option<CompositionId> {
        self.ids.get(bits).copied()
    }

    /// Records a new bit pattern and returns its id.
    ///
    /// Callers check [`CompositionResolver::get`] first; allocating a pattern
    /// twice would break the bijection.
    pub(crate) fn allocate(&mut self, bits: &BitVector) -> CompositionId {
        debug_assert!(self.get(bits).is_none(), "composition allocated twice");

        let id = CompositionId::from_index(self.bits.len());
        self.bits.push(bits.clone());
        self.types.push(bits.iter().collect());
        self.ids.insert(bits.clone(), id);
        id
    }

    /// Bit pattern of a composition.
    #[must_use]
    pub fn bits(&self, id: CompositionId) -> Option<&BitVector> {
        self.bits.get(id.index())
    }

    /// Type indices of a composition, ascending.
    #[must_use]
    pub fn types(&self, id: CompositionId) -> Option<&[usize]> {
        self.types.get(id.index()).map(Vec::as_slice)
    }

    /// Iterates over every `(id, bits)` in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (CompositionId, &BitVector)> + '_ {
        self.bits
            .iter()
            .enumerate()
            .map(|(index, bits)| (CompositionId::from_index(index), bits))
    }

    /// Number of distinct compositions observed, including the empty one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Always `false`; the empty composition is pre-registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

impl Default for CompositionResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_preregistered() {
        let resolver = CompositionResolver::new();
        assert_eq!(resolver.get(&BitVector::new()), Some(CompositionId::EMPTY));
        assert_eq!(resolver.len(), 1);
        assert!(!resolver.is_empty());
    }

    #[test]
    fn test_allocate_is_append_only() {
        let mut resolver = CompositionResolver::new();
        let ab = BitVector::from_indices([0, 1]);
        let b = BitVector::from_indices([1]);

        let first = resolver.allocate(&ab);
        let second = resolver.allocate(&b);

        assert_eq!(first.raw(), 1);
        assert_eq!(second.raw(), 2);
        assert_eq!(resolver.bits(first), Some(&ab));
        assert_eq!(resolver.types(first), Some(&[0, 1][..]));
        assert_eq!(resolver.get(&BitVector::from_indices([1, 0])), Some(first));
    }

    #[test]
    fn test_lookup_ignores_capacity() {
        let mut resolver = CompositionResolver::new();
        let id = resolver.allocate(&BitVector::from_indices([2]));

        let mut wide = BitVector::with_capacity(512);
        wide.set(2);
        assert_eq!(resolver.get(&wide), Some(id));
    }
}
