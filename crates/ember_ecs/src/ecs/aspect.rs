//! # Aspects
//!
//! An aspect is an immutable predicate over a composition's bits:
//!
//! ```text
//! all     every bit must be set
//! one     at least one bit must be set (ignored when empty)
//! exclude no bit may be set
//! ```
//!
//! Matching is pure bit testing with no per-entity state.

use std::fmt;

use super::bits::BitVector;
use super::component::{Component, ComponentKey};
use super::component_manager::ComponentManager;

/// Compiled predicate over component compositions.
///
/// Two aspects built from the same types compare equal, whatever order the
/// builder listed them in. A world keeps one subscription per distinct
/// aspect.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Aspect {
    all: BitVector,
    one: BitVector,
    exclude: BitVector,
}

impl Aspect {
    /// Starts a builder matching every entity.
    #[must_use]
    pub fn builder() -> AspectBuilder {
        AspectBuilder::new()
    }

    /// Starts a builder requiring component `C`.
    #[must_use]
    pub fn all<C: Component>() -> AspectBuilder {
        AspectBuilder::new().all::<C>()
    }

    /// Starts a builder requiring at least component `C` among the `one` set.
    #[must_use]
    pub fn one<C: Component>() -> AspectBuilder {
        AspectBuilder::new().one::<C>()
    }

    /// Starts a builder rejecting component `C`.
    #[must_use]
    pub fn exclude<C: Component>() -> AspectBuilder {
        AspectBuilder::new().exclude::<C>()
    }

    /// Creates an aspect directly from bit sets.
    #[must_use]
    pub fn from_bits(all: BitVector, one: BitVector, exclude: BitVector) -> Self {
        Self { all, one, exclude }
    }

    /// Checks whether a composition satisfies this aspect.
    #[must_use]
    pub fn is_interested(&self, composition: &BitVector) -> bool {
        if !composition.contains_all(&self.all) {
            return false;
        }

        if self.exclude.intersects(composition) {
            return false;
        }

        self.one.is_empty() || self.one.intersects(composition)
    }

    /// Types that must all be present.
    #[must_use]
    pub fn all_set(&self) -> &BitVector {
        &self.all
    }

    /// Types of which at least one must be present.
    #[must_use]
    pub fn one_set(&self) -> &BitVector {
        &self.one
    }

    /// Types that must be absent.
    #[must_use]
    pub fn exclusion_set(&self) -> &BitVector {
        &self.exclude
    }
}

/// Collects component types for an [`Aspect`] before they are registered.
///
/// # Example
///
/// ```rust
/// use ember_ecs::{Aspect, Component, World};
///
/// #[derive(Default)]
/// struct Position;
/// impl Component for Position {}
/// #[derive(Default)]
/// struct Velocity;
/// impl Component for Velocity {}
/// #[derive(Default)]
/// struct Frozen;
/// impl Component for Frozen {}
///
/// let mut world = World::default();
/// let moving = world.subscribe(
///     Aspect::all::<Position>().all::<Velocity>().exclude::<Frozen>(),
/// );
/// assert!(world.subscription(moving)?.is_empty());
/// # Ok::<(), ember_ecs::EcsError>(())
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AspectBuilder {
    all: Vec<ComponentKey>,
    one: Vec<ComponentKey>,
    exclude: Vec<ComponentKey>,
}

impl AspectBuilder {
    /// Creates a builder matching every entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires component `C`.
    #[must_use]
    pub fn all<C: Component>(mut self) -> Self {
        push_unique(&mut self.all, ComponentKey::of::<C>());
        self
    }

    /// Adds `C` to the set of which at least one must be present.
    #[must_use]
    pub fn one<C: Component>(mut self) -> Self {
        push_unique(&mut self.one, ComponentKey::of::<C>());
        self
    }

    /// Rejects entities holding component `C`.
    #[must_use]
    pub fn exclude<C: Component>(mut self) -> Self {
        push_unique(&mut self.exclude, ComponentKey::of::<C>());
        self
    }

    /// Registers every listed type and compiles the aspect.
    pub fn build(&self, components: &mut ComponentManager) -> Aspect {
        let mut resolve = |keys: &[ComponentKey]| -> BitVector {
            keys.iter()
                .map(|&key| components.register_key(key).index())
                .collect()
        };

        Aspect {
            all: resolve(&self.all),
            one: resolve(&self.one),
            exclude: resolve(&self.exclude),
        }
    }

    /// Types that must all be present.
    #[must_use]
    pub fn all_types(&self) -> &[ComponentKey] {
        &self.all
    }

    /// Types of which at least one must be present.
    #[must_use]
    pub fn one_types(&self) -> &[ComponentKey] {
        &self.one
    }

    /// Types that must be absent.
    #[must_use]
    pub fn exclude_types(&self) -> &[ComponentKey] {
        &self.exclude
    }
}

fn push_unique(keys: &mut Vec<ComponentKey>, key: ComponentKey) {
    if !keys.contains(&key) {
        keys.push(key);
    }
}

impl fmt::Debug for AspectBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Aspect(all={:?} one={:?} exclude={:?})",
            self.all, self.one, self.exclude
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(indices: &[usize]) -> BitVector {
        indices.iter().copied().collect()
    }

    #[test]
    fn test_empty_aspect_matches_everything() {
        let aspect = Aspect::default();
        assert!(aspect.is_interested(&BitVector::new()));
        assert!(aspect.is_interested(&bits(&[4, 9])));
    }

    #[test]
    fn test_all_requires_every_bit() {
        let aspect = Aspect::from_bits(bits(&[0, 1]), BitVector::new(), BitVector::new());
        assert!(aspect.is_interested(&bits(&[0, 1, 2])));
        assert!(!aspect.is_interested(&bits(&[0])));
        assert!(!aspect.is_interested(&BitVector::new()));
    }

    #[test]
    fn test_one_requires_any_bit() {
        let aspect = Aspect::from_bits(BitVector::new(), bits(&[2, 3]), BitVector::new());
        assert!(aspect.is_interested(&bits(&[3])));
        assert!(!aspect.is_interested(&bits(&[0, 1])));
    }

    #[test]
    fn test_exclude_rejects_any_bit() {
        let aspect = Aspect::from_bits(bits(&[0]), BitVector::new(), bits(&[5]));
        assert!(aspect.is_interested(&bits(&[0, 4])));
        assert!(!aspect.is_interested(&bits(&[0, 5])));
    }

    #[test]
    fn test_builder_dedups_and_ignores_order() {
        #[derive(Default)]
        struct A;
        impl Component for A {}
        #[derive(Default)]
        struct B;
        impl Component for B {}

        let mut cm = ComponentManager::new(16, false);
        let ab = Aspect::all::<A>().all::<B>().all::<A>().build(&mut cm);
        let ba = Aspect::all::<B>().all::<A>().build(&mut cm);

        assert_eq!(ab, ba);
        assert_eq!(ab.all_set().cardinality(), 2);
        assert_eq!(Aspect::all::<A>().all::<A>().all_types().len(), 1);
    }
}
