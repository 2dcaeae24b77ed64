//! # Archetypes
//!
//! An archetype is a precomputed composition used to create entities with a
//! fixed component set in one step. Creation from an archetype yields the
//! same composition id as creating an empty entity and adding the same
//! types one by one, without any per-entity bit arithmetic.

use std::fmt;

use super::bits::BitVector;
use super::component::{Component, ComponentKey};
use super::composition::CompositionId;
use super::world::World;

/// Blueprint for entities created with [`World::create_from`].
///
/// Archetypes hold type indices and a composition id of the world that
/// built them and must only be used with that world.
#[derive(Clone, PartialEq, Eq)]
pub struct Archetype {
    composition_id: CompositionId,
    /// Type indices, ascending.
    types: Vec<usize>,
    /// Types as listed by the builder, for deriving children.
    keys: Vec<ComponentKey>,
    name: String,
}

impl Archetype {
    /// Composition id of every entity created from this archetype.
    #[inline]
    #[must_use]
    pub const fn composition_id(&self) -> CompositionId {
        self.composition_id
    }

    /// Component type indices created for each entity, ascending.
    #[must_use]
    pub fn types(&self) -> &[usize] {
        &self.types
    }

    /// Component types of this archetype.
    #[must_use]
    pub fn keys(&self) -> &[ComponentKey] {
        &self.keys
    }

    /// Archetype name. Defaults to the composition id.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Archetype({} {:?} {})", self.name, self.keys, self.composition_id)
    }
}

/// Collects component types for an [`Archetype`].
///
/// # Example
///
/// ```rust
/// use ember_ecs::{ArchetypeBuilder, Component, World};
///
/// #[derive(Default)]
/// struct Position(f32, f32);
/// impl Component for Position {}
/// #[derive(Default)]
/// struct Sprite(u32);
/// impl Component for Sprite {}
/// #[derive(Default)]
/// struct Enemy;
/// impl Component for Enemy {}
///
/// let mut world = World::default();
/// let visible = ArchetypeBuilder::new()
///     .add::<Position>()
///     .add::<Sprite>()
///     .build(&mut world, Some("visible"));
/// let enemy = ArchetypeBuilder::from_parent(&visible)
///     .add::<Enemy>()
///     .build(&mut world, None);
///
/// let e = world.create_from(&enemy);
/// assert!(world.mapper::<Enemy>().is_some_and(|m| m.has(e)));
/// assert_eq!(enemy.name(), enemy.composition_id().raw().to_string());
/// ```
#[derive(Clone, Default)]
pub struct ArchetypeBuilder {
    keys: Vec<ComponentKey>,
}

impl ArchetypeBuilder {
    /// Creates a builder with no component types.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder starting from the types of `parent`.
    #[must_use]
    pub fn from_parent(parent: &Archetype) -> Self {
        Self {
            keys: parent.keys.clone(),
        }
    }

    /// Includes component `C`.
    #[must_use]
    pub fn add<C: Component>(mut self) -> Self {
        let key = ComponentKey::of::<C>();
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
        self
    }

    /// Drops component `C`, typically one inherited from a parent.
    #[must_use]
    pub fn remove<C: Component>(mut self) -> Self {
        let key = ComponentKey::of::<C>();
        self.keys.retain(|k| *k != key);
        self
    }

    /// Registers the types in `world` and resolves the composition.
    ///
    /// # Arguments
    ///
    /// * `world` - World the archetype will be used with
    /// * `name` - Archetype name; the composition id when `None`
    pub fn build(&self, world: &mut World, name: Option<&str>) -> Archetype {
        let bits: BitVector = self
            .keys
            .iter()
            .map(|&key| world.components.register_key(key).index())
            .collect();
        let composition_id = world
            .components
            .composition_identity(&bits, &mut world.subscriptions);

        Archetype {
            composition_id,
            types: bits.iter().collect(),
            keys: self.keys.clone(),
            name: name.map_or_else(|| composition_id.raw().to_string(), str::to_owned),
        }
    }
}

impl fmt::Debug for ArchetypeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArchetypeBuilder{:?}", self.keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Position(i32);
    impl Component for Position {}

    #[derive(Debug, Default, PartialEq)]
    struct Velocity(i32);
    impl Component for Velocity {}

    #[test]
    fn test_same_types_same_composition() {
        let mut world = World::default();
        let a = ArchetypeBuilder::new()
            .add::<Position>()
            .add::<Velocity>()
            .build(&mut world, None);
        let b = ArchetypeBuilder::new()
            .add::<Velocity>()
            .add::<Position>()
            .add::<Position>()
            .build(&mut world, Some("mover"));

        assert_eq!(a.composition_id(), b.composition_id());
        assert_eq!(a.types().len(), 2);
        assert_eq!(b.name(), "mover");
    }

    #[test]
    fn test_parent_remove() {
        let mut world = World::default();
        let parent = ArchetypeBuilder::new()
            .add::<Position>()
            .add::<Velocity>()
            .build(&mut world, None);
        let still = ArchetypeBuilder::from_parent(&parent)
            .remove::<Velocity>()
            .build(&mut world, None);
        let only_position = ArchetypeBuilder::new().add::<Position>().build(&mut world, None);

        assert_eq!(still.composition_id(), only_position.composition_id());
    }

    #[test]
    fn test_create_from_defaults_components() {
        let mut world = World::default();
        let archetype = ArchetypeBuilder::new().add::<Position>().build(&mut world, None);
        let e = world.create_from(&archetype);

        assert_eq!(world.mapper::<Position>().unwrap().get(e), Some(&Position(0)));
        assert_eq!(world.composition_id(e).unwrap(), archetype.composition_id());
    }
}
