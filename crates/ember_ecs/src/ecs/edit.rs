//! # Entity Edits
//!
//! Component add/remove on a single entity. Values land in the mappers at
//! once; the entity's composition id and subscription membership follow at
//! the next flush.

use super::component::Component;
use super::entity::EntityId;
use super::world::World;

/// Open edit of one entity, obtained from [`World::edit`].
///
/// Editing the same entity several times in a round continues the same
/// pending change set.
///
/// # Example
///
/// ```rust
/// use ember_ecs::{Component, World};
///
/// #[derive(Default)]
/// struct Position(f32, f32);
/// impl Component for Position {}
///
/// #[derive(Default)]
/// struct Sleeping;
/// impl Component for Sleeping {}
///
/// let mut world = World::default();
/// let e = world.create();
/// world.edit(e)?.add(Position(1.0, 0.0)).add(Sleeping);
///
/// let mut edit = world.edit(e)?;
/// edit.remove::<Sleeping>();
/// edit.create::<Position>().1 = 4.0;
/// assert!(!edit.has::<Sleeping>());
/// # Ok::<(), ember_ecs::EcsError>(())
/// ```
pub struct EntityEdit<'w> {
    world: &'w mut World,
    entity: EntityId,
    slot: usize,
}

impl<'w> EntityEdit<'w> {
    pub(crate) fn new(world: &'w mut World, entity: EntityId, slot: usize) -> Self {
        Self {
            world,
            entity,
            slot,
        }
    }

    /// The entity being edited.
    #[inline]
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Stores `component`, replacing any instance of the same type.
    pub fn add<C: Component>(&mut self, component: C) -> &mut Self {
        let world = &mut *self.world;
        let mapper = world.components.mapper_entry::<C>();
        let index = mapper.component_type().index();
        mapper.insert(self.entity, component);
        world.batch.edit_bits_mut(self.slot).set(index);
        self
    }

    /// Returns the entity's `C`, creating a default one if it has none.
    pub fn create<C: Component>(&mut self) -> &mut C {
        let world = &mut *self.world;
        let index = world.components.register::<C>().index();
        world.batch.edit_bits_mut(self.slot).set(index);
        world.components.mapper_entry::<C>().create(self.entity)
    }

    /// Removes the entity's `C`, if any.
    ///
    /// Delayed-removal types stay readable until the round settles.
    pub fn remove<C: Component>(&mut self) -> &mut Self {
        let world = &mut *self.world;
        if let Some(ty) = world.components.component_type::<C>() {
            world
                .components
                .remove_component(self.entity, ty.index(), world.batch.purgatories_mut());
            world.batch.edit_bits_mut(self.slot).unset(ty.index());
        }
        self
    }

    /// Checks whether the entity currently holds `C`.
    #[must_use]
    pub fn has<C: Component>(&self) -> bool {
        self.world
            .components
            .component_type::<C>()
            .is_some_and(|ty| self.world.components.has_component(self.entity, ty.index()))
    }

    /// Marks the entity for deletion. Further edits are still applied to
    /// storage but never make it visible to subscriptions again.
    pub fn delete_entity(&mut self) -> &mut Self {
        self.world.batch.delete(self.entity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::composition::CompositionId;

    #[derive(Debug, Default, PartialEq)]
    struct Position(i32);
    impl Component for Position {}

    #[derive(Debug, Default, PartialEq)]
    struct Tag;
    impl Component for Tag {}

    #[test]
    fn test_add_is_visible_before_flush() {
        let mut world = World::default();
        let e = world.create();
        world.edit(e).unwrap().add(Position(3));

        assert_eq!(world.mapper::<Position>().unwrap().get(e), Some(&Position(3)));
        // Composition catches up at the flush
        assert_eq!(world.composition_id(e).unwrap(), CompositionId::EMPTY);
        world.update().unwrap();
        assert_ne!(world.composition_id(e).unwrap(), CompositionId::EMPTY);
    }

    #[test]
    fn test_create_keeps_existing() {
        let mut world = World::default();
        let e = world.create();
        let mut edit = world.edit(e).unwrap();
        edit.add(Position(9));
        assert_eq!(edit.create::<Position>(), &mut Position(9));
    }

    #[test]
    fn test_add_then_remove_in_one_round() {
        let mut world = World::default();
        let e = world.create();
        world.edit(e).unwrap().add(Tag).add(Position(1));
        world.edit(e).unwrap().remove::<Tag>();
        world.update().unwrap();

        let bits = world.composition_bits(world.composition_id(e).unwrap()).unwrap();
        assert_eq!(bits.cardinality(), 1);
        assert!(!world.edit(e).unwrap().has::<Tag>());
    }

    #[test]
    fn test_remove_unregistered_is_noop() {
        let mut world = World::default();
        let e = world.create();
        world.edit(e).unwrap().remove::<Tag>();
        world.update().unwrap();
        assert_eq!(world.composition_id(e).unwrap(), CompositionId::EMPTY);
    }
}
