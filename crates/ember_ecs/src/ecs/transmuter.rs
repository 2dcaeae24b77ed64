//! # Entity Transmuters
//!
//! A transmuter applies a fixed add/remove set of component types to
//! entities, skipping per-call bit arithmetic.
//!
//! The outcome only depends on the entity's composition before the call, so
//! it is computed once per origin composition and cached:
//!
//! ```text
//! target    = (origin | add) & !remove
//! additions = add & !remove & !origin
//! removals  = remove & origin
//! ```
//!
//! A type in both sets is removed, never created.

use super::aspect::AspectBuilder;
use super::bits::BitVector;
use super::component::{Component, ComponentKey};
use super::composition::CompositionId;
use super::entity::EntityId;
use super::world::World;
use crate::error::{EcsError, EcsResult};

/// Precomputed transition from one composition to another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransmuteOperation {
    /// Composition after the transition.
    pub composition_id: CompositionId,
    /// Type indices created with default values.
    pub additions: Vec<usize>,
    /// Type indices removed.
    pub removals: Vec<usize>,
}

/// Collects the add and remove sets of an [`EntityTransmuter`].
///
/// # Example
///
/// ```rust
/// use ember_ecs::{Component, EntityTransmuterFactory, World};
///
/// #[derive(Default)]
/// struct Alive;
/// impl Component for Alive {}
/// #[derive(Default)]
/// struct Dead;
/// impl Component for Dead {}
///
/// let mut world = World::default();
/// let mut kill = EntityTransmuterFactory::new()
///     .add::<Dead>()
///     .remove::<Alive>()
///     .build(&mut world);
///
/// let e = world.create();
/// world.edit(e)?.add(Alive);
/// kill.transmute(&mut world, e)?;
///
/// assert!(world.mapper::<Dead>().is_some_and(|m| m.has(e)));
/// assert!(!world.mapper::<Alive>().is_some_and(|m| m.has(e)));
/// # Ok::<(), ember_ecs::EcsError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct EntityTransmuterFactory {
    additions: Vec<ComponentKey>,
    removals: Vec<ComponentKey>,
}

impl EntityTransmuterFactory {
    /// Creates a factory with empty sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `C` on transmuted entities that lack it.
    #[must_use]
    pub fn add<C: Component>(mut self) -> Self {
        self.additions.push(ComponentKey::of::<C>());
        self
    }

    /// Removes `C` from transmuted entities.
    #[must_use]
    pub fn remove<C: Component>(mut self) -> Self {
        self.removals.push(ComponentKey::of::<C>());
        self
    }

    /// Registers the listed types in `world` and builds the transmuter.
    pub fn build(&self, world: &mut World) -> EntityTransmuter {
        EntityTransmuter::from_keys(world, &self.additions, &self.removals)
    }
}

/// Applies a fixed structural change to entities.
///
/// Transmuters hold type indices and composition ids of the world that
/// built them and must only be used with that world.
#[derive(Clone, Debug)]
pub struct EntityTransmuter {
    additions: BitVector,
    removals: BitVector,
    /// Cached operation per origin composition id.
    operations: Vec<Option<TransmuteOperation>>,
}

impl EntityTransmuter {
    /// Builds a transmuter that adds the aspect's `all` types and removes
    /// its `exclude` types, leaving the result matching the aspect.
    pub fn from_aspect(world: &mut World, aspect: &AspectBuilder) -> Self {
        Self::from_keys(world, aspect.all_types(), aspect.exclude_types())
    }

    fn from_keys(world: &mut World, additions: &[ComponentKey], removals: &[ComponentKey]) -> Self {
        let mut resolve = |keys: &[ComponentKey]| -> BitVector {
            keys.iter()
                .map(|&key| world.components.register_key(key).index())
                .collect()
        };

        Self {
            additions: resolve(additions),
            removals: resolve(removals),
            operations: Vec::new(),
        }
    }

    /// Type indices this transmuter creates.
    #[must_use]
    pub fn additions(&self) -> &BitVector {
        &self.additions
    }

    /// Type indices this transmuter removes.
    #[must_use]
    pub fn removals(&self) -> &BitVector {
        &self.removals
    }

    /// Cached operation for an origin composition, if computed already.
    #[must_use]
    pub fn operation(&self, origin: CompositionId) -> Option<&TransmuteOperation> {
        self.operations.get(origin.index())?.as_ref()
    }

    /// Applies the change to `entity` and marks it changed.
    ///
    /// An open edit of the entity is committed first. Entities pending
    /// deletion are left untouched.
    ///
    /// # Errors
    ///
    /// [`EcsError::InactiveEntity`] if `entity` is not active.
    pub fn transmute(&mut self, world: &mut World, entity: EntityId) -> EcsResult<()> {
        if !world.entities.is_active(entity) {
            return Err(EcsError::InactiveEntity {
                entity,
                operation: "transmute",
            });
        }
        if world.batch.is_deleted(entity) {
            return Ok(());
        }

        world
            .batch
            .commit_edit(entity, &mut world.components, &mut world.subscriptions);

        let origin = world.components.identity(entity);
        let index = origin.index();
        if index >= self.operations.len() {
            self.operations.resize(index + 1, None);
        }

        let operation = match self.operations[index].take() {
            Some(operation) => operation,
            None => self.compute(world, origin)?,
        };

        for &removal in &operation.removals {
            world
                .components
                .remove_component(entity, removal, world.batch.purgatories_mut());
        }
        for &addition in &operation.additions {
            world.components.create_component(entity, addition);
        }
        world.components.set_identity(entity, operation.composition_id);
        world.batch.mark_changed(entity);

        self.operations[index] = Some(operation);
        Ok(())
    }

    fn compute(&self, world: &mut World, origin: CompositionId) -> EcsResult<TransmuteOperation> {
        let origin_bits = world.components.composition_bits(origin)?.clone();

        let mut target = origin_bits.clone();
        target.or(&self.additions);
        target.and_not(&self.removals);

        let mut additions = self.additions.clone();
        additions.and_not(&self.removals);
        additions.and_not(&origin_bits);

        let mut removals = self.removals.clone();
        removals.and(&origin_bits);

        let composition_id = world
            .components
            .composition_identity(&target, &mut world.subscriptions);
        tracing::trace!("transmute {} -> {}", origin, composition_id);

        Ok(TransmuteOperation {
            composition_id,
            additions: additions.iter().collect(),
            removals: removals.iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::aspect::Aspect;

    #[derive(Debug, Default, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    #[derive(Debug, Default, PartialEq)]
    struct Poisoned;
    impl Component for Poisoned {}

    #[derive(Debug, Default, PartialEq)]
    struct Shielded;
    impl Component for Shielded {}

    #[test]
    fn test_keeps_existing_values() {
        let mut world = World::default();
        let mut heal = EntityTransmuterFactory::new()
            .add::<Health>()
            .remove::<Poisoned>()
            .build(&mut world);

        let e = world.create();
        world.edit(e).unwrap().add(Health(40)).add(Poisoned);
        heal.transmute(&mut world, e).unwrap();

        assert_eq!(world.mapper::<Health>().unwrap().get(e), Some(&Health(40)));
        assert!(!world.mapper::<Poisoned>().unwrap().has(e));
    }

    #[test]
    fn test_matches_edit_path() {
        let mut world = World::default();
        let mut t = EntityTransmuterFactory::new()
            .add::<Health>()
            .add::<Shielded>()
            .build(&mut world);

        let a = world.create();
        let b = world.create();
        t.transmute(&mut world, a).unwrap();
        world.edit(b).unwrap().add(Shielded).add(Health(1));
        world.update().unwrap();

        assert_eq!(world.composition_id(a), world.composition_id(b));
    }

    #[test]
    fn test_operation_cached_per_origin() {
        let mut world = World::default();
        let mut t = EntityTransmuterFactory::new().add::<Health>().build(&mut world);

        let a = world.create();
        let b = world.create();
        t.transmute(&mut world, a).unwrap();
        t.transmute(&mut world, b).unwrap();

        let op = t.operation(CompositionId::EMPTY).unwrap();
        assert_eq!(op.additions.len(), 1);
        assert!(op.removals.is_empty());
        assert_eq!(world.composition_id(b).unwrap(), op.composition_id);
    }

    #[test]
    fn test_remove_wins_over_add() {
        let mut world = World::default();
        let mut t = EntityTransmuterFactory::new()
            .add::<Shielded>()
            .remove::<Shielded>()
            .build(&mut world);

        let e = world.create();
        t.transmute(&mut world, e).unwrap();
        assert!(!world.mapper::<Shielded>().unwrap().has(e));
        assert_eq!(world.composition_id(e).unwrap(), CompositionId::EMPTY);
    }

    #[test]
    fn test_deleted_is_noop_and_inactive_errors() {
        let mut world = World::default();
        let mut t = EntityTransmuterFactory::new().add::<Health>().build(&mut world);

        let e = world.create();
        world.delete(e).unwrap();
        t.transmute(&mut world, e).unwrap();
        assert!(!world.mapper::<Health>().unwrap().has(e));

        world.process().unwrap();
        assert!(matches!(
            t.transmute(&mut world, e),
            Err(EcsError::InactiveEntity { operation: "transmute", .. })
        ));
    }

    #[test]
    fn test_pending_edit_committed_first() {
        let mut world = World::default();
        let mut t = EntityTransmuter::from_aspect(
            &mut world,
            &Aspect::all::<Health>().exclude::<Poisoned>(),
        );

        let e = world.create();
        world.edit(e).unwrap().add(Poisoned).add(Shielded);
        t.transmute(&mut world, e).unwrap();
        world.update().unwrap();

        let bits = world.composition_bits(world.composition_id(e).unwrap()).unwrap();
        let shielded = world.components().component_type::<Shielded>().unwrap();
        let health = world.components().component_type::<Health>().unwrap();
        assert!(bits.get(shielded.index()));
        assert!(bits.get(health.index()));
        assert_eq!(bits.cardinality(), 2);
    }
}
