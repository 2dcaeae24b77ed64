//! # Component Storage
//!
//! One [`Mapper`] per component type: a dense array of instances indexed by
//! entity id plus a presence bit per entity.
//!
//! The storage uses a dense array strategy:
//! - Slots are default-initialized as the live id range grows
//! - Access is O(1) via entity index
//! - Removal resets the slot instead of freeing it

use std::any::Any;

use super::bits::BitVector;
use super::component::{Component, ComponentType};
use super::entity::EntityId;
use crate::error::{EcsError, EcsResult};

/// Outcome of removing a component from a mapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Removal {
    /// The entity had no such component.
    Absent,
    /// The slot was reset on the spot.
    Immediate,
    /// The value stays readable until the next purge.
    Delayed,
}

/// Dense storage for a single component type.
///
/// Structural changes (create/insert/remove) go through
/// [`EntityEdit`](super::edit::EntityEdit), transmuters and archetypes so that
/// an entity's composition id never drifts from what its mappers hold. The
/// public surface is value access only.
///
/// # Example
///
/// ```rust
/// use ember_ecs::{Component, World};
///
/// #[derive(Default, Debug, PartialEq)]
/// struct Speed(f32);
/// impl Component for Speed {}
///
/// let mut world = World::default();
/// let e = world.create();
/// world.edit(e)?.add(Speed(2.0));
///
/// let speeds = world.mapper::<Speed>().expect("registered by the edit");
/// assert_eq!(speeds.get(e), Some(&Speed(2.0)));
/// # Ok::<(), ember_ecs::EcsError>(())
/// ```
pub struct Mapper<C: Component> {
    /// Type identity backing this mapper.
    component_type: ComponentType,
    /// The dense array of components.
    data: Vec<C>,
    /// Entities that currently hold this component.
    present: BitVector,
    /// Delayed removals awaiting purge. Values stay readable until then.
    purgatory: BitVector,
}

impl<C: Component> Mapper<C> {
    pub(crate) fn new(component_type: ComponentType, capacity: usize) -> Self {
        let mut data = Vec::with_capacity(capacity);
        data.resize_with(capacity, C::default);

        Self {
            component_type,
            data,
            present: BitVector::with_capacity(capacity),
            purgatory: BitVector::new(),
        }
    }

    /// Returns the type identity of this mapper.
    #[inline]
    #[must_use]
    pub const fn component_type(&self) -> ComponentType {
        self.component_type
    }

    /// Checks if the entity holds this component.
    ///
    /// Always `false` once removed, even while a delayed-removal value is
    /// still readable through [`Mapper::get`].
    #[inline]
    #[must_use]
    pub fn has(&self, entity: EntityId) -> bool {
        self.present.get(entity.index())
    }

    /// Gets the component of an entity.
    ///
    /// # Returns
    ///
    /// The component if present, or if this is a delayed-removal type whose
    /// removal has not been purged yet. `None` otherwise.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&C> {
        let index = entity.index();
        if self.present.get(index) || self.purgatory.get(index) {
            self.data.get(index)
        } else {
            None
        }
    }

    /// Gets the component of an entity, reporting an unsafe read as an error.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnsafeComponentAccess`] if [`Mapper::get`] would return
    /// `None`.
    pub fn try_get(&self, entity: EntityId) -> EcsResult<&C> {
        self.get(entity).ok_or(EcsError::UnsafeComponentAccess {
            entity,
            component: self.component_type.name(),
        })
    }

    /// Gets a mutable component of an entity that currently holds it.
    #[inline]
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut C> {
        let index = entity.index();
        if self.present.get(index) {
            self.data.get_mut(index)
        } else {
            None
        }
    }

    /// Number of entities holding this component.
    #[must_use]
    pub fn len(&self) -> usize {
        self.present.cardinality()
    }

    /// Checks if no entity holds this component.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Iterates over `(entity, component)` for every holder, by ascending id.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &C)> + '_ {
        self.present
            .iter()
            .map(move |index| (EntityId::from_index(index), &self.data[index]))
    }

    /// Stores `component`, replacing any existing instance.
    pub(crate) fn insert(&mut self, entity: EntityId, component: C) {
        let index = self.slot(entity);
        self.data[index] = component;
        self.present.set(index);
        self.purgatory.unset(index);
    }

    /// Ensures the entity holds a component, creating a default one if not.
    ///
    /// A pending delayed removal is cancelled and replaced by a fresh
    /// instance.
    pub(crate) fn create(&mut self, entity: EntityId) -> &mut C {
        let index = self.slot(entity);
        if !self.present.get(index) {
            self.data[index] = C::default();
            self.present.set(index);
            self.purgatory.unset(index);
        }
        &mut self.data[index]
    }

    /// Grows the dense array to cover `entity` and returns its index.
    fn slot(&mut self, entity: EntityId) -> usize {
        let index = entity.index();
        if index >= self.data.len() {
            self.data.resize_with(index + 1, C::default);
        }
        index
    }
}

/// Type-erased view of a [`Mapper`], used for operations driven by
/// composition bits rather than by a static type.
pub(crate) trait ComponentStore: Any {
    fn has(&self, entity: EntityId) -> bool;

    /// Creates a default instance if the entity has none.
    fn create_default(&mut self, entity: EntityId);

    fn remove(&mut self, entity: EntityId) -> Removal;

    /// Resets every slot parked by a delayed removal.
    fn purge(&mut self);

    fn ensure_capacity(&mut self, capacity: usize);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ComponentStore for Mapper<C> {
    fn has(&self, entity: EntityId) -> bool {
        Mapper::has(self, entity)
    }

    fn create_default(&mut self, entity: EntityId) {
        self.create(entity);
    }

    fn remove(&mut self, entity: EntityId) -> Removal {
        let index = entity.index();
        if !self.present.get(index) {
            return Removal::Absent;
        }

        self.present.unset(index);
        if self.component_type.is_delayed_removal() {
            self.purgatory.set(index);
            Removal::Delayed
        } else {
            self.data[index] = C::default();
            Removal::Immediate
        }
    }

    fn purge(&mut self) {
        for index in self.purgatory.iter() {
            if !self.present.get(index) {
                self.data[index] = C::default();
            }
        }
        self.purgatory.clear();
    }

    fn ensure_capacity(&mut self, capacity: usize) {
        if capacity > self.data.len() {
            self.data.resize_with(capacity, C::default);
        }
        self.present.ensure_capacity(capacity);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
