//! # Component Manager
//!
//! Owns every [`Mapper`], the component type registry, the composition
//! identity table and the per-entity composition id.
//!
//! Per entity, the composition id is the single source of truth for which
//! component types it holds. It is only rewritten at commit points: when
//! an edit is flushed, by a transmuter, or at archetype creation.

use std::any::TypeId;
use std::fmt;

use super::bits::BitVector;
use super::component::{Component, ComponentKey, ComponentType, ComponentTypeFactory};
use super::composition::{CompositionId, CompositionResolver};
use super::entity::EntityId;
use super::storage::{ComponentStore, Mapper, Removal};
use super::subscription::AspectSubscriptionManager;
use crate::error::{EcsError, EcsResult};

/// Component storage and composition bookkeeping for one world.
pub struct ComponentManager {
    /// Dense type indices.
    factory: ComponentTypeFactory,
    /// One mapper per type, at the type's index.
    stores: Vec<Box<dyn ComponentStore>>,
    /// Bit pattern to composition id table.
    resolver: CompositionResolver,
    /// Composition id per entity.
    identities: Vec<CompositionId>,
    /// Initial slot count for new mappers.
    capacity: usize,
    /// Forces delayed removal for every type.
    always_delay_removal: bool,
}

impl ComponentManager {
    /// Creates an empty manager.
    ///
    /// # Arguments
    ///
    /// * `expected_entity_count` - Initial size of every mapper
    /// * `always_delay_removal` - Treat every type as delayed-removal
    #[must_use]
    pub fn new(expected_entity_count: usize, always_delay_removal: bool) -> Self {
        Self {
            factory: ComponentTypeFactory::new(),
            stores: Vec::new(),
            resolver: CompositionResolver::new(),
            identities: Vec::with_capacity(expected_entity_count),
            capacity: expected_entity_count,
            always_delay_removal,
        }
    }

    /// Registers component type `C`, creating its mapper if needed.
    pub fn register<C: Component>(&mut self) -> ComponentType {
        self.register_key(ComponentKey::of::<C>())
    }

    /// Registers the type behind `key`, creating its mapper if needed.
    pub fn register_key(&mut self, key: ComponentKey) -> ComponentType {
        let (ty, is_new) = self.factory.get_or_register(key, self.always_delay_removal);
        if is_new {
            self.stores.push(key.new_store(ty, self.capacity));
        }
        ty
    }

    /// Looks up the registered type of `C`.
    #[must_use]
    pub fn component_type<C: Component>(&self) -> Option<ComponentType> {
        self.factory.get(TypeId::of::<C>())
    }

    /// The type registry.
    #[must_use]
    pub fn types(&self) -> &ComponentTypeFactory {
        &self.factory
    }

    /// The composition identity table.
    #[must_use]
    pub fn resolver(&self) -> &CompositionResolver {
        &self.resolver
    }

    /// Mapper of `C`, or `None` if the type was never registered.
    #[must_use]
    pub fn mapper<C: Component>(&self) -> Option<&Mapper<C>> {
        let ty = self.component_type::<C>()?;
        self.stores[ty.index()].as_any().downcast_ref()
    }

    /// Mutable mapper of `C`, or `None` if the type was never registered.
    ///
    /// Only component values can be changed through it; the set of holders
    /// is fixed.
    pub fn mapper_mut<C: Component>(&mut self) -> Option<&mut Mapper<C>> {
        let ty = self.component_type::<C>()?;
        self.stores[ty.index()].as_any_mut().downcast_mut()
    }

    /// Mapper of `C`, registering the type first if needed.
    pub(crate) fn mapper_entry<C: Component>(&mut self) -> &mut Mapper<C> {
        let index = self.register::<C>().index();
        match self.stores[index].as_any_mut().downcast_mut() {
            Some(mapper) => mapper,
            None => unreachable!("store {index} does not hold its registered type"),
        }
    }

    /// Returns the id for `bits`, minting a new one on first sight.
    ///
    /// Every subscription learns about a new id before it is returned.
    pub(crate) fn composition_identity(
        &mut self,
        bits: &BitVector,
        subscriptions: &mut AspectSubscriptionManager,
    ) -> CompositionId {
        if let Some(id) = self.resolver.get(bits) {
            return id;
        }

        let id = self.resolver.allocate(bits);
        subscriptions.process_component_identity(id, bits);
        tracing::debug!("minted {} with {} component types", id, bits.cardinality());
        id
    }

    /// Current composition id of an entity.
    ///
    /// Entities that never held a component report
    /// [`CompositionId::EMPTY`].
    #[inline]
    #[must_use]
    pub fn identity(&self, entity: EntityId) -> CompositionId {
        self.identities
            .get(entity.index())
            .copied()
            .unwrap_or(CompositionId::EMPTY)
    }

    pub(crate) fn set_identity(&mut self, entity: EntityId, id: CompositionId) {
        let index = entity.index();
        if index >= self.identities.len() {
            self.identities.resize(index + 1, CompositionId::EMPTY);
        }
        self.identities[index] = id;
    }

    /// Bit pattern of a composition id.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidComposition`] if the id was never minted.
    pub fn composition_bits(&self, id: CompositionId) -> EcsResult<&BitVector> {
        self.resolver.bits(id).ok_or(EcsError::InvalidComposition(id))
    }

    /// Bit pattern of an entity's current composition.
    #[must_use]
    pub fn entity_bits(&self, entity: EntityId) -> &BitVector {
        // Identities only ever hold minted ids.
        match self.resolver.bits(self.identity(entity)) {
            Some(bits) => bits,
            None => unreachable!("entity {entity} holds an unminted composition"),
        }
    }

    /// Type indices of a composition, ascending.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidComposition`] if the id was never minted.
    pub fn composition_types(&self, id: CompositionId) -> EcsResult<&[usize]> {
        self.resolver.types(id).ok_or(EcsError::InvalidComposition(id))
    }

    /// Gives `entity` a default component of type `index` if it has none.
    pub(crate) fn create_component(&mut self, entity: EntityId, index: usize) {
        self.stores[index].create_default(entity);
    }

    /// Removes component type `index` from `entity`.
    ///
    /// Delayed removals flag the type in `purgatories`.
    pub(crate) fn remove_component(
        &mut self,
        entity: EntityId,
        index: usize,
        purgatories: &mut BitVector,
    ) {
        if self.stores[index].remove(entity) == Removal::Delayed {
            purgatories.set(index);
        }
    }

    /// Checks whether `entity` holds component type `index`.
    #[must_use]
    pub(crate) fn has_component(&self, entity: EntityId, index: usize) -> bool {
        self.stores
            .get(index)
            .is_some_and(|store| store.has(entity))
    }

    /// Strips every component from purged entities and resets them to the
    /// empty composition.
    pub(crate) fn clean(&mut self, purged: &[EntityId], purgatories: &mut BitVector) {
        for &entity in purged {
            let id = self.identity(entity);
            if id == CompositionId::EMPTY {
                continue;
            }

            if let Some(types) = self.resolver.types(id) {
                for &index in types {
                    if self.stores[index].remove(entity) == Removal::Delayed {
                        purgatories.set(index);
                    }
                }
            }
            self.set_identity(entity, CompositionId::EMPTY);
        }
    }

    /// Physically clears delayed removals of the flagged types.
    pub(crate) fn purge(&mut self, purgatories: &BitVector) {
        for index in purgatories {
            self.stores[index].purge();
        }
    }

    /// Number of entities every mapper is sized for.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Grows every mapper to hold at least `capacity` entities.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        self.capacity = self.capacity.max(capacity);
        for store in &mut self.stores {
            store.ensure_capacity(capacity);
        }
    }
}

impl fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentManager")
            .field("types", &self.factory.types())
            .field("compositions", &self.resolver.len())
            .field("always_delay_removal", &self.always_delay_removal)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Position(i32);
    impl Component for Position {}

    #[derive(Debug, Default, PartialEq)]
    struct Corpse(u8);
    impl Component for Corpse {
        const DELAYED_REMOVAL: bool = true;
    }

    #[test]
    fn test_register_creates_mapper() {
        let mut cm = ComponentManager::new(8, false);
        assert!(cm.mapper::<Position>().is_none());

        let ty = cm.register::<Position>();
        assert_eq!(cm.register::<Position>(), ty);
        assert!(cm.mapper::<Position>().is_some());
        assert_eq!(cm.types().len(), 1);
    }

    #[test]
    fn test_identity_is_stable() {
        let mut cm = ComponentManager::new(8, false);
        let mut asm = AspectSubscriptionManager::new();
        let bits = BitVector::from_indices([0, 3]);

        let first = cm.composition_identity(&bits, &mut asm);
        let second = cm.composition_identity(&BitVector::from_indices([3, 0]), &mut asm);
        assert_eq!(first, second);
        assert_ne!(first, CompositionId::EMPTY);
        assert_eq!(cm.composition_bits(first), Ok(&bits));
    }

    #[test]
    fn test_unknown_composition() {
        let cm = ComponentManager::new(8, false);
        let missing = CompositionId::from_index(9);
        assert_eq!(
            cm.composition_bits(missing),
            Err(EcsError::InvalidComposition(missing))
        );
    }

    #[test]
    fn test_clean_strips_components() {
        let mut cm = ComponentManager::new(8, false);
        let mut asm = AspectSubscriptionManager::new();
        let e = EntityId::new(2);

        cm.mapper_entry::<Position>().insert(e, Position(5));
        cm.mapper_entry::<Corpse>().insert(e, Corpse(1));
        let id = cm.composition_identity(&BitVector::from_indices([0, 1]), &mut asm);
        cm.set_identity(e, id);

        let mut purgatories = BitVector::new();
        cm.clean(&[e], &mut purgatories);

        assert_eq!(cm.identity(e), CompositionId::EMPTY);
        assert!(cm.mapper::<Position>().unwrap().get(e).is_none());
        // Delayed type stays readable until purged
        assert_eq!(cm.mapper::<Corpse>().unwrap().get(e), Some(&Corpse(1)));
        assert!(purgatories.get(1));

        cm.purge(&purgatories);
        assert!(cm.mapper::<Corpse>().unwrap().get(e).is_none());
    }

    #[test]
    fn test_always_delay_removal() {
        let mut cm = ComponentManager::new(8, true);
        assert!(cm.register::<Position>().is_delayed_removal());
    }
}
