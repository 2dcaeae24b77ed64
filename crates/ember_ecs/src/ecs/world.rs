//! # ECS World
//!
//! The central container: entities, component storage, subscriptions,
//! pending changes and systems of one simulation.
//!
//! ## Round Protocol
//!
//! ```text
//! for each enabled system:
//!     flush
//!     begin / process / end
//! flush
//! purge deleted entities
//! ```
//!
//! Between flushes, subscriptions keep the membership they had at the last
//! flush no matter what systems create, edit or delete.

use std::mem;

use super::archetype::Archetype;
use super::aspect::{Aspect, AspectBuilder};
use super::batch::BatchChangeProcessor;
use super::bits::BitVector;
use super::component::{Component, ComponentType};
use super::component_manager::ComponentManager;
use super::composition::CompositionId;
use super::edit::EntityEdit;
use super::entity::{EntityId, EntityManager};
use super::storage::Mapper;
use super::subscription::{
    AspectSubscriptionManager, EntitySubscription, ListenerId, SubscriptionId,
    SubscriptionListener,
};
use super::system::System;
use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};

/// The ECS World - container for all simulation state.
///
/// # Example
///
/// ```rust
/// use ember_ecs::{Aspect, Component, World, WorldConfig};
///
/// #[derive(Default)]
/// struct Position(f32, f32);
/// impl Component for Position {}
///
/// let mut world = World::with_config(WorldConfig::new().with_expected_entity_count(1024))?;
/// let placed = world.subscribe(Aspect::all::<Position>());
///
/// let e = world.create();
/// world.edit(e)?.add(Position(1.0, 2.0));
/// assert!(!world.subscription(placed)?.contains(e));
///
/// world.process()?;
/// assert!(world.subscription(placed)?.contains(e));
/// # Ok::<(), ember_ecs::EcsError>(())
/// ```
pub struct World {
    pub(crate) entities: EntityManager,
    pub(crate) components: ComponentManager,
    pub(crate) subscriptions: AspectSubscriptionManager,
    pub(crate) batch: BatchChangeProcessor,
    systems: Vec<Box<dyn System>>,
    /// Reused between purges.
    purged: Vec<EntityId>,
    delta: f32,
    config: WorldConfig,
}

impl World {
    /// Creates a world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(WorldConfig::default())
    }

    /// Creates a world from a configuration.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if the configuration fails validation.
    pub fn with_config(config: WorldConfig) -> EcsResult<Self> {
        Ok(Self::build(config.validated()?))
    }

    fn build(config: WorldConfig) -> Self {
        let expected = config.expected_entity_count;
        Self {
            entities: EntityManager::new(expected),
            components: ComponentManager::new(expected, config.always_delay_component_removal),
            subscriptions: AspectSubscriptionManager::new(),
            batch: BatchChangeProcessor::new(expected),
            systems: Vec::new(),
            purged: Vec::new(),
            delta: 0.0,
            config,
        }
    }

    /// The configuration this world was built with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity with no components.
    ///
    /// It joins matching subscriptions at the next flush.
    pub fn create(&mut self) -> EntityId {
        let entity = self.allocate();
        self.components.set_identity(entity, CompositionId::EMPTY);
        self.batch.mark_changed(entity);
        entity
    }

    /// Creates an entity holding default instances of the archetype's
    /// components.
    pub fn create_from(&mut self, archetype: &Archetype) -> EntityId {
        let entity = self.allocate();
        for &index in archetype.types() {
            self.components.create_component(entity, index);
        }
        self.components
            .set_identity(entity, archetype.composition_id());
        self.batch.mark_changed(entity);
        entity
    }

    /// Issues an id, growing component storage when the id range outgrows it.
    fn allocate(&mut self) -> EntityId {
        let entity = self.entities.create();
        if entity.index() >= self.components.capacity() {
            self.components
                .ensure_capacity((entity.index() + 1).next_power_of_two());
        }
        entity
    }

    /// Opens an edit of `entity`.
    ///
    /// # Errors
    ///
    /// [`EcsError::InactiveEntity`] if `entity` is not active.
    pub fn edit(&mut self, entity: EntityId) -> EcsResult<EntityEdit<'_>> {
        self.require_active(entity, "edit")?;
        let slot = self
            .batch
            .obtain_edit(entity, self.components.entity_bits(entity));
        Ok(EntityEdit::new(self, entity, slot))
    }

    /// Marks `entity` for deletion.
    ///
    /// Subscriptions drop it at the next flush; its components and id are
    /// reclaimed at the end of the round. Deleting it again before then is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// [`EcsError::InactiveEntity`] if `entity` is not active.
    pub fn delete(&mut self, entity: EntityId) -> EcsResult<()> {
        self.require_active(entity, "delete")?;
        self.batch.delete(entity);
        Ok(())
    }

    /// Marks every active entity for deletion.
    pub fn delete_all(&mut self) {
        for entity in self.entities.iter_active() {
            self.batch.delete(entity);
        }
    }

    /// Checks if `entity` is issued and not yet reclaimed.
    #[inline]
    #[must_use]
    pub fn is_active(&self, entity: EntityId) -> bool {
        self.entities.is_active(entity)
    }

    /// Checks if `entity` is marked for deletion this round.
    #[inline]
    #[must_use]
    pub fn is_deleted(&self, entity: EntityId) -> bool {
        self.batch.is_deleted(entity)
    }

    /// Number of active entities, including those pending deletion.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.active_count()
    }

    /// The entity id allocator.
    #[must_use]
    pub fn entity_manager(&self) -> &EntityManager {
        &self.entities
    }

    fn require_active(&self, entity: EntityId, operation: &'static str) -> EcsResult<()> {
        if self.entities.is_active(entity) {
            Ok(())
        } else {
            Err(EcsError::InactiveEntity { entity, operation })
        }
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Registers component type `C` ahead of first use.
    pub fn register<C: Component>(&mut self) -> ComponentType {
        self.components.register::<C>()
    }

    /// Mapper of `C`, or `None` if no entity ever used the type.
    #[must_use]
    pub fn mapper<C: Component>(&self) -> Option<&Mapper<C>> {
        self.components.mapper::<C>()
    }

    /// Mutable access to the values of `C`.
    pub fn mapper_mut<C: Component>(&mut self) -> Option<&mut Mapper<C>> {
        self.components.mapper_mut::<C>()
    }

    /// Component storage and composition table.
    #[must_use]
    pub fn components(&self) -> &ComponentManager {
        &self.components
    }

    /// Composition id of `entity` as of the last commit.
    ///
    /// # Errors
    ///
    /// [`EcsError::InactiveEntity`] if `entity` is not active.
    pub fn composition_id(&self, entity: EntityId) -> EcsResult<CompositionId> {
        self.require_active(entity, "inspect")?;
        Ok(self.components.identity(entity))
    }

    /// Bit pattern of a composition id.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidComposition`] if the id was never minted.
    pub fn composition_bits(&self, id: CompositionId) -> EcsResult<&BitVector> {
        self.components.composition_bits(id)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Returns the subscription for an aspect, creating and back-filling it
    /// on first request.
    pub fn subscribe(&mut self, aspect: AspectBuilder) -> SubscriptionId {
        let aspect = aspect.build(&mut self.components);
        self.subscribe_aspect(aspect)
    }

    /// Like [`World::subscribe`], for an already built aspect.
    pub fn subscribe_aspect(&mut self, aspect: Aspect) -> SubscriptionId {
        let batch = &self.batch;
        let live = self
            .entities
            .iter_active()
            .filter(|&entity| !batch.is_deleted(entity));
        self.subscriptions.subscribe(aspect, &self.components, live)
    }

    /// Looks up a subscription.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownSubscription`] if `id` was not issued by this world.
    pub fn subscription(&self, id: SubscriptionId) -> EcsResult<&EntitySubscription> {
        self.subscriptions.get(id)
    }

    /// Every subscription of this world.
    #[must_use]
    pub fn subscriptions(&self) -> &AspectSubscriptionManager {
        &self.subscriptions
    }

    /// Attaches a listener to a subscription.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownSubscription`] if `id` was not issued by this world.
    pub fn add_subscription_listener(
        &mut self,
        id: SubscriptionId,
        listener: impl SubscriptionListener + 'static,
    ) -> EcsResult<ListenerId> {
        self.subscriptions.add_listener(id, Box::new(listener))
    }

    /// Detaches a listener and hands it back.
    pub fn remove_subscription_listener(
        &mut self,
        id: SubscriptionId,
        listener: ListenerId,
    ) -> Option<Box<dyn SubscriptionListener>> {
        self.subscriptions.remove_listener(id, listener)
    }

    // =========================================================================
    // Rounds
    // =========================================================================

    /// Initializes `system` and appends it to the round.
    ///
    /// # Errors
    ///
    /// Whatever [`System::initialize`] returns; the system is dropped.
    pub fn add_system(&mut self, system: impl System + 'static) -> EcsResult<()> {
        let mut system: Box<dyn System> = Box::new(system);
        system.initialize(self)?;
        self.systems.push(system);
        Ok(())
    }

    /// Number of registered systems.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Runs one round: every enabled system bracketed by flushes, then the
    /// purge of deleted entities.
    ///
    /// # Errors
    ///
    /// The first error of a system or listener. The round stops there and
    /// nothing is purged.
    pub fn process(&mut self) -> EcsResult<()> {
        let mut systems = mem::take(&mut self.systems);
        let result = self.run_systems(&mut systems);

        // Systems added during the round run from the next one.
        systems.append(&mut self.systems);
        self.systems = systems;
        result?;

        self.update()?;
        self.purge();
        Ok(())
    }

    fn run_systems(&mut self, systems: &mut [Box<dyn System>]) -> EcsResult<()> {
        for system in systems.iter_mut() {
            if !system.is_enabled() {
                continue;
            }
            self.update()?;
            system.begin(self)?;
            system.process(self)?;
            system.end(self)?;
        }
        Ok(())
    }

    /// Flushes pending changes into subscriptions.
    ///
    /// Idempotent when nothing changed.
    ///
    /// # Errors
    ///
    /// The first listener error.
    pub fn update(&mut self) -> EcsResult<()> {
        if !self.batch.is_dirty() {
            return Ok(());
        }
        self.batch
            .update(&mut self.components, &mut self.subscriptions)
    }

    /// Reclaims entities whose deletion every subscription has seen.
    fn purge(&mut self) {
        self.purged.clear();
        self.batch.take_pending_purge(&mut self.purged);
        if self.purged.is_empty() {
            return;
        }

        self.components
            .clean(&self.purged, self.batch.purgatories_mut());
        self.entities.clean(&self.purged);
        self.batch.purge_components(&mut self.components);
        tracing::debug!("purged {} entities", self.purged.len());
    }

    /// Time elapsed since the previous round, as set by the driver.
    #[inline]
    #[must_use]
    pub const fn delta(&self) -> f32 {
        self.delta
    }

    /// Sets the time value systems read this round.
    pub fn set_delta(&mut self, delta: f32) {
        self.delta = delta;
    }

    /// Disposes every system, then deletes and reclaims every entity and
    /// rewinds the id counter.
    ///
    /// A failing system does not stop the others from being disposed.
    ///
    /// # Errors
    ///
    /// The first error of a system or listener.
    pub fn dispose(&mut self) -> EcsResult<()> {
        let mut result = Ok(());
        for mut system in mem::take(&mut self.systems) {
            if let Err(e) = system.dispose(self) {
                tracing::warn!("system dispose failed: {e}");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        self.delete_all();
        let flushed = self.update();
        self.purge();
        self.entities.reset();
        tracing::debug!("world disposed");
        result.and(flushed)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
