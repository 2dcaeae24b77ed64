//! # Entity Subscriptions
//!
//! A subscription is the live set of entities matching one [`Aspect`].
//!
//! Matching is cached per composition id rather than per entity: when a new
//! composition is minted every subscription tests it once, and from then on
//! re-checking an entity is two bit lookups.
//!
//! ## Flush Order
//!
//! ```text
//! 1. deleted entities leave the active set
//! 2. changed entities are re-tested against their current composition
//! 3. listeners get `removed`, then `inserted`
//! ```
//!
//! A deleted entity therefore never shows up in an `inserted` batch of the
//! flush that deletes it.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;

use super::aspect::Aspect;
use super::bits::BitVector;
use super::component_manager::ComponentManager;
use super::composition::CompositionId;
use super::entity::EntityId;
use crate::error::{EcsError, EcsResult};

/// Handle to a subscription of a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

impl SubscriptionId {
    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Handle to a registered listener, used to detach it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Receives membership changes of a subscription.
///
/// Both callbacks run synchronously inside a flush. Entities are in
/// ascending id order. Components removed with delayed removal are still
/// readable through `components` during `removed`.
///
/// An error aborts the flush and is returned to whoever drove it.
pub trait SubscriptionListener {
    /// Entities that started matching.
    ///
    /// # Errors
    ///
    /// Any error the listener chooses to raise.
    fn inserted(&mut self, entities: &[EntityId], components: &ComponentManager) -> EcsResult<()> {
        let _ = (entities, components);
        Ok(())
    }

    /// Entities that stopped matching or were deleted.
    ///
    /// # Errors
    ///
    /// Any error the listener chooses to raise.
    fn removed(&mut self, entities: &[EntityId], components: &ComponentManager) -> EcsResult<()> {
        let _ = (entities, components);
        Ok(())
    }
}

/// Live set of entities matching an aspect.
pub struct EntitySubscription {
    id: SubscriptionId,
    aspect: Aspect,
    /// Interest per composition id.
    aspect_cache: BitVector,
    /// Matching entities.
    active: BitVector,
    /// Dense copy of `active`, rebuilt on first read after a change.
    entities: OnceCell<Vec<EntityId>>,
    /// Entered since the last notification.
    inserted: BitVector,
    /// Left since the last notification.
    removed: BitVector,
    /// Batch buffers handed to listeners.
    inserted_ids: Vec<EntityId>,
    removed_ids: Vec<EntityId>,
    listeners: Vec<(ListenerId, Box<dyn SubscriptionListener>)>,
}

impl EntitySubscription {
    fn new(id: SubscriptionId, aspect: Aspect) -> Self {
        Self {
            id,
            aspect,
            aspect_cache: BitVector::new(),
            active: BitVector::new(),
            entities: OnceCell::new(),
            inserted: BitVector::new(),
            removed: BitVector::new(),
            inserted_ids: Vec::new(),
            removed_ids: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Handle of this subscription.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The aspect entities are matched against.
    #[must_use]
    pub fn aspect(&self) -> &Aspect {
        &self.aspect
    }

    /// Checks whether `entity` is currently a member.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.active.get(entity.index())
    }

    /// Members in ascending id order.
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        self.entities
            .get_or_init(|| self.active.iter().map(EntityId::from_index).collect())
    }

    /// Members as a bit vector indexed by entity id.
    #[must_use]
    pub fn active_ids(&self) -> &BitVector {
        &self.active
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.cardinality()
    }

    /// Checks if the subscription has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn process_component_identity(&mut self, id: CompositionId, bits: &BitVector) {
        self.aspect_cache
            .set_to(id.index(), self.aspect.is_interested(bits));
    }

    fn check(&mut self, entity: EntityId, composition: CompositionId) {
        let index = entity.index();
        let interested = self.aspect_cache.get(composition.index());
        let contains = self.active.get(index);

        if interested && !contains {
            self.active.set(index);
            self.inserted.set(index);
        } else if !interested && contains {
            self.active.unset(index);
            self.removed.set(index);
        }
    }

    fn apply(
        &mut self,
        changed: &BitVector,
        deleted: &BitVector,
        components: &ComponentManager,
    ) {
        for index in deleted {
            if self.active.get(index) {
                self.active.unset(index);
                self.removed.set(index);
            }
        }

        for index in changed {
            let entity = EntityId::from_index(index);
            self.check(entity, components.identity(entity));
        }
    }

    fn inform_entity_changes(&mut self, components: &ComponentManager) -> EcsResult<()> {
        if self.inserted.is_empty() && self.removed.is_empty() {
            return Ok(());
        }

        self.entities.take();
        transfer(&mut self.inserted, &mut self.inserted_ids);
        transfer(&mut self.removed, &mut self.removed_ids);

        let mut result = Ok(());
        for (_, listener) in &mut self.listeners {
            if !self.removed_ids.is_empty() {
                keep_first(&mut result, listener.removed(&self.removed_ids, components));
            }
            if !self.inserted_ids.is_empty() {
                keep_first(&mut result, listener.inserted(&self.inserted_ids, components));
            }
        }
        result
    }
}

fn keep_first(result: &mut EcsResult<()>, next: EcsResult<()>) {
    if result.is_ok() {
        *result = next;
    }
}

/// Moves set bits into `ids` and clears the bit vector.
fn transfer(bits: &mut BitVector, ids: &mut Vec<EntityId>) {
    ids.clear();
    ids.extend(bits.iter().map(EntityId::from_index));
    bits.clear();
}

impl fmt::Debug for EntitySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySubscription")
            .field("id", &self.id)
            .field("aspect", &self.aspect)
            .field("active", &self.active)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

/// Owns one subscription per distinct aspect and keeps all of them in sync.
#[derive(Debug, Default)]
pub struct AspectSubscriptionManager {
    subscriptions: Vec<EntitySubscription>,
    by_aspect: HashMap<Aspect, SubscriptionId>,
    next_listener: u64,
}

impl AspectSubscriptionManager {
    /// Creates a manager without subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the subscription for `aspect`, creating it on first request.
    ///
    /// A new subscription learns every known composition and is back-filled
    /// from `entities` without notifying anyone.
    pub(crate) fn subscribe(
        &mut self,
        aspect: Aspect,
        components: &ComponentManager,
        entities: impl Iterator<Item = EntityId>,
    ) -> SubscriptionId {
        if let Some(&id) = self.by_aspect.get(&aspect) {
            return id;
        }

        let id = SubscriptionId(self.subscriptions.len());
        let mut subscription = EntitySubscription::new(id, aspect.clone());

        for (composition, bits) in components.resolver().iter() {
            subscription.process_component_identity(composition, bits);
        }
        for entity in entities {
            subscription.check(entity, components.identity(entity));
        }
        subscription.inserted.clear();
        subscription.removed.clear();

        tracing::debug!(
            "subscription {} created for {:?}, {} entities matched",
            id.0,
            aspect,
            subscription.len()
        );

        self.by_aspect.insert(aspect, id);
        self.subscriptions.push(subscription);
        id
    }

    /// Looks up a subscription.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownSubscription`] if `id` was not issued here.
    pub fn get(&self, id: SubscriptionId) -> EcsResult<&EntitySubscription> {
        self.subscriptions
            .get(id.0)
            .ok_or(EcsError::UnknownSubscription(id.0))
    }

    /// Looks up the subscription of an aspect, if one exists.
    #[must_use]
    pub fn find(&self, aspect: &Aspect) -> Option<SubscriptionId> {
        self.by_aspect.get(aspect).copied()
    }

    /// Iterates over every subscription in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySubscription> + '_ {
        self.subscriptions.iter()
    }

    /// Number of subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Checks if there are no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Attaches a listener to a subscription.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownSubscription`] if `id` was not issued here.
    pub fn add_listener(
        &mut self,
        id: SubscriptionId,
        listener: Box<dyn SubscriptionListener>,
    ) -> EcsResult<ListenerId> {
        let subscription = self
            .subscriptions
            .get_mut(id.0)
            .ok_or(EcsError::UnknownSubscription(id.0))?;

        let listener_id = ListenerId(self.next_listener);
        self.next_listener += 1;
        subscription.listeners.push((listener_id, listener));
        Ok(listener_id)
    }

    /// Detaches a listener and hands it back.
    pub fn remove_listener(
        &mut self,
        id: SubscriptionId,
        listener: ListenerId,
    ) -> Option<Box<dyn SubscriptionListener>> {
        let listeners = &mut self.subscriptions.get_mut(id.0)?.listeners;
        let position = listeners.iter().position(|(lid, _)| *lid == listener)?;
        Some(listeners.remove(position).1)
    }

    /// Teaches every subscription whether a newly minted composition
    /// matches.
    pub(crate) fn process_component_identity(&mut self, id: CompositionId, bits: &BitVector) {
        for subscription in &mut self.subscriptions {
            subscription.process_component_identity(id, bits);
        }
    }

    /// Applies one flush to every subscription, then notifies listeners.
    ///
    /// Membership is updated everywhere before the first listener runs, and
    /// every listener still receives its batches when an earlier one fails.
    ///
    /// # Errors
    ///
    /// The first listener error.
    pub(crate) fn process(
        &mut self,
        changed: &BitVector,
        deleted: &BitVector,
        components: &ComponentManager,
    ) -> EcsResult<()> {
        for subscription in &mut self.subscriptions {
            subscription.apply(changed, deleted, components);
        }

        let mut result = Ok(());
        for subscription in &mut self.subscriptions {
            keep_first(&mut result, subscription.inform_entity_changes(components));
        }
        result
    }
}
