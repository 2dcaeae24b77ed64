//! # Batch Change Processor
//!
//! Structural changes are recorded here and applied to subscriptions only at
//! flush points. Systems can therefore add, remove and delete while iterating
//! a subscription without disturbing it.
//!
//! ## Entity Bits
//!
//! ```text
//! changed        composition may differ from what subscriptions saw
//! deleted        deletion not yet seen by subscriptions
//! pending_purge  deleted, waiting to be reclaimed after the round
//! ```
//!
//! A delete always wins over a composition change in the same round.

use std::collections::HashMap;
use std::mem;

use super::bits::BitVector;
use super::component_manager::ComponentManager;
use super::entity::EntityId;
use super::subscription::AspectSubscriptionManager;
use crate::error::EcsResult;
use crate::memory::{Pool, Poolable};

/// Composition bits of one entity while an edit is open.
#[derive(Debug)]
pub(crate) struct EditState {
    entity: EntityId,
    bits: BitVector,
}

impl Default for EditState {
    fn default() -> Self {
        Self {
            entity: EntityId::new(0),
            bits: BitVector::new(),
        }
    }
}

impl Poolable for EditState {
    fn reset(&mut self) {
        self.bits.clear();
    }
}

/// Pending structural changes of one world.
#[derive(Debug)]
pub(crate) struct BatchChangeProcessor {
    changed: BitVector,
    deleted: BitVector,
    pending_purge: BitVector,
    /// Component types holding delayed removals.
    purgatories: BitVector,
    /// Snapshots handed to subscriptions during a flush.
    flushing_changed: BitVector,
    flushing_deleted: BitVector,
    /// Open edits in the order they were first obtained.
    edits: Vec<EditState>,
    edit_slots: HashMap<EntityId, usize>,
    pool: Pool<EditState>,
}

impl BatchChangeProcessor {
    pub(crate) fn new(expected_entity_count: usize) -> Self {
        Self {
            changed: BitVector::with_capacity(expected_entity_count),
            deleted: BitVector::with_capacity(expected_entity_count),
            pending_purge: BitVector::with_capacity(expected_entity_count),
            purgatories: BitVector::new(),
            flushing_changed: BitVector::with_capacity(expected_entity_count),
            flushing_deleted: BitVector::with_capacity(expected_entity_count),
            edits: Vec::new(),
            edit_slots: HashMap::new(),
            pool: Pool::new(),
        }
    }

    /// Returns the edit slot of `entity`, opening one from `current` if the
    /// entity has no open edit this round.
    pub(crate) fn obtain_edit(&mut self, entity: EntityId, current: &BitVector) -> usize {
        if let Some(&slot) = self.edit_slots.get(&entity) {
            return slot;
        }

        let mut state = self.pool.obtain();
        state.entity = entity;
        state.bits.copy_from(current);

        let slot = self.edits.len();
        self.edits.push(state);
        self.edit_slots.insert(entity, slot);
        self.mark_changed(entity);
        slot
    }

    #[cfg(test)]
    pub(crate) fn edit_bits(&self, slot: usize) -> &BitVector {
        &self.edits[slot].bits
    }

    pub(crate) fn edit_bits_mut(&mut self, slot: usize) -> &mut BitVector {
        &mut self.edits[slot].bits
    }

    /// Number of edits not yet committed.
    #[cfg(test)]
    pub(crate) fn open_edits(&self) -> usize {
        self.edits.len()
    }

    /// Resolves the open edit of `entity`, if any, into its composition id.
    pub(crate) fn commit_edit(
        &mut self,
        entity: EntityId,
        components: &mut ComponentManager,
        subscriptions: &mut AspectSubscriptionManager,
    ) {
        let Some(slot) = self.edit_slots.remove(&entity) else {
            return;
        };

        let state = self.edits.swap_remove(slot);
        if let Some(moved) = self.edits.get(slot) {
            self.edit_slots.insert(moved.entity, slot);
        }

        let id = components.composition_identity(&state.bits, subscriptions);
        components.set_identity(entity, id);
        self.pool.free(state);
    }

    /// Resolves every open edit into its composition id.
    fn commit_edits(
        &mut self,
        components: &mut ComponentManager,
        subscriptions: &mut AspectSubscriptionManager,
    ) {
        for state in self.edits.drain(..) {
            let id = components.composition_identity(&state.bits, subscriptions);
            components.set_identity(state.entity, id);
            self.pool.free(state);
        }
        self.edit_slots.clear();
    }

    /// Flags `entity` for re-evaluation at the next flush, unless it is
    /// being deleted.
    pub(crate) fn mark_changed(&mut self, entity: EntityId) {
        if !self.pending_purge.get(entity.index()) {
            self.changed.set(entity.index());
        }
    }

    /// Marks `entity` for deletion. Returns `false` if it already was.
    pub(crate) fn delete(&mut self, entity: EntityId) -> bool {
        let index = entity.index();
        if self.pending_purge.get(index) {
            return false;
        }

        self.deleted.set(index);
        self.pending_purge.set(index);
        self.changed.unset(index);
        true
    }

    pub(crate) fn is_deleted(&self, entity: EntityId) -> bool {
        self.pending_purge.get(entity.index())
    }

    pub(crate) fn is_dirty(&self) -> bool {
        !self.changed.is_empty() || !self.deleted.is_empty() || !self.edits.is_empty()
    }

    pub(crate) fn purgatories_mut(&mut self) -> &mut BitVector {
        &mut self.purgatories
    }

    /// Flushes until no change is pending.
    ///
    /// A no-op when nothing changed since the last flush.
    ///
    /// # Errors
    ///
    /// The first listener error. The failed flush is not retried; its
    /// changes count as delivered.
    pub(crate) fn update(
        &mut self,
        components: &mut ComponentManager,
        subscriptions: &mut AspectSubscriptionManager,
    ) -> EcsResult<()> {
        loop {
            self.commit_edits(components, subscriptions);
            if self.changed.is_empty() && self.deleted.is_empty() {
                return Ok(());
            }

            self.changed.and_not(&self.deleted);
            mem::swap(&mut self.changed, &mut self.flushing_changed);
            mem::swap(&mut self.deleted, &mut self.flushing_deleted);
            tracing::trace!(
                "flushing {} changed, {} deleted",
                self.flushing_changed.cardinality(),
                self.flushing_deleted.cardinality()
            );

            let result =
                subscriptions.process(&self.flushing_changed, &self.flushing_deleted, components);
            self.flushing_changed.clear();
            self.flushing_deleted.clear();
            self.purge_components(components);
            result?;
        }
    }

    /// Drains the deleted entities whose removal every subscription has
    /// seen.
    pub(crate) fn take_pending_purge(&mut self, purged: &mut Vec<EntityId>) {
        purged.extend(self.pending_purge.iter().map(EntityId::from_index));
        self.pending_purge.clear();
    }

    /// Physically clears delayed component removals.
    pub(crate) fn purge_components(&mut self, components: &mut ComponentManager) {
        if self.purgatories.is_empty() {
            return;
        }
        components.purge(&self.purgatories);
        self.purgatories.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::aspect::Aspect;
    use crate::ecs::composition::CompositionId;

    fn setup() -> (BatchChangeProcessor, ComponentManager, AspectSubscriptionManager) {
        (
            BatchChangeProcessor::new(8),
            ComponentManager::new(8, false),
            AspectSubscriptionManager::new(),
        )
    }

    #[test]
    fn test_repeated_edit_reuses_slot() {
        let (mut batch, _, _) = setup();
        let e = EntityId::new(1);
        let a = batch.obtain_edit(e, &BitVector::new());
        batch.edit_bits_mut(a).set(3);
        let b = batch.obtain_edit(e, &BitVector::new());

        assert_eq!(a, b);
        assert!(batch.edit_bits(b).get(3));
        assert_eq!(batch.open_edits(), 1);
    }

    #[test]
    fn test_update_commits_edits() {
        let (mut batch, mut cm, mut asm) = setup();
        let e = EntityId::new(0);
        let slot = batch.obtain_edit(e, &BitVector::new());
        batch.edit_bits_mut(slot).set(2);

        batch.update(&mut cm, &mut asm).unwrap();
        assert_ne!(cm.identity(e), CompositionId::EMPTY);
        assert!(cm.entity_bits(e).get(2));
        assert!(!batch.is_dirty());
    }

    #[test]
    fn test_commit_single_edit_keeps_others() {
        let (mut batch, mut cm, mut asm) = setup();
        let (a, b, c) = (EntityId::new(0), EntityId::new(1), EntityId::new(2));
        for (e, bit) in [(a, 0), (b, 1), (c, 2)] {
            let slot = batch.obtain_edit(e, &BitVector::new());
            batch.edit_bits_mut(slot).set(bit);
        }

        batch.commit_edit(a, &mut cm, &mut asm);
        assert_eq!(batch.open_edits(), 2);
        assert!(cm.entity_bits(a).get(0));

        // c moved into a's slot and is still found
        let slot = batch.obtain_edit(c, &BitVector::new());
        assert!(batch.edit_bits(slot).get(2));
        assert_eq!(batch.open_edits(), 2);
    }

    #[test]
    fn test_delete_wins_over_change() {
        let (mut batch, mut cm, mut asm) = setup();
        let id = asm.subscribe(Aspect::default(), &cm, std::iter::empty());
        let e = EntityId::new(4);

        batch.mark_changed(e);
        assert!(batch.delete(e));
        assert!(!batch.delete(e));
        batch.mark_changed(e);

        batch.update(&mut cm, &mut asm).unwrap();
        assert!(!asm.get(id).unwrap().contains(e));
        assert!(batch.is_deleted(e));

        let mut purged = Vec::new();
        batch.take_pending_purge(&mut purged);
        assert_eq!(purged, vec![e]);
        assert!(!batch.is_deleted(e));
    }

    #[test]
    fn test_update_idle_is_noop() {
        let (mut batch, mut cm, mut asm) = setup();
        batch.update(&mut cm, &mut asm).unwrap();
        batch.update(&mut cm, &mut asm).unwrap();
        assert_eq!(cm.resolver().len(), 1);
    }
}
