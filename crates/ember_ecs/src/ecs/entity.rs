//! # Entity Management
//!
//! Entities are bare integer handles into every per-entity array and bitset.
//! Freed ids are recycled first-in first-out before the live range is
//! extended.
//!
//! There is no generation counter: once an id has been purged and handed out
//! again, a handle retained from before the purge refers to the new entity.

use std::collections::VecDeque;
use std::fmt;

use super::bits::BitVector;

/// Handle to an entity.
///
/// Doubles as the index into mapper storage and entity bit vectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates an entity ID from a raw index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the id as an index into per-entity storage.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Converts a bit index back into an entity ID.
    ///
    /// Bit vectors keyed by entity only ever hold indices produced by
    /// [`EntityId::index`], so the narrowing is lossless.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues and recycles entity ids and tracks which ones are active.
///
/// An id is *active* from [`EntityManager::create`] until it is handed back
/// through [`EntityManager::clean`]. Pending deletion is tracked by the batch
/// processor; such entities are still active here.
#[derive(Debug)]
pub struct EntityManager {
    /// Ids that have been freed and not yet reissued.
    recycled: BitVector,
    /// Reuse queue, oldest freed id first.
    limbo: VecDeque<EntityId>,
    /// One past the highest id ever issued.
    next_id: u32,
    /// Number of currently active entities.
    active_count: usize,
    /// Lifetime counters.
    total_created: u64,
    total_deleted: u64,
}

impl EntityManager {
    /// Creates a manager pre-sized for `expected_entity_count` entities.
    #[must_use]
    pub fn new(expected_entity_count: usize) -> Self {
        Self {
            recycled: BitVector::with_capacity(expected_entity_count),
            limbo: VecDeque::with_capacity(expected_entity_count),
            next_id: 0,
            active_count: 0,
            total_created: 0,
            total_deleted: 0,
        }
    }

    /// Allocates an id, preferring a previously freed one.
    pub fn create(&mut self) -> EntityId {
        let id = match self.limbo.pop_front() {
            Some(id) => {
                self.recycled.unset(id.index());
                id
            }
            None => {
                let id = EntityId::new(self.next_id);
                self.next_id += 1;
                id
            }
        };

        self.active_count += 1;
        self.total_created += 1;
        id
    }

    /// Checks if an id is currently issued.
    #[inline]
    #[must_use]
    pub fn is_active(&self, id: EntityId) -> bool {
        id.raw() < self.next_id && !self.recycled.get(id.index())
    }

    /// Returns purged ids to the free list. Called once per round.
    pub fn clean(&mut self, purged: &[EntityId]) {
        for &id in purged {
            if !self.is_active(id) {
                continue;
            }
            self.recycled.set(id.index());
            self.limbo.push_back(id);
            self.active_count -= 1;
            self.total_deleted += 1;
        }
    }

    /// Rewinds the id counter so that ids are issued from zero again.
    ///
    /// Only possible while no entity is active. Returns whether the reset
    /// happened.
    pub fn reset(&mut self) -> bool {
        if self.active_count > 0 {
            return false;
        }

        self.recycled.clear();
        self.limbo.clear();
        self.next_id = 0;
        true
    }

    /// Returns the number of currently active entities.
    #[inline]
    #[must_use]
    pub const fn active_count(&self) -> usize {
        self.active_count
    }

    /// Returns one past the highest id ever issued.
    #[inline]
    #[must_use]
    pub const fn id_range(&self) -> usize {
        self.next_id as usize
    }

    /// Returns how many ids have been issued since creation.
    #[inline]
    #[must_use]
    pub const fn total_created(&self) -> u64 {
        self.total_created
    }

    /// Returns how many ids have been reclaimed since creation.
    #[inline]
    #[must_use]
    pub const fn total_deleted(&self) -> u64 {
        self.total_deleted
    }

    /// Iterates over every active id in ascending order.
    pub fn iter_active(&self) -> impl Iterator<Item = EntityId> + '_ {
        (0..self.next_id)
            .map(EntityId::new)
            .filter(|&id| !self.recycled.get(id.index()))
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_sequential() {
        let mut em = EntityManager::new(8);
        assert_eq!(em.create(), EntityId::new(0));
        assert_eq!(em.create(), EntityId::new(1));
        assert_eq!(em.active_count(), 2);
    }

    #[test]
    fn test_clean_recycles_fifo() {
        let mut em = EntityManager::new(8);
        let ids: Vec<_> = (0..4).map(|_| em.create()).collect();

        em.clean(&[ids[2], ids[0]]);
        assert!(!em.is_active(ids[2]));
        assert!(!em.is_active(ids[0]));
        assert!(em.is_active(ids[1]));
        assert_eq!(em.active_count(), 2);

        // Oldest freed id comes back first
        assert_eq!(em.create(), ids[2]);
        assert_eq!(em.create(), ids[0]);
        assert_eq!(em.create(), EntityId::new(4));
    }

    #[test]
    fn test_never_issued_is_inactive() {
        let em = EntityManager::new(8);
        assert!(!em.is_active(EntityId::new(0)));
    }

    #[test]
    fn test_double_clean_counts_once() {
        let mut em = EntityManager::new(8);
        let id = em.create();
        em.clean(&[id]);
        em.clean(&[id]);
        assert_eq!(em.active_count(), 0);
        assert_eq!(em.total_deleted(), 1);
        assert_eq!(em.create(), id);
        assert_eq!(em.create(), EntityId::new(1));
    }

    #[test]
    fn test_reset_only_when_empty() {
        let mut em = EntityManager::new(8);
        let id = em.create();
        assert!(!em.reset());

        em.clean(&[id]);
        assert!(em.reset());
        assert_eq!(em.id_range(), 0);
        assert_eq!(em.create(), EntityId::new(0));
    }

    #[test]
    fn test_iter_active_skips_freed() {
        let mut em = EntityManager::new(8);
        let a = em.create();
        let b = em.create();
        let c = em.create();
        em.clean(&[b]);
        assert_eq!(em.iter_active().collect::<Vec<_>>(), vec![a, c]);
    }
}
