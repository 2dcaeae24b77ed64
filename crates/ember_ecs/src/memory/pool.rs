//! # Object Pool
//!
//! Recycles objects that are obtained and returned at a high rate.

/// Types that can be returned to a [`Pool`] and handed out again.
pub trait Poolable: Default {
    /// Clears the object before it is parked in the pool.
    fn reset(&mut self);
}

/// A recycling pool of reusable objects.
///
/// Objects keep whatever heap capacity they grew while in use, so a steady
/// obtain/free cycle stops allocating once the pool is warm.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. It belongs to a single world.
///
/// # Example
///
/// ```rust
/// use ember_ecs::memory::{Pool, Poolable};
///
/// #[derive(Default)]
/// struct Scratch(Vec<u32>);
///
/// impl Poolable for Scratch {
///     fn reset(&mut self) {
///         self.0.clear();
///     }
/// }
///
/// let mut pool: Pool<Scratch> = Pool::new();
/// let mut scratch = pool.obtain();
/// scratch.0.push(7);
/// pool.free(scratch);
///
/// // Same buffer, emptied
/// let again = pool.obtain();
/// assert!(again.0.is_empty());
/// assert!(again.0.capacity() >= 1);
/// ```
#[derive(Debug)]
pub struct Pool<T: Poolable> {
    /// Parked objects, last freed on top.
    free: Vec<T>,
    /// Number of objects ever built by the pool.
    created: usize,
}

impl<T: Poolable> Pool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            created: 0,
        }
    }

    /// Creates a pool pre-filled with `count` objects.
    #[must_use]
    pub fn with_preallocated(count: usize) -> Self {
        let mut free = Vec::with_capacity(count);
        free.resize_with(count, T::default);
        Self {
            free,
            created: count,
        }
    }

    /// Takes an object from the pool, building a new one if it is empty.
    ///
    /// This is a **O(1)** operation.
    pub fn obtain(&mut self) -> T {
        self.free.pop().unwrap_or_else(|| {
            self.created += 1;
            T::default()
        })
    }

    /// Resets `value` and parks it for reuse.
    pub fn free(&mut self, mut value: T) {
        value.reset();
        self.free.push(value);
    }

    /// Number of parked objects.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of objects the pool has built since creation.
    #[inline]
    #[must_use]
    pub const fn created_count(&self) -> usize {
        self.created
    }
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}
