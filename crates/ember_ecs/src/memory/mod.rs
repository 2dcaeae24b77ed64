//! # Memory Management
//!
//! Recycling pools for short-lived scratch objects.
//!
//! Structural edits are frequent and each needs a scratch bit set. Pooling
//! those keeps steady-state editing free of heap allocations.

mod pool;

pub use pool::{Pool, Poolable};
