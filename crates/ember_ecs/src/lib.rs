//! # Ember ECS
//!
//! Entity Component System runtime core:
//! - Bitset compositions with canonical composition ids
//! - Aspect subscriptions kept in sync at flush boundaries
//! - Deferred structural changes, safe to issue while iterating
//! - Delayed component removal, readable until the round settles
//!
//! ## Architecture Rules
//!
//! 1. **Single writer** - one thread drives a world; no internal locking
//! 2. **Mark now, flush later** - edits never touch subscriptions directly
//! 3. **Two-phase deletion** - ids are reclaimed only after every
//!    subscription has seen the removal
//!
//! ## Example
//!
//! ```rust
//! use ember_ecs::{Aspect, Component, World};
//!
//! #[derive(Default)]
//! struct Position(f32, f32);
//! impl Component for Position {}
//!
//! #[derive(Default)]
//! struct Velocity(f32, f32);
//! impl Component for Velocity {}
//!
//! let mut world = World::default();
//! let movers = world.subscribe(Aspect::all::<Position>().all::<Velocity>());
//!
//! let e = world.create();
//! world.edit(e)?.add(Position(0.0, 0.0)).add(Velocity(1.0, 0.0));
//! world.update()?;
//!
//! assert_eq!(world.subscription(movers)?.entities(), &[e]);
//! # Ok::<(), ember_ecs::EcsError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;

pub use config::WorldConfig;
pub use ecs::{
    Archetype, ArchetypeBuilder, Aspect, AspectBuilder, BitVector, Component, ComponentManager,
    CompositionId, EntityEdit, EntityId, EntitySubscription, EntityTransmuter,
    EntityTransmuterFactory, ListenerId, Mapper, SubscriptionId, SubscriptionListener, System,
    World,
};
pub use error::{EcsError, EcsResult};
