//! # Entity Component System
//!
//! Bitset-driven ECS runtime with deferred structural changes.
//!
//! ## Design Philosophy
//!
//! - Components live in dense per-type arrays indexed by entity id
//! - Every distinct component set gets a canonical composition id
//! - Subscriptions cache aspect interest per composition id
//! - Structural changes are batched and flushed between systems

mod archetype;
mod aspect;
mod batch;
mod bits;
mod component;
mod component_manager;
mod composition;
mod edit;
mod entity;
mod storage;
mod subscription;
mod system;
mod transmuter;
mod world;

pub use archetype::{Archetype, ArchetypeBuilder};
pub use aspect::{Aspect, AspectBuilder};
pub use bits::{BitVector, Ones};
pub use component::{Component, ComponentKey, ComponentType, ComponentTypeFactory};
pub use component_manager::ComponentManager;
pub use composition::{CompositionId, CompositionResolver};
pub use edit::EntityEdit;
pub use entity::{EntityId, EntityManager};
pub use storage::Mapper;
pub use subscription::{
    AspectSubscriptionManager, EntitySubscription, ListenerId, SubscriptionId,
    SubscriptionListener,
};
pub use system::System;
pub use transmuter::{EntityTransmuter, EntityTransmuterFactory, TransmuteOperation};
pub use world::World;
