//! # Systems
//!
//! Systems hold the behavior of a world. Each round the world flushes
//! pending changes and then calls `begin`, `process` and `end` on every
//! enabled system in registration order.
//!
//! Systems that need to react to membership changes attach a
//! [`SubscriptionListener`](super::subscription::SubscriptionListener) from
//! `initialize`.

use super::world::World;
use crate::error::EcsResult;

/// A unit of per-round behavior.
///
/// # Example
///
/// ```rust
/// use ember_ecs::{Aspect, Component, EcsResult, SubscriptionId, System, World};
///
/// #[derive(Default)]
/// struct Position(f32);
/// impl Component for Position {}
/// #[derive(Default)]
/// struct Velocity(f32);
/// impl Component for Velocity {}
///
/// #[derive(Default)]
/// struct Movement {
///     movers: Option<SubscriptionId>,
/// }
///
/// impl System for Movement {
///     fn initialize(&mut self, world: &mut World) -> EcsResult<()> {
///         self.movers = Some(world.subscribe(Aspect::all::<Position>().all::<Velocity>()));
///         Ok(())
///     }
///
///     fn process(&mut self, world: &mut World) -> EcsResult<()> {
///         let Some(movers) = self.movers else { return Ok(()) };
///         let delta = world.delta();
///         let entities = world.subscription(movers)?.entities().to_vec();
///         for e in entities {
///             let speed = world.mapper::<Velocity>().and_then(|m| m.get(e)).map_or(0.0, |v| v.0);
///             if let Some(p) = world.mapper_mut::<Position>().and_then(|m| m.get_mut(e)) {
///                 p.0 += speed * delta;
///             }
///         }
///         Ok(())
///     }
/// }
///
/// let mut world = World::default();
/// world.add_system(Movement::default())?;
/// let e = world.create();
/// world.edit(e)?.add(Position(0.0)).add(Velocity(2.0));
/// world.set_delta(0.5);
/// world.process()?;
/// assert_eq!(world.mapper::<Position>().and_then(|m| m.get(e)).map(|p| p.0), Some(1.0));
/// # Ok::<(), ember_ecs::EcsError>(())
/// ```
pub trait System {
    /// Called once when the system is added to a world.
    ///
    /// # Errors
    ///
    /// Aborts [`World::add_system`]; the system is not added.
    fn initialize(&mut self, world: &mut World) -> EcsResult<()> {
        let _ = world;
        Ok(())
    }

    /// Disabled systems are skipped for the round, including their flush.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Called before [`System::process`].
    ///
    /// # Errors
    ///
    /// Aborts the round.
    fn begin(&mut self, world: &mut World) -> EcsResult<()> {
        let _ = world;
        Ok(())
    }

    /// The work of the system.
    ///
    /// # Errors
    ///
    /// Aborts the round.
    fn process(&mut self, world: &mut World) -> EcsResult<()>;

    /// Called after [`System::process`].
    ///
    /// # Errors
    ///
    /// Aborts the round.
    fn end(&mut self, world: &mut World) -> EcsResult<()> {
        let _ = world;
        Ok(())
    }

    /// Called once from [`World::dispose`].
    ///
    /// # Errors
    ///
    /// Aborts the disposal.
    fn dispose(&mut self, world: &mut World) -> EcsResult<()> {
        let _ = world;
        Ok(())
    }
}
