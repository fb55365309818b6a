//! The [`System`] trait.
//!
//! A system is a scheduler unit: it tracks the entities it cares about (in an
//! [`EntityTable`](crate::table::EntityTable), by convention) and runs once per
//! frame. Systems are generic over the context type `C` the hosting
//! [`World`](crate::world::World) carries, so the ECS crate does not depend on
//! the engine that drives it.

use crate::component::ComponentBag;
use crate::entity::EntityId;
use crate::message::AsAny;

/// Priority used when a system does not override [`System::priority`].
pub const DEFAULT_PRIORITY: i32 = 0;

/// A per-frame update unit.
pub trait System<C>: AsAny {
    /// Human-readable name, used in diagnostics and logs.
    fn name(&self) -> &str;

    /// Scheduling priority. Higher runs earlier within a frame.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// One-time setup when the system joins a world, e.g. subscribing to
    /// messages on the context's bus.
    fn attach(&mut self, _context: &C) {}

    /// Advance the system by `dt` seconds.
    fn update(&mut self, context: &C, dt: f32);

    /// Stop tracking `entity`. Absent ids are a no-op.
    fn remove(&mut self, entity: EntityId);

    /// Start tracking `entity` if `bag` holds every component kind this
    /// system needs. Returns whether the entity was taken.
    ///
    /// The default implementation declines everything, for systems that are
    /// only fed explicitly.
    fn try_add(&mut self, _entity: EntityId, _bag: &ComponentBag) -> bool {
        false
    }
}
