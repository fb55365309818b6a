//! Tessera ECS -- entities, component handles, systems and the message bus.
//!
//! This crate is the scheduling and messaging substrate of the Tessera engine.
//! Entities are bare [`EntityId`](entity::EntityId)s. Each [`System`](system::System)
//! tracks the entities it cares about in its own
//! [`EntityTable`](table::EntityTable), and a [`World`](world::World) runs its
//! systems once per frame in priority order. Systems coordinate through a
//! synchronous [`MessageBus`](message::MessageBus).
//!
//! # Quick Start
//!
//! ```
//! use std::rc::Rc;
//! use tessera_ecs::prelude::*;
//!
//! struct Tick;
//!
//! impl Message for Tick {
//!     fn kind(&self) -> &str {
//!         "Tick"
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct Health(u32);
//!
//! #[derive(Default)]
//! struct Regen {
//!     entities: EntityTable<Shared<Health>>,
//! }
//!
//! impl System<Rc<MessageBus>> for Regen {
//!     fn name(&self) -> &str {
//!         "regen"
//!     }
//!
//!     fn update(&mut self, bus: &Rc<MessageBus>, _dt: f32) {
//!         for (_, health) in self.entities.iter() {
//!             health.borrow_mut().0 += 1;
//!         }
//!         bus.dispatch(&Tick);
//!     }
//!
//!     fn remove(&mut self, entity: EntityId) {
//!         self.entities.remove(entity);
//!     }
//!
//!     fn try_add(&mut self, entity: EntityId, bag: &ComponentBag) -> bool {
//!         bag.get::<Health>()
//!             .map(|health| self.entities.insert(entity, health).is_ok())
//!             .unwrap_or(false)
//!     }
//! }
//!
//! let mut world = World::new(Rc::new(MessageBus::new()));
//! world.add_system(Regen::default());
//!
//! let health = shared(Health(10));
//! world.add_entity(EntityId::next(), &ComponentBag::new().with(health.clone()));
//! world.update(1.0 / 60.0);
//!
//! assert_eq!(health.borrow().0, 11);
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod message;
pub mod system;
pub mod table;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// A system already tracks this entity.
    #[error("entity {entity} is already tracked by this system")]
    DuplicateEntity { entity: entity::EntityId },

    /// A typed system lookup found nothing.
    #[error("no system of type '{name}' in this world")]
    SystemNotFound { name: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{shared, ComponentBag, Shared};
    pub use crate::entity::EntityId;
    pub use crate::message::{AsAny, ListenerId, Message, MessageBus};
    pub use crate::system::{System, DEFAULT_PRIORITY};
    pub use crate::table::EntityTable;
    pub use crate::world::{World, WorldDiagnostics};
    pub use crate::EcsError;
}
