//! The [`World`]: the set of systems active for one scene.
//!
//! A world owns a context value `C` (the engine's handles to the bus, camera,
//! input and so on) and an ordered list of systems. Each call to
//! [`World::update`] runs every system exactly once, highest priority first,
//! each to completion before the next starts.
//!
//! # Example
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! struct Counter {
//!     ticks: u32,
//! }
//!
//! impl System<()> for Counter {
//!     fn name(&self) -> &str {
//!         "counter"
//!     }
//!
//!     fn update(&mut self, _context: &(), _dt: f32) {
//!         self.ticks += 1;
//!     }
//!
//!     fn remove(&mut self, _entity: EntityId) {}
//! }
//!
//! let mut world = World::new(());
//! world.add_system(Counter { ticks: 0 });
//! world.update(1.0 / 60.0);
//! world.update(1.0 / 60.0);
//!
//! assert_eq!(world.system::<Counter>().unwrap().ticks, 2);
//! ```

use std::time::{Duration, Instant};

use crate::component::ComponentBag;
use crate::entity::EntityId;
use crate::system::System;
use crate::EcsError;

// ---------------------------------------------------------------------------
// WorldDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last update.
#[derive(Debug, Clone, Default)]
pub struct WorldDiagnostics {
    /// Wall-clock time per system, in execution order.
    pub system_times: Vec<(String, Duration)>,
    /// Total time for the update.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// A scene's systems plus the context they are attached to.
pub struct World<C> {
    context: C,
    /// Sorted by descending priority; ties keep insertion order.
    systems: Vec<Box<dyn System<C>>>,
    frame_count: u64,
    last_diagnostics: WorldDiagnostics,
}

impl<C: 'static> World<C> {
    /// An empty world around `context`.
    pub fn new(context: C) -> Self {
        Self {
            context,
            systems: Vec::new(),
            frame_count: 0,
            last_diagnostics: WorldDiagnostics::default(),
        }
    }

    /// Attach `system` and insert it in priority order.
    ///
    /// [`System::attach`] runs before insertion, so a system may subscribe to
    /// the context's bus there.
    pub fn add_system<S: System<C> + 'static>(&mut self, mut system: S) {
        system.attach(&self.context);
        let priority = system.priority();
        let index = self
            .systems
            .iter()
            .position(|existing| existing.priority() < priority)
            .unwrap_or(self.systems.len());
        tracing::debug!(system = system.name(), priority, index, "system added");
        self.systems.insert(index, Box::new(system));
    }

    /// Run every system once with `dt` seconds of elapsed time.
    pub fn update(&mut self, dt: f32) {
        let update_start = Instant::now();
        let mut system_times = Vec::with_capacity(self.systems.len());

        for system in &mut self.systems {
            let start = Instant::now();
            system.update(&self.context, dt);
            system_times.push((system.name().to_owned(), start.elapsed()));
        }

        self.frame_count += 1;
        self.last_diagnostics = WorldDiagnostics {
            system_times,
            total_time: update_start.elapsed(),
        };
    }

    /// Offer `bag` to every system. Returns how many systems took the entity.
    pub fn add_entity(&mut self, entity: EntityId, bag: &ComponentBag) -> usize {
        let mut accepted = 0;
        for system in &mut self.systems {
            if system.try_add(entity, bag) {
                accepted += 1;
            }
        }
        if accepted == 0 {
            tracing::debug!(%entity, ?bag, "no system accepted entity");
        }
        accepted
    }

    /// Remove `entity` from every system.
    pub fn remove_entity(&mut self, entity: EntityId) {
        for system in &mut self.systems {
            system.remove(entity);
        }
    }

    /// The first system of type `T`.
    pub fn system<T: System<C> + 'static>(&self) -> Option<&T> {
        self.systems
            .iter()
            .find_map(|system| (**system).as_any().downcast_ref::<T>())
    }

    /// Mutable access to the first system of type `T`.
    pub fn system_mut<T: System<C> + 'static>(&mut self) -> Option<&mut T> {
        self.systems
            .iter_mut()
            .find_map(|system| (**system).as_any_mut().downcast_mut::<T>())
    }

    /// Like [`system_mut`](Self::system_mut), but a missing system is an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotFound`] if no system of type `T` is in
    /// the world.
    pub fn require_system_mut<T: System<C> + 'static>(&mut self) -> Result<&mut T, EcsError> {
        self.system_mut::<T>().ok_or_else(|| EcsError::SystemNotFound {
            name: std::any::type_name::<T>().to_owned(),
        })
    }

    // -- accessors ----------------------------------------------------------

    /// The context shared by every system of this world.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Number of systems.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// System names in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    /// Number of completed updates.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Diagnostics from the last update.
    pub fn last_diagnostics(&self) -> &WorldDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
