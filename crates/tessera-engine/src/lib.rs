//! Tessera Engine -- 2D scenes, sprites, cameras and collisions on top of
//! [`tessera_ecs`].
//!
//! A game is a set of [`Scene`](scene::Scene)s. Each scene owns a
//! [`World`](tessera_ecs::world::World) whose systems share an
//! [`EngineContext`](context::EngineContext): the scene's message bus and
//! camera plus the engine-wide input snapshot, asset loader and display.
//! The [`Engine`](engine::Engine) activates scenes and runs the frame loop,
//! headless or (with the `renderer` feature) in a window.
//!
//! # Quick Start
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! struct Level;
//!
//! impl Scene for Level {
//!     fn name(&self) -> &str {
//!         "Level"
//!     }
//!
//!     fn preload(&mut self, _ctx: &EngineContext) {}
//!
//!     fn setup(&mut self, world: &mut EngineWorld) {
//!         world.add_system(CollisionSystem::new());
//!         world.add_system(RenderSystem::new());
//!
//!         let space = shared(SpaceComponent::new(Point::new(10.0, 10.0), 32.0, 32.0));
//!         let sprite = Drawable::from_texture(Texture::solid(32, 32, Color::WHITE));
//!         world.add_entity(
//!             EntityId::next(),
//!             &ComponentBag::new()
//!                 .with(space)
//!                 .with_value(CollisionComponent::new(true, true))
//!                 .with_value(RenderComponent::new(sprite)),
//!         );
//!     }
//! }
//!
//! let options = RunOptions::default().with_headless(true).with_no_run(true);
//! let mut engine = Engine::new(options).unwrap();
//! engine.run(Box::new(Level)).unwrap();
//!
//! for _ in 0..10 {
//!     engine.run_iteration(1.0 / 60.0);
//! }
//! let world = engine.scenes().current_world().unwrap();
//! assert_eq!(world.frame_count(), 10);
//! ```

#![deny(unsafe_code)]

pub mod assets;
pub mod audio;
pub mod camera;
pub mod collision;
pub mod context;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod mouse;
pub mod render;
pub mod scene;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use tessera_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use tessera_ecs::prelude::*;

    pub use crate::assets::Loader;
    pub use crate::audio::{AudioComponent, AudioSystem};
    pub use crate::camera::{
        Camera, CameraAxis, CameraMessage, CameraSystem, EdgeScroller, KeyboardScroller,
        MouseZoomer,
    };
    pub use crate::collision::{CollisionComponent, CollisionMessage, CollisionSystem};
    pub use crate::context::{Display, EngineContext, EngineWorld};
    pub use crate::engine::{Engine, RunOptions, WindowResizeMessage};
    pub use crate::error::{AssetError, EngineError};
    pub use crate::geometry::{Aabb, Line, Point, SpaceComponent};
    pub use crate::input::{Input, Key, MouseButton};
    pub use crate::mouse::{MouseComponent, MouseSystem};
    pub use crate::render::{
        Color, Drawable, RenderComponent, RenderSystem, Shader, ShaderHandle, Shaders, Texture,
    };
    pub use crate::scene::{Scene, SceneManager, SceneState};
}
