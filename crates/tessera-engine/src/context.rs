//! Shared engine state handed to every system.
//!
//! An [`EngineContext`] is a bundle of reference-counted handles. Each scene
//! world gets its own clone with a private message bus and camera; the input
//! snapshot, asset loader, display settings, frame sink, built-in shaders and
//! close signal are shared by all of them. Switching scenes swaps which
//! world (and therefore which context) the engine updates.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tessera_ecs::message::MessageBus;
use tessera_ecs::world::World;

use crate::assets::Loader;
use crate::camera::Camera;
use crate::geometry::{Aabb, Point};
use crate::input::Input;
use crate::render::{Color, RenderFrame, Shaders, Viewport};

/// A world whose systems see an [`EngineContext`].
pub type EngineWorld = World<EngineContext>;

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// Game and window dimensions plus presentation flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    /// Size of the game area in game units.
    pub game_width: f32,
    pub game_height: f32,
    /// Size of the window in physical pixels.
    pub window_width: f32,
    pub window_height: f32,
    /// No window and no draw commands.
    pub headless: bool,
    /// Keep the game size fixed when the window is resized.
    pub scale_on_resize: bool,
    /// Clear colour.
    pub background: Color,
}

impl Display {
    /// A display whose game and window sizes are both `width` x `height`.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            game_width: width,
            game_height: height,
            window_width: width,
            window_height: height,
            headless: false,
            scale_on_resize: false,
            background: Color::BLACK,
        }
    }

    /// The game area as a viewport.
    pub fn game_viewport(&self) -> Viewport {
        Viewport::new(self.game_width, self.game_height)
    }

    /// The window as a viewport.
    pub fn window_viewport(&self) -> Viewport {
        Viewport::new(self.window_width, self.window_height)
    }

    /// Bounds a new camera may move within: the whole game area.
    pub fn world_bounds(&self) -> Aabb {
        Aabb::new(Point::ZERO, Point::new(self.game_width, self.game_height))
    }
}

// ---------------------------------------------------------------------------
// CloseSignal
// ---------------------------------------------------------------------------

/// Thread-safe "please close" flag.
///
/// Signal handlers run on their own thread; they only set this flag and the
/// frame loop acts on it.
#[derive(Debug, Clone, Default)]
pub struct CloseSignal(Arc<AtomicBool>);

impl CloseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a pending request. Returns whether one was pending.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// EngineContext
// ---------------------------------------------------------------------------

/// Everything a system may touch outside its own entity table.
#[derive(Debug, Clone)]
pub struct EngineContext {
    /// This world's message bus.
    pub bus: Rc<MessageBus>,
    /// This world's camera.
    pub camera: Rc<RefCell<Camera>>,
    pub input: Rc<RefCell<Input>>,
    pub assets: Rc<RefCell<Loader>>,
    pub display: Rc<RefCell<Display>>,
    /// Sink for this frame's draw commands.
    pub frame: Rc<RefCell<RenderFrame>>,
    pub shaders: Shaders,
    pub close: CloseSignal,
}

impl EngineContext {
    /// A context for `display` with fresh shared state.
    pub fn new(display: Display) -> Self {
        let shaders = Shaders::new(display.game_viewport());
        let camera = Camera::new(display.world_bounds());
        Self {
            bus: Rc::new(MessageBus::new()),
            camera: Rc::new(RefCell::new(camera)),
            input: Rc::new(RefCell::new(Input::new())),
            assets: Rc::new(RefCell::new(Loader::new())),
            display: Rc::new(RefCell::new(display)),
            frame: Rc::new(RefCell::new(RenderFrame::new())),
            shaders,
            close: CloseSignal::new(),
        }
    }

    /// A clone with its own bus and a camera centred on the current game
    /// area. Everything else stays shared.
    pub fn for_scene(&self) -> Self {
        let bounds = self.display.borrow().world_bounds();
        Self {
            bus: Rc::new(MessageBus::new()),
            camera: Rc::new(RefCell::new(Camera::new(bounds))),
            ..self.clone()
        }
    }

    /// Whether the engine runs without a window.
    pub fn headless(&self) -> bool {
        self.display.borrow().headless
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(Display::new(800.0, 800.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_contexts_share_engine_state_only() {
        let root = EngineContext::default();
        let scene = root.for_scene();

        assert!(!Rc::ptr_eq(&root.bus, &scene.bus));
        assert!(!Rc::ptr_eq(&root.camera, &scene.camera));
        assert!(Rc::ptr_eq(&root.input, &scene.input));
        assert!(Rc::ptr_eq(&root.assets, &scene.assets));
        assert!(Rc::ptr_eq(&root.frame, &scene.frame));
        assert_eq!(root.shaders.world(), scene.shaders.world());
    }

    #[test]
    fn scene_camera_starts_at_game_centre() {
        let root = EngineContext::new(Display::new(400.0, 200.0));
        let scene = root.for_scene();
        let camera = scene.camera.borrow();
        assert_eq!((camera.x(), camera.y(), camera.zoom()), (200.0, 100.0, 1.0));
    }

    #[test]
    fn close_signal_is_shared_and_takeable() {
        let ctx = EngineContext::default();
        let other = ctx.for_scene();
        other.close.request();
        assert!(ctx.close.is_requested());
        assert!(ctx.close.take());
        assert!(!ctx.close.is_requested());
    }
}
