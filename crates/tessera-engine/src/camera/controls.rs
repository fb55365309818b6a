//! Input-to-camera translators.
//!
//! These systems hold no simulation state. Each frame they look at the input
//! snapshot and dispatch incremental [`CameraMessage`]s.

use tessera_ecs::entity::EntityId;
use tessera_ecs::system::System;

use crate::context::EngineContext;
use crate::input::Key;

use super::{CameraAxis, CameraMessage};

/// Camera controls run before regular systems so gameplay sees this frame's
/// camera.
pub const CONTROL_PRIORITY: i32 = 10;

/// One set of directional keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyBinding {
    up: Key,
    right: Key,
    down: Key,
    left: Key,
}

// ---------------------------------------------------------------------------
// KeyboardScroller
// ---------------------------------------------------------------------------

/// Pans the camera while direction keys are held.
#[derive(Debug, Clone)]
pub struct KeyboardScroller {
    /// Units per second.
    pub scroll_speed: f32,
    bindings: Vec<KeyBinding>,
}

impl KeyboardScroller {
    pub fn new(scroll_speed: f32, up: Key, right: Key, down: Key, left: Key) -> Self {
        let mut scroller = Self {
            scroll_speed,
            bindings: Vec::new(),
        };
        scroller.bind_keyboard(up, right, down, left);
        scroller
    }

    /// Add another set of keys. Any bound key moves the camera.
    pub fn bind_keyboard(&mut self, up: Key, right: Key, down: Key, left: Key) {
        self.bindings.push(KeyBinding {
            up,
            right,
            down,
            left,
        });
    }
}

impl System<EngineContext> for KeyboardScroller {
    fn name(&self) -> &str {
        "keyboard_scroller"
    }

    fn priority(&self) -> i32 {
        CONTROL_PRIORITY
    }

    fn update(&mut self, ctx: &EngineContext, dt: f32) {
        let step = self.scroll_speed * dt;
        let moves = {
            let input = ctx.input.borrow();
            let held = |pick: fn(&KeyBinding) -> Key| {
                self.bindings.iter().any(|b| input.down(pick(b)))
            };
            [
                (held(|b| b.up), CameraAxis::Y, -step),
                (held(|b| b.right), CameraAxis::X, step),
                (held(|b| b.down), CameraAxis::Y, step),
                (held(|b| b.left), CameraAxis::X, -step),
            ]
        };

        for (held, axis, delta) in moves {
            if held {
                ctx.bus.dispatch(&CameraMessage::incremental(axis, delta));
            }
        }
    }

    fn remove(&mut self, _entity: EntityId) {}
}

// ---------------------------------------------------------------------------
// EdgeScroller
// ---------------------------------------------------------------------------

/// Pans the camera while the cursor is near the window edge.
#[derive(Debug, Clone, Copy)]
pub struct EdgeScroller {
    /// Units per second.
    pub scroll_speed: f32,
    /// Distance from the edge, in window pixels, that triggers scrolling.
    pub edge_margin: f32,
}

impl EdgeScroller {
    pub fn new(scroll_speed: f32, edge_margin: f32) -> Self {
        Self {
            scroll_speed,
            edge_margin,
        }
    }
}

impl System<EngineContext> for EdgeScroller {
    fn name(&self) -> &str {
        "edge_scroller"
    }

    fn priority(&self) -> i32 {
        CONTROL_PRIORITY
    }

    fn update(&mut self, ctx: &EngineContext, dt: f32) {
        let (x, y) = {
            let input = ctx.input.borrow();
            (input.mouse().x, input.mouse().y)
        };
        let (max_x, max_y) = {
            let display = ctx.display.borrow();
            (display.window_width, display.window_height)
        };
        let step = self.scroll_speed * dt;

        if x < self.edge_margin {
            ctx.bus.dispatch(&CameraMessage::incremental(CameraAxis::X, -step));
        } else if x > max_x - self.edge_margin {
            ctx.bus.dispatch(&CameraMessage::incremental(CameraAxis::X, step));
        }

        if y < self.edge_margin {
            ctx.bus.dispatch(&CameraMessage::incremental(CameraAxis::Y, -step));
        } else if y > max_y - self.edge_margin {
            ctx.bus.dispatch(&CameraMessage::incremental(CameraAxis::Y, step));
        }
    }

    fn remove(&mut self, _entity: EntityId) {}
}

// ---------------------------------------------------------------------------
// MouseZoomer
// ---------------------------------------------------------------------------

/// Zooms with the scroll wheel.
#[derive(Debug, Clone, Copy)]
pub struct MouseZoomer {
    /// Zoom change per wheel notch. Negative values invert the wheel.
    pub zoom_speed: f32,
}

impl MouseZoomer {
    pub fn new(zoom_speed: f32) -> Self {
        Self { zoom_speed }
    }
}

impl System<EngineContext> for MouseZoomer {
    fn name(&self) -> &str {
        "mouse_zoomer"
    }

    fn priority(&self) -> i32 {
        CONTROL_PRIORITY
    }

    fn update(&mut self, ctx: &EngineContext, _dt: f32) {
        let scroll = ctx.input.borrow().mouse().scroll_y;
        if scroll != 0.0 {
            ctx.bus.dispatch(&CameraMessage::incremental(
                CameraAxis::Zoom,
                scroll * self.zoom_speed,
            ));
        }
    }

    fn remove(&mut self, _entity: EntityId) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
