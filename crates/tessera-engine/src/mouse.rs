//! Mouse picking.
//!
//! The [`MouseSystem`] converts the cursor to world coordinates and updates
//! each tracked entity's [`MouseComponent`] against its space. Entities drawn
//! with the HUD shader are tested against the raw window position, since the
//! camera does not move them.

use tessera_ecs::component::{ComponentBag, Shared};
use tessera_ecs::entity::EntityId;
use tessera_ecs::system::System;
use tessera_ecs::table::EntityTable;

use crate::context::EngineContext;
use crate::geometry::{Point, SpaceComponent};
use crate::input::{Modifiers, MouseAction, MouseButton};
use crate::render::RenderComponent;

/// Runs with the camera controls, ahead of gameplay systems.
pub const MOUSE_PRIORITY: i32 = 10;

/// Per-entity mouse state, rewritten every frame.
///
/// Only `track` and `hovered` survive from one frame to the next; every other
/// flag describes the current frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouseComponent {
    pub clicked: bool,
    pub released: bool,
    pub hovered: bool,
    pub dragged: bool,
    pub right_clicked: bool,
    pub right_released: bool,
    /// The cursor entered the entity this frame.
    pub enter: bool,
    /// The cursor left the entity this frame.
    pub leave: bool,
    /// Cursor position while hovering (or always, when tracking).
    pub mouse_x: f32,
    pub mouse_y: f32,
    /// Report events regardless of the cursor position.
    pub track: bool,
    pub modifiers: Modifiers,
}

impl MouseComponent {
    /// A component that reports the cursor anywhere on screen.
    pub fn tracking() -> Self {
        Self {
            track: true,
            ..Self::default()
        }
    }
}

/// What the mouse system tracks per entity.
#[derive(Debug, Clone)]
pub struct MouseEntity {
    pub mouse: Shared<MouseComponent>,
    pub space: Shared<SpaceComponent>,
    pub render: Option<Shared<RenderComponent>>,
}

/// Updates mouse components from the input snapshot.
#[derive(Debug, Default)]
pub struct MouseSystem {
    entities: EntityTable<MouseEntity>,
    /// Cursor in world coordinates, as of the last update.
    world_cursor: Point,
    mouse_down: bool,
}

impl MouseSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `entity`. `render` is only consulted to detect HUD entities.
    pub fn add(
        &mut self,
        entity: EntityId,
        mouse: Shared<MouseComponent>,
        space: Shared<SpaceComponent>,
        render: Option<Shared<RenderComponent>>,
    ) -> bool {
        self.entities
            .insert(
                entity,
                MouseEntity {
                    mouse,
                    space,
                    render,
                },
            )
            .is_ok()
    }

    /// The cursor in world coordinates.
    pub fn world_cursor(&self) -> Point {
        self.world_cursor
    }
}

/// Map a window position to world coordinates for the given camera.
pub fn window_to_world(
    window: Point,
    camera: (f32, f32, f32),
    game_size: (f32, f32),
    window_size: (f32, f32),
) -> Point {
    let (cam_x, cam_y, zoom) = camera;
    let (game_w, game_h) = game_size;
    let (win_w, win_h) = window_size;
    Point::new(
        window.x * zoom * (game_w / win_w) + cam_x - (game_w / 2.0) * zoom,
        window.y * zoom * (game_h / win_h) + cam_y - (game_h / 2.0) * zoom,
    )
}

impl System<EngineContext> for MouseSystem {
    fn name(&self) -> &str {
        "mouse"
    }

    fn priority(&self) -> i32 {
        MOUSE_PRIORITY
    }

    fn update(&mut self, ctx: &EngineContext, _dt: f32) {
        let mouse = *ctx.input.borrow().mouse();
        let camera = {
            let camera = ctx.camera.borrow();
            (camera.x(), camera.y(), camera.zoom())
        };
        let (game_size, window_size) = {
            let display = ctx.display.borrow();
            (
                (display.game_width, display.game_height),
                (display.window_width, display.window_height),
            )
        };
        let raw = Point::new(mouse.x, mouse.y);
        self.world_cursor = window_to_world(raw, camera, game_size, window_size);
        let hud = ctx.shaders.hud();

        for (_, e) in self.entities.iter() {
            let mut state = e.mouse.borrow_mut();
            *state = MouseComponent {
                track: state.track,
                hovered: state.hovered,
                ..MouseComponent::default()
            };

            if state.track {
                state.mouse_x = self.world_cursor.x;
                state.mouse_y = self.world_cursor.y;
            }

            let on_hud = e
                .render
                .as_ref()
                .is_some_and(|r| r.borrow().shader() == Some(hud));
            let cursor = if on_hud { raw } else { self.world_cursor };

            if state.track || e.space.borrow().contains(cursor) {
                state.enter = !state.hovered;
                state.hovered = true;

                if !state.track {
                    state.mouse_x = cursor.x;
                    state.mouse_y = cursor.y;
                }

                match mouse.action {
                    MouseAction::Press => {
                        match mouse.button {
                            Some(MouseButton::Left) => state.clicked = true,
                            Some(MouseButton::Right) => state.right_clicked = true,
                            _ => {}
                        }
                        self.mouse_down = true;
                    }
                    MouseAction::Release => {
                        match mouse.button {
                            Some(MouseButton::Left) => state.released = true,
                            Some(MouseButton::Right) => state.right_released = true,
                            _ => {}
                        }
                        state.dragged = false;
                        self.mouse_down = false;
                    }
                    MouseAction::Move => {
                        if self.mouse_down {
                            state.dragged = true;
                        }
                    }
                    MouseAction::Neutral => {}
                }
            } else {
                state.leave = state.hovered;
                state.hovered = false;
            }

            state.modifiers = mouse.modifiers;
        }
    }

    fn remove(&mut self, entity: EntityId) {
        self.entities.remove(entity);
    }

    fn try_add(&mut self, entity: EntityId, bag: &ComponentBag) -> bool {
        match (bag.get::<MouseComponent>(), bag.get::<SpaceComponent>()) {
            (Some(mouse), Some(space)) => {
                self.add(entity, mouse, space, bag.get::<RenderComponent>())
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
