//! The scene camera.
//!
//! A [`Camera`] has three axes (X, Y and zoom). Systems never move it
//! directly: they dispatch [`CameraMessage`]s on the bus and the
//! [`CameraSystem`] applies them. An axis is either idle or running one long
//! task, a linear move spread over a duration. A new message on an axis
//! always replaces that axis's long task.
//!
//! ```
//! use std::time::Duration;
//! use tessera_engine::camera::{Camera, CameraAxis, CameraMessage};
//! use tessera_engine::geometry::{Aabb, Point};
//!
//! let mut camera = Camera::new(Aabb::new(Point::ZERO, Point::new(100.0, 100.0)));
//! camera.handle(&CameraMessage::absolute(CameraAxis::X, 80.0).over(Duration::from_secs(1)));
//!
//! camera.advance(0.5);
//! assert_eq!(camera.x(), 65.0);
//! camera.advance(0.5);
//! assert_eq!(camera.x(), 80.0);
//! ```

mod controls;

pub use controls::{EdgeScroller, KeyboardScroller, MouseZoomer, CONTROL_PRIORITY};

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use tessera_ecs::component::Shared;
use tessera_ecs::entity::EntityId;
use tessera_ecs::message::Message;
use tessera_ecs::system::System;

use crate::context::EngineContext;
use crate::geometry::{Aabb, SpaceComponent};

/// Default lower zoom bound.
pub const MIN_ZOOM: f32 = 0.25;
/// Default upper zoom bound.
pub const MAX_ZOOM: f32 = 3.0;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CameraAxis {
    X,
    Y,
    Zoom,
}

/// A request to move one camera axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMessage {
    pub axis: CameraAxis,
    pub value: f32,
    /// Add `value` to the axis instead of setting it.
    pub incremental: bool,
    /// Spread the move over this long. Zero applies it at once.
    pub duration: Duration,
}

impl CameraMessage {
    pub const KIND: &'static str = "CameraMessage";

    /// Move `axis` by `delta`.
    pub fn incremental(axis: CameraAxis, delta: f32) -> Self {
        Self {
            axis,
            value: delta,
            incremental: true,
            duration: Duration::ZERO,
        }
    }

    /// Move `axis` to `value`.
    pub fn absolute(axis: CameraAxis, value: f32) -> Self {
        Self {
            axis,
            value,
            incremental: false,
            duration: Duration::ZERO,
        }
    }

    /// Spread the move over `duration`.
    pub fn over(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

impl Message for CameraMessage {
    fn kind(&self) -> &str {
        Self::KIND
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// An axis move in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LongTask {
    value: f32,
    incremental: bool,
    /// Seconds left.
    remaining: f32,
    /// Units per second, fixed on the first tick.
    speed: f32,
}

/// Camera position, zoom and in-flight moves.
#[derive(Debug)]
pub struct Camera {
    x: f32,
    y: f32,
    zoom: f32,
    bounds: Aabb,
    min_zoom: f32,
    max_zoom: f32,
    long_tasks: BTreeMap<CameraAxis, LongTask>,
    tracking: Option<(EntityId, Shared<SpaceComponent>)>,
}

impl Camera {
    /// A camera at the centre of `bounds` with zoom 1.
    pub fn new(bounds: Aabb) -> Self {
        let bounds = bounds.ordered();
        Self {
            x: (bounds.min.x + bounds.max.x) / 2.0,
            y: (bounds.min.y + bounds.max.y) / 2.0,
            zoom: 1.0,
            bounds,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            long_tasks: BTreeMap::new(),
            tracking: None,
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Change the area X and Y are clamped to. The current position is
    /// clamped immediately.
    pub fn set_bounds(&mut self, bounds: Aabb) {
        self.bounds = bounds.ordered();
        self.move_to(CameraAxis::X, self.x);
        self.move_to(CameraAxis::Y, self.y);
    }

    /// Change the zoom range. The current zoom is clamped immediately.
    pub fn set_zoom_range(&mut self, min: f32, max: f32) {
        self.min_zoom = min.min(max);
        self.max_zoom = max.max(min);
        self.move_to(CameraAxis::Zoom, self.zoom);
    }

    pub fn zoom_range(&self) -> (f32, f32) {
        (self.min_zoom, self.max_zoom)
    }

    /// Apply a camera message.
    ///
    /// Any long task on the message's axis is dropped. A message with a
    /// duration becomes the axis's new long task and is applied by
    /// [`advance`](Self::advance); otherwise it takes effect now.
    pub fn handle(&mut self, msg: &CameraMessage) {
        self.long_tasks.remove(&msg.axis);

        if !msg.duration.is_zero() {
            self.long_tasks.insert(
                msg.axis,
                LongTask {
                    value: msg.value,
                    incremental: msg.incremental,
                    remaining: msg.duration.as_secs_f32(),
                    speed: 0.0,
                },
            );
            return;
        }

        if msg.incremental {
            self.move_by(msg.axis, msg.value);
        } else {
            self.move_to(msg.axis, msg.value);
        }
    }

    /// Progress long tasks by `dt` seconds, then re-centre on the followed
    /// entity, if any.
    pub fn advance(&mut self, dt: f32) {
        let axes: Vec<CameraAxis> = self.long_tasks.keys().copied().collect();
        for axis in axes {
            let current = self.get(axis);
            let Some(task) = self.long_tasks.get_mut(&axis) else {
                continue;
            };

            if !task.incremental {
                task.incremental = true;
                task.value -= current;
            }
            if task.speed == 0.0 {
                task.speed = task.value / task.remaining;
            }

            let delta = task.speed * dt;
            task.remaining -= dt;
            let finished = task.remaining <= 0.0;
            if finished {
                self.long_tasks.remove(&axis);
            }
            self.move_by(axis, delta);
        }

        if let Some((_, space)) = &self.tracking {
            let center = space.borrow().center();
            self.move_to(CameraAxis::X, center.x);
            self.move_to(CameraAxis::Y, center.y);
        }
    }

    /// Keep the camera centred on `space` from the next frame on.
    pub fn follow(&mut self, entity: EntityId, space: Shared<SpaceComponent>) {
        tracing::debug!(%entity, "camera following entity");
        self.tracking = Some((entity, space));
    }

    pub fn stop_following(&mut self) {
        self.tracking = None;
    }

    pub fn following(&self) -> Option<EntityId> {
        self.tracking.as_ref().map(|(entity, _)| *entity)
    }

    /// Whether `axis` has a move in progress.
    pub fn has_long_task(&self, axis: CameraAxis) -> bool {
        self.long_tasks.contains_key(&axis)
    }

    fn get(&self, axis: CameraAxis) -> f32 {
        match axis {
            CameraAxis::X => self.x,
            CameraAxis::Y => self.y,
            CameraAxis::Zoom => self.zoom,
        }
    }

    fn move_by(&mut self, axis: CameraAxis, delta: f32) {
        self.move_to(axis, self.get(axis) + delta);
    }

    fn move_to(&mut self, axis: CameraAxis, value: f32) {
        match axis {
            CameraAxis::X => self.x = value.clamp(self.bounds.min.x, self.bounds.max.x),
            CameraAxis::Y => self.y = value.clamp(self.bounds.min.y, self.bounds.max.y),
            CameraAxis::Zoom => self.zoom = value.clamp(self.min_zoom, self.max_zoom),
        }
    }
}

// ---------------------------------------------------------------------------
// CameraSystem
// ---------------------------------------------------------------------------

/// Applies camera messages and drives long tasks.
///
/// The scene manager adds one to every new world.
#[derive(Debug, Default)]
pub struct CameraSystem {
    camera: Option<Rc<RefCell<Camera>>>,
}

impl CameraSystem {
    pub fn new() -> Self {
        Self::default()
    }
}

impl System<EngineContext> for CameraSystem {
    fn name(&self) -> &str {
        "camera"
    }

    fn attach(&mut self, ctx: &EngineContext) {
        self.camera = Some(ctx.camera.clone());
        let camera = ctx.camera.clone();
        ctx.bus
            .listen_for::<CameraMessage, _>(CameraMessage::KIND, move |msg| {
                camera.borrow_mut().handle(msg);
            });
    }

    fn update(&mut self, ctx: &EngineContext, dt: f32) {
        ctx.camera.borrow_mut().advance(dt);
    }

    fn remove(&mut self, entity: EntityId) {
        let Some(camera) = &self.camera else {
            return;
        };
        let mut camera = camera.borrow_mut();
        if camera.following() == Some(entity) {
            camera.stop_following();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
