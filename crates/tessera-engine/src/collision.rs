//! Axis-aligned collision detection.
//!
//! Every frame the [`CollisionSystem`] tests each entity flagged `main`
//! against every other tracked entity. Overlapping pairs produce a
//! [`CollisionMessage`]; when both sides are `solid` the main entity is also
//! pushed out along the axis of least overlap.
//!
//! ```
//! use tessera_engine::collision::{is_intersecting, minimum_translation};
//! use tessera_engine::geometry::{Aabb, Point};
//!
//! let a = Aabb::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
//! let b = Aabb::new(Point::new(8.0, 2.0), Point::new(18.0, 12.0));
//! assert!(is_intersecting(a, b));
//! assert_eq!(minimum_translation(a, b), Point::new(-2.0, 0.0));
//! ```

use serde::{Deserialize, Serialize};

use tessera_ecs::component::{ComponentBag, Shared};
use tessera_ecs::entity::EntityId;
use tessera_ecs::message::Message;
use tessera_ecs::system::System;
use tessera_ecs::table::EntityTable;

use crate::context::EngineContext;
use crate::geometry::{Aabb, Point, SpaceComponent};

// ---------------------------------------------------------------------------
// Component and message
// ---------------------------------------------------------------------------

/// Collision flags for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionComponent {
    /// Solid pairs push each other apart.
    pub solid: bool,
    /// Only main entities look for collisions.
    pub main: bool,
    /// Extra margin around the space; half goes on each side.
    pub extra: Point,
}

impl CollisionComponent {
    pub fn new(solid: bool, main: bool) -> Self {
        Self {
            solid,
            main,
            extra: Point::ZERO,
        }
    }

    pub fn with_extra(mut self, extra: Point) -> Self {
        self.extra = extra;
        self
    }

    /// `space`'s box grown by half of `extra` on every side.
    pub fn inflated(&self, space: &SpaceComponent) -> Aabb {
        space.aabb().inflate(self.extra.multiply_scalar(0.5))
    }
}

/// One side of a collision, as it was after resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionParticipant {
    pub entity: EntityId,
    pub collision: CollisionComponent,
    pub space: SpaceComponent,
}

/// Dispatched for every overlapping pair, main entity first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionMessage {
    pub entity: CollisionParticipant,
    pub to: CollisionParticipant,
}

impl CollisionMessage {
    pub const KIND: &'static str = "CollisionMessage";
}

impl Message for CollisionMessage {
    fn kind(&self) -> &str {
        Self::KIND
    }
}

// ---------------------------------------------------------------------------
// Box math
// ---------------------------------------------------------------------------

/// Whether two boxes overlap. Touching edges do not count.
pub fn is_intersecting(a: Aabb, b: Aabb) -> bool {
    a.max.x > b.min.x && a.min.x < b.max.x && a.max.y > b.min.y && a.min.y < b.max.y
}

/// The smallest single-axis move of `a` that separates it from `b`.
///
/// The axis with the smaller overlap wins; on a tie the move is vertical.
/// Boxes that do not overlap, or only touch, yield [`Point::ZERO`].
pub fn minimum_translation(a: Aabb, b: Aabb) -> Point {
    let left = b.min.x - a.max.x;
    let right = b.max.x - a.min.x;
    let top = b.min.y - a.max.y;
    let bottom = b.max.y - a.min.y;

    if left >= 0.0 || right <= 0.0 || top >= 0.0 || bottom <= 0.0 {
        tracing::debug!(?a, ?b, "boxes do not overlap; no translation");
        return Point::ZERO;
    }

    let x = if left.abs() < right { left } else { right };
    let y = if top.abs() < bottom { top } else { bottom };

    if x.abs() < y.abs() {
        Point::new(x, 0.0)
    } else {
        Point::new(0.0, y)
    }
}

// ---------------------------------------------------------------------------
// CollisionSystem
// ---------------------------------------------------------------------------

/// What the collision system tracks per entity.
#[derive(Debug, Clone)]
pub struct CollisionEntity {
    pub collision: Shared<CollisionComponent>,
    pub space: Shared<SpaceComponent>,
}

impl CollisionEntity {
    fn snapshot(&self, entity: EntityId) -> CollisionParticipant {
        CollisionParticipant {
            entity,
            collision: *self.collision.borrow(),
            space: *self.space.borrow(),
        }
    }
}

/// Pairwise AABB collision between main entities and everything else.
#[derive(Debug, Default)]
pub struct CollisionSystem {
    entities: EntityTable<CollisionEntity>,
}

impl CollisionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `entity`. A second add of the same entity is ignored.
    pub fn add(
        &mut self,
        entity: EntityId,
        collision: Shared<CollisionComponent>,
        space: Shared<SpaceComponent>,
    ) -> bool {
        match self
            .entities
            .insert(entity, CollisionEntity { collision, space })
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%entity, error = %e, "collision entity not added");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl System<EngineContext> for CollisionSystem {
    fn name(&self) -> &str {
        "collision"
    }

    fn update(&mut self, ctx: &EngineContext, _dt: f32) {
        for (id, main) in self.entities.iter() {
            let main_flags = *main.collision.borrow();
            if !main_flags.main {
                continue;
            }

            for (other_id, other) in self.entities.iter() {
                if other_id == id {
                    continue;
                }

                let other_flags = *other.collision.borrow();
                let own_box = main_flags.inflated(&main.space.borrow());
                let other_box = other_flags.inflated(&other.space.borrow());
                if !is_intersecting(own_box, other_box) {
                    continue;
                }

                if main_flags.solid && other_flags.solid {
                    let push = minimum_translation(own_box, other_box);
                    main.space.borrow_mut().position += push;
                }

                ctx.bus.dispatch(&CollisionMessage {
                    entity: main.snapshot(id),
                    to: other.snapshot(other_id),
                });
            }
        }
    }

    fn remove(&mut self, entity: EntityId) {
        self.entities.remove(entity);
    }

    fn try_add(&mut self, entity: EntityId, bag: &ComponentBag) -> bool {
        match (bag.get::<CollisionComponent>(), bag.get::<SpaceComponent>()) {
            (Some(collision), Some(space)) => self.add(entity, collision, space),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn aabb(x: f32, y: f32, w: f32, h: f32) -> Aabb {
        Aabb::new(Point::new(x, y), Point::new(x + w, y + h))
    }

    // -- 1. Intersection ---------------------------------------------------

    #[test]
    fn overlapping_boxes_intersect() {
        assert!(is_intersecting(aabb(0.0, 0.0, 10.0, 10.0), aabb(5.0, 5.0, 10.0, 10.0)));
        assert!(is_intersecting(aabb(0.0, 0.0, 10.0, 10.0), aabb(2.0, 2.0, 2.0, 2.0)));
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        assert!(!is_intersecting(aabb(0.0, 0.0, 10.0, 10.0), aabb(10.0, 0.0, 10.0, 10.0)));
        assert!(!is_intersecting(aabb(0.0, 0.0, 10.0, 10.0), aabb(0.0, 10.0, 10.0, 10.0)));
        assert!(!is_intersecting(aabb(0.0, 0.0, 10.0, 10.0), aabb(30.0, 30.0, 1.0, 1.0)));
    }

    // -- 2. Minimum translation --------------------------------------------

    #[test]
    fn translation_picks_shallow_axis() {
        let a = aabb(0.0, 0.0, 10.0, 10.0);
        assert_eq!(minimum_translation(a, aabb(9.0, 2.0, 10.0, 10.0)), Point::new(-1.0, 0.0));
        assert_eq!(minimum_translation(a, aabb(-9.0, 2.0, 10.0, 10.0)), Point::new(1.0, 0.0));
        assert_eq!(minimum_translation(a, aabb(2.0, 8.0, 10.0, 10.0)), Point::new(0.0, -2.0));
    }

    #[test]
    fn translation_tie_resolves_vertically() {
        let push = minimum_translation(aabb(0.0, 0.0, 10.0, 10.0), aabb(5.0, 5.0, 10.0, 10.0));
        assert_eq!(push, Point::new(0.0, -5.0));
    }

    #[test]
    fn translation_makes_boxes_touch() {
        let a = aabb(0.0, 0.0, 4.0, 3.0);
        let b = aabb(3.0, 1.0, 4.0, 4.0);
        let push = minimum_translation(a, b);
        assert!((push.x == 0.0) != (push.y == 0.0));

        let moved = Aabb::new(a.min + push, a.max + push);
        assert!(!is_intersecting(moved, b));
        assert!(moved.max.x == b.min.x || moved.max.y == b.min.y);
    }

    #[test]
    fn separated_boxes_yield_zero() {
        let a = aabb(0.0, 0.0, 1.0, 1.0);
        assert_eq!(minimum_translation(a, aabb(5.0, 5.0, 1.0, 1.0)), Point::ZERO);
        assert_eq!(minimum_translation(a, aabb(1.0, 0.0, 1.0, 1.0)), Point::ZERO);
    }

    // -- 3. Component ------------------------------------------------------

    #[test]
    fn extra_inflates_half_per_side() {
        let space = SpaceComponent::new(Point::new(10.0, 10.0), 10.0, 10.0);
        let collision = CollisionComponent::new(true, true).with_extra(Point::new(4.0, 2.0));
        assert_eq!(collision.inflated(&space), aabb(8.0, 9.0, 14.0, 12.0));
    }
}
