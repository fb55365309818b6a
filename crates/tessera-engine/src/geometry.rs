//! 2D geometry primitives and the space component.
//!
//! All coordinates are in game units with the origin at the top-left corner
//! and Y growing downwards.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A 2D point or vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// The origin.
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Both components multiplied by `s`.
    #[inline]
    pub fn multiply_scalar(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    /// Euclidean distance to `other`.
    pub fn point_distance(self, other: Point) -> f32 {
        self.point_distance_squared(other).sqrt()
    }

    /// Squared distance to `other`.
    pub fn point_distance_squared(self, other: Point) -> f32 {
        let d = self - other;
        d.x * d.x + d.y * d.y
    }

    /// Whether both components are within `epsilon` of `other`'s.
    pub fn approx_eq(self, other: Point, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Point {
    type Output = Point;
    fn mul(self, rhs: f32) -> Point {
        self.multiply_scalar(rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

// ---------------------------------------------------------------------------
// Aabb
// ---------------------------------------------------------------------------

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point,
    pub max: Point,
}

impl Aabb {
    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// The same box with `min` and `max` swapped per axis where needed.
    pub fn ordered(&self) -> Aabb {
        Aabb::new(
            Point::new(self.min.x.min(self.max.x), self.min.y.min(self.max.y)),
            Point::new(self.min.x.max(self.max.x), self.min.y.max(self.max.y)),
        )
    }

    /// Clamp `p` into the box.
    pub fn clamp(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y.clamp(self.min.y, self.max.y),
        )
    }

    /// Grow the box by `margin` on every side.
    pub fn inflate(&self, margin: Point) -> Aabb {
        Aabb::new(self.min - margin, self.max + margin)
    }
}

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

/// A line segment between two points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub p1: Point,
    pub p2: Point,
}

impl Line {
    pub const fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    pub fn length(&self) -> f32 {
        self.p1.point_distance(self.p2)
    }

    /// Angle of the segment from `p1` to `p2`, in degrees, measured from the
    /// positive X axis.
    pub fn angle(&self) -> f32 {
        let d = self.p2 - self.p1;
        d.y.atan2(d.x).to_degrees()
    }

    /// Which side of the (infinite) line `p` lies on: negative on one side,
    /// positive on the other, zero on the line.
    pub fn point_side(&self, p: Point) -> f32 {
        (self.p2.x - self.p1.x) * (p.y - self.p1.y) - (self.p2.y - self.p1.y) * (p.x - self.p1.x)
    }
}

// ---------------------------------------------------------------------------
// SpaceComponent
// ---------------------------------------------------------------------------

/// Where an entity is and how much room it takes.
///
/// `position` is the top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceComponent {
    pub position: Point,
    pub width: f32,
    pub height: f32,
}

impl SpaceComponent {
    pub fn new(position: Point, width: f32, height: f32) -> Self {
        Self {
            position,
            width,
            height,
        }
    }

    /// The box spanned by the component.
    pub fn aabb(&self) -> Aabb {
        Aabb::new(
            self.position,
            Point::new(self.position.x + self.width, self.position.y + self.height),
        )
    }

    /// The centre of the box.
    pub fn center(&self) -> Point {
        Point::new(
            self.position.x + self.width / 2.0,
            self.position.y + self.height / 2.0,
        )
    }

    /// Move the box so that its centre is at `p`.
    pub fn set_center(&mut self, p: Point) {
        self.position = Point::new(p.x - self.width / 2.0, p.y - self.height / 2.0);
    }

    /// Whether `p` lies strictly inside the box.
    pub fn contains(&self, p: Point) -> bool {
        p.x > self.position.x
            && p.x < self.position.x + self.width
            && p.y > self.position.y
            && p.y < self.position.y + self.height
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, -1.0);
        assert_eq!(a + b, Point::new(4.0, 1.0));
        assert_eq!(a - b, Point::new(-2.0, 3.0));
        assert_eq!(a * 2.0, Point::new(2.0, 4.0));
        assert_eq!(-a, Point::new(-1.0, -2.0));

        let mut c = a;
        c += b;
        c -= Point::new(1.0, 1.0);
        assert_eq!(c, Point::new(3.0, 0.0));
    }

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.point_distance(b), 5.0);
        assert_eq!(a.point_distance_squared(b), 25.0);
    }

    #[test]
    fn aabb_clamp_and_inflate() {
        let bounds = Aabb::new(Point::ZERO, Point::new(100.0, 50.0));
        assert_eq!(bounds.clamp(Point::new(-5.0, 70.0)), Point::new(0.0, 50.0));
        assert_eq!(bounds.width(), 100.0);
        assert_eq!(bounds.height(), 50.0);

        let grown = bounds.inflate(Point::new(1.0, 2.0));
        assert_eq!(grown.min, Point::new(-1.0, -2.0));
        assert_eq!(grown.max, Point::new(101.0, 52.0));
    }

    #[test]
    fn line_measurements() {
        let line = Line::new(Point::ZERO, Point::new(0.0, 10.0));
        assert_eq!(line.length(), 10.0);
        assert!((line.angle() - 90.0).abs() < 1e-4);

        assert!(line.point_side(Point::new(-1.0, 5.0)) > 0.0);
        assert!(line.point_side(Point::new(1.0, 5.0)) < 0.0);
        assert_eq!(line.point_side(Point::new(0.0, 3.0)), 0.0);
    }

    #[test]
    fn space_aabb_spans_size() {
        let space = SpaceComponent::new(Point::new(5.0, 5.0), 10.0, 20.0);
        let aabb = space.aabb();
        assert_eq!(aabb.min, Point::new(5.0, 5.0));
        assert_eq!(aabb.max, Point::new(15.0, 25.0));
    }

    #[test]
    fn space_center_roundtrip() {
        let mut space = SpaceComponent::new(Point::ZERO, 10.0, 4.0);
        space.set_center(Point::new(50.0, 50.0));
        assert_eq!(space.position, Point::new(45.0, 48.0));
        assert_eq!(space.center(), Point::new(50.0, 50.0));
    }

    #[test]
    fn space_contains_is_strict() {
        let space = SpaceComponent::new(Point::ZERO, 10.0, 10.0);
        assert!(space.contains(Point::new(5.0, 5.0)));
        assert!(!space.contains(Point::new(0.0, 5.0)));
        assert!(!space.contains(Point::new(10.0, 5.0)));
    }
}
