//! Closed polygon contours and the overlap tests built on them.
//!
//! Contours are stored as ordered vertex lists; the closing edge from the last
//! vertex back to the first is implicit. Every test here treats the boundary
//! as part of the polygon, so two shapes that merely touch are reported as
//! overlapping.

use glam::{Mat2, Vec2};
use serde::{Deserialize, Serialize};

use crate::Aabb;

/// Tolerance for collinearity checks in segment tests.
const EPSILON: f32 = 1e-4;

/// A closed polygon contour.
///
/// # Example
///
/// ```
/// use glam::Vec2;
/// use polygrid::Polygon;
///
/// let square = Polygon::rectangle(Vec2::ZERO, Vec2::new(10.0, 10.0));
/// assert!(square.contains(Vec2::new(5.0, 5.0)));
/// assert!(square.contains(Vec2::new(10.0, 5.0))); // boundary counts
/// assert!(!square.contains(Vec2::new(11.0, 5.0)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Vec2>,
}

impl Polygon {
    /// Creates a polygon from an ordered vertex list.
    #[must_use]
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    /// Creates an axis-aligned rectangle spanning `min` to `max`.
    #[must_use]
    pub fn rectangle(min: Vec2, max: Vec2) -> Self {
        Self::new(vec![
            min,
            Vec2::new(max.x, min.y),
            max,
            Vec2::new(min.x, max.y),
        ])
    }

    /// Returns the vertices in order.
    #[must_use]
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Returns `true` if the contour has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Bounding box of the contour, or `None` when empty.
    #[must_use]
    pub fn aabb(&self) -> Option<Aabb> {
        Aabb::from_points(&self.points)
    }

    /// Iterates the edges, including the closing edge.
    ///
    /// A single-vertex polygon yields one degenerate edge so that
    /// point-like shapes still take part in segment tests.
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Point-in-polygon test (even-odd rule, boundary inclusive).
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        if self.points.len() < 3 {
            return self.edges().any(|(a, b)| point_on_segment(point, a, b));
        }
        if self.edges().any(|(a, b)| point_on_segment(point, a, b)) {
            return true;
        }

        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > point.y) != (b.y > point.y) {
                let x_cross = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if point.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Returns `true` if the two contours share at least one point.
    ///
    /// Empty contours never intersect anything.
    #[must_use]
    pub fn intersects(&self, other: &Polygon) -> bool {
        let (Some(a_box), Some(b_box)) = (self.aabb(), other.aabb()) else {
            return false;
        };
        if !a_box.intersects(&b_box) {
            return false;
        }

        for (a1, a2) in self.edges() {
            for (b1, b2) in other.edges() {
                if segments_intersect(a1, a2, b1, b2) {
                    return true;
                }
            }
        }

        // No crossing edges: either disjoint or one fully inside the other.
        other.contains(self.points[0]) || self.contains(other.points[0])
    }

    /// Applies a rigid transform to every vertex.
    #[must_use]
    pub fn transformed(&self, transform: &RigidTransform) -> Polygon {
        Polygon::new(self.points.iter().map(|p| transform.apply(*p)).collect())
    }
}

impl From<Vec<Vec2>> for Polygon {
    fn from(points: Vec<Vec2>) -> Self {
        Self::new(points)
    }
}

/// Rotation about a pivot followed by a translation.
///
/// Maps a local point `p` to `translation + R(rotation) * (p - pivot)`, which
/// places the pivot exactly at `translation`.
///
/// # Example
///
/// ```
/// use glam::Vec2;
/// use polygrid::RigidTransform;
///
/// let t = RigidTransform::new(Vec2::new(100.0, 100.0), std::f32::consts::FRAC_PI_2, Vec2::new(5.0, 0.0));
/// let p = t.apply(Vec2::new(10.0, 0.0));
/// assert!((p - Vec2::new(100.0, 105.0)).length() < 1e-4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    /// Where the pivot lands in world space.
    pub translation: Vec2,
    /// Rotation in radians (counter-clockwise in a y-up frame).
    pub rotation: f32,
    /// Local-space rotation pivot.
    pub pivot: Vec2,
}

impl RigidTransform {
    /// Creates a transform.
    #[must_use]
    pub const fn new(translation: Vec2, rotation: f32, pivot: Vec2) -> Self {
        Self {
            translation,
            rotation,
            pivot,
        }
    }

    /// Transforms a single local point into world space.
    #[must_use]
    pub fn apply(&self, point: Vec2) -> Vec2 {
        self.translation + Mat2::from_angle(self.rotation) * (point - self.pivot)
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 0.0, Vec2::ZERO)
    }
}

/// Unit vector pointing along `angle` radians.
#[must_use]
pub fn unit(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Heading angle of a direction vector, in radians.
#[must_use]
pub fn heading_of(direction: Vec2) -> f32 {
    direction.y.atan2(direction.x)
}

fn orientation(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

fn point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> bool {
    if orientation(a, b, p).abs() > EPSILON * (b - a).length().max(1.0) {
        return false;
    }
    p.x >= a.x.min(b.x) - EPSILON
        && p.x <= a.x.max(b.x) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
}

/// Returns `true` if segments `a1-a2` and `b1-b2` share a point.
#[must_use]
pub fn segments_intersect(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    point_on_segment(a1, b1, b2)
        || point_on_segment(a2, b1, b2)
        || point_on_segment(b1, a1, a2)
        || point_on_segment(b2, a1, a2)
}
