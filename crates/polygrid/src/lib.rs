//! # Polygrid
//!
//! Polygon geometry and a uniform-grid spatial index for flat 2D worlds.
//!
//! Polygrid answers one question quickly: *which stored shapes overlap this
//! region?* Shapes are closed polygon contours in world coordinates, regions
//! are triangles, rectangles or arbitrary contours. It knows nothing about
//! what the shapes represent; callers key them by their own identifiers.
//!
//! - [`Polygon`]: closed contour with containment and overlap tests
//! - [`RigidTransform`]: rotation about a pivot plus translation
//! - [`QueryRegion`]: triangle / rectangle / polygon query shapes
//! - [`GridIndex`]: bucketed broad phase with an exact narrow phase
//!
//! ## Quick Start
//!
//! ```
//! use glam::Vec2;
//! use polygrid::{GridIndex, GridConfig, Polygon, QueryRegion, RigidTransform};
//!
//! let mut grid = GridIndex::new(GridConfig::default()).unwrap();
//!
//! // A 20x20 tree trunk placed at (300, 200), pivot at its centre.
//! let local = Polygon::rectangle(Vec2::ZERO, Vec2::splat(20.0));
//! let placed = local.transformed(&RigidTransform::new(Vec2::new(300.0, 200.0), 0.0, Vec2::splat(10.0)));
//! grid.insert(0u64, vec![placed]);
//!
//! let cone = QueryRegion::Triangle([
//!     Vec2::new(250.0, 200.0),
//!     Vec2::new(400.0, 150.0),
//!     Vec2::new(400.0, 250.0),
//! ]);
//! assert_eq!(grid.query(&cone), vec![0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod grid;
pub mod polygon;
pub mod query;

// Re-exports for convenience
pub use grid::{GridConfig, GridError, GridIndex};
pub use polygon::{heading_of, segments_intersect, unit, Polygon, RigidTransform};
pub use query::QueryRegion;

use glam::Vec2;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Aabb {
    /// Create a box from min/max corners.
    #[must_use]
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, `None` for an empty slice.
    #[must_use]
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Some(Self { min, max })
    }

    /// Get the center of the box.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Get the size of the box.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Check if a point is inside the box (inclusive).
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Check if two boxes overlap (touching counts).
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Smallest box containing both.
    #[must_use]
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}
