//! Query regions for spatial lookups.
//!
//! A query region is an ordered vertex list: a sensor cone or a car
//! footprint is usually a triangle, a rectangle or an arbitrary contour.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::polygon::Polygon;
use crate::Aabb;

/// Region to search for overlapping shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryRegion {
    /// Three ordered vertices.
    Triangle([Vec2; 3]),
    /// Four ordered vertices (not necessarily axis aligned).
    Rectangle([Vec2; 4]),
    /// Any closed contour.
    Polygon(Polygon),
}

impl QueryRegion {
    /// Axis-aligned rectangle query from two corners.
    #[must_use]
    pub fn rect(min: Vec2, max: Vec2) -> Self {
        Self::Rectangle([min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)])
    }

    /// Returns the region as a polygon contour.
    #[must_use]
    pub fn to_polygon(&self) -> Polygon {
        match self {
            Self::Triangle(points) => Polygon::new(points.to_vec()),
            Self::Rectangle(points) => Polygon::new(points.to_vec()),
            Self::Polygon(polygon) => polygon.clone(),
        }
    }

    /// Bounding box of the region, `None` for an empty contour.
    #[must_use]
    pub fn aabb(&self) -> Option<Aabb> {
        match self {
            Self::Triangle(points) => Aabb::from_points(points),
            Self::Rectangle(points) => Aabb::from_points(points),
            Self::Polygon(polygon) => polygon.aabb(),
        }
    }
}

impl From<Polygon> for QueryRegion {
    fn from(polygon: Polygon) -> Self {
        Self::Polygon(polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_to_polygon_keeps_order() {
        let region = QueryRegion::Triangle([Vec2::ZERO, Vec2::X, Vec2::Y]);
        assert_eq!(region.to_polygon().points(), &[Vec2::ZERO, Vec2::X, Vec2::Y]);
    }

    #[test]
    fn rect_has_four_corners() {
        let region = QueryRegion::rect(Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0));
        let aabb = region.aabb().unwrap();
        assert_eq!(aabb.min, Vec2::new(1.0, 2.0));
        assert_eq!(aabb.max, Vec2::new(3.0, 4.0));
        assert_eq!(region.to_polygon().len(), 4);
    }

    #[test]
    fn empty_polygon_region_has_no_bounds() {
        assert!(QueryRegion::Polygon(Polygon::default()).aabb().is_none());
    }
}
