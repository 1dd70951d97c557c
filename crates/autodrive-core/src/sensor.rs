//! Sensor fields of view.
//!
//! Each sensor is a triangle anchored on the car body. The module computes
//! the triangles for a pose and lists the objects inside them; deciding what
//! to do about those objects is left to driver-assist collaborators.
//!
//! # Example
//!
//! ```
//! use autodrive_core::entity::CarPose;
//! use autodrive_core::sensor::FieldOfView;
//! use glam::Vec2;
//!
//! let radar = FieldOfView::radar();
//! let [apex, _, _] = radar.triangle(&CarPose::new(Vec2::ZERO, 0.0));
//! assert!((apex - Vec2::new(120.0, 0.0)).length() < 1e-4);
//! ```

use glam::{Mat2, Vec2};
use polygrid::{unit, QueryRegion};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::{CarPose, ObjectId, SensorFlags, SensorOverlay};
use crate::world::World;

/// A triangular field of view mounted on the car.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldOfView {
    /// Mount point in car coordinates (x along the heading, y to the left).
    pub mount: Vec2,
    /// Look direction relative to the heading, in degrees.
    pub rotation: f32,
    /// Reach from the mount point in pixels.
    pub range: f32,
    /// Half of the opening angle, in degrees.
    pub half_angle: f32,
}

impl FieldOfView {
    /// Forward radar: 60° cone, 200 px deep, 120 px ahead of the centre.
    #[must_use]
    pub const fn radar() -> Self {
        Self {
            mount: Vec2::new(120.0, 0.0),
            rotation: 0.0,
            range: 200.0,
            half_angle: 30.0,
        }
    }

    /// Ultrasound sensor at `(x, y)` looking `rotation` degrees off the heading.
    #[must_use]
    pub const fn ultrasound(x: f32, y: f32, rotation: f32) -> Self {
        Self {
            mount: Vec2::new(x, y),
            rotation,
            range: 150.0,
            half_angle: 50.0,
        }
    }

    /// The eight parking sensors around the body.
    #[must_use]
    pub fn ultrasound_ring() -> Vec<Self> {
        vec![
            Self::ultrasound(110.0, 30.0, 0.0),
            Self::ultrasound(105.0, 45.0, 90.0),
            Self::ultrasound(110.0, -30.0, 0.0),
            Self::ultrasound(105.0, -45.0, -90.0),
            Self::ultrasound(-120.0, 25.0, 180.0),
            Self::ultrasound(-105.0, 45.0, 90.0),
            Self::ultrasound(-120.0, -25.0, 180.0),
            Self::ultrasound(-105.0, -45.0, -90.0),
        ]
    }

    /// Triangle in world coordinates: apex first, then the two far corners.
    #[must_use]
    pub fn triangle(&self, pose: &CarPose) -> [Vec2; 3] {
        let apex = pose.position + Mat2::from_angle(pose.heading) * self.mount;
        let look = pose.heading + self.rotation.to_radians();
        let spread = self.half_angle.to_radians();
        [
            apex,
            apex + unit(look - spread) * self.range,
            apex + unit(look + spread) * self.range,
        ]
    }

    /// The triangle as a query region.
    #[must_use]
    pub fn region(&self, pose: &CarPose) -> QueryRegion {
        QueryRegion::Triangle(self.triangle(pose))
    }

    /// Objects inside the field of view, the car excluded, in insertion order.
    #[must_use]
    pub fn detect(&self, world: &World) -> Vec<ObjectId> {
        world.objects_in_region(&self.region(&world.car().pose()), Some(World::CAR_ID))
    }
}

/// Objects seen by each sensor during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Radar contacts.
    pub radar: Vec<ObjectId>,
    /// Contacts per ultrasound sensor, in mount order.
    pub ultrasound: Vec<Vec<ObjectId>>,
}

/// Radar plus the ultrasound ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSuite {
    /// Forward radar.
    pub radar: FieldOfView,
    /// Parking sensors.
    pub ultrasounds: Vec<FieldOfView>,
}

impl Default for SensorSuite {
    fn default() -> Self {
        Self {
            radar: FieldOfView::radar(),
            ultrasounds: FieldOfView::ultrasound_ring(),
        }
    }
}

impl SensorSuite {
    /// Queries every sensor against the world.
    #[must_use]
    pub fn scan(&self, world: &World) -> SensorReading {
        SensorReading {
            radar: self.radar.detect(world),
            ultrasound: self
                .ultrasounds
                .par_iter()
                .map(|sensor| sensor.detect(world))
                .collect(),
        }
    }

    /// Writes the outlines of the visible sensors into `overlay`.
    pub fn draw(&self, pose: &CarPose, overlay: &mut SensorOverlay) {
        overlay.radar.clear();
        overlay.ultrasound.clear();
        if overlay.visible.contains(SensorFlags::RADAR) {
            overlay.radar = self.radar.triangle(pose).to_vec();
        }
        if overlay.visible.contains(SensorFlags::ULTRASOUND) {
            overlay.ultrasound = self
                .ultrasounds
                .iter()
                .map(|sensor| sensor.triangle(pose).to_vec())
                .collect();
        }
    }
}
