//! Entity module for world objects and the controlled car.
//!
//! This module provides the placed entities of the simulated world:
//! - [`ObjectId`]: Unique identifier, assigned by the world in insertion order
//! - [`ObjectKind`]: Tagged classification driving collision behaviour
//! - [`ObjectFlags`]: Collidable / highlighted bits
//! - [`WorldObject`]: Position, heading, pivot, size and local collision contours
//! - [`AutomatedCar`]: The one controlled vehicle, wrapping a `WorldObject`
//!
//! # Architecture
//!
//! Instead of a class hierarchy the entity system is a single record plus a
//! kind tag. Behaviour that only some kinds have is expressed through the
//! [`Collidable`] and [`Movable`] capability traits.
//!
//! # Example
//!
//! ```
//! use autodrive_core::entity::{ObjectKind, WorldObject, Collidable};
//! use glam::{IVec2, Vec2};
//! use polygrid::Polygon;
//!
//! let tree = WorldObject::new("tree", IVec2::new(300, 200))
//!     .with_polygons(vec![Polygon::rectangle(Vec2::ZERO, Vec2::splat(40.0))])
//!     .with_pivot(Vec2::splat(20.0));
//!
//! assert_eq!(tree.kind(), &ObjectKind::Tree);
//! assert!(tree.is_collidable());
//! assert!(tree.world_polygons()[0].contains(Vec2::new(300.0, 200.0)));
//! ```

pub mod car;

use glam::{IVec2, UVec2, Vec2};
use polygrid::{Polygon, RigidTransform};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use car::{AutomatedCar, CarPose, SensorFlags, SensorOverlay};

/// Unique identifier for a world object.
///
/// Identifiers are handed out by the world in insertion order, so ordering
/// by id is ordering by insertion.
///
/// # Example
///
/// ```
/// use autodrive_core::entity::ObjectId;
///
/// let a = ObjectId::new(1);
/// let b = ObjectId::new(2);
/// assert!(a < b);
/// assert_eq!(a.as_u64(), 1);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Creates a new `ObjectId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ObjectId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// Classification of a world object.
///
/// Only `Tree` and `Sign` take part in collision resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Immovable obstacle; stops the car dead.
    Tree,
    /// Light obstacle that gets shoved by the car.
    Sign {
        /// Sign text taken from the asset name (`roadsign_speed_50` -> `50`).
        text: String,
    },
    /// Road surface tile.
    Road,
    /// Parking space marking.
    Parking,
    /// Anything else (decoration, unknown assets).
    Generic,
    /// The controlled car itself.
    ControlledVehicle,
}

impl ObjectKind {
    /// Derives the kind from an asset identifier.
    ///
    /// ```
    /// use autodrive_core::entity::ObjectKind;
    ///
    /// assert_eq!(ObjectKind::from_asset("tree"), ObjectKind::Tree);
    /// assert_eq!(ObjectKind::from_asset("road_2lane_straight"), ObjectKind::Road);
    /// assert_eq!(
    ///     ObjectKind::from_asset("roadsign_speed_50"),
    ///     ObjectKind::Sign { text: "50".into() }
    /// );
    /// assert_eq!(ObjectKind::from_asset("garage"), ObjectKind::Generic);
    /// ```
    #[must_use]
    pub fn from_asset(asset: &str) -> Self {
        // roadsign_ must be checked before road_
        if asset.contains("roadsign_") {
            let text = asset.rsplit('_').next().unwrap_or_default().to_string();
            Self::Sign { text }
        } else if asset.contains("road_") {
            Self::Road
        } else if asset.contains("tree") {
            Self::Tree
        } else if asset.contains("parking") {
            Self::Parking
        } else {
            Self::Generic
        }
    }

    /// Returns `true` for kinds the collision resolver reacts to.
    #[must_use]
    pub const fn is_collidable(&self) -> bool {
        matches!(self, Self::Tree | Self::Sign { .. })
    }

    /// Returns `true` for kinds a collision impulse can displace.
    #[must_use]
    pub const fn is_movable(&self) -> bool {
        matches!(self, Self::Sign { .. } | Self::ControlledVehicle)
    }

    /// Short name used in logs and snapshots.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Sign { .. } => "sign",
            Self::Road => "road",
            Self::Parking => "parking",
            Self::Generic => "generic",
            Self::ControlledVehicle => "car",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags::bitflags! {
    /// Boolean properties of a world object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ObjectFlags: u8 {
        /// Participates in collision resolution.
        const COLLIDABLE = 1;
        /// Drawn highlighted (set by sensor collaborators).
        const HIGHLIGHTED = 1 << 1;
    }
}

/// A placed entity in the simulated world.
///
/// Collision contours are stored in local coordinates; the world-space shape
/// is obtained by rotating about `pivot` by `heading` and moving the pivot to
/// `position` (see [`WorldObject::transform`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    id: ObjectId,
    /// World position in integer pixels.
    pub position: IVec2,
    /// Heading in radians.
    pub heading: f32,
    /// Asset file name / identifier used for lookups.
    pub asset: String,
    /// Rotation pivot relative to the local origin.
    pub pivot: Vec2,
    /// Bounding size (width, height).
    pub size: UVec2,
    /// Render order.
    pub z_index: i32,
    /// Local collision contours.
    pub polygons: Vec<Polygon>,
    /// Collidable / highlighted bits.
    pub flags: ObjectFlags,
    kind: ObjectKind,
}

impl WorldObject {
    /// Creates an object whose kind is derived from the asset name.
    ///
    /// The id is a placeholder until the object is added to a world.
    #[must_use]
    pub fn new(asset: impl Into<String>, position: IVec2) -> Self {
        let asset = asset.into();
        let kind = ObjectKind::from_asset(&asset);
        Self::with_kind(kind, asset, position)
    }

    /// Creates an object with an explicit kind.
    #[must_use]
    pub fn with_kind(kind: ObjectKind, asset: impl Into<String>, position: IVec2) -> Self {
        let flags = if kind.is_collidable() {
            ObjectFlags::COLLIDABLE
        } else {
            ObjectFlags::empty()
        };
        Self {
            id: ObjectId::new(0),
            position,
            heading: 0.0,
            asset: asset.into(),
            pivot: Vec2::ZERO,
            size: UVec2::ZERO,
            z_index: 0,
            polygons: Vec::new(),
            flags,
            kind,
        }
    }

    /// Sets the local collision contours; size defaults to their extent.
    #[must_use]
    pub fn with_polygons(mut self, polygons: Vec<Polygon>) -> Self {
        if self.size == UVec2::ZERO {
            let extent = polygons
                .iter()
                .filter_map(Polygon::aabb)
                .map(|aabb| aabb.max)
                .reduce(Vec2::max)
                .unwrap_or(Vec2::ZERO);
            self.size = extent.max(Vec2::ZERO).ceil().as_uvec2();
        }
        self.polygons = polygons;
        self
    }

    /// Sets the rotation pivot.
    #[must_use]
    pub fn with_pivot(mut self, pivot: Vec2) -> Self {
        self.pivot = pivot;
        self
    }

    /// Sets the heading in radians.
    #[must_use]
    pub fn with_heading(mut self, heading: f32) -> Self {
        self.heading = heading;
        self
    }

    /// Sets the bounding size.
    #[must_use]
    pub fn with_size(mut self, size: UVec2) -> Self {
        self.size = size;
        self
    }

    /// Sets the render order.
    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Returns the object's identifier.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    /// Returns the object's kind.
    #[must_use]
    pub const fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Position as a float vector.
    #[must_use]
    pub fn position_f32(&self) -> Vec2 {
        self.position.as_vec2()
    }

    /// Local-to-world transform at the current pose.
    #[must_use]
    pub fn transform(&self) -> RigidTransform {
        self.transform_at(self.position_f32(), self.heading)
    }

    /// Local-to-world transform at an arbitrary pose.
    #[must_use]
    pub fn transform_at(&self, position: Vec2, heading: f32) -> RigidTransform {
        RigidTransform::new(position, heading, self.pivot)
    }

    /// World-space contours at an arbitrary pose.
    #[must_use]
    pub fn polygons_at(&self, position: Vec2, heading: f32) -> Vec<Polygon> {
        let transform = self.transform_at(position, heading);
        self.polygons
            .iter()
            .map(|poly| poly.transformed(&transform))
            .collect()
    }

    /// Returns `true` if highlighted.
    #[must_use]
    pub fn is_highlighted(&self) -> bool {
        self.flags.contains(ObjectFlags::HIGHLIGHTED)
    }

    /// Sets or clears the highlight bit.
    pub fn set_highlighted(&mut self, value: bool) {
        self.flags.set(ObjectFlags::HIGHLIGHTED, value);
    }
}

/// Objects that take part in collision detection.
pub trait Collidable {
    /// Returns `true` if the collision resolver should react to this object.
    fn is_collidable(&self) -> bool;

    /// Collision contours in world coordinates.
    fn world_polygons(&self) -> Vec<Polygon>;
}

/// Objects whose position can change after load.
pub trait Movable {
    /// Places the object at `position`.
    fn move_to(&mut self, position: IVec2);

    /// Shifts the object by `offset`, truncating towards zero.
    fn displace(&mut self, offset: Vec2);
}

impl Collidable for WorldObject {
    fn is_collidable(&self) -> bool {
        self.flags.contains(ObjectFlags::COLLIDABLE) && !self.polygons.is_empty()
    }

    fn world_polygons(&self) -> Vec<Polygon> {
        self.polygons_at(self.position_f32(), self.heading)
    }
}

impl Movable for WorldObject {
    fn move_to(&mut self, position: IVec2) {
        self.position = position;
    }

    fn displace(&mut self, offset: Vec2) {
        self.position = (self.position_f32() + offset).as_ivec2();
    }
}
