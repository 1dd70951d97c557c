//! World module: the container for every placed object and the controlled car.
//!
//! The World provides:
//! - Object storage with deterministic iteration order (`BTreeMap`)
//! - A polygon spatial index for region queries
//! - The single controlled [`AutomatedCar`]
//! - Viewport placement for rendering collaborators
//!
//! # Ids
//!
//! The car always carries [`World::CAR_ID`]. Placed objects get increasing
//! ids starting after it, so sorting by id is sorting by insertion order.
//!
//! # Spatial Index Synchronization
//!
//! The index is NOT updated when an object is changed through
//! [`World::get_mut`]. Call [`World::update_spatial`] afterwards, or use
//! [`World::move_object`] / [`World::displace_object`] which do it for you.
//!
//! # Example
//!
//! ```
//! use autodrive_core::entity::{AutomatedCar, WorldObject};
//! use autodrive_core::entity::car::CarConfig;
//! use autodrive_core::powertrain::Powertrain;
//! use autodrive_core::world::World;
//! use glam::{IVec2, UVec2, Vec2};
//! use polygrid::{GridConfig, Polygon, QueryRegion};
//!
//! let car = AutomatedCar::new(IVec2::new(100, 100), 0.0, &CarConfig::default(), Powertrain::default());
//! let mut world = World::new(UVec2::new(2000, 2000), UVec2::new(800, 600), car, GridConfig::default()).unwrap();
//!
//! let tree = world.add_object(
//!     WorldObject::new("tree", IVec2::new(600, 100))
//!         .with_polygons(vec![Polygon::rectangle(Vec2::ZERO, Vec2::splat(40.0))])
//!         .with_pivot(Vec2::splat(20.0)),
//! );
//!
//! let ahead = QueryRegion::rect(Vec2::new(550.0, 50.0), Vec2::new(650.0, 150.0));
//! assert_eq!(world.objects_in_region(&ahead, None), vec![tree]);
//! ```

use std::collections::BTreeMap;

use glam::{IVec2, UVec2, Vec2};
use polygrid::{GridConfig, GridError, GridIndex, QueryRegion};

use crate::entity::{AutomatedCar, Collidable, Movable, ObjectId, ObjectKind, WorldObject};

/// Simulated world.
#[derive(Debug, Clone)]
pub struct World {
    size: UVec2,
    viewport: UVec2,
    /// Next id handed to a placed object.
    next_id: u64,
    /// Placed objects in insertion order.
    objects: BTreeMap<ObjectId, WorldObject>,
    car: AutomatedCar,
    index: GridIndex<ObjectId>,
}

impl World {
    /// Id of the controlled car.
    pub const CAR_ID: ObjectId = ObjectId::new(0);

    /// Creates a world holding only the controlled car.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if the grid configuration is invalid.
    pub fn new(
        size: UVec2,
        viewport: UVec2,
        mut car: AutomatedCar,
        grid: GridConfig,
    ) -> Result<Self, GridError> {
        car.object_mut().set_id(Self::CAR_ID);
        let mut world = Self {
            size,
            viewport,
            next_id: Self::CAR_ID.as_u64() + 1,
            objects: BTreeMap::new(),
            car,
            index: GridIndex::new(grid)?,
        };
        world.sync_car();
        Ok(world)
    }

    /// Adds an object and returns its id.
    ///
    /// Duplicates are allowed; every call yields a fresh id.
    pub fn add_object(&mut self, mut object: WorldObject) -> ObjectId {
        let id = ObjectId::new(self.next_id);
        self.next_id += 1;
        object.set_id(id);
        self.index.insert(id, object.world_polygons());
        tracing::trace!(%id, kind = %object.kind(), asset = %object.asset, "object added");
        self.objects.insert(id, object);
        id
    }

    /// Removes an object. The car cannot be removed.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<WorldObject> {
        let removed = self.objects.remove(&id)?;
        self.index.remove(id);
        Some(removed)
    }

    /// Returns an object by id; [`World::CAR_ID`] yields the car's object.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&WorldObject> {
        if id == Self::CAR_ID {
            Some(self.car.object())
        } else {
            self.objects.get(&id)
        }
    }

    /// Mutable access to a placed object. Call [`World::update_spatial`]
    /// after changing its pose or shape.
    #[must_use]
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut WorldObject> {
        self.objects.get_mut(&id)
    }

    /// Re-indexes one object after its pose or shape changed.
    pub fn update_spatial(&mut self, id: ObjectId) {
        if id == Self::CAR_ID {
            self.sync_car();
        } else if let Some(object) = self.objects.get(&id) {
            self.index.insert(id, object.world_polygons());
        }
    }

    /// Places an object at `position`. Returns `false` for unknown ids.
    pub fn move_object(&mut self, id: ObjectId, position: IVec2) -> bool {
        let Some(object) = self.objects.get_mut(&id) else {
            return false;
        };
        object.move_to(position);
        self.update_spatial(id);
        true
    }

    /// Shifts a movable object by `offset`, truncating to whole pixels.
    /// Returns the new position, or `None` for unknown ids and for kinds
    /// that are not [movable](ObjectKind::is_movable).
    pub fn displace_object(&mut self, id: ObjectId, offset: Vec2) -> Option<IVec2> {
        let object = self.objects.get_mut(&id).filter(|o| o.kind().is_movable())?;
        object.displace(offset);
        let position = object.position;
        self.update_spatial(id);
        Some(position)
    }

    /// Placed objects in insertion order (the car excluded).
    pub fn objects(&self) -> impl Iterator<Item = &WorldObject> + '_ {
        self.objects.values()
    }

    /// Ids of placed objects in insertion order.
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.keys().copied()
    }

    /// Number of placed objects (the car excluded).
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// The controlled car.
    #[must_use]
    pub fn car(&self) -> &AutomatedCar {
        &self.car
    }

    /// Mutable access to the controlled car. Call [`World::sync_car`] after
    /// changing its pose.
    #[must_use]
    pub fn car_mut(&mut self) -> &mut AutomatedCar {
        &mut self.car
    }

    /// Re-indexes the car footprint.
    pub fn sync_car(&mut self) {
        self.index.insert(Self::CAR_ID, self.car.world_polygons());
    }

    /// World size in pixels.
    #[must_use]
    pub const fn size(&self) -> UVec2 {
        self.size
    }

    /// Visible area in pixels.
    #[must_use]
    pub const fn viewport(&self) -> UVec2 {
        self.viewport
    }

    /// The spatial index.
    #[must_use]
    pub fn index(&self) -> &GridIndex<ObjectId> {
        &self.index
    }

    /// Top-left corner of the visible area.
    ///
    /// Keeps the car centred and clamps to the world edges. A viewport larger
    /// than the world pins the origin to zero.
    #[must_use]
    pub fn viewport_origin(&self) -> IVec2 {
        let size = self.size.as_ivec2();
        let visible = self.viewport.as_ivec2();
        let max = (size - visible).max(IVec2::ZERO);
        (self.car.position() - visible / 2).clamp(IVec2::ZERO, max)
    }

    // =========================================================================
    // Region queries
    // =========================================================================

    /// Every object whose world polygons share a point with `region`, in
    /// insertion order. `exclude` drops one id from the result.
    ///
    /// Objects without polygons never match.
    #[must_use]
    pub fn objects_in_region(&self, region: &QueryRegion, exclude: Option<ObjectId>) -> Vec<ObjectId> {
        let mut hits = self.index.query(region);
        if let Some(skip) = exclude {
            hits.retain(|id| *id != skip);
        }
        hits
    }

    /// Linear-scan variant of [`World::objects_in_region`].
    #[must_use]
    pub fn objects_in_region_linear(
        &self,
        region: &QueryRegion,
        exclude: Option<ObjectId>,
    ) -> Vec<ObjectId> {
        let mut hits = self.index.query_linear(region);
        if let Some(skip) = exclude {
            hits.retain(|id| *id != skip);
        }
        hits
    }

    /// Trees overlapping `region`.
    #[must_use]
    pub fn trees_in_region(&self, region: &QueryRegion) -> Vec<ObjectId> {
        self.kind_in_region(region, |kind| matches!(kind, ObjectKind::Tree))
    }

    /// Signs overlapping `region`.
    #[must_use]
    pub fn signs_in_region(&self, region: &QueryRegion) -> Vec<ObjectId> {
        self.kind_in_region(region, |kind| matches!(kind, ObjectKind::Sign { .. }))
    }

    /// Road tiles overlapping `region`.
    #[must_use]
    pub fn roads_in_region(&self, region: &QueryRegion) -> Vec<ObjectId> {
        self.kind_in_region(region, |kind| matches!(kind, ObjectKind::Road))
    }

    fn kind_in_region(&self, region: &QueryRegion, keep: impl Fn(&ObjectKind) -> bool) -> Vec<ObjectId> {
        self.objects_in_region(region, Some(Self::CAR_ID))
            .into_iter()
            .filter(|id| self.objects.get(id).is_some_and(|o| keep(o.kind())))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
