//! The controlled car.
//!
//! [`AutomatedCar`] wraps a [`WorldObject`] of kind
//! [`ObjectKind::ControlledVehicle`] and adds the state the physics core
//! owns: mass, health, speed and the powertrain bundle. Sensor overlay
//! geometry is carried for rendering collaborators.

use glam::{IVec2, Vec2};
use polygrid::Polygon;
use serde::{Deserialize, Serialize};

use super::{Collidable, Movable, ObjectKind, WorldObject};
use crate::powertrain::Powertrain;

/// Tunables for the controlled car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarConfig {
    /// Asset identifier.
    pub asset: String,
    /// Mass used for impulse transfer.
    pub mass: f32,
    /// Starting (and maximum) health.
    pub max_health: i32,
    /// Footprint length along the heading, in pixels.
    pub length: f32,
    /// Footprint width across the heading, in pixels.
    pub width: f32,
}

impl Default for CarConfig {
    fn default() -> Self {
        Self {
            asset: "car_1_white".to_string(),
            mass: 5.0,
            max_health: 100,
            length: 240.0,
            width: 108.0,
        }
    }
}

impl CarConfig {
    /// Rectangular footprint in local coordinates, heading along +x.
    #[must_use]
    pub fn footprint(&self) -> Polygon {
        Polygon::rectangle(Vec2::ZERO, Vec2::new(self.length, self.width))
    }

    /// Centre of the footprint, used as the rotation pivot.
    #[must_use]
    pub fn pivot(&self) -> Vec2 {
        Vec2::new(self.length, self.width) * 0.5
    }
}

/// Position and heading of the car.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CarPose {
    /// Position in world pixels.
    pub position: Vec2,
    /// Heading in radians.
    pub heading: f32,
}

impl CarPose {
    /// Creates a pose.
    #[must_use]
    pub const fn new(position: Vec2, heading: f32) -> Self {
        Self { position, heading }
    }
}

bitflags::bitflags! {
    /// Which sensor overlays are drawn.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SensorFlags: u8 {
        /// Radar cone.
        const RADAR = 1;
        /// Ultrasound cones.
        const ULTRASOUND = 1 << 1;
    }
}

impl Default for SensorFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// Render-only sensor overlay state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorOverlay {
    /// Visible overlays.
    pub visible: SensorFlags,
    /// Radar cone outline in world coordinates.
    pub radar: Vec<Vec2>,
    /// One outline per ultrasound sensor.
    pub ultrasound: Vec<Vec<Vec2>>,
}

/// The single controlled vehicle of a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomatedCar {
    object: WorldObject,
    /// Mass used for impulse transfer.
    pub mass: f32,
    health: i32,
    max_health: i32,
    /// Speed in pixels per tick, produced by the engine.
    pub speed: f32,
    /// Sensor overlay geometry for rendering.
    pub sensors: SensorOverlay,
    powertrain: Powertrain,
}

impl AutomatedCar {
    /// Creates a car at `position` facing `heading`.
    #[must_use]
    pub fn new(position: IVec2, heading: f32, config: &CarConfig, powertrain: Powertrain) -> Self {
        let object = WorldObject::with_kind(ObjectKind::ControlledVehicle, config.asset.clone(), position)
            .with_polygons(vec![config.footprint()])
            .with_pivot(config.pivot())
            .with_heading(heading)
            .with_z_index(10);
        Self {
            object,
            mass: config.mass,
            health: config.max_health,
            max_health: config.max_health,
            speed: 0.0,
            sensors: SensorOverlay::default(),
            powertrain,
        }
    }

    /// The underlying world object.
    #[must_use]
    pub fn object(&self) -> &WorldObject {
        &self.object
    }

    /// Mutable access to the underlying world object.
    #[must_use]
    pub fn object_mut(&mut self) -> &mut WorldObject {
        &mut self.object
    }

    /// Committed position.
    #[must_use]
    pub fn position(&self) -> IVec2 {
        self.object.position
    }

    /// Committed heading in radians.
    #[must_use]
    pub fn heading(&self) -> f32 {
        self.object.heading
    }

    /// Committed pose as floats.
    #[must_use]
    pub fn pose(&self) -> CarPose {
        CarPose::new(self.object.position_f32(), self.object.heading)
    }

    /// Current health in `[0, max_health]`.
    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health
    }

    /// Health the car started with.
    #[must_use]
    pub const fn max_health(&self) -> i32 {
        self.max_health
    }

    /// Returns `true` once health has reached zero.
    #[must_use]
    pub const fn is_wrecked(&self) -> bool {
        self.health == 0
    }

    /// Reduces health by `amount`, saturating at zero.
    ///
    /// Negative amounts are ignored so health never increases. Returns the
    /// damage actually taken.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        let amount = amount.max(0);
        let before = self.health;
        self.health = self.health.saturating_sub(amount).max(0);
        before - self.health
    }

    /// Applies collision damage from the impact velocities of both parties.
    ///
    /// Damage is `|(cx + cy) - (ox + oy)|` with every component truncated to
    /// an integer. Returns the damage actually taken.
    pub fn damage_on_collision(&mut self, car_velocity: Vec2, other_velocity: Vec2) -> i32 {
        self.apply_damage(collision_damage(car_velocity, other_velocity))
    }

    /// Footprint contours placed at `pose`.
    #[must_use]
    pub fn footprint_at(&self, pose: CarPose) -> Vec<Polygon> {
        self.object.polygons_at(pose.position, pose.heading)
    }

    /// The powertrain bundle.
    #[must_use]
    pub fn powertrain(&self) -> &Powertrain {
        &self.powertrain
    }

    /// Mutable access to the powertrain bundle.
    #[must_use]
    pub fn powertrain_mut(&mut self) -> &mut Powertrain {
        &mut self.powertrain
    }

    /// Commits a resolved pose, truncating the position to whole pixels.
    pub fn commit(&mut self, position: Vec2, heading: f32) {
        self.object.move_to(position.as_ivec2());
        self.object.heading = heading;
    }
}

/// Damage dealt by a collision between two impact velocities.
///
/// Saturates at `i32::MAX` for impacts too large to represent.
#[must_use]
pub fn collision_damage(car_velocity: Vec2, other_velocity: Vec2) -> i32 {
    let car = car_velocity.as_ivec2();
    let other = other_velocity.as_ivec2();
    car.x
        .saturating_add(car.y)
        .saturating_sub(other.x.saturating_add(other.y))
        .saturating_abs()
}

impl Collidable for AutomatedCar {
    fn is_collidable(&self) -> bool {
        !self.object.polygons.is_empty()
    }

    fn world_polygons(&self) -> Vec<Polygon> {
        self.object.world_polygons()
    }
}

impl Movable for AutomatedCar {
    fn move_to(&mut self, position: IVec2) {
        self.object.move_to(position);
    }

    fn displace(&mut self, offset: Vec2) {
        self.object.displace(offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car_at(x: i32, y: i32) -> AutomatedCar {
        AutomatedCar::new(
            IVec2::new(x, y),
            0.0,
            &CarConfig::default(),
            Powertrain::default(),
        )
    }

    mod damage_tests {
        use super::*;

        #[test]
        fn damage_formula_matches_reference_numbers() {
            // current (0,0) -> candidate (10,0): impact 2 * (10,0)
            assert_eq!(collision_damage(Vec2::new(20.0, 0.0), Vec2::ZERO), 20);
        }

        #[test]
        fn damage_is_absolute() {
            assert_eq!(collision_damage(Vec2::new(-20.0, -4.0), Vec2::ZERO), 24);
            assert_eq!(collision_damage(Vec2::new(3.0, 4.0), Vec2::new(1.0, 1.0)), 5);
        }

        #[test]
        fn components_truncate() {
            assert_eq!(collision_damage(Vec2::new(1.9, 1.9), Vec2::ZERO), 2);
        }

        #[test]
        fn huge_impacts_saturate() {
            assert_eq!(collision_damage(Vec2::splat(f32::MAX), Vec2::ZERO), i32::MAX);
            assert_eq!(collision_damage(Vec2::splat(f32::MAX), Vec2::splat(-f32::MAX)), i32::MAX);
            assert_eq!(collision_damage(Vec2::splat(-f32::MAX), Vec2::ZERO), i32::MAX);
            assert_eq!(collision_damage(Vec2::new(f32::MAX, -f32::MAX), Vec2::ZERO), 1);

            let mut car = car_at(0, 0);
            let damage = collision_damage(Vec2::splat(f32::MAX), Vec2::splat(-f32::MAX));
            assert_eq!(car.apply_damage(damage), 100);
            assert_eq!(car.health(), 0);
        }

        #[test]
        fn health_saturates_at_zero() {
            let mut car = car_at(0, 0);
            let taken = car.apply_damage(250);
            assert_eq!(taken, 100);
            assert_eq!(car.health(), 0);
            assert!(car.is_wrecked());
            assert_eq!(car.apply_damage(10), 0);
            assert_eq!(car.health(), 0);
        }

        #[test]
        fn negative_damage_does_not_heal() {
            let mut car = car_at(0, 0);
            car.apply_damage(30);
            assert_eq!(car.apply_damage(-50), 0);
            assert_eq!(car.health(), 70);
        }

        #[test]
        fn repeated_collisions_never_increase_health() {
            let mut car = car_at(0, 0);
            let mut last = car.health();
            for i in 0..30 {
                #[allow(clippy::cast_precision_loss)]
                let v = Vec2::new(i as f32 - 15.0, 3.0);
                car.damage_on_collision(v, Vec2::ZERO);
                assert!(car.health() <= last);
                assert!(car.health() >= 0);
                last = car.health();
            }
        }
    }

    mod pose_tests {
        use super::*;

        #[test]
        fn new_car_is_full_health_and_still() {
            let car = car_at(10, 20);
            assert_eq!(car.health(), 100);
            assert_eq!(car.max_health(), 100);
            assert_eq!(car.speed, 0.0);
            assert_eq!(car.position(), IVec2::new(10, 20));
            assert_eq!(car.object().kind(), &ObjectKind::ControlledVehicle);
        }

        #[test]
        fn commit_truncates_position() {
            let mut car = car_at(0, 0);
            car.commit(Vec2::new(10.9, -3.7), 0.5);
            assert_eq!(car.position(), IVec2::new(10, -3));
            assert_eq!(car.heading(), 0.5);
        }

        #[test]
        fn footprint_is_centred_on_position() {
            let car = car_at(500, 500);
            let footprint = car.footprint_at(car.pose());
            assert!(footprint[0].contains(Vec2::new(500.0, 500.0)));
            assert!(footprint[0].contains(Vec2::new(619.0, 500.0)));
            assert!(!footprint[0].contains(Vec2::new(500.0, 560.0)));
        }

        #[test]
        fn sensors_visible_by_default() {
            let car = car_at(0, 0);
            assert_eq!(car.sensors.visible, SensorFlags::all());
        }
    }
}
