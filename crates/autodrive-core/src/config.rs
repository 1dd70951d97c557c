//! Simulation tunables and world scenario loading.
//!
//! Two documents configure a run:
//!
//! - [`SimConfig`]: engine, steering, car, grid and sensor tunables plus the
//!   tick rate. Every field has a default, so `{}` is a valid document.
//! - [`WorldConfig`]: the scenario. Object placements reference assets by
//!   name; polygon shapes and rotation points are keyed by the same names and
//!   joined on load by [`World::from_config`].
//!
//! # Example
//!
//! ```
//! use autodrive_core::config::{SimConfig, WorldConfig};
//! use autodrive_core::world::World;
//!
//! let scenario = r#"{
//!     "width": 2000,
//!     "height": 1500,
//!     "objects": [{ "x": 600, "y": 400, "type": "tree", "m11": 1.0 }],
//!     "polygons": [{ "typename": "tree", "polys": [{ "points": [[0, 0], [40, 0], [40, 40], [0, 40]] }] }],
//!     "rotation_points": [{ "name": "tree.png", "x": 20, "y": 20 }],
//!     "car": { "x": 200, "y": 400 }
//! }"#;
//!
//! let world_config = WorldConfig::from_json_str(scenario).unwrap();
//! let world = World::from_config(&world_config, &SimConfig::default()).unwrap();
//! assert_eq!(world.object_count(), 1);
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use glam::{IVec2, UVec2, Vec2};
use polygrid::{GridConfig, GridError, Polygon};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::car::CarConfig;
use crate::entity::{AutomatedCar, WorldObject};
use crate::powertrain::{EngineConfig, Powertrain, SteeringConfig};
use crate::sensor::SensorSuite;
use crate::ticker::DEFAULT_TICK_RATE;
use crate::world::World;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON for the expected shape.
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// World dimensions must be positive.
    #[error("invalid world size {width}x{height}")]
    InvalidWorldSize {
        /// Configured width.
        width: u32,
        /// Configured height.
        height: u32,
    },

    /// A tunable is outside the range the physics can integrate.
    #[error("invalid tunable {field} = {value}")]
    InvalidTunable {
        /// Dotted path of the field.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// The spatial grid rejected its configuration.
    #[error(transparent)]
    Grid(#[from] GridError),
}

fn require(field: &'static str, value: f64, ok: bool) -> Result<(), ConfigError> {
    if ok && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidTunable { field, value })
    }
}

fn require_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    require(field, f64::from(value), value > 0.0)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

// =============================================================================
// Simulation tunables
// =============================================================================

/// Tunables for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Engine and gearbox constants.
    pub engine: EngineConfig,
    /// Bicycle-model constants.
    pub steering: SteeringConfig,
    /// Car body and health.
    pub car: CarConfig,
    /// Spatial index tuning.
    pub grid: GridConfig,
    /// Sensor mounts and ranges.
    pub sensors: SensorSuite,
    /// Ticks per second for the tick driver.
    pub tick_rate_hz: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            steering: SteeringConfig::default(),
            car: CarConfig::default(),
            grid: GridConfig::default(),
            sensors: SensorSuite::default(),
            tick_rate_hz: DEFAULT_TICK_RATE,
        }
    }
}

impl SimConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the document is malformed and
    /// [`ConfigError::InvalidTunable`] if it fails [`SimConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = read_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the tunables the tick loop divides by or clamps with.
    ///
    /// Divisors and gear ratios must be positive, `max_rpm` non-negative,
    /// the released-pedal brake force at least the pressed one, and the
    /// car mass non-negative. All floats must be finite.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTunable`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        require_positive("engine.force_to_pixel_velocity", engine.force_to_pixel_velocity)?;
        require_positive("engine.reverse_gear_ratio", engine.reverse_gear_ratio)?;
        for gear in &engine.drive_gears {
            require_positive("engine.drive_gears.ratio", gear.ratio)?;
        }
        require("engine.max_rpm", f64::from(engine.max_rpm), engine.max_rpm >= 0)?;
        require(
            "engine.maximum_brake_force",
            f64::from(engine.maximum_brake_force),
            engine.maximum_brake_force.is_finite() && engine.maximum_brake_force >= 0.0,
        )?;
        require(
            "engine.minimum_brake_force",
            f64::from(engine.minimum_brake_force),
            engine.minimum_brake_force >= engine.maximum_brake_force,
        )?;
        require_positive("steering.wheel_base", self.steering.wheel_base)?;
        require("steering.wheel_conversion", f64::from(self.steering.wheel_conversion), true)?;
        require("car.mass", f64::from(self.car.mass), self.car.mass >= 0.0)?;
        Ok(())
    }

    /// A powertrain built from these tunables.
    #[must_use]
    pub fn powertrain(&self) -> Powertrain {
        Powertrain::new(self.engine.clone(), self.steering)
    }
}

// =============================================================================
// World scenario
// =============================================================================

/// One placed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Position x.
    pub x: i32,
    /// Position y.
    pub y: i32,
    /// Asset name, also the key into polygons and rotation points.
    #[serde(rename = "type")]
    pub asset: String,
    /// First entry of the rotation matrix (cosine of the heading).
    #[serde(default = "identity_m11")]
    pub m11: f32,
    /// Second entry of the rotation matrix (sine of the heading).
    #[serde(default)]
    pub m12: Option<f32>,
    /// Bounding width, defaults to the polygon extent.
    #[serde(default)]
    pub width: Option<u32>,
    /// Bounding height, defaults to the polygon extent.
    #[serde(default)]
    pub height: Option<u32>,
    /// Render order.
    #[serde(default)]
    pub z_index: Option<i32>,
}

fn identity_m11() -> f32 {
    1.0
}

impl PlacementConfig {
    /// Heading in radians.
    ///
    /// Uses both matrix entries when `m12` is present; otherwise only the
    /// cosine is known and the heading falls in `[0, π]`.
    #[must_use]
    pub fn heading(&self) -> f32 {
        match self.m12 {
            Some(m12) => m12.atan2(self.m11),
            None => self.m11.clamp(-1.0, 1.0).acos(),
        }
    }
}

/// Point list of one contour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourConfig {
    /// Vertices in local coordinates.
    pub points: Vec<[f32; 2]>,
}

/// Collision contours for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeConfig {
    /// Asset name.
    pub typename: String,
    /// Contours.
    pub polys: Vec<ContourConfig>,
}

impl ShapeConfig {
    /// Contours as polygons.
    #[must_use]
    pub fn polygons(&self) -> Vec<Polygon> {
        self.polys
            .iter()
            .map(|c| Polygon::new(c.points.iter().map(|&p| Vec2::from(p)).collect()))
            .collect()
    }
}

/// Rotation pivot for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationPointConfig {
    /// Image file name; the extension is stripped when matching assets.
    pub name: String,
    /// Pivot x.
    pub x: i32,
    /// Pivot y.
    pub y: i32,
}

impl RotationPointConfig {
    /// Asset name this pivot applies to.
    #[must_use]
    pub fn asset(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map_or(self.name.as_str(), |(stem, _)| stem)
    }
}

/// Starting pose of the controlled car.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarPlacement {
    /// Position x.
    pub x: i32,
    /// Position y.
    pub y: i32,
    /// Heading in radians.
    #[serde(default)]
    pub heading: f32,
}

impl Default for CarPlacement {
    fn default() -> Self {
        Self {
            x: 480,
            y: 1425,
            heading: 0.0,
        }
    }
}

fn default_viewport() -> [u32; 2] {
    [960, 720]
}

/// A world scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// World width in pixels.
    pub width: u32,
    /// World height in pixels.
    pub height: u32,
    /// Visible area in pixels.
    #[serde(default = "default_viewport")]
    pub viewport: [u32; 2],
    /// Placed objects, in load order.
    #[serde(default)]
    pub objects: Vec<PlacementConfig>,
    /// Collision contours keyed by asset.
    #[serde(default)]
    pub polygons: Vec<ShapeConfig>,
    /// Rotation pivots keyed by asset file name.
    #[serde(default)]
    pub rotation_points: Vec<RotationPointConfig>,
    /// Controlled car.
    #[serde(default)]
    pub car: CarPlacement,
}

impl WorldConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the document is malformed.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_json(path.as_ref())
    }
}

impl World {
    /// Builds a world from a scenario.
    ///
    /// Placements without a matching polygon get no contours (and so never
    /// collide); placements without a rotation point pivot about their
    /// origin. Both cases are logged, neither is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWorldSize`] for a zero dimension,
    /// [`ConfigError::InvalidTunable`] for tunables failing
    /// [`SimConfig::validate`] and [`ConfigError::Grid`] for an invalid grid.
    pub fn from_config(config: &WorldConfig, sim: &SimConfig) -> Result<Self, ConfigError> {
        sim.validate()?;
        if config.width == 0 || config.height == 0 {
            return Err(ConfigError::InvalidWorldSize {
                width: config.width,
                height: config.height,
            });
        }

        // Later entries win, matching a last-write-wins join.
        let shapes: HashMap<&str, &ShapeConfig> = config
            .polygons
            .iter()
            .map(|s| (s.typename.as_str(), s))
            .collect();
        let pivots: HashMap<&str, &RotationPointConfig> = config
            .rotation_points
            .iter()
            .map(|r| (r.asset(), r))
            .collect();

        let car = AutomatedCar::new(
            IVec2::new(config.car.x, config.car.y),
            config.car.heading,
            &sim.car,
            sim.powertrain(),
        );
        let mut world = Self::new(
            UVec2::new(config.width, config.height),
            UVec2::from(config.viewport),
            car,
            sim.grid,
        )?;

        for placement in &config.objects {
            let asset = placement.asset.as_str();
            let mut object = WorldObject::new(asset, IVec2::new(placement.x, placement.y))
                .with_heading(placement.heading());

            match shapes.get(asset) {
                Some(shape) => object = object.with_polygons(shape.polygons()),
                None => tracing::warn!(asset, "no polygon for asset, object will not collide"),
            }
            match pivots.get(asset) {
                Some(pivot) => object = object.with_pivot(IVec2::new(pivot.x, pivot.y).as_vec2()),
                None => tracing::debug!(asset, "no rotation point for asset"),
            }
            if let (Some(w), Some(h)) = (placement.width, placement.height) {
                object = object.with_size(UVec2::new(w, h));
            }
            if let Some(z) = placement.z_index {
                object = object.with_z_index(z);
            }
            world.add_object(object);
        }

        tracing::info!(
            width = config.width,
            height = config.height,
            objects = world.object_count(),
            "world loaded"
        );
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Collidable, ObjectKind};
    use std::f32::consts::FRAC_PI_2;

    const SCENARIO: &str = r#"{
        "width": 5000,
        "height": 3000,
        "objects": [
            { "x": 600, "y": 400, "type": "tree", "m11": 1.0 },
            { "x": 900, "y": 400, "type": "roadsign_speed_40", "m11": 0.0, "m12": 1.0 },
            { "x": 0, "y": 0, "type": "road_2lane_straight", "m11": 1.0, "z_index": -1 },
            { "x": 50, "y": 50, "type": "mystery_box", "m11": 1.0 }
        ],
        "polygons": [
            { "typename": "tree", "polys": [{ "points": [[0, 0], [40, 0], [40, 40], [0, 40]] }] },
            { "typename": "roadsign_speed_40", "polys": [{ "points": [[0, 0], [20, 0], [20, 60], [0, 60]] }] }
        ],
        "rotation_points": [
            { "name": "tree.png", "x": 20, "y": 20 },
            { "name": "roadsign_speed_40.png", "x": 10, "y": 30 }
        ],
        "car": { "x": 200, "y": 400, "heading": 0.0 }
    }"#;

    mod sim_config_tests {
        use super::*;

        #[test]
        fn empty_document_is_default() {
            let config = SimConfig::from_json_str("{}").unwrap();
            assert_eq!(config, SimConfig::default());
            assert_eq!(config.tick_rate_hz, 60);
        }

        #[test]
        fn partial_override() {
            let config = SimConfig::from_json_str(r#"{ "tick_rate_hz": 30, "car": { "mass": 8.0 } }"#).unwrap();
            assert_eq!(config.tick_rate_hz, 30);
            assert_eq!(config.car.mass, 8.0);
            assert_eq!(config.car.max_health, 100);
        }

        #[test]
        fn malformed_json_is_an_error() {
            let err = SimConfig::from_json_str("{ tick_rate_hz: ").unwrap_err();
            assert!(matches!(err, ConfigError::Json(_)));
        }

        #[test]
        fn missing_file_is_an_io_error() {
            let err = SimConfig::load("/definitely/not/here.json").unwrap_err();
            assert!(matches!(err, ConfigError::Io { .. }));
        }

        fn rejected_field(json: &str) -> &'static str {
            match SimConfig::from_json_str(json).unwrap_err() {
                ConfigError::InvalidTunable { field, .. } => field,
                other => panic!("expected InvalidTunable, got {other:?}"),
            }
        }

        #[test]
        fn defaults_and_demo_tunables_validate() {
            SimConfig::default().validate().unwrap();
            SimConfig::from_json_str(include_str!("../../../demos/sim.json")).unwrap();
        }

        #[test]
        fn zero_force_to_pixel_velocity_is_rejected() {
            let json = r#"{ "engine": { "force_to_pixel_velocity": 0.0 } }"#;
            assert_eq!(rejected_field(json), "engine.force_to_pixel_velocity");
        }

        #[test]
        fn negative_force_to_pixel_velocity_is_rejected() {
            let json = r#"{ "engine": { "force_to_pixel_velocity": -10.0 } }"#;
            assert_eq!(rejected_field(json), "engine.force_to_pixel_velocity");
        }

        #[test]
        fn zero_reverse_ratio_is_rejected() {
            let json = r#"{ "engine": { "reverse_gear_ratio": 0.0 } }"#;
            assert_eq!(rejected_field(json), "engine.reverse_gear_ratio");
        }

        #[test]
        fn non_positive_drive_ratio_is_rejected() {
            let mut config = SimConfig::default();
            config.engine.drive_gears[1].ratio = 0.0;
            let err = config.validate().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidTunable { field: "engine.drive_gears.ratio", .. }
            ));

            config.engine.drive_gears[1].ratio = -1.5;
            assert!(config.validate().is_err());
        }

        #[test]
        fn negative_max_rpm_is_rejected() {
            let err = SimConfig::from_json_str(r#"{ "engine": { "max_rpm": -1 } }"#).unwrap_err();
            match err {
                ConfigError::InvalidTunable { field, value } => {
                    assert_eq!(field, "engine.max_rpm");
                    assert_eq!(value, -1.0);
                }
                other => panic!("expected InvalidTunable, got {other:?}"),
            }
        }

        #[test]
        fn zero_max_rpm_is_accepted() {
            SimConfig::from_json_str(r#"{ "engine": { "max_rpm": 0 } }"#).unwrap();
        }

        #[test]
        fn inverted_brake_forces_are_rejected() {
            let json = r#"{ "engine": { "minimum_brake_force": 0.1, "maximum_brake_force": 0.9 } }"#;
            assert_eq!(rejected_field(json), "engine.minimum_brake_force");
        }

        #[test]
        fn negative_brake_floor_is_rejected() {
            let json = r#"{ "engine": { "maximum_brake_force": -0.5 } }"#;
            assert_eq!(rejected_field(json), "engine.maximum_brake_force");
        }

        #[test]
        fn negative_mass_is_rejected() {
            assert_eq!(rejected_field(r#"{ "car": { "mass": -1.0 } }"#), "car.mass");
        }

        #[test]
        fn zero_wheel_base_is_rejected() {
            assert_eq!(rejected_field(r#"{ "steering": { "wheel_base": 0.0 } }"#), "steering.wheel_base");
        }

        #[test]
        fn non_finite_tunables_are_rejected() {
            let mut config = SimConfig::default();
            config.engine.force_to_pixel_velocity = f32::NAN;
            assert!(config.validate().is_err());

            let mut config = SimConfig::default();
            config.engine.minimum_brake_force = f32::INFINITY;
            assert!(config.validate().is_err());
        }

        #[test]
        fn file_load_validates() {
            let path = std::env::temp_dir().join(format!("autodrive-bad-tunables-{}.json", std::process::id()));
            std::fs::write(&path, r#"{ "engine": { "force_to_pixel_velocity": 0.0 } }"#).unwrap();
            let err = SimConfig::load(&path).unwrap_err();
            std::fs::remove_file(&path).ok();
            assert!(matches!(err, ConfigError::InvalidTunable { .. }));
        }

        #[test]
        fn world_from_config_rejects_bad_tunables() {
            let config = WorldConfig::from_json_str(r#"{ "width": 100, "height": 100 }"#).unwrap();
            let mut sim = SimConfig::default();
            sim.engine.max_rpm = -5;
            let err = World::from_config(&config, &sim).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidTunable { field: "engine.max_rpm", .. }));
        }
    }

    mod world_config_tests {
        use super::*;

        #[test]
        fn rotation_point_strips_extension() {
            let point = RotationPointConfig {
                name: "roadsign_parking_right.png".into(),
                x: 0,
                y: 0,
            };
            assert_eq!(point.asset(), "roadsign_parking_right");
            let bare = RotationPointConfig {
                name: "tree".into(),
                x: 0,
                y: 0,
            };
            assert_eq!(bare.asset(), "tree");
        }

        #[test]
        fn heading_from_matrix() {
            let mut placement = PlacementConfig {
                x: 0,
                y: 0,
                asset: "tree".into(),
                m11: 0.0,
                m12: Some(-1.0),
                width: None,
                height: None,
                z_index: None,
            };
            assert!((placement.heading() + FRAC_PI_2).abs() < 1e-5);
            placement.m12 = None;
            assert!((placement.heading() - FRAC_PI_2).abs() < 1e-5);
            placement.m11 = 1.5;
            assert_eq!(placement.heading(), 0.0);
        }

        #[test]
        fn builds_world() {
            let config = WorldConfig::from_json_str(SCENARIO).unwrap();
            let world = World::from_config(&config, &SimConfig::default()).unwrap();

            assert_eq!(world.size(), UVec2::new(5000, 3000));
            assert_eq!(world.viewport(), UVec2::new(960, 720));
            assert_eq!(world.object_count(), 4);
            assert_eq!(world.car().position(), IVec2::new(200, 400));

            let objects: Vec<_> = world.objects().collect();
            assert_eq!(objects[0].kind(), &ObjectKind::Tree);
            assert_eq!(objects[0].pivot, Vec2::splat(20.0));
            assert!(objects[0].is_collidable());
            assert!((objects[1].heading - FRAC_PI_2).abs() < 1e-5);
            assert_eq!(objects[2].z_index, -1);
        }

        #[test]
        fn unmatched_asset_has_no_contours() {
            let config = WorldConfig::from_json_str(SCENARIO).unwrap();
            let world = World::from_config(&config, &SimConfig::default()).unwrap();
            let mystery = world.objects().find(|o| o.asset == "mystery_box").unwrap();
            assert!(mystery.polygons.is_empty());
            assert!(!mystery.is_collidable());
        }

        #[test]
        fn demo_scenario_loads() {
            let config = WorldConfig::from_json_str(include_str!("../../../demos/scenario.json")).unwrap();
            let sim = SimConfig::from_json_str(include_str!("../../../demos/sim.json")).unwrap();
            let world = World::from_config(&config, &sim).unwrap();
            assert_eq!(world.object_count(), config.objects.len());
            assert_eq!(world.signs_in_region(&polygrid::QueryRegion::rect(Vec2::ZERO, Vec2::splat(5000.0))).len(), 3);
        }

        #[test]
        fn zero_size_is_rejected() {
            let config = WorldConfig::from_json_str(r#"{ "width": 0, "height": 100 }"#).unwrap();
            let err = World::from_config(&config, &SimConfig::default()).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidWorldSize { width: 0, height: 100 }));
        }

        #[test]
        fn bad_grid_is_rejected() {
            let config = WorldConfig::from_json_str(r#"{ "width": 100, "height": 100 }"#).unwrap();
            let mut sim = SimConfig::default();
            sim.grid.cell_size = 0.0;
            let err = World::from_config(&config, &sim).unwrap_err();
            assert!(matches!(err, ConfigError::Grid(_)));
        }

        #[test]
        fn config_car_uses_sim_tunables() {
            let config = WorldConfig::from_json_str(r#"{ "width": 100, "height": 100 }"#).unwrap();
            let mut sim = SimConfig::default();
            sim.car.mass = 9.0;
            let world = World::from_config(&config, &sim).unwrap();
            assert_eq!(world.car().mass, 9.0);
            assert_eq!(world.car().position(), IVec2::new(480, 1425));
        }
    }
}
