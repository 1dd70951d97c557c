//! Simulation module with the per-tick execution loop.
//!
//! The `Simulation` struct orchestrates one controlled car through a fixed
//! sequence of phases:
//!
//! 1. **INPUT**: Clamp the latest driver input and derive the powertrain packet
//! 2. **ENGINE**: Update gear, RPM and velocity; the car's speed follows
//! 3. **STEERING**: Integrate the wheels into a candidate pose
//! 4. **RESOLUTION**: Validate the candidate against the world
//! 5. **COMMIT**: Store pose and health, refresh sensors, publish a snapshot
//!
//! # Determinism
//!
//! Given the same world and the same input sequence the simulation produces
//! identical snapshots:
//! - Objects are iterated in id order (via `BTreeMap`)
//! - Collision hits are ordered nearest-first with ties broken by id
//! - Parallel spatial queries are re-sorted before use
//!
//! # Example
//!
//! ```
//! use autodrive_core::entity::AutomatedCar;
//! use autodrive_core::entity::car::CarConfig;
//! use autodrive_core::hmi::{Gear, HmiPacket};
//! use autodrive_core::powertrain::Powertrain;
//! use autodrive_core::simulation::Simulation;
//! use autodrive_core::world::World;
//! use glam::{IVec2, UVec2};
//! use polygrid::GridConfig;
//!
//! let car = AutomatedCar::new(IVec2::new(500, 500), 0.0, &CarConfig::default(), Powertrain::default());
//! let world = World::new(UVec2::new(3000, 3000), UVec2::new(800, 600), car, GridConfig::default()).unwrap();
//! let mut sim = Simulation::new(world);
//!
//! // Stopped simulations do nothing
//! assert!(sim.step().is_none());
//!
//! sim.start();
//! sim.set_input(HmiPacket::new(Gear::Drive, 100.0, 0.0, 0.0));
//! for _ in 0..30 {
//!     sim.step();
//! }
//!
//! assert_eq!(sim.tick(), 30);
//! assert!(sim.world().car().position().x > 500);
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::hmi::{HmiPacket, PowertrainPacket};
use crate::resolver::CollisionResolver;
use crate::sensor::SensorSuite;
use crate::snapshot::{SnapshotBoard, WorldSnapshot};
use crate::world::World;

/// Whether ticks are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    /// `step` is a no-op.
    #[default]
    Stopped,
    /// `step` advances the world.
    Running,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

// =============================================================================
// Simulation
// =============================================================================

/// The controlled-vehicle orchestrator.
///
/// `Simulation` owns:
/// - The [`World`] with the controlled car
/// - The collision resolver and sensor suite
/// - The latest driver input
/// - A [`SnapshotBoard`] readers can hold on to
pub struct Simulation {
    world: World,
    resolver: CollisionResolver,
    sensors: SensorSuite,
    input: HmiPacket,
    state: RunState,
    tick: u64,
    board: SnapshotBoard,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("world", &self.world)
            .field("resolver", &self.resolver)
            .field("input", &self.input)
            .field("state", &self.state)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Creates a stopped simulation with the default resolver and sensors.
    #[must_use]
    pub fn new(world: World) -> Self {
        Self {
            world,
            resolver: CollisionResolver::new(),
            sensors: SensorSuite::default(),
            input: HmiPacket::default(),
            state: RunState::Stopped,
            tick: 0,
            board: SnapshotBoard::new(),
        }
    }

    /// Replaces the collision resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: CollisionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replaces the sensor suite.
    #[must_use]
    pub fn with_sensors(mut self, sensors: SensorSuite) -> Self {
        self.sensors = sensors;
        self
    }

    /// Stopped → Running. Idempotent.
    pub fn start(&mut self) {
        if self.state == RunState::Running {
            return;
        }
        self.state = RunState::Running;
        tracing::info!(tick = self.tick, "simulation started");
    }

    /// Running → Stopped. No-op when already stopped; state is preserved.
    pub fn stop(&mut self) {
        if self.state == RunState::Stopped {
            return;
        }
        self.state = RunState::Stopped;
        tracing::info!(tick = self.tick, "simulation stopped");
    }

    /// Current run state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Returns `true` while running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Stores the driver input used by the following ticks.
    pub fn set_input(&mut self, input: HmiPacket) {
        self.input = input.clamped();
    }

    /// The driver input in effect.
    #[must_use]
    pub const fn input(&self) -> &HmiPacket {
        &self.input
    }

    /// Executes one tick. Returns `None` while stopped.
    pub fn step(&mut self) -> Option<Arc<WorldSnapshot>> {
        if self.state == RunState::Stopped {
            return None;
        }

        // INPUT
        let hmi = self.input;
        let packet = PowertrainPacket::from(&hmi);

        // ENGINE
        let car = self.world.car_mut();
        car.powertrain_mut().engine.update(&hmi);
        car.speed = car.powertrain().engine.velocity();

        // STEERING
        let pose = car.pose();
        let speed = car.speed;
        let candidate = car.powertrain_mut().steering.update(&packet, &pose, speed);

        // RESOLUTION
        let resolution = self.resolver.resolve(&mut self.world, candidate);

        // COMMIT
        self.world.car_mut().commit(resolution.position, resolution.heading);
        self.world.sync_car();

        let reading = self.sensors.scan(&self.world);
        let committed = self.world.car().pose();
        self.sensors.draw(&committed, &mut self.world.car_mut().sensors);

        self.tick += 1;
        let car = self.world.car();
        tracing::debug!(
            tick = self.tick,
            x = car.position().x,
            y = car.position().y,
            heading = car.heading(),
            speed = car.speed,
            health = car.health(),
            collisions = resolution.events.len(),
            "tick"
        );

        let snapshot = WorldSnapshot::capture(self.tick, &self.world, resolution.events, reading);
        Some(self.board.publish(snapshot))
    }

    /// Number of executed ticks.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// The world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world, for setup between ticks.
    #[must_use]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Handle to the snapshot board; clones share state.
    #[must_use]
    pub fn board(&self) -> SnapshotBoard {
        self.board.clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
