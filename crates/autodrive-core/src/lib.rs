//! # Autodrive Core
//!
//! Vehicle kinematics, collision and damage core for the automated car
//! simulation.
//!
//! This crate advances one controlled car through a world of placed objects,
//! one tick at a time, and publishes an immutable snapshot after every tick.
//!
//! ## Architecture
//!
//! - **Entities**: placed world objects tagged by kind, plus the controlled car
//! - **Powertrain**: engine with an automatic drive gearbox, bicycle-model steering
//! - **Resolver**: per-kind collision responses that correct the candidate pose
//! - **Sensors**: radar and ultrasound fields of view over the spatial index
//! - **Simulation**: the per-tick orchestrator, driven by a [`ticker::TickDriver`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use autodrive_core::config::{SimConfig, WorldConfig};
//! use autodrive_core::simulation::Simulation;
//! use autodrive_core::ticker::TickDriver;
//! use autodrive_core::world::World;
//!
//! let sim_config = SimConfig::load("sim.json")?;
//! let world = World::from_config(&WorldConfig::load("world.json")?, &sim_config)?;
//! let mut driver = TickDriver::new(Simulation::new(world), sim_config.tick_rate_hz);
//! driver.start();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export polygrid for spatial queries
pub use polygrid;

pub mod config;
pub mod entity;
pub mod hmi;
pub mod powertrain;
pub mod resolver;
pub mod sensor;
pub mod simulation;
pub mod snapshot;
pub mod ticker;
pub mod world;

pub use config::{ConfigError, SimConfig, WorldConfig};
pub use entity::{AutomatedCar, ObjectId, ObjectKind, WorldObject};
pub use hmi::{Gear, HmiPacket};
pub use simulation::{RunState, Simulation};
pub use snapshot::{SnapshotBoard, WorldSnapshot};
pub use ticker::TickDriver;
pub use world::World;

#[cfg(test)]
mod tests;
