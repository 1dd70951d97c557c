//! Powertrain: engine, gearbox and steering.
//!
//! The powertrain turns driver input into a [`CandidatePose`]. It never
//! commits anything; the resolver decides where the car actually ends up.

pub mod engine;
pub mod gearbox;
pub mod steering;

use serde::{Deserialize, Serialize};

pub use engine::{Engine, EngineConfig};
pub use gearbox::{ChangeState, DriveGear, GearShifter};
pub use steering::{CandidatePose, Steering, SteeringConfig};

/// Engine and steering owned by the controlled car.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Powertrain {
    /// Engine and gearbox.
    pub engine: Engine,
    /// Steering model.
    pub steering: Steering,
}

impl Powertrain {
    /// Creates a powertrain from its tunables.
    #[must_use]
    pub fn new(engine: EngineConfig, steering: SteeringConfig) -> Self {
        Self {
            engine: Engine::new(engine),
            steering: Steering::new(steering),
        }
    }
}
