//! Bicycle steering model.
//!
//! The car is reduced to a front and back wheel `wheel_base` apart. The back
//! wheel rolls along the heading, the front wheel along the heading plus the
//! steering angle; the new pose is read off the moved wheels.

use glam::Vec2;
use polygrid::{heading_of, unit};
use serde::{Deserialize, Serialize};

use crate::entity::CarPose;
use crate::hmi::{Gear, PowertrainPacket};

/// Steering tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Distance between the axles in pixels.
    pub wheel_base: f32,
    /// Wheel angle in degrees per steering wheel unit.
    pub wheel_conversion: f32,
    /// Length of a tick in ticks; speed is divided by it.
    pub delta_time: f32,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            wheel_base: 156.0,
            wheel_conversion: 0.6,
            delta_time: 1.0,
        }
    }
}

/// Provisional pose produced by steering, validated by the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidatePose {
    /// Proposed position.
    pub position: Vec2,
    /// Proposed heading in radians.
    pub heading: f32,
}

impl From<CandidatePose> for CarPose {
    fn from(candidate: CandidatePose) -> Self {
        CarPose::new(candidate.position, candidate.heading)
    }
}

/// Steering state; wheel positions are recomputed every tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Steering {
    config: SteeringConfig,
    front_wheel: Vec2,
    back_wheel: Vec2,
}

impl Steering {
    /// Creates a steering model.
    #[must_use]
    pub fn new(config: SteeringConfig) -> Self {
        Self {
            config,
            front_wheel: Vec2::ZERO,
            back_wheel: Vec2::ZERO,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SteeringConfig {
        &self.config
    }

    /// Front wheel position after the last update.
    #[must_use]
    pub fn front_wheel(&self) -> Vec2 {
        self.front_wheel
    }

    /// Back wheel position after the last update.
    #[must_use]
    pub fn back_wheel(&self) -> Vec2 {
        self.back_wheel
    }

    /// Steering angle in radians for a steering wheel position.
    #[must_use]
    pub fn steering_angle(&self, wheel: f32) -> f32 {
        (wheel * self.config.wheel_conversion).to_radians()
    }

    /// Integrates one tick of motion from `pose` at `speed` pixels per tick.
    pub fn update(&mut self, packet: &PowertrainPacket, pose: &CarPose, speed: f32) -> CandidatePose {
        let heading = unit(pose.heading);
        let half_base = self.config.wheel_base / 2.0;
        self.front_wheel = pose.position + heading * half_base;
        self.back_wheel = pose.position - heading * half_base;

        let mut displacement = if self.config.delta_time > 0.0 {
            speed / self.config.delta_time
        } else {
            0.0
        };
        if packet.gear == Gear::Reverse {
            displacement = -displacement;
        }

        let steer = self.steering_angle(packet.steering);
        self.back_wheel += heading * displacement;
        self.front_wheel += unit(pose.heading + steer) * displacement;

        CandidatePose {
            position: (self.front_wheel + self.back_wheel) * 0.5,
            heading: heading_of(self.front_wheel - self.back_wheel),
        }
    }
}
