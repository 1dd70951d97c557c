//! Driver input packets.
//!
//! The human-machine interface is an external collaborator. It hands the core
//! an [`HmiPacket`] which is clamped on entry and treated as read-only for the
//! rest of the tick. The powertrain sees a narrowed [`PowertrainPacket`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gear lever position.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gear {
    /// Parking: engine idles at zero RPM, no drive force.
    #[default]
    Park,
    /// Reverse: drive force through the reverse ratio, motion negated.
    Reverse,
    /// Neutral: engine revs freely, no drive force.
    Neutral,
    /// Drive: automatic selection through the drive gear sequence.
    Drive,
}

impl fmt::Display for Gear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Park => write!(f, "P"),
            Self::Reverse => write!(f, "R"),
            Self::Neutral => write!(f, "N"),
            Self::Drive => write!(f, "D"),
        }
    }
}

/// Pedal range upper bound.
pub const PEDAL_MAX: f32 = 100.0;

/// Steering wheel range bound (symmetric).
pub const STEERING_MAX: f32 = 100.0;

/// One tick of driver input.
///
/// Construct with [`HmiPacket::new`] to get clamped values; the fields stay
/// public so collaborators can read them back.
///
/// # Example
///
/// ```
/// use autodrive_core::hmi::{Gear, HmiPacket};
///
/// let packet = HmiPacket::new(Gear::Drive, 140.0, -3.0, 0.0);
/// assert_eq!(packet.gas, 100.0);
/// assert_eq!(packet.brake, 0.0);
/// ```
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HmiPacket {
    /// Requested gear.
    pub gear: Gear,
    /// Gas pedal in `[0, 100]`.
    pub gas: f32,
    /// Brake pedal in `[0, 100]`.
    pub brake: f32,
    /// Steering wheel in `[-100, 100]`, positive turns towards +heading.
    pub steering: f32,
}

impl HmiPacket {
    /// Creates a packet with every value clamped to its range.
    #[must_use]
    pub fn new(gear: Gear, gas: f32, brake: f32, steering: f32) -> Self {
        Self {
            gear,
            gas,
            brake,
            steering,
        }
        .clamped()
    }

    /// Returns a copy with every value clamped; NaN becomes zero.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            gear: self.gear,
            gas: clamp_or_zero(self.gas, 0.0, PEDAL_MAX),
            brake: clamp_or_zero(self.brake, 0.0, PEDAL_MAX),
            steering: clamp_or_zero(self.steering, -STEERING_MAX, STEERING_MAX),
        }
    }
}

/// Subset of the input the powertrain consumes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowertrainPacket {
    /// Gear lever position.
    pub gear: Gear,
    /// Steering wheel in `[-100, 100]`.
    pub steering: f32,
}

impl From<&HmiPacket> for PowertrainPacket {
    fn from(packet: &HmiPacket) -> Self {
        Self {
            gear: packet.gear,
            steering: packet.steering,
        }
    }
}

fn clamp_or_zero(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(min, max)
    }
}
