//! Engine model.
//!
//! Each tick the engine reads the pedals and lever, lets the gearbox pick a
//! drive gear, integrates RPM and derives the car's velocity in pixels per
//! tick.
//!
//! # Example
//!
//! ```
//! use autodrive_core::hmi::{Gear, HmiPacket};
//! use autodrive_core::powertrain::Engine;
//!
//! let mut engine = Engine::default();
//! engine.update(&HmiPacket::new(Gear::Drive, 50.0, 0.0, 0.0));
//! assert_eq!(engine.rpm(), 50);
//! assert!(engine.velocity() > 0.0);
//! ```

use serde::{Deserialize, Serialize};

use super::gearbox::{default_drive_gears, DriveGear, GearShifter};
use crate::hmi::{Gear, HmiPacket, PEDAL_MAX};

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// RPM gained per unit of gas pedal.
    pub gas_pedal_scaling: i32,
    /// RPM lost per unit of brake pedal.
    pub brake_pedal_scaling: i32,
    /// RPM change per tick with no gas (negative).
    pub rpm_decay_per_tick: i32,
    /// Extra RPM per tick when revving in Neutral.
    pub neutral_rpm_increase: i32,
    /// RPM ceiling.
    pub max_rpm: i32,
    /// Reverse gear ratio.
    pub reverse_gear_ratio: f32,
    /// Brake force multiplier with the pedal released.
    pub minimum_brake_force: f32,
    /// Brake force multiplier floor with the pedal fully pressed.
    pub maximum_brake_force: f32,
    /// Divides the resultant force into pixels per tick.
    pub force_to_pixel_velocity: f32,
    /// Forward gear sequence.
    pub drive_gears: Vec<DriveGear>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gas_pedal_scaling: 1,
            brake_pedal_scaling: 10,
            rpm_decay_per_tick: -10,
            neutral_rpm_increase: 500,
            max_rpm: 6000,
            reverse_gear_ratio: 2.9,
            minimum_brake_force: 0.9,
            maximum_brake_force: 0.1,
            force_to_pixel_velocity: 10.0,
            drive_gears: default_drive_gears(),
        }
    }
}

/// Engine state: gearbox, RPM and resulting velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engine {
    config: EngineConfig,
    shifter: GearShifter,
    rpm: i32,
    velocity: f32,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Creates a stopped engine in Park.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let shifter = GearShifter::new(config.drive_gears.clone());
        Self {
            config,
            shifter,
            rpm: 0,
            velocity: 0.0,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current RPM in `[0, max_rpm]`.
    #[must_use]
    pub const fn rpm(&self) -> i32 {
        self.rpm
    }

    /// Velocity in pixels per tick.
    #[must_use]
    pub const fn velocity(&self) -> f32 {
        self.velocity
    }

    /// The gearbox.
    #[must_use]
    pub fn shifter(&self) -> &GearShifter {
        &self.shifter
    }

    /// Advances the engine by one tick.
    pub fn update(&mut self, packet: &HmiPacket) {
        let packet = packet.clamped();
        self.shifter.position = packet.gear;

        let delta = self.rpm_change(&packet);
        self.shifter.select_drive_gear(self.rpm, delta);
        self.rpm = self.next_rpm(&packet, delta);
        self.velocity =
            self.drive_force() * self.brake_force(packet.brake) / self.config.force_to_pixel_velocity;

        tracing::trace!(
            gear = %packet.gear,
            rpm = self.rpm,
            velocity = self.velocity,
            "engine updated"
        );
    }

    /// RPM change requested by the pedals, before gear adjustment.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn rpm_change(&self, packet: &HmiPacket) -> i32 {
        if packet.gas > 0.0 {
            (packet.gas as i32).saturating_mul(self.config.gas_pedal_scaling)
        } else {
            self.config
                .rpm_decay_per_tick
                .saturating_sub((packet.brake as i32).saturating_mul(self.config.brake_pedal_scaling))
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn next_rpm(&self, packet: &HmiPacket, delta: i32) -> i32 {
        let base = self.rpm.saturating_add(delta) as f32;
        let rpm = match packet.gear {
            Gear::Drive => base * self.shifter.rpm_adjustment(),
            Gear::Neutral if packet.gas > 0.0 => base + self.config.neutral_rpm_increase as f32,
            Gear::Neutral | Gear::Reverse => base,
            Gear::Park => 0.0,
        };
        // `as` saturates and maps NaN to 0.
        (rpm as i32).clamp(0, self.config.max_rpm)
    }

    /// Force pushing the car, before braking.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn drive_force(&self) -> f32 {
        let rpm = self.rpm as f32;
        match self.shifter.position {
            Gear::Drive => rpm / self.shifter.current().ratio,
            Gear::Reverse => rpm / self.config.reverse_gear_ratio,
            Gear::Park | Gear::Neutral => 0.0,
        }
    }

    /// Brake multiplier for a pedal position.
    ///
    /// Falls linearly from `minimum_brake_force` and never drops below
    /// `maximum_brake_force`.
    #[must_use]
    pub fn brake_force(&self, brake: f32) -> f32 {
        let min = self.config.minimum_brake_force;
        let brake = brake.clamp(0.0, PEDAL_MAX);
        (min - brake / (PEDAL_MAX / min)).max(self.config.maximum_brake_force)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::powertrain::ChangeState;
    use proptest::prelude::*;

    fn drive(gas: f32, brake: f32) -> HmiPacket {
        HmiPacket::new(Gear::Drive, gas, brake, 0.0)
    }

    mod rpm_tests {
        use super::*;

        #[test]
        fn gas_raises_rpm() {
            let mut engine = Engine::default();
            engine.update(&drive(40.0, 0.0));
            assert_eq!(engine.rpm(), 40);
            engine.update(&drive(40.0, 0.0));
            assert_eq!(engine.rpm(), 80);
        }

        #[test]
        fn coasting_decays_and_floors_at_zero() {
            let mut engine = Engine::default();
            engine.rpm = 25;
            engine.update(&drive(0.0, 0.0));
            assert_eq!(engine.rpm(), 15);
            engine.update(&drive(0.0, 0.0));
            engine.update(&drive(0.0, 0.0));
            assert_eq!(engine.rpm(), 0);
        }

        #[test]
        fn brake_pulls_rpm_down_fast() {
            let mut engine = Engine::default();
            engine.rpm = 1000;
            engine.update(&drive(0.0, 50.0));
            assert_eq!(engine.rpm(), 1000 - 10 - 500);
        }

        #[test]
        fn park_forces_zero() {
            let mut engine = Engine::default();
            engine.rpm = 3000;
            engine.update(&HmiPacket::new(Gear::Park, 100.0, 0.0, 0.0));
            assert_eq!(engine.rpm(), 0);
            assert_eq!(engine.velocity(), 0.0);
        }

        #[test]
        fn neutral_revs_without_moving() {
            let mut engine = Engine::default();
            engine.update(&HmiPacket::new(Gear::Neutral, 10.0, 0.0, 0.0));
            assert_eq!(engine.rpm(), 510);
            assert_eq!(engine.velocity(), 0.0);
        }

        #[test]
        fn neutral_without_gas_only_decays() {
            let mut engine = Engine::default();
            engine.rpm = 600;
            engine.update(&HmiPacket::new(Gear::Neutral, 0.0, 0.0, 0.0));
            assert_eq!(engine.rpm(), 590);
        }

        #[test]
        fn rpm_capped_at_max() {
            let mut engine = Engine::default();
            for _ in 0..20 {
                engine.update(&HmiPacket::new(Gear::Neutral, 100.0, 0.0, 0.0));
            }
            assert_eq!(engine.rpm(), 6000);
        }

        #[test]
        fn upshift_drops_rpm() {
            let mut engine = Engine::default();
            engine.rpm = 2450;
            engine.update(&drive(100.0, 0.0));
            assert_eq!(engine.shifter().change_state(), ChangeState::Upshift);
            // (2450 + 100) * 1.78 / 2.66
            assert_eq!(engine.rpm(), 1706);
        }

        #[test]
        fn pedal_fractions_truncate() {
            let engine = Engine::default();
            assert_eq!(engine.rpm_change(&drive(12.9, 0.0)), 12);
            assert_eq!(engine.rpm_change(&drive(0.0, 1.9)), -20);
        }
    }

    mod force_tests {
        use super::*;

        #[test]
        fn brake_force_endpoints() {
            let engine = Engine::default();
            assert!((engine.brake_force(0.0) - 0.9).abs() < 1e-6);
            assert!((engine.brake_force(100.0) - 0.1).abs() < 1e-6);
            assert!((engine.brake_force(50.0) - 0.45).abs() < 1e-6);
        }

        #[test]
        fn reverse_uses_reverse_ratio() {
            let mut engine = Engine::default();
            engine.update(&HmiPacket::new(Gear::Reverse, 58.0, 0.0, 0.0));
            assert_eq!(engine.rpm(), 58);
            let expected = 58.0 / 2.9 * 0.9 / 10.0;
            assert!((engine.velocity() - expected).abs() < 1e-5);
        }

        #[test]
        fn drive_velocity_matches_formula() {
            let mut engine = Engine::default();
            engine.update(&drive(100.0, 0.0));
            let expected = 100.0 / 2.66 * 0.9 / 10.0;
            assert!((engine.velocity() - expected).abs() < 1e-5);
        }
    }

    proptest! {
        #[test]
        fn gas_in_first_gear_adds_linearly(start in 0i32..2400, gas in 1u8..=100) {
            prop_assume!(start + i32::from(gas) <= 2500);
            let mut engine = Engine::default();
            engine.rpm = start;
            engine.update(&drive(f32::from(gas), 0.0));
            prop_assert_eq!(engine.shifter().change_state(), ChangeState::None);
            prop_assert_eq!(engine.rpm(), (start + i32::from(gas)).clamp(0, 6000));
        }

        #[test]
        fn brake_force_stays_in_range(brake in -50.0f32..200.0) {
            let engine = Engine::default();
            let force = engine.brake_force(brake);
            prop_assert!(force >= 0.1 - 1e-6);
            prop_assert!(force <= 0.9 + 1e-6);
        }

        #[test]
        fn rpm_always_in_range(
            inputs in prop::collection::vec((0u8..4, 0.0f32..100.0, 0.0f32..100.0), 1..60)
        ) {
            let mut engine = Engine::default();
            for (gear, gas, brake) in inputs {
                let gear = match gear {
                    0 => Gear::Park,
                    1 => Gear::Reverse,
                    2 => Gear::Neutral,
                    _ => Gear::Drive,
                };
                engine.update(&HmiPacket::new(gear, gas, brake, 0.0));
                prop_assert!((0..=6000).contains(&engine.rpm()));
                prop_assert!(engine.velocity() >= 0.0);
            }
        }
    }
}
