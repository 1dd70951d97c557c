//! Automatic gearbox.
//!
//! The lever position comes from the driver. In [`Gear::Drive`] the shifter
//! walks an ordered sequence of [`DriveGear`]s one step at a time, deciding
//! from the engine RPM the next tick would reach.

use serde::{Deserialize, Serialize};

use crate::hmi::Gear;

/// One forward gear.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveGear {
    /// Position in the drive sequence, starting at 0.
    pub sequence: usize,
    /// Gear ratio.
    pub ratio: f32,
    /// Shift up once the projected RPM exceeds this; `None` for the top gear.
    pub upshift_rpm: Option<i32>,
    /// Shift down once the projected RPM falls below this; `None` for first.
    pub downshift_rpm: Option<i32>,
}

/// Default five-speed sequence.
#[must_use]
pub fn default_drive_gears() -> Vec<DriveGear> {
    const RATIOS: [f32; 5] = [2.66, 1.78, 1.30, 1.00, 0.74];
    let top = RATIOS.len() - 1;
    RATIOS
        .iter()
        .enumerate()
        .map(|(sequence, &ratio)| DriveGear {
            sequence,
            ratio,
            upshift_rpm: (sequence < top).then_some(2500),
            downshift_rpm: (sequence > 0).then_some(1100),
        })
        .collect()
}

/// Outcome of the last drive gear selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeState {
    /// Stayed in the same gear.
    #[default]
    None,
    /// Moved one gear up.
    Upshift,
    /// Moved one gear down.
    Downshift,
}

/// Lever position plus the automatic drive gear state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearShifter {
    /// Lever position requested by the driver.
    pub position: Gear,
    drive_gears: Vec<DriveGear>,
    current: usize,
    change: ChangeState,
}

impl Default for GearShifter {
    fn default() -> Self {
        Self::new(default_drive_gears())
    }
}

impl GearShifter {
    /// Creates a shifter in Park, first drive gear selected.
    ///
    /// An empty sequence falls back to [`default_drive_gears`].
    #[must_use]
    pub fn new(drive_gears: Vec<DriveGear>) -> Self {
        let drive_gears = if drive_gears.is_empty() {
            tracing::warn!("empty drive gear sequence, using the default five-speed box");
            default_drive_gears()
        } else {
            drive_gears
        };
        Self {
            position: Gear::Park,
            drive_gears,
            current: 0,
            change: ChangeState::None,
        }
    }

    /// The ordered drive gears.
    #[must_use]
    pub fn drive_gears(&self) -> &[DriveGear] {
        &self.drive_gears
    }

    /// Index of the selected drive gear.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current
    }

    /// The selected drive gear.
    #[must_use]
    pub fn current(&self) -> &DriveGear {
        &self.drive_gears[self.current]
    }

    /// Result of the last call to [`GearShifter::select_drive_gear`].
    #[must_use]
    pub const fn change_state(&self) -> ChangeState {
        self.change
    }

    /// Picks the drive gear for the coming tick.
    ///
    /// `rpm + delta` is compared against the current gear's thresholds and
    /// the shifter moves at most one gear. Outside Drive nothing changes and
    /// the state is [`ChangeState::None`].
    pub fn select_drive_gear(&mut self, rpm: i32, delta: i32) -> ChangeState {
        self.change = ChangeState::None;
        if self.position != Gear::Drive {
            return self.change;
        }

        let projected = rpm.saturating_add(delta);
        let gear = *self.current();
        let has_higher = self.current + 1 < self.drive_gears.len();
        let has_lower = self.current > 0;

        if has_higher && gear.upshift_rpm.is_some_and(|up| projected > up) {
            self.current += 1;
            self.change = ChangeState::Upshift;
        } else if has_lower && gear.downshift_rpm.is_some_and(|down| projected < down) {
            self.current -= 1;
            self.change = ChangeState::Downshift;
        }

        if self.change != ChangeState::None {
            tracing::debug!(
                change = ?self.change,
                gear = self.current + 1,
                projected,
                "drive gear changed"
            );
        }
        self.change
    }

    /// RPM multiplier for the last gear change.
    ///
    /// `ratio(current) / ratio(previous)` after a shift, `1.0` otherwise.
    #[must_use]
    pub fn rpm_adjustment(&self) -> f32 {
        let previous = match self.change {
            ChangeState::None => return 1.0,
            ChangeState::Upshift => self.current.checked_sub(1),
            ChangeState::Downshift => Some(self.current + 1),
        };
        previous
            .and_then(|i| self.drive_gears.get(i))
            .map_or(1.0, |prev| self.current().ratio / prev.ratio)
    }
}
