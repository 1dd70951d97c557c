//! Scripted driver input.
//!
//! A script is a JSON array of segments, each holding one input for a number
//! of ticks:
//!
//! ```json
//! [
//!   { "ticks": 60, "gear": "Drive", "gas": 80 },
//!   { "ticks": 30, "gear": "Drive", "gas": 40, "steering": -50 },
//!   { "ticks": 40, "gear": "Drive", "brake": 100 }
//! ]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use autodrive_core::hmi::{Gear, HmiPacket};
use serde::Deserialize;

/// One input held for `ticks` ticks.
#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    pub ticks: usize,
    #[serde(default = "drive")]
    pub gear: Gear,
    #[serde(default)]
    pub gas: f32,
    #[serde(default)]
    pub brake: f32,
    #[serde(default)]
    pub steering: f32,
}

fn drive() -> Gear {
    Gear::Drive
}

impl Segment {
    pub fn packet(&self) -> HmiPacket {
        HmiPacket::new(self.gear, self.gas, self.brake, self.steering)
    }
}

/// Ordered input segments.
#[derive(Debug, Clone, Default)]
pub struct Script {
    segments: Vec<Segment>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing script {}", path.display()))
    }

    pub fn parse(json: &str) -> Result<Self> {
        let segments = serde_json::from_str(json)?;
        Ok(Self { segments })
    }

    /// A single segment holding `packet` for `ticks` ticks.
    pub fn constant(packet: HmiPacket, ticks: usize) -> Self {
        Self {
            segments: vec![Segment {
                ticks,
                gear: packet.gear,
                gas: packet.gas,
                brake: packet.brake,
                steering: packet.steering,
            }],
        }
    }

    pub fn total_ticks(&self) -> usize {
        self.segments.iter().map(|s| s.ticks).sum()
    }

    /// One packet per tick.
    pub fn packets(&self) -> impl Iterator<Item = HmiPacket> + '_ {
        self.segments
            .iter()
            .flat_map(|s| std::iter::repeat(s.packet()).take(s.ticks))
    }
}
