//! Test helper functions for setting up worlds and simulations.
//!
//! This module provides factory functions and setup utilities that make
//! writing tests more ergonomic and consistent.

use glam::{IVec2, UVec2, Vec2};
use polygrid::{GridConfig, Polygon};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::entity::car::CarConfig;
use crate::entity::{AutomatedCar, ObjectId, WorldObject};
use crate::hmi::{Gear, HmiPacket};
use crate::powertrain::Powertrain;
use crate::simulation::Simulation;
use crate::snapshot::WorldSnapshot;
use crate::world::World;

/// Side of the square test obstacles.
pub const BLOCK_SIZE: f32 = 10.0;

// =============================================================================
// World Setup
// =============================================================================

/// A 5000x5000 world with the default car at `(x, y)` facing +x.
pub fn world_with_car(x: i32, y: i32) -> World {
    let car = AutomatedCar::new(IVec2::new(x, y), 0.0, &CarConfig::default(), Powertrain::default());
    World::new(UVec2::splat(5000), UVec2::new(1000, 700), car, GridConfig::default())
        .expect("default grid is valid")
}

/// A running simulation with the car at `(x, y)`.
pub fn running_sim(x: i32, y: i32) -> Simulation {
    let mut sim = Simulation::new(world_with_car(x, y));
    sim.start();
    sim
}

// =============================================================================
// Object Factory Functions
// =============================================================================

/// A square obstacle centred on `(x, y)`, kind derived from `asset`.
pub fn block(asset: &str, x: i32, y: i32) -> WorldObject {
    WorldObject::new(asset, IVec2::new(x, y))
        .with_polygons(vec![Polygon::rectangle(Vec2::ZERO, Vec2::splat(BLOCK_SIZE))])
        .with_pivot(Vec2::splat(BLOCK_SIZE / 2.0))
}

/// Places a tree centred on `(x, y)`.
pub fn spawn_tree(world: &mut World, x: i32, y: i32) -> ObjectId {
    world.add_object(block("tree", x, y))
}

/// Places a speed sign centred on `(x, y)`.
pub fn spawn_sign(world: &mut World, x: i32, y: i32) -> ObjectId {
    world.add_object(block("roadsign_speed_50", x, y))
}

/// Scatters `count` trees and signs over a 3000x3000 area, reproducibly.
///
/// A clear lane around `y = 2500` is kept free for the car.
pub fn scatter_obstacles(world: &mut World, seed: u64, count: usize) -> Vec<ObjectId> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let x = rng.gen_range(0..3000);
            let y = rng.gen_range(0..2200);
            let object = if rng.gen_bool(0.5) {
                block("tree", x, y)
            } else {
                block("roadsign_speed_30", x, y)
            };
            world.add_object(object.with_heading(rng.gen_range(0.0..std::f32::consts::TAU)))
        })
        .collect()
}

// =============================================================================
// Input Scripts
// =============================================================================

/// Full throttle in Drive, straight ahead.
pub fn full_throttle() -> HmiPacket {
    HmiPacket::new(Gear::Drive, 100.0, 0.0, 0.0)
}

/// A reproducible input script of `ticks` packets.
pub fn input_script(seed: u64, ticks: usize) -> Vec<HmiPacket> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let gears = [Gear::Drive, Gear::Drive, Gear::Drive, Gear::Reverse, Gear::Neutral];
    (0..ticks)
        .map(|_| {
            let gear = gears[rng.gen_range(0..gears.len())];
            HmiPacket::new(
                gear,
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.0..20.0),
                rng.gen_range(-100.0..100.0),
            )
        })
        .collect()
}

/// Feeds each packet for one tick and collects the snapshots.
pub fn run_script(sim: &mut Simulation, script: &[HmiPacket]) -> Vec<WorldSnapshot> {
    script
        .iter()
        .filter_map(|packet| {
            sim.set_input(*packet);
            sim.step()
        })
        .map(|snapshot| (*snapshot).clone())
        .collect()
}

/// Steps `ticks` times with the same input.
pub fn drive_for(sim: &mut Simulation, input: HmiPacket, ticks: usize) {
    sim.set_input(input);
    for _ in 0..ticks {
        sim.step();
    }
}
