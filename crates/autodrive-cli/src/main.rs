//! autodrive - headless runner for the automated car simulation
//!
//! Loads a world scenario, drives the controlled car with scripted input and
//! logs the resulting snapshots.

mod script;

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use autodrive_core::config::{SimConfig, WorldConfig};
use autodrive_core::entity::Collidable;
use autodrive_core::hmi::{Gear, HmiPacket};
use autodrive_core::simulation::Simulation;
use autodrive_core::snapshot::WorldSnapshot;
use autodrive_core::ticker::TickDriver;
use autodrive_core::world::World;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use script::Script;

#[derive(Parser, Debug)]
#[command(name = "autodrive")]
#[command(about = "Headless automated car simulation")]
#[command(version)]
struct Cli {
    /// Simulation tunables (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Step the simulation as fast as possible
    Run {
        /// World scenario (JSON)
        world: PathBuf,

        /// Input script (JSON); full throttle in Drive when omitted
        #[arg(short, long)]
        script: Option<PathBuf>,

        /// Ticks to run when no script is given
        #[arg(short, long, default_value_t = 600)]
        ticks: usize,

        /// Log every n-th snapshot
        #[arg(long, default_value_t = 60)]
        every: u64,

        /// Write all snapshots to this file as a JSON array
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run on the tick driver at the configured rate
    Realtime {
        /// World scenario (JSON)
        world: PathBuf,

        /// Wall-clock run time in seconds
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,

        /// Gas pedal in [0, 100]
        #[arg(long, default_value_t = 50.0)]
        gas: f32,

        /// Steering wheel in [-100, 100]
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        steering: f32,
    },

    /// Validate a scenario without running it
    Check {
        /// World scenario (JSON)
        world: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let sim_config = match &cli.config {
        Some(path) => SimConfig::load(path).context("loading simulation config")?,
        None => SimConfig::default(),
    };

    match cli.command {
        Commands::Run {
            world,
            script,
            ticks,
            every,
            output,
        } => {
            let script = match script {
                Some(path) => Script::load(&path)?,
                None => Script::constant(HmiPacket::new(Gear::Drive, 100.0, 0.0, 0.0), ticks),
            };
            run(&sim_config, &world, &script, every, output.as_deref())
        }
        Commands::Realtime {
            world,
            seconds,
            gas,
            steering,
        } => realtime(&sim_config, &world, seconds, HmiPacket::new(Gear::Drive, gas, 0.0, steering)),
        Commands::Check { world } => check(&sim_config, &world),
    }
}

fn load_world(sim_config: &SimConfig, path: &Path) -> Result<World> {
    let world_config = WorldConfig::load(path).with_context(|| format!("loading {}", path.display()))?;
    World::from_config(&world_config, sim_config).with_context(|| format!("building {}", path.display()))
}

fn build_simulation(sim_config: &SimConfig, path: &Path) -> Result<Simulation> {
    let world = load_world(sim_config, path)?;
    Ok(Simulation::new(world).with_sensors(sim_config.sensors.clone()))
}

fn log_snapshot(snapshot: &WorldSnapshot) {
    let v = &snapshot.vehicle;
    info!(
        tick = snapshot.tick,
        x = v.position.x,
        y = v.position.y,
        heading = v.heading,
        speed = v.speed,
        rpm = v.rpm,
        gear = %v.gear,
        drive_gear = v.drive_gear,
        health = v.health,
        radar = snapshot.sensors.radar.len(),
        "snapshot"
    );
}

fn run(
    sim_config: &SimConfig,
    world: &Path,
    script: &Script,
    every: u64,
    output: Option<&Path>,
) -> Result<()> {
    let mut sim = build_simulation(sim_config, world)?;
    info!(ticks = script.total_ticks(), "running script");
    sim.start();

    let every = every.max(1);
    let mut recorded = Vec::new();
    let mut collisions = 0;
    for packet in script.packets() {
        sim.set_input(packet);
        let Some(snapshot) = sim.step() else {
            break;
        };
        collisions += snapshot.collisions.len();
        for event in &snapshot.collisions {
            info!(tick = snapshot.tick, object = %event.object, kind = %event.kind, damage = event.damage, "collision");
        }
        if snapshot.tick % every == 0 {
            log_snapshot(&snapshot);
        }
        if output.is_some() {
            recorded.push(snapshot);
        }
        if sim.world().car().is_wrecked() {
            info!(tick = sim.tick(), "car wrecked");
            break;
        }
    }
    sim.stop();

    if let Some(latest) = sim.board().latest() {
        log_snapshot(&latest);
    }
    info!(ticks = sim.tick(), collisions, "run finished");

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&recorded)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), snapshots = recorded.len(), "snapshots written");
    }
    Ok(())
}

fn realtime(sim_config: &SimConfig, world: &Path, seconds: f64, input: HmiPacket) -> Result<()> {
    let sim = build_simulation(sim_config, world)?;
    let board = sim.board();
    let snapshots = board.subscribe();

    let mut driver = TickDriver::new(sim, sim_config.tick_rate_hz);
    driver.lock().set_input(input);
    driver.start();

    let logger = thread::spawn(move || {
        let mut seen = 0_u64;
        for snapshot in snapshots {
            seen += 1;
            if snapshot.tick % 60 == 0 {
                log_snapshot(&snapshot);
            }
        }
        seen
    });

    thread::sleep(Duration::from_secs_f64(seconds.max(0.0)));
    let ticks = driver.stop();
    // Dropping the driver and board closes the last sender.
    drop(driver);
    drop(board);
    let seen = logger
        .join()
        .map_err(|_| anyhow::anyhow!("snapshot logger panicked"))?;
    info!(ticks, seen, "realtime run finished");
    Ok(())
}

fn check(sim_config: &SimConfig, path: &Path) -> Result<()> {
    let world = load_world(sim_config, path)?;
    let collidable = world
        .objects()
        .filter(|o| o.is_collidable())
        .count();
    info!(
        width = world.size().x,
        height = world.size().y,
        objects = world.object_count(),
        collidable,
        "scenario ok"
    );
    Ok(())
}
