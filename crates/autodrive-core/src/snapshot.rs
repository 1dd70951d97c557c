//! Immutable per-tick snapshots and the board that publishes them.
//!
//! Every tick ends by capturing a [`WorldSnapshot`] and publishing it on a
//! [`SnapshotBoard`]. Readers either poll [`SnapshotBoard::latest`] or
//! [`SnapshotBoard::subscribe`] to receive snapshots over a bounded channel.
//! A subscriber that falls [`SUBSCRIBER_CAPACITY`] snapshots behind misses
//! new ones until it drains. Snapshots are shared behind `Arc` and never
//! change after publication.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::entity::{ObjectId, ObjectKind, SensorFlags};
use crate::hmi::Gear;
use crate::resolver::CollisionEvent;
use crate::sensor::SensorReading;
use crate::world::World;

/// Controlled car state after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    /// Committed position.
    pub position: IVec2,
    /// Committed heading in radians.
    pub heading: f32,
    /// Health in `[0, 100]`.
    pub health: i32,
    /// Speed in pixels per tick.
    pub speed: f32,
    /// Engine RPM.
    pub rpm: i32,
    /// Lever position.
    pub gear: Gear,
    /// Selected drive gear, starting at 1.
    pub drive_gear: usize,
    /// Visible sensor overlays.
    pub sensors: SensorFlags,
}

/// One placed object after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    /// Object id.
    pub id: ObjectId,
    /// Object kind.
    pub kind: ObjectKind,
    /// Position.
    pub position: IVec2,
    /// Heading in radians.
    pub heading: f32,
}

/// Everything a renderer or dashboard needs from one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Tick number, starting at 1 for the first step.
    pub tick: u64,
    /// The controlled car.
    pub vehicle: VehicleSnapshot,
    /// Placed objects in insertion order.
    pub objects: Vec<ObjectSnapshot>,
    /// Top-left corner of the visible area.
    pub viewport_origin: IVec2,
    /// Collisions handled this tick.
    pub collisions: Vec<CollisionEvent>,
    /// Sensor contacts this tick.
    pub sensors: SensorReading,
}

impl WorldSnapshot {
    /// Captures the world after a tick.
    #[must_use]
    pub fn capture(
        tick: u64,
        world: &World,
        collisions: Vec<CollisionEvent>,
        sensors: SensorReading,
    ) -> Self {
        let car = world.car();
        let engine = &car.powertrain().engine;
        let vehicle = VehicleSnapshot {
            position: car.position(),
            heading: car.heading(),
            health: car.health(),
            speed: car.speed,
            rpm: engine.rpm(),
            gear: engine.shifter().position,
            drive_gear: engine.shifter().current_index() + 1,
            sensors: car.sensors.visible,
        };
        let objects = world
            .objects()
            .map(|o| ObjectSnapshot {
                id: o.id(),
                kind: o.kind().clone(),
                position: o.position,
                heading: o.heading,
            })
            .collect();
        Self {
            tick,
            vehicle,
            objects,
            viewport_origin: world.viewport_origin(),
            collisions,
            sensors,
        }
    }

    /// Looks up one object by id.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&ObjectSnapshot> {
        self.objects
            .binary_search_by_key(&id, |o| o.id)
            .ok()
            .map(|i| &self.objects[i])
    }
}

/// Snapshots a subscriber may hold undrained.
pub const SUBSCRIBER_CAPACITY: usize = 256;

/// Shared handle to the latest snapshot plus channel subscribers.
///
/// Cloning the board yields another handle to the same state.
#[derive(Debug, Clone, Default)]
pub struct SnapshotBoard {
    latest: Arc<RwLock<Option<Arc<WorldSnapshot>>>>,
    subscribers: Arc<Mutex<Vec<Sender<Arc<WorldSnapshot>>>>>,
}

impl SnapshotBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the latest snapshot and forwards it to every live subscriber.
    ///
    /// Never blocks: a full subscriber skips this snapshot and stays
    /// subscribed, a disconnected one is dropped.
    pub fn publish(&self, snapshot: WorldSnapshot) -> Arc<WorldSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&snapshot));

        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| match tx.try_send(Arc::clone(&snapshot)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!(tick = snapshot.tick, "subscriber lagging, snapshot skipped");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        snapshot
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<WorldSnapshot>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Receives snapshots published from now on.
    ///
    /// The channel holds at most [`SUBSCRIBER_CAPACITY`] snapshots; while it
    /// is full, newer snapshots are skipped for this subscriber. Dropping the
    /// receiver unsubscribes on the next publish.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<Arc<WorldSnapshot>> {
        let (tx, rx) = crossbeam_channel::bounded(SUBSCRIBER_CAPACITY);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Number of live subscribers as of the last publish.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::car::CarConfig;
    use crate::entity::{AutomatedCar, WorldObject};
    use crate::powertrain::Powertrain;
    use glam::UVec2;
    use polygrid::GridConfig;

    fn world() -> World {
        let car = AutomatedCar::new(IVec2::new(400, 300), 0.5, &CarConfig::default(), Powertrain::default());
        let mut world = World::new(UVec2::new(2000, 1500), UVec2::new(800, 600), car, GridConfig::default()).unwrap();
        world.add_object(WorldObject::new("tree", IVec2::new(10, 20)));
        world.add_object(WorldObject::new("roadsign_speed_50", IVec2::new(30, 40)));
        world
    }

    fn snapshot(tick: u64) -> WorldSnapshot {
        WorldSnapshot::capture(tick, &world(), Vec::new(), SensorReading::default())
    }

    mod capture_tests {
        use super::*;

        #[test]
        fn captures_vehicle_state() {
            let snap = snapshot(7);
            assert_eq!(snap.tick, 7);
            assert_eq!(snap.vehicle.position, IVec2::new(400, 300));
            assert_eq!(snap.vehicle.heading, 0.5);
            assert_eq!(snap.vehicle.health, 100);
            assert_eq!(snap.vehicle.gear, Gear::Park);
            assert_eq!(snap.vehicle.drive_gear, 1);
            assert_eq!(snap.viewport_origin, IVec2::ZERO);
        }

        #[test]
        fn objects_in_insertion_order() {
            let snap = snapshot(1);
            let kinds: Vec<_> = snap.objects.iter().map(|o| o.kind.name()).collect();
            assert_eq!(kinds, vec!["tree", "sign"]);
            let second = snap.objects[1].id;
            assert_eq!(snap.object(second).unwrap().position, IVec2::new(30, 40));
            assert!(snap.object(World::CAR_ID).is_none());
        }

        #[test]
        fn serializes_to_json() {
            let snap = snapshot(3);
            let json = serde_json::to_string(&snap).unwrap();
            let back: WorldSnapshot = serde_json::from_str(&json).unwrap();
            assert_eq!(snap, back);
        }
    }

    mod board_tests {
        use super::*;

        #[test]
        fn latest_follows_publish() {
            let board = SnapshotBoard::new();
            assert!(board.latest().is_none());
            board.publish(snapshot(1));
            board.publish(snapshot(2));
            assert_eq!(board.latest().unwrap().tick, 2);
        }

        #[test]
        fn clones_share_state() {
            let board = SnapshotBoard::new();
            let reader = board.clone();
            board.publish(snapshot(5));
            assert_eq!(reader.latest().unwrap().tick, 5);
        }

        #[test]
        fn subscribers_receive_every_snapshot() {
            let board = SnapshotBoard::new();
            let rx = board.subscribe();
            board.publish(snapshot(1));
            board.publish(snapshot(2));
            let ticks: Vec<u64> = rx.try_iter().map(|s| s.tick).collect();
            assert_eq!(ticks, vec![1, 2]);
        }

        #[test]
        fn dropped_subscribers_are_pruned() {
            let board = SnapshotBoard::new();
            let rx = board.subscribe();
            assert_eq!(board.subscriber_count(), 1);
            drop(rx);
            board.publish(snapshot(1));
            assert_eq!(board.subscriber_count(), 0);
        }

        #[test]
        fn lagging_subscriber_keeps_oldest_and_stays_subscribed() {
            let board = SnapshotBoard::new();
            let rx = board.subscribe();
            let total = SUBSCRIBER_CAPACITY as u64 + 10;
            for tick in 1..=total {
                board.publish(snapshot(tick));
            }
            assert_eq!(rx.len(), SUBSCRIBER_CAPACITY);
            assert_eq!(board.subscriber_count(), 1);
            assert_eq!(board.latest().unwrap().tick, total);

            let held: Vec<u64> = rx.try_iter().map(|s| s.tick).collect();
            assert_eq!(held.first(), Some(&1));
            assert_eq!(held.last(), Some(&(SUBSCRIBER_CAPACITY as u64)));

            board.publish(snapshot(total + 1));
            assert_eq!(rx.try_recv().unwrap().tick, total + 1);
        }

        #[test]
        fn published_snapshot_is_shared() {
            let board = SnapshotBoard::new();
            let published = board.publish(snapshot(9));
            assert!(Arc::ptr_eq(&published, &board.latest().unwrap()));
        }
    }
}
