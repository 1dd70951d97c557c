//! Collision events.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::entity::{ObjectId, ObjectKind};

/// Record of one handled collision.
///
/// Events are informational; everything they describe has already been
/// applied to the world when they are emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// The object that was hit.
    pub object: ObjectId,
    /// Its kind at the time of the hit.
    pub kind: ObjectKind,
    /// Displacement the car was attempting (`candidate - current`).
    pub impact: Vec2,
    /// Health actually lost.
    pub damage: i32,
    /// New position of the object if it was knocked away.
    pub displaced_to: Option<IVec2>,
}

impl CollisionEvent {
    /// Creates an event for an object that did not move.
    #[must_use]
    pub fn new(object: ObjectId, kind: ObjectKind, impact: Vec2, damage: i32) -> Self {
        Self {
            object,
            kind,
            impact,
            damage,
            displaced_to: None,
        }
    }

    /// Records where the object ended up.
    #[must_use]
    pub fn with_displacement(mut self, position: IVec2) -> Self {
        self.displaced_to = Some(position);
        self
    }
}
