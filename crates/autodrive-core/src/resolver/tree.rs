//! Tree collisions: the car stops dead.

use glam::Vec2;

use crate::entity::{ObjectId, ObjectKind};
use crate::world::World;

use super::{CollisionEvent, CollisionResponse, ImpactContext};

/// Damage is dealt at twice the attempted displacement.
const IMPACT_FACTOR: f32 = 2.0;

/// Response for immovable obstacles.
///
/// The car takes damage from `2 × impact` and the candidate is reset to the
/// pre-move pose, heading included.
///
/// # Example
///
/// ```
/// use autodrive_core::entity::ObjectKind;
/// use autodrive_core::resolver::{CollisionResponse, TreeResponse};
///
/// assert!(TreeResponse.handles(&ObjectKind::Tree));
/// assert!(!TreeResponse.handles(&ObjectKind::Road));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeResponse;

impl CollisionResponse for TreeResponse {
    fn handles(&self, kind: &ObjectKind) -> bool {
        matches!(kind, ObjectKind::Tree)
    }

    fn respond(
        &self,
        ctx: &mut ImpactContext,
        world: &mut World,
        object: ObjectId,
    ) -> Option<CollisionEvent> {
        let impact = ctx.impact();
        let damage = world
            .car_mut()
            .damage_on_collision(impact * IMPACT_FACTOR, Vec2::ZERO);
        ctx.revert();
        Some(CollisionEvent::new(object, ObjectKind::Tree, impact, damage))
    }
}
