//! Sign collisions: the sign flies, the car bounces.

use glam::Vec2;

use crate::entity::{ObjectId, ObjectKind};
use crate::world::World;

use super::{CollisionEvent, CollisionResponse, ImpactContext};

const IMPACT_FACTOR: f32 = 2.0;

/// Response for light, movable obstacles.
///
/// With `impact = candidate - current`:
/// - the car takes damage from `2 × impact`
/// - the sign moves by `mass × impact`, truncated to whole pixels
/// - the candidate becomes `current + 2 × (current - candidate)`
///
/// The candidate heading is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignResponse;

impl CollisionResponse for SignResponse {
    fn handles(&self, kind: &ObjectKind) -> bool {
        matches!(kind, ObjectKind::Sign { .. })
    }

    fn respond(
        &self,
        ctx: &mut ImpactContext,
        world: &mut World,
        object: ObjectId,
    ) -> Option<CollisionEvent> {
        let kind = world.object(object)?.kind().clone();
        let impact = ctx.impact();
        let damage = world
            .car_mut()
            .damage_on_collision(impact * IMPACT_FACTOR, Vec2::ZERO);
        let landed = world.displace_object(object, impact * ctx.mass)?;

        let current = ctx.current.position;
        ctx.candidate.position = current + (current - ctx.candidate.position) * IMPACT_FACTOR;

        Some(CollisionEvent::new(object, kind, impact, damage).with_displacement(landed))
    }
}
