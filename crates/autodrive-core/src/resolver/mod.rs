//! Collision resolver.
//!
//! The resolver is the validation step between steering and commit. It takes
//! the [`CandidatePose`] produced by the powertrain, finds every collidable
//! object the car footprint overlaps at that pose, and lets a per-kind
//! [`CollisionResponse`] correct the candidate, damage the car and shove the
//! other object.
//!
//! # Architecture
//!
//! Each response declares which kinds it handles via
//! [`CollisionResponse::handles`]. During resolution:
//! 1. The car footprint at the candidate pose is queried against the world
//! 2. Hits are ordered nearest-first, ties by insertion order
//! 3. Each hit is routed to the first response that handles its kind; kinds
//!    nobody handles are ignored
//! 4. The corrected candidate is threaded from one hit to the next
//!
//! # Invariants
//!
//! - Resolution never fails
//! - Health never increases and saturates at zero
//! - The same world and candidate always produce the same result
//!
//! # Available Responses
//!
//! - [`TreeResponse`]: stops the car at its pre-move pose
//! - [`SignResponse`]: knocks the sign away and bounces the car back

mod event;
mod sign;
mod tree;

pub use event::CollisionEvent;
pub use sign::SignResponse;
pub use tree::TreeResponse;

use glam::Vec2;
use polygrid::QueryRegion;
use serde::{Deserialize, Serialize};

use crate::entity::{CarPose, Collidable, ObjectId, ObjectKind};
use crate::powertrain::CandidatePose;
use crate::world::World;

/// State threaded through the hits of one resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactContext {
    /// Committed pose before this tick.
    pub current: CarPose,
    /// Candidate pose, corrected by each response in turn.
    pub candidate: CandidatePose,
    /// Mass of the car.
    pub mass: f32,
}

impl ImpactContext {
    /// Displacement the car is attempting: `candidate - current`.
    #[must_use]
    pub fn impact(&self) -> Vec2 {
        self.candidate.position - self.current.position
    }

    /// Resets the candidate to the pre-move pose.
    pub fn revert(&mut self) {
        self.candidate = CandidatePose {
            position: self.current.position,
            heading: self.current.heading,
        };
    }
}

/// Reaction to the car running into one object kind.
///
/// # Example
///
/// ```
/// use autodrive_core::entity::{ObjectId, ObjectKind};
/// use autodrive_core::resolver::{CollisionEvent, CollisionResponse, ImpactContext};
/// use autodrive_core::world::World;
///
/// struct Ghost;
///
/// impl CollisionResponse for Ghost {
///     fn handles(&self, kind: &ObjectKind) -> bool {
///         matches!(kind, ObjectKind::Generic)
///     }
///
///     fn respond(
///         &self,
///         _ctx: &mut ImpactContext,
///         _world: &mut World,
///         _object: ObjectId,
///     ) -> Option<CollisionEvent> {
///         None
///     }
/// }
/// ```
pub trait CollisionResponse: Send + Sync {
    /// Returns `true` if this response handles `kind`.
    fn handles(&self, kind: &ObjectKind) -> bool;

    /// Applies the collision with `object`.
    ///
    /// Implementations may mutate the car and the object through `world`
    /// and must keep the spatial index in sync for anything they move.
    fn respond(
        &self,
        ctx: &mut ImpactContext,
        world: &mut World,
        object: ObjectId,
    ) -> Option<CollisionEvent>;
}

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Position to commit.
    pub position: Vec2,
    /// Heading to commit.
    pub heading: f32,
    /// One event per handled hit, in handling order.
    pub events: Vec<CollisionEvent>,
}

impl Resolution {
    /// Returns `true` if anything was hit.
    #[must_use]
    pub fn collided(&self) -> bool {
        !self.events.is_empty()
    }
}

/// Routes footprint hits to per-kind responses.
pub struct CollisionResolver {
    responses: Vec<Box<dyn CollisionResponse>>,
}

impl std::fmt::Debug for CollisionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionResolver")
            .field("responses", &self.responses.len())
            .finish()
    }
}

impl Default for CollisionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionResolver {
    /// Creates a resolver with the tree and sign responses.
    #[must_use]
    pub fn new() -> Self {
        Self::empty()
            .with_response(Box::new(TreeResponse))
            .with_response(Box::new(SignResponse))
    }

    /// Creates a resolver that ignores every hit.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            responses: Vec::new(),
        }
    }

    /// Registers a response. Earlier responses win for overlapping kinds.
    #[must_use]
    pub fn with_response(mut self, response: Box<dyn CollisionResponse>) -> Self {
        self.responses.push(response);
        self
    }

    /// Collidable objects the car footprint overlaps at `pose`, nearest first.
    #[must_use]
    pub fn hits_at(&self, world: &World, pose: CarPose) -> Vec<ObjectId> {
        let mut hits: Vec<ObjectId> = world
            .car()
            .footprint_at(pose)
            .into_iter()
            .flat_map(|poly| world.objects_in_region(&QueryRegion::Polygon(poly), Some(World::CAR_ID)))
            .filter(|id| world.object(*id).is_some_and(Collidable::is_collidable))
            .collect();
        hits.sort_unstable();
        hits.dedup();

        let origin = world.car().pose().position;
        let distance = |id: &ObjectId| {
            world
                .object(*id)
                .map_or(f32::INFINITY, |o| origin.distance_squared(o.position_f32()))
        };
        // Stable sort keeps id order for equal distances.
        hits.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
        hits
    }

    /// Validates `candidate` against the world.
    ///
    /// Mutates car health and displaced objects; the returned pose is left
    /// for the caller to commit.
    pub fn resolve(&self, world: &mut World, candidate: CandidatePose) -> Resolution {
        let hits = self.hits_at(world, candidate.into());
        let mut ctx = ImpactContext {
            current: world.car().pose(),
            candidate,
            mass: world.car().mass,
        };

        let mut events = Vec::new();
        for id in hits {
            let Some(kind) = world.object(id).map(|o| o.kind().clone()) else {
                continue;
            };
            let Some(response) = self.responses.iter().find(|r| r.handles(&kind)) else {
                continue;
            };
            if let Some(event) = response.respond(&mut ctx, world, id) {
                tracing::debug!(
                    object = %event.object,
                    kind = %event.kind,
                    damage = event.damage,
                    health = world.car().health(),
                    "collision"
                );
                events.push(event);
            }
        }

        Resolution {
            position: ctx.candidate.position,
            heading: ctx.candidate.heading,
            events,
        }
    }
}
