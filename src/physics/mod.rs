//! Physics simulation module
//!
//! Point bodies with ray-probe collision, stepped by a fixed-tick world.
//! Probe geometry can be analytic shapes or rapier3d colliders.

mod body;
mod colliders;
mod geometry;
mod world;

pub use body::{Body, Contact, Contacts, Direction, Probe};
pub use colliders::ColliderGeometry;
pub use geometry::{EmptyGeometry, Geometry, ObjectId, Ray, RayHit, Shape, StaticGeometry};
pub use world::{BodyId, DebugSnapshot, World, WorldId};
