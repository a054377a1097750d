//! World Layer
//!
//! Entity/collider storage, the staged mutation protocol and the collision
//! pass. Nothing here knows about concrete gameplay types; the payload of
//! an entity is a type parameter.
//!
//! ## Module Structure
//!
//! - `entity`: entity record and id
//! - `collider`: colliders, boxes and the pair test
//! - `registry`: staged add/remove with a single commit point
//! - `collision`: ordered-pair collision detection

pub mod collider;
pub mod collision;
pub mod entity;
pub mod registry;

// Re-export key types
pub use collider::{Aabb, Collider, ColliderId, ContactKind, test_pair};
pub use collision::{Collision, detect_collisions};
pub use entity::{Entity, EntityId};
pub use registry::{CommitReport, EntityRegistry};
