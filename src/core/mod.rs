//! Core primitives.
//!
//! Math, time and randomness shared by the world and game layers.

pub mod clock;
pub mod rng;
pub mod vec2;

// Re-export core types
pub use clock::Clock;
pub use rng::DeterministicRng;
pub use vec2::{Bounds, Vec2};
