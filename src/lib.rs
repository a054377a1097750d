//! # Arcade Engine
//!
//! Real-time entity/scene core for a 2D arcade shooter: a fixed-period
//! tick with a watchdog, staged entity/collider lifecycle, a discrete
//! collision pass, and the scene and level orchestration around them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ARCADE ENGINE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── vec2.rs     - 2D vector and playfield bounds            │
//! │  ├── clock.rs    - Wall delta + pausable level time          │
//! │  └── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │                                                              │
//! │  world/          - Gameplay-agnostic storage                 │
//! │  ├── registry.rs - Staged add/remove, single commit point    │
//! │  ├── collider.rs - Boxes and the pair test                   │
//! │  └── collision.rs- Ordered-pair collision pass               │
//! │                                                              │
//! │  game/           - Gameplay                                  │
//! │  ├── enemy.rs    - Enemy kinds, movement and wall policies   │
//! │  ├── spawn.rs    - Wave policy and placement                 │
//! │  ├── director.rs - Waves, score, death handling              │
//! │  ├── death.rs    - Time-driven death sequence                │
//! │  └── scene.rs    - Scenes and the scene state machine        │
//! │                                                              │
//! │  engine/         - Engine context and the tick               │
//! │  scheduler.rs    - Tick task + watchdog                      │
//! │  render.rs       - Render task with its own staging          │
//! │  runtime.rs      - Wiring and shutdown order                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! The tick task owns the [`Engine`] outright. The render task never sees
//! the registry: it receives registration deltas over a channel, stages
//! them in its own lists, and reads transforms from a whole-frame snapshot
//! replaced after every tick. No lock is shared between the two.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod game;
pub mod render;
pub mod runtime;
pub mod scheduler;
pub mod world;

// Re-export commonly used types
pub use config::{EngineConfig, Settings};
pub use core::{Bounds, Clock, DeterministicRng, Vec2};
pub use engine::{Engine, TickOutcome};
pub use error::EngineError;
pub use game::{EngineCommand, LevelSpec, MenuAction, OutboundCommand, Scene, ScoreRecord};
pub use runtime::{GameRuntime, InputHandle};
pub use scheduler::{LoopStatus, Scheduler, Simulation};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
