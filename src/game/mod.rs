//! Game Logic Module
//!
//! Gameplay on top of the world layer: entity payloads, the enemy roster,
//! wave policy, the level director, the death sequence and scenes.
//!
//! ## Module Structure
//!
//! - `entity`: gameplay payloads stored in the registry
//! - `enemy`: enemy kinds with movement and wall policies
//! - `spawn`: wave policy, spawn events and placement
//! - `death`: time-driven player-death sequence
//! - `director`: per-level waves, scoring and death handling
//! - `scene`: scenes and the scene state machine
//! - `input`: input intent and menu actions
//! - `command`: outbound commands for an external transport
//! - `score`: score records and ranking

pub mod command;
pub mod death;
pub mod director;
pub mod enemy;
pub mod entity;
pub mod input;
pub mod scene;
pub mod score;
pub mod spawn;

// Re-export key types
pub use command::{CommandKind, OutboundCommand};
pub use death::{DeathOutcome, DeathSequencer, DeathStep};
pub use director::{HudIds, LevelContext, LevelDirector};
pub use enemy::{Enemy, EnemyKind, MovementPolicy, WallPolicy};
pub use entity::{EntityKind, GameEntity, Registry, UiElement, Widget};
pub use input::{EngineCommand, InputState, MenuAction};
pub use scene::{Scene, SceneManager, SceneState};
pub use score::{ScoreRecord, Scoreboard};
pub use spawn::{LevelSpec, SpawnEvent, SpawnPattern, WaveGrowth, WavePolicy};
