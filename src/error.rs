//! Engine errors.

use crate::game::scene::SceneState;

/// Errors surfaced by the engine core.
///
/// Gameplay-level problems (a spawn that cannot be materialized) are logged
/// and skipped instead; everything here is either a programming error or
/// fatal for the running session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A scene load started while another load or teardown was in progress.
    /// Loads are synchronous, so this only fires on re-entry from scene
    /// load or teardown code.
    #[error("Scene conflict: load requested while scene manager is {0:?}")]
    SceneConflict(SceneState),

    /// An operation needed a current scene (or level) and there is none.
    #[error("No active scene")]
    NoActiveScene,

    /// The tick task terminated.
    #[error("Game loop died: {0}")]
    LoopDied(String),

    /// Configuration could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),
}
