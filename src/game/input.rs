//! Input Intent
//!
//! The core never parses raw input events. An external input layer sends
//! [`EngineCommand`]s; the engine folds them into an [`InputState`] that
//! the controlled entity and UI buttons read during their update.

use serde::{Deserialize, Serialize};

use crate::core::vec2::Vec2;

/// A menu choice. Carried by a UI button and consumed by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuAction {
    /// Start the level at this index
    Play(usize),
    /// Leave the pause panel
    Resume,
    /// Reload the current level
    Retry,
    /// Back to the main menu
    MainMenu,
    /// End the session
    Quit,
}

/// Commands accepted from outside the tick task.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum EngineCommand {
    /// Directional intent; normalized if longer than one
    Move(Vec2),
    /// Fire intent held or released
    Fire(bool),
    /// Pause or resume a running level
    TogglePause,
    /// Activate a menu button
    Select(MenuAction),
    /// Master volume (clamped)
    SetVolume(f32),
    /// Game speed multiplier (clamped)
    SetGameSpeed(f32),
}

/// Intent for the currently controlled entity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputState {
    direction: Vec2,
    fire: bool,
    pending_action: Option<MenuAction>,
}

impl InputState {
    /// Create an idle input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set directional intent.
    pub fn set_direction(&mut self, direction: Vec2) {
        self.direction = if direction.length_squared() > 1.0 {
            direction.normalize()
        } else {
            direction
        };
    }

    /// Set fire intent.
    pub fn set_fire(&mut self, fire: bool) {
        self.fire = fire;
    }

    /// Queue a menu action for the button that owns it.
    pub fn select(&mut self, action: MenuAction) {
        self.pending_action = Some(action);
    }

    /// Current direction (length <= 1).
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    /// Fire held.
    pub fn fire(&self) -> bool {
        self.fire
    }

    /// Pending menu action, if any.
    pub fn pending_action(&self) -> Option<MenuAction> {
        self.pending_action
    }

    /// Take the pending action if it matches `action`.
    pub fn consume(&mut self, action: MenuAction) -> bool {
        if self.pending_action == Some(action) {
            self.pending_action = None;
            true
        } else {
            false
        }
    }

    /// Drop an action no button claimed this tick.
    pub fn clear_action(&mut self) -> Option<MenuAction> {
        self.pending_action.take()
    }

    /// Release everything (scene change).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_normalized() {
        let mut input = InputState::new();
        input.set_direction(Vec2::new(3.0, 4.0));
        assert!((input.direction().length() - 1.0).abs() < 1e-5);

        input.set_direction(Vec2::new(0.5, 0.0));
        assert_eq!(input.direction(), Vec2::new(0.5, 0.0));
    }

    #[test]
    fn test_consume_only_matching_action() {
        let mut input = InputState::new();
        input.select(MenuAction::Retry);
        assert!(!input.consume(MenuAction::Quit));
        assert!(input.consume(MenuAction::Retry));
        assert!(!input.consume(MenuAction::Retry));
        assert_eq!(input.pending_action(), None);
    }
}
