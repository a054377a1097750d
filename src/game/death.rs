//! Player-Death Sequencer
//!
//! Time-driven state machine. A death only records state; every visible
//! consequence is released by [`DeathSequencer::poll`] once enough level
//! time has passed, and each step fires exactly once.
//!
//! ```text
//! death at t0 ──► next poll:   DisableColliders
//!             ──► t0 + d:      Reposition        (lives left)
//!             ──► t0 + 2d:     Respawn           (lives left)
//!             ──► t0 + d:      ShowGameOver      (no lives left)
//! ```

/// What a death led to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeathOutcome {
    /// Lives remain; a recovery wave should be scheduled
    Recover,
    /// Last life lost
    GameOver,
}

/// A step released by [`DeathSequencer::poll`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeathStep {
    /// Turn the player's colliders off
    DisableColliders,
    /// Move the player back to the start, facing up
    Reposition,
    /// Turn the player's colliders back on
    Respawn,
    /// Pause and show the game-over panel
    ShowGameOver,
}

/// Lives and death timing for one level.
#[derive(Clone, Debug, PartialEq)]
pub struct DeathSequencer {
    interval: f32,
    lives: u32,
    dead: bool,
    died_at: f32,
    game_over: bool,
    colliders_disabled: bool,
    repositioned: bool,
    game_over_shown: bool,
}

impl DeathSequencer {
    /// Create a sequencer with `lives` and death interval `interval`.
    pub fn new(lives: u32, interval: f32) -> Self {
        Self {
            interval,
            lives,
            dead: false,
            died_at: 0.0,
            game_over: false,
            colliders_disabled: false,
            repositioned: false,
            game_over_shown: false,
        }
    }

    /// Record a death at level time `now`.
    ///
    /// Returns `None` if the player is already dead (a second enemy
    /// touching the same frame).
    pub fn on_death(&mut self, now: f32) -> Option<DeathOutcome> {
        if self.dead || self.game_over {
            return None;
        }
        self.lives = self.lives.saturating_sub(1);
        self.dead = true;
        self.died_at = now;
        self.colliders_disabled = false;
        self.repositioned = false;

        if self.lives == 0 {
            self.game_over = true;
            Some(DeathOutcome::GameOver)
        } else {
            Some(DeathOutcome::Recover)
        }
    }

    /// Release the steps that are due at level time `now`, in order.
    pub fn poll(&mut self, now: f32) -> Vec<DeathStep> {
        let mut steps = Vec::new();
        if !self.dead {
            return steps;
        }

        if !self.colliders_disabled {
            self.colliders_disabled = true;
            steps.push(DeathStep::DisableColliders);
        }

        let elapsed = now - self.died_at;

        if self.game_over {
            if !self.game_over_shown && elapsed >= self.interval {
                self.game_over_shown = true;
                steps.push(DeathStep::ShowGameOver);
            }
            return steps;
        }

        if !self.repositioned && elapsed >= self.interval {
            self.repositioned = true;
            steps.push(DeathStep::Reposition);
        }
        if elapsed >= self.interval * 2.0 {
            self.dead = false;
            steps.push(DeathStep::Respawn);
        }
        steps
    }

    /// Lives left.
    pub fn lives(&self) -> u32 {
        self.lives
    }

    /// In the death sequence.
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Last life lost.
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// The game-over panel has been released.
    pub fn game_over_shown(&self) -> bool {
        self.game_over_shown
    }

    /// Level time of the last death.
    pub fn died_at(&self) -> f32 {
        self.died_at
    }

    /// Death interval.
    pub fn interval(&self) -> f32 {
        self.interval
    }
}
