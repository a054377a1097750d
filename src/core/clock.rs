//! Simulation Clock
//!
//! Tracks wall-clock delta time and a separate level time that stops
//! accumulating while the simulation is paused.

use std::time::{Duration, Instant};

/// Largest delta a single wall-clock step may report. Keeps a stalled
/// process from teleporting entities when it resumes.
pub const MAX_WALL_DELTA: f32 = 0.25;

#[derive(Debug, Clone, Copy)]
enum ClockMode {
    /// Delta measured from the host monotonic clock.
    Wall { last: Instant },
    /// Every step advances by the same amount (replays and tests).
    Fixed { step: f32 },
}

/// Wall time plus pausable level time.
#[derive(Debug, Clone)]
pub struct Clock {
    mode: ClockMode,
    /// Seconds covered by the most recent step (scaled by `speed`)
    delta: f32,
    /// Seconds since the clock was created
    wall_time: f32,
    /// Seconds of unpaused time since the level started
    level_time: f32,
    paused: bool,
    /// Game speed multiplier applied to every delta
    speed: f32,
}

impl Clock {
    /// Clock driven by the host monotonic clock.
    pub fn wall() -> Self {
        Self::with_mode(ClockMode::Wall {
            last: Instant::now(),
        })
    }

    /// Clock that advances by exactly `step` per call to [`Clock::advance`].
    pub fn fixed(step: Duration) -> Self {
        Self::with_mode(ClockMode::Fixed {
            step: step.as_secs_f32(),
        })
    }

    fn with_mode(mode: ClockMode) -> Self {
        Self {
            mode,
            delta: 0.0,
            wall_time: 0.0,
            level_time: 0.0,
            paused: false,
            speed: 1.0,
        }
    }

    /// Advance one step and return the delta in seconds.
    ///
    /// Level time only moves while unpaused.
    pub fn advance(&mut self) -> f32 {
        let raw = match &mut self.mode {
            ClockMode::Wall { last } => {
                let now = Instant::now();
                let dt = now.duration_since(*last).as_secs_f32();
                *last = now;
                dt.min(MAX_WALL_DELTA)
            }
            ClockMode::Fixed { step } => *step,
        };

        self.delta = raw * self.speed;
        self.wall_time += self.delta;
        if !self.paused {
            self.level_time += self.delta;
        }
        self.delta
    }

    /// Delta of the most recent step.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Seconds since the clock was created.
    #[inline]
    pub fn wall_time(&self) -> f32 {
        self.wall_time
    }

    /// Unpaused seconds since the current level started.
    #[inline]
    pub fn level_time(&self) -> f32 {
        self.level_time
    }

    /// Restart level time at zero (new level or retry).
    pub fn reset_level_time(&mut self) {
        self.level_time = 0.0;
    }

    /// Is level time suspended?
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Suspend or resume level time.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Set the game speed multiplier (already clamped by the caller).
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }
}
