//! Engine Configuration
//!
//! Every field has a default so a partial JSON file is enough. Values
//! outside their valid range are clamped, never rejected.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::vec2::Bounds;
use crate::error::EngineError;
use crate::game::spawn::LevelSpec;

/// Valid master volume range.
pub const VOLUME_RANGE: (f32, f32) = (0.0, 1.0);

/// Valid game speed multiplier range.
pub const GAME_SPEED_RANGE: (f32, f32) = (0.25, 2.0);

/// Player-adjustable options. Setters clamp silently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master volume in [0, 1], read by the external audio layer
    pub volume: f32,
    /// Multiplier applied to every clock step
    pub game_speed: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: 0.8,
            game_speed: 1.0,
        }
    }
}

impl Settings {
    /// Set volume, clamped to [`VOLUME_RANGE`].
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_or(volume, VOLUME_RANGE, Self::default().volume);
    }

    /// Set game speed, clamped to [`GAME_SPEED_RANGE`].
    pub fn set_game_speed(&mut self, speed: f32) {
        self.game_speed = clamp_or(speed, GAME_SPEED_RANGE, Self::default().game_speed);
    }

    fn sanitized(mut self) -> Self {
        let (volume, speed) = (self.volume, self.game_speed);
        self.set_volume(volume);
        self.set_game_speed(speed);
        self
    }
}

/// Player ship tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Movement speed (units/second)
    pub speed: f32,
    /// Ship box size
    pub size: f32,
    /// Seconds between shots
    pub fire_cooldown: f32,
    /// Bullet speed (units/second)
    pub bullet_speed: f32,
    /// Bullet box size
    pub bullet_size: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed: 260.0,
            size: 24.0,
            fire_cooldown: 0.2,
            bullet_speed: 600.0,
            bullet_size: 6.0,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed tick period (ms)
    pub tick_period_ms: u64,
    /// Delay before the watchdog checks the tick task (ms)
    pub watchdog_timeout_ms: u64,
    /// Render pass period (ms)
    pub render_period_ms: u64,
    /// Visible playfield
    pub bounds: Bounds,
    /// Death-sequence interval (seconds of level time)
    pub death_interval: f32,
    /// Seed for spawn placement and enemy headings
    pub rng_seed: u64,
    /// Random placement attempts before falling back to the best candidate
    pub spawn_max_attempts: u32,
    /// Name written into score records
    pub player_name: String,
    /// Player ship tuning
    pub player: PlayerTuning,
    /// Player-adjustable options
    pub settings: Settings,
    /// Playable levels, in menu order
    pub levels: Vec<LevelSpec>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let bounds = Bounds::default();
        Self {
            tick_period_ms: 20,
            watchdog_timeout_ms: 1000,
            render_period_ms: 16,
            bounds,
            death_interval: 1.5,
            rng_seed: 0x5EED,
            spawn_max_attempts: 32,
            player_name: "PLAYER".to_string(),
            player: PlayerTuning::default(),
            settings: Settings::default(),
            levels: LevelSpec::default_campaign(&bounds),
        }
    }
}

impl EngineConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str::<Self>(json)
            .map(Self::sanitized)
            .map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Clamp every field into its valid range.
    pub fn sanitized(mut self) -> Self {
        self.tick_period_ms = self.tick_period_ms.clamp(1, 1000);
        self.watchdog_timeout_ms = self.watchdog_timeout_ms.max(self.tick_period_ms);
        self.render_period_ms = self.render_period_ms.clamp(1, 1000);
        self.bounds.width = clamp_or(self.bounds.width, (16.0, 16384.0), 800.0);
        self.bounds.height = clamp_or(self.bounds.height, (16.0, 16384.0), 600.0);
        self.death_interval = clamp_or(self.death_interval, (0.0, 60.0), 1.5);
        self.spawn_max_attempts = self.spawn_max_attempts.max(1);
        self.settings = self.settings.sanitized();
        if self.levels.is_empty() {
            self.levels = LevelSpec::default_campaign(&self.bounds);
        }
        for level in &mut self.levels {
            level.sanitize(&self.bounds);
        }
        self
    }

    /// Tick period as a duration.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Watchdog timeout as a duration.
    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    /// Render period as a duration.
    pub fn render_period(&self) -> Duration {
        Duration::from_millis(self.render_period_ms)
    }
}

/// Clamp into `range`; NaN falls back to `fallback`.
fn clamp_or(value: f32, range: (f32, f32), fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(range.0, range.1)
    }
}
