//! Wave Spawning
//!
//! A level's [`WavePolicy`] turns "what happened so far" into the next
//! [`SpawnEvent`]; [`placements`] turns an event into positions.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::rng::DeterministicRng;
use crate::core::vec2::{Bounds, Vec2};
use crate::game::enemy::EnemyKind;

/// How a wave's enemies are laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnPattern {
    /// Uniform random positions, kept away from the player
    Random,
    /// Evenly spaced along the top edge
    Line,
    /// Evenly spaced on a circle around the player
    Ring,
    /// The four corners, round robin
    Corners,
    /// Positions listed in the event
    Explicit,
}

/// One wave to materialize. Consumed exactly once.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnEvent {
    /// Level time at which the wave appears
    pub time: f32,
    /// Zero-based wave index
    pub wave: u32,
    /// Enemy kind for every member of the wave
    pub enemy_kind: EnemyKind,
    /// Number of enemies
    pub count: u32,
    /// Layout
    pub pattern: SpawnPattern,
    /// Minimum distance from the player for random placement
    pub min_player_distance: f32,
    /// Positions for [`SpawnPattern::Explicit`]
    pub positions: Option<Vec<Vec2>>,
    /// Issued as a post-death recovery wave
    pub recovery: bool,
}

/// How wave size grows with the wave index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveGrowth {
    /// `wave + 1`
    Linear,
    /// `2 * wave + 1`
    Steep,
    /// Always the same size
    Constant(u32),
}

impl WaveGrowth {
    /// Enemy count for a wave index.
    pub fn count(self, wave: u32) -> u32 {
        match self {
            WaveGrowth::Linear => wave.saturating_add(1),
            WaveGrowth::Steep => wave.saturating_mul(2).saturating_add(1),
            WaveGrowth::Constant(n) => n,
        }
    }
}

/// Data-driven spawn policy for one level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WavePolicy {
    /// Seconds between regular waves, measured from the previous wave
    pub interval: f32,
    /// Seconds from a player death to the recovery wave
    pub recovery_offset: f32,
    /// Kinds cycled by wave index
    pub enemy_kinds: Vec<EnemyKind>,
    /// Patterns cycled by wave index
    pub patterns: Vec<SpawnPattern>,
    /// Size growth
    pub growth: WaveGrowth,
    /// Upper bound on wave size
    pub max_count: u32,
    /// Random placement keeps this far from the player
    pub min_player_distance: f32,
    /// Used by [`SpawnPattern::Explicit`]
    pub explicit_positions: Vec<Vec2>,
}

impl Default for WavePolicy {
    fn default() -> Self {
        Self {
            interval: 8.0,
            recovery_offset: 3.0,
            enemy_kinds: EnemyKind::ALL.to_vec(),
            patterns: vec![SpawnPattern::Random],
            growth: WaveGrowth::Linear,
            max_count: 12,
            min_player_distance: 160.0,
            explicit_positions: Vec::new(),
        }
    }
}

impl WavePolicy {
    /// Decide the next wave.
    ///
    /// * `last_spawn_time` - scheduled time of the previous wave
    /// * `now` - current level time
    /// * `wave_number` - waves spawned so far (index of the wave to plan)
    /// * `player_just_died` - schedule a shorter, easier recovery wave
    ///
    /// Returns `None` when the policy has no enemy kinds.
    pub fn next_event(
        &self,
        last_spawn_time: f32,
        now: f32,
        wave_number: u32,
        player_just_died: bool,
    ) -> Option<SpawnEvent> {
        if self.enemy_kinds.is_empty() {
            return None;
        }

        let index = wave_number as usize;
        let pattern = if self.patterns.is_empty() {
            SpawnPattern::Random
        } else {
            self.patterns[index % self.patterns.len()]
        };
        let normal_count = self.growth.count(wave_number).min(self.max_count);

        let (time, enemy_kind, count) = if player_just_died {
            // Simplest kind, half the size, counted from now
            (
                now + self.recovery_offset,
                self.enemy_kinds[0],
                (normal_count / 2).max(1),
            )
        } else if wave_number == 0 {
            (0.0, self.enemy_kinds[0], normal_count)
        } else {
            (
                last_spawn_time + self.interval,
                self.enemy_kinds[index % self.enemy_kinds.len()],
                normal_count,
            )
        };

        let positions = (pattern == SpawnPattern::Explicit && !self.explicit_positions.is_empty())
            .then(|| self.explicit_positions.clone());

        Some(SpawnEvent {
            time,
            wave: wave_number,
            enemy_kind,
            count,
            pattern,
            min_player_distance: self.min_player_distance,
            positions,
            recovery: player_just_died,
        })
    }

    fn sanitize(&mut self) {
        self.interval = finite_at_least(self.interval, 0.1, 8.0);
        self.recovery_offset = finite_at_least(self.recovery_offset, 0.0, 3.0);
        self.min_player_distance = finite_at_least(self.min_player_distance, 0.0, 0.0);
        self.max_count = self.max_count.max(1);
    }
}

/// A playable level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelSpec {
    /// Display name, also written into score records
    pub name: String,
    /// Where the player appears and respawns
    pub player_start: Vec2,
    /// Lives at level start
    pub starting_lives: u32,
    /// Wave policy
    pub policy: WavePolicy,
}

impl Default for LevelSpec {
    fn default() -> Self {
        let bounds = Bounds::default();
        Self {
            name: "Level".to_string(),
            player_start: Vec2::new(bounds.width * 0.5, bounds.height * 0.8),
            starting_lives: 3,
            policy: WavePolicy::default(),
        }
    }
}

impl LevelSpec {
    /// Built-in levels.
    pub fn default_campaign(bounds: &Bounds) -> Vec<LevelSpec> {
        let start = Vec2::new(bounds.width * 0.5, bounds.height * 0.8);
        vec![
            LevelSpec {
                name: "Training".to_string(),
                player_start: start,
                starting_lives: 3,
                policy: WavePolicy {
                    interval: 10.0,
                    recovery_offset: 4.0,
                    enemy_kinds: vec![EnemyKind::Drifter, EnemyKind::Chaser],
                    patterns: vec![SpawnPattern::Random, SpawnPattern::Line],
                    growth: WaveGrowth::Linear,
                    max_count: 8,
                    ..WavePolicy::default()
                },
            },
            LevelSpec {
                name: "Onslaught".to_string(),
                player_start: start,
                starting_lives: 3,
                policy: WavePolicy {
                    interval: 6.0,
                    recovery_offset: 2.5,
                    enemy_kinds: EnemyKind::ALL.to_vec(),
                    patterns: vec![
                        SpawnPattern::Random,
                        SpawnPattern::Corners,
                        SpawnPattern::Ring,
                        SpawnPattern::Line,
                    ],
                    growth: WaveGrowth::Steep,
                    max_count: 16,
                    ..WavePolicy::default()
                },
            },
        ]
    }

    /// Pull values into range. The start position is clamped into `bounds`.
    pub fn sanitize(&mut self, bounds: &Bounds) {
        if self.name.trim().is_empty() {
            self.name = "Level".to_string();
        }
        let start = Vec2::new(
            finite_at_least(self.player_start.x, 0.0, bounds.width * 0.5),
            finite_at_least(self.player_start.y, 0.0, bounds.height * 0.8),
        );
        self.player_start = bounds.clamp(start, Vec2::ZERO);
        self.starting_lives = self.starting_lives.max(1);
        self.policy.sanitize();
    }
}

fn finite_at_least(value: f32, min: f32, fallback: f32) -> f32 {
    if value.is_finite() { value.max(min) } else { fallback }
}

// =============================================================================
// PLACEMENT
// =============================================================================

/// Compute spawn positions for `event`.
///
/// Random placement uses rejection sampling bounded by `max_attempts` per
/// enemy; when no candidate is far enough from the player the farthest one
/// seen is used. The returned list may be shorter than `event.count` only
/// for [`SpawnPattern::Explicit`] without positions (empty).
pub fn placements(
    event: &SpawnEvent,
    bounds: &Bounds,
    player: Option<Vec2>,
    half: Vec2,
    rng: &mut DeterministicRng,
    max_attempts: u32,
) -> Vec<Vec2> {
    let count = event.count as usize;
    let margin = half.x.max(half.y);

    match event.pattern {
        SpawnPattern::Random => (0..count)
            .map(|_| sample_away_from(bounds, player, event.min_player_distance, margin, rng, max_attempts))
            .collect(),
        SpawnPattern::Line => {
            let step = bounds.width / (count as f32 + 1.0);
            (0..count)
                .map(|i| bounds.clamp(Vec2::new(step * (i as f32 + 1.0), margin), half))
                .collect()
        }
        SpawnPattern::Ring => {
            let center = player.unwrap_or_else(|| bounds.center());
            let radius = event.min_player_distance.max(margin * 2.0);
            (0..count)
                .map(|i| {
                    let angle = std::f32::consts::TAU * i as f32 / count as f32;
                    bounds.clamp(center + Vec2::from_heading(angle).scale(radius), half)
                })
                .collect()
        }
        SpawnPattern::Corners => {
            let corners = [
                Vec2::new(margin, margin),
                Vec2::new(bounds.width - margin, margin),
                Vec2::new(bounds.width - margin, bounds.height - margin),
                Vec2::new(margin, bounds.height - margin),
            ];
            (0..count).map(|i| bounds.clamp(corners[i % corners.len()], half)).collect()
        }
        SpawnPattern::Explicit => match &event.positions {
            Some(positions) => positions.iter().cycle().take(count).copied().collect(),
            None => Vec::new(),
        },
    }
}

/// Rejection-sample one point at least `min_distance` from `player`.
fn sample_away_from(
    bounds: &Bounds,
    player: Option<Vec2>,
    min_distance: f32,
    margin: f32,
    rng: &mut DeterministicRng,
    max_attempts: u32,
) -> Vec2 {
    let Some(player) = player else {
        return rng.random_point(bounds, margin);
    };

    let min_sq = min_distance * min_distance;
    let mut best = rng.random_point(bounds, margin);
    let mut best_sq = best.distance_squared(player);

    for _ in 1..max_attempts.max(1) {
        if best_sq >= min_sq {
            return best;
        }
        let candidate = rng.random_point(bounds, margin);
        let d_sq = candidate.distance_squared(player);
        if d_sq > best_sq {
            best = candidate;
            best_sq = d_sq;
        }
    }

    if best_sq < min_sq {
        debug!(
            attempts = max_attempts,
            distance = best_sq.sqrt(),
            min_distance,
            "Spawn spacing unsatisfiable, using farthest candidate"
        );
    }
    best
}

/// Log and drop a wave that produced no positions.
pub(crate) fn warn_empty_wave(event: &SpawnEvent) {
    warn!(
        wave = event.wave,
        kind = ?event.enemy_kind,
        pattern = ?event.pattern,
        "Spawn event has no usable positions, skipping wave"
    );
}
