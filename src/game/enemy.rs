//! Enemy Roster
//!
//! Each enemy kind is plain data: a movement policy, a wall policy, a size
//! and a score value. Behaviour is dispatched with `match`, so the world
//! layer never sees a concrete enemy type.

use serde::{Deserialize, Serialize};

use crate::core::vec2::{Bounds, Vec2};

/// Enemy kinds, in the order a wave policy cycles through them by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Straight line, bounces off walls
    Drifter,
    /// Steers toward the player, stops at walls
    Chaser,
    /// Straight line, sidesteps bullets entering its sensor
    Dodger,
    /// Turns continuously, wraps around the playfield
    Spinner,
}

impl EnemyKind {
    /// Every kind.
    pub const ALL: [EnemyKind; 4] = [
        EnemyKind::Drifter,
        EnemyKind::Chaser,
        EnemyKind::Dodger,
        EnemyKind::Spinner,
    ];

    /// Static tuning for this kind.
    pub fn profile(self) -> EnemyProfile {
        match self {
            EnemyKind::Drifter => EnemyProfile {
                speed: 90.0,
                size: 28.0,
                score: 100,
                movement: MovementPolicy::Linear,
                walls: WallPolicy::Reflect,
                sensor_size: None,
            },
            EnemyKind::Chaser => EnemyProfile {
                speed: 70.0,
                size: 22.0,
                score: 150,
                movement: MovementPolicy::Seek { turn_rate: 2.5 },
                walls: WallPolicy::Clamp,
                sensor_size: None,
            },
            EnemyKind::Dodger => EnemyProfile {
                speed: 80.0,
                size: 24.0,
                score: 250,
                movement: MovementPolicy::Linear,
                walls: WallPolicy::Reflect,
                sensor_size: Some(96.0),
            },
            EnemyKind::Spinner => EnemyProfile {
                speed: 110.0,
                size: 20.0,
                score: 200,
                movement: MovementPolicy::Spin { angular_speed: 1.8 },
                walls: WallPolicy::Wrap,
                sensor_size: None,
            },
        }
    }
}

/// How an enemy chooses its velocity each update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MovementPolicy {
    /// Keep the current velocity
    Linear,
    /// Blend velocity toward the target at `turn_rate` per second
    Seek {
        /// Fraction of the steering error corrected per second
        turn_rate: f32,
    },
    /// Rotate the heading at a constant rate and move along it
    Spin {
        /// Radians per second, clockwise
        angular_speed: f32,
    },
}

/// What happens when an enemy reaches the playfield edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WallPolicy {
    /// Mirror the velocity component that points out of the playfield
    Reflect,
    /// Stop at the edge
    Clamp,
    /// Reappear on the opposite edge
    Wrap,
}

/// Per-kind tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyProfile {
    /// Units per second
    pub speed: f32,
    /// Body box size
    pub size: f32,
    /// Points awarded when shot
    pub score: u32,
    /// Movement policy
    pub movement: MovementPolicy,
    /// Wall policy
    pub walls: WallPolicy,
    /// Size of the bullet-detecting trigger box, if any
    pub sensor_size: Option<f32>,
}

/// Seconds a dodger waits before it can sidestep again.
pub const DODGE_COOLDOWN: f32 = 0.6;

/// Speed multiplier applied to a sidestep, until the cooldown runs out.
const DODGE_BOOST: f32 = 1.75;

/// Enemy gameplay state.
#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    /// Kind
    pub kind: EnemyKind,
    /// Current velocity
    pub velocity: Vec2,
    /// Seconds until the next sidestep is allowed
    pub dodge_cooldown: f32,
    /// Wave that spawned this enemy
    pub wave: u32,
}

impl Enemy {
    /// Create an enemy of `kind` heading along `direction`.
    pub fn new(kind: EnemyKind, direction: Vec2, wave: u32) -> Self {
        Self {
            kind,
            velocity: direction.normalize().scale(kind.profile().speed),
            dodge_cooldown: 0.0,
            wave,
        }
    }

    /// Advance one update step.
    ///
    /// `target` is the player's position when a player is alive; seeking
    /// enemies coast on their current velocity without one.
    pub fn step(
        &mut self,
        position: &mut Vec2,
        rotation: &mut f32,
        half: Vec2,
        target: Option<Vec2>,
        bounds: &Bounds,
        dt: f32,
    ) {
        let profile = self.kind.profile();
        let dodging = self.dodge_cooldown > 0.0;
        self.dodge_cooldown = (self.dodge_cooldown - dt).max(0.0);
        if dodging && self.dodge_cooldown <= 0.0 && self.velocity.is_nonzero() {
            // Sidestep over, back to cruise speed
            self.velocity = self.velocity.normalize().scale(profile.speed);
        }

        match profile.movement {
            MovementPolicy::Linear => {}
            MovementPolicy::Seek { turn_rate } => {
                if let Some(target) = target {
                    let desired = (target - *position).normalize().scale(profile.speed);
                    let blend = (turn_rate * dt).min(1.0);
                    self.velocity = self.velocity + (desired - self.velocity).scale(blend);
                }
            }
            MovementPolicy::Spin { angular_speed } => {
                *rotation += angular_speed * dt;
                self.velocity = Vec2::from_heading(*rotation).scale(profile.speed);
            }
        }

        *position += self.velocity.scale(dt);

        match profile.walls {
            WallPolicy::Reflect => {
                let (p, v) = reflect(*position, self.velocity, half, bounds);
                *position = p;
                self.velocity = v;
            }
            WallPolicy::Clamp => *position = bounds.clamp(*position, half),
            WallPolicy::Wrap => *position = bounds.wrap(*position),
        }

        if !matches!(profile.movement, MovementPolicy::Spin { .. }) && self.velocity.is_nonzero() {
            *rotation = self.velocity.heading();
        }
    }

    /// React to a bullet entering the sensor. Returns true if the enemy
    /// changed course.
    pub fn dodge(&mut self, bullet_velocity: Vec2) -> bool {
        if self.kind.profile().sensor_size.is_none() || self.dodge_cooldown > 0.0 {
            return false;
        }
        if !bullet_velocity.is_nonzero() {
            return false;
        }
        let side = bullet_velocity.perpendicular().normalize();
        // Keep moving roughly the same way along the dodge axis
        let side = if side.dot(self.velocity) < 0.0 { -side } else { side };
        self.velocity = side.scale(self.kind.profile().speed * DODGE_BOOST);
        self.dodge_cooldown = DODGE_COOLDOWN;
        true
    }
}

/// Wall reflection for a box of `half` extents. Returns the corrected
/// position and velocity; the outward component of the velocity is
/// mirrored and the box is pushed back inside.
pub fn reflect(mut position: Vec2, mut velocity: Vec2, half: Vec2, bounds: &Bounds) -> (Vec2, Vec2) {
    if position.x - half.x < 0.0 {
        position.x = half.x;
        velocity.x = velocity.x.abs();
    } else if position.x + half.x > bounds.width {
        position.x = bounds.width - half.x;
        velocity.x = -velocity.x.abs();
    }

    if position.y - half.y < 0.0 {
        position.y = half.y;
        velocity.y = velocity.y.abs();
    } else if position.y + half.y > bounds.height {
        position.y = bounds.height - half.y;
        velocity.y = -velocity.y.abs();
    }

    (position, velocity)
}
