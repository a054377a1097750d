//! Level Director
//!
//! Owns the gameplay semantics of a running level: the player, the wave
//! schedule, the enemies that still count, the score and the death
//! sequence. Liveness itself stays with the registry; every mutation here
//! goes through its staging calls.

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::core::clock::Clock;
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::death::{DeathOutcome, DeathSequencer, DeathStep};
use crate::game::enemy::Enemy;
use crate::game::entity::{
    EXPLOSION_LIFETIME, EntityKind, Explosion, HudField, PlayerShip, Registry, Widget,
};
use crate::game::score::ScoreRecord;
use crate::game::spawn::{LevelSpec, SpawnEvent, placements, warn_empty_wave};
use crate::world::{Collider, Entity, EntityId};

/// Explosion box size.
const EXPLOSION_SIZE: f32 = 48.0;

/// Borrowed engine state a director step needs.
pub struct LevelContext<'a> {
    /// Entity registry
    pub registry: &'a mut Registry,
    /// Placement RNG
    pub rng: &'a mut DeterministicRng,
    /// Engine configuration
    pub config: &'a EngineConfig,
    /// Current level time
    pub now: f32,
}

/// HUD entities the director writes to. Any may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HudIds {
    /// Score readout
    pub score: Option<EntityId>,
    /// Level time readout
    pub timer: Option<EntityId>,
    /// Lives readout
    pub lives: Option<EntityId>,
    /// Wave readout
    pub wave: Option<EntityId>,
}

/// What a director step asks of the engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirectorReport {
    /// Enemies staged this step
    pub spawned: usize,
    /// Pause and show the game-over panel with this record
    pub game_over: Option<ScoreRecord>,
}

#[derive(Debug)]
struct ActiveLevel {
    spec: LevelSpec,
    player: EntityId,
    hud: HudIds,
    enemies: Vec<EntityId>,
    pending: Option<SpawnEvent>,
    last_spawn_time: f32,
    wave_number: u32,
    score: u32,
    death: DeathSequencer,
}

/// Drives waves, scoring and the death sequence of the current level.
#[derive(Debug, Default)]
pub struct LevelDirector {
    level: Option<ActiveLevel>,
}

impl LevelDirector {
    /// Create an idle director.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `spec`: reset level time, unpause, stage the player and plan
    /// the first wave.
    pub fn begin_level(
        &mut self,
        spec: LevelSpec,
        hud: HudIds,
        registry: &mut Registry,
        clock: &mut Clock,
        config: &EngineConfig,
    ) {
        clock.reset_level_time();
        clock.set_paused(false);

        let size = config.player.size;
        let player = registry.stage_add(Entity::new(
            spec.player_start,
            Vec2::new(size * 0.5, size * 0.5),
            EntityKind::Player(PlayerShip::default()),
        ));
        registry.stage_add_collider(Collider::new(player, size, size));

        let pending = spec.policy.next_event(0.0, 0.0, 0, false);
        if pending.is_none() {
            warn!(level = %spec.name, "Level has no enemy kinds, no waves will spawn");
        }

        info!(level = %spec.name, lives = spec.starting_lives, "Level started");
        self.level = Some(ActiveLevel {
            death: DeathSequencer::new(spec.starting_lives, config.death_interval),
            spec,
            player,
            hud,
            enemies: Vec::new(),
            pending,
            last_spawn_time: 0.0,
            wave_number: 0,
            score: 0,
        });
    }

    /// Forget the current level. Its entities are torn down by the scene.
    pub fn end_level(&mut self) {
        if let Some(level) = self.level.take() {
            debug!(level = %level.spec.name, score = level.score, "Level ended");
        }
    }

    /// Per-tick step. The caller skips it while paused.
    pub fn update(&mut self, ctx: &mut LevelContext<'_>) -> DirectorReport {
        let mut report = DirectorReport::default();
        let Some(level) = self.level.as_mut() else {
            return report;
        };
        let now = ctx.now;

        for step in level.death.poll(now) {
            match step {
                DeathStep::DisableColliders => {
                    ctx.registry.set_colliders_enabled(level.player, false);
                }
                DeathStep::Reposition => {
                    if let Some(player) = ctx.registry.get_mut(level.player) {
                        player.position = level.spec.player_start;
                        player.rotation = 0.0;
                        player.enabled = true;
                    }
                    debug!(now, "Player repositioned");
                }
                DeathStep::Respawn => {
                    ctx.registry.set_colliders_enabled(level.player, true);
                    info!(now, lives = level.death.lives(), "Player respawned");
                }
                DeathStep::ShowGameOver => {
                    info!(score = level.score, level = %level.spec.name, "Game over");
                    report.game_over = Some(ScoreRecord {
                        score: level.score,
                        elapsed_time: level.death.died_at(),
                        player_name: ctx.config.player_name.clone(),
                        level_name: level.spec.name.clone(),
                    });
                }
            }
        }

        level.enemies.retain(|id| ctx.registry.get(*id).is_some());
        level.refresh_hud(ctx.registry, now);

        if level.death.is_game_over() {
            return report;
        }

        let due = level.pending.as_ref().is_some_and(|event| now >= event.time);
        if due {
            if let Some(event) = level.pending.take() {
                report.spawned = level.materialize(&event, ctx);
                level.last_spawn_time = event.time;
                level.wave_number += 1;
                level.pending = level
                    .spec
                    .policy
                    .next_event(level.last_spawn_time, now, level.wave_number, false);
            }
        }

        report
    }

    /// The player touched an enemy. Clears enemies, leaves an explosion and
    /// either plans a recovery wave or flags game over.
    pub fn on_player_death(&mut self, ctx: &mut LevelContext<'_>) -> Option<DeathOutcome> {
        let level = self.level.as_mut()?;
        let outcome = level.death.on_death(ctx.now)?;
        info!(now = ctx.now, lives = level.death.lives(), ?outcome, "Player died");

        for id in level.enemies.drain(..) {
            ctx.registry.stage_remove(id);
        }

        let position = match ctx.registry.get_mut(level.player) {
            Some(player) => {
                player.enabled = false;
                player.position
            }
            None => level.spec.player_start,
        };
        ctx.registry.stage_add(
            Entity::new(
                position,
                Vec2::new(EXPLOSION_SIZE * 0.5, EXPLOSION_SIZE * 0.5),
                EntityKind::Explosion(Explosion {
                    remaining: EXPLOSION_LIFETIME,
                }),
            ),
        );

        level.pending = match outcome {
            DeathOutcome::Recover => level.spec.policy.next_event(
                level.last_spawn_time,
                ctx.now,
                level.wave_number,
                true,
            ),
            DeathOutcome::GameOver => None,
        };
        Some(outcome)
    }

    /// An enemy was shot. Returns the points awarded, once per enemy; an
    /// enemy already cleared or claimed is worth nothing.
    pub fn claim_enemy(&mut self, id: EntityId, registry: &Registry) -> Option<u32> {
        let level = self.level.as_mut()?;
        let index = level.enemies.iter().position(|e| *e == id)?;
        level.enemies.swap_remove(index);

        let points = match registry.get(id).map(|e| &e.kind) {
            Some(EntityKind::Enemy(enemy)) => enemy.kind.profile().score,
            _ => 0,
        };
        level.score = level.score.saturating_add(points);
        Some(points)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// A level is running.
    pub fn is_active(&self) -> bool {
        self.level.is_some()
    }

    /// Player entity of the running level.
    pub fn player(&self) -> Option<EntityId> {
        self.level.as_ref().map(|l| l.player)
    }

    /// Spec of the running level.
    pub fn spec(&self) -> Option<&LevelSpec> {
        self.level.as_ref().map(|l| &l.spec)
    }

    /// Lives left.
    pub fn lives(&self) -> Option<u32> {
        self.level.as_ref().map(|l| l.death.lives())
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        self.level.as_ref().map_or(0, |l| l.score)
    }

    /// Waves spawned so far.
    pub fn wave_number(&self) -> u32 {
        self.level.as_ref().map_or(0, |l| l.wave_number)
    }

    /// Next planned wave.
    pub fn pending_event(&self) -> Option<&SpawnEvent> {
        self.level.as_ref().and_then(|l| l.pending.as_ref())
    }

    /// Enemies that still count for this level.
    pub fn enemies(&self) -> &[EntityId] {
        self.level.as_ref().map_or(&[], |l| &l.enemies)
    }

    /// Player is in the death sequence.
    pub fn is_player_dead(&self) -> bool {
        self.level.as_ref().is_some_and(|l| l.death.is_dead())
    }

    /// Last life lost.
    pub fn is_game_over(&self) -> bool {
        self.level.as_ref().is_some_and(|l| l.death.is_game_over())
    }

    /// Sequencer of the running level.
    pub fn death(&self) -> Option<&DeathSequencer> {
        self.level.as_ref().map(|l| &l.death)
    }
}

impl ActiveLevel {
    fn refresh_hud(&self, registry: &mut Registry, now: f32) {
        let fields = [
            (self.hud.score, HudField::Score),
            (self.hud.timer, HudField::Timer),
            (self.hud.lives, HudField::Lives),
            (self.hud.wave, HudField::Wave),
        ];
        for (id, field) in fields {
            let Some(id) = id else { continue };
            let Some(entity) = registry.get_mut(id) else { continue };
            if let EntityKind::Ui(ui) = &mut entity.kind {
                if ui.widget == Widget::Hud(field) {
                    ui.text = self.hud_text(field, now);
                }
            }
        }
    }

    fn hud_text(&self, field: HudField, now: f32) -> String {
        match field {
            HudField::Score => format!("SCORE {:06}", self.score),
            HudField::Timer => {
                let secs = now.max(0.0) as u32;
                format!("{:02}:{:02}", secs / 60, secs % 60)
            }
            HudField::Lives => format!("LIVES {}", self.death.lives()),
            HudField::Wave => format!("WAVE {}", self.wave_number),
        }
    }

    fn materialize(&mut self, event: &SpawnEvent, ctx: &mut LevelContext<'_>) -> usize {
        let profile = event.enemy_kind.profile();
        let half = Vec2::new(profile.size * 0.5, profile.size * 0.5);

        // Spawn spacing is measured from where the player will be
        let player_pos = if self.death.is_dead() {
            Some(self.spec.player_start)
        } else {
            ctx.registry.get(self.player).map(|p| p.position)
        };

        let positions = placements(
            event,
            &ctx.config.bounds,
            player_pos,
            half,
            ctx.rng,
            ctx.config.spawn_max_attempts,
        );
        if positions.is_empty() {
            if event.count > 0 {
                warn_empty_wave(event);
            }
            return 0;
        }

        for position in &positions {
            let direction = match player_pos {
                Some(target) if (target - *position).is_nonzero() => {
                    // Aim roughly at the player, jittered
                    ((target - *position).normalize() + ctx.rng.random_direction().scale(0.5)).normalize()
                }
                _ => ctx.rng.random_direction(),
            };
            let direction = if direction.is_nonzero() { direction } else { Vec2::DOWN };
            let enemy = Enemy::new(event.enemy_kind, direction, event.wave);
            let id = ctx.registry.stage_add(
                Entity::new(*position, half, EntityKind::Enemy(enemy)).with_rotation(direction.heading()),
            );
            ctx.registry
                .stage_add_collider(Collider::new(id, profile.size, profile.size));
            if let Some(sensor) = profile.sensor_size {
                ctx.registry
                    .stage_add_collider(Collider::new(id, sensor, sensor).trigger());
            }
            self.enemies.push(id);
        }

        info!(
            wave = event.wave,
            kind = ?event.enemy_kind,
            count = positions.len(),
            recovery = event.recovery,
            "Wave spawned"
        );
        positions.len()
    }
}
