//! Per-kind start, update and collision handlers.
//!
//! Handlers only stage registry changes (or flip flags on their own
//! entity), so the tick can keep walking its snapshot of live ids.

use tracing::debug;

use crate::core::vec2::Vec2;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::game::director::LevelContext;
use crate::game::entity::{Bullet, EntityKind, GameEntity, Widget};
use crate::game::command::OutboundCommand;
use crate::world::{Collider, ContactKind, Collision, Entity, EntityId};

/// One-time hook, run by the registry commit before the entity goes live.
pub(super) fn start(entity: &mut GameEntity, tick: u64) {
    entity.started_tick = Some(tick);
    match &entity.kind {
        EntityKind::Enemy(enemy) if enemy.velocity.is_nonzero() => {
            entity.rotation = enemy.velocity.heading();
        }
        EntityKind::Bullet(bullet) if bullet.velocity.is_nonzero() => {
            entity.rotation = bullet.velocity.heading();
        }
        _ => {}
    }
}

/// Update step for one live entity.
pub(super) fn update(engine: &mut Engine, id: EntityId, dt: f32) -> Result<(), EngineError> {
    let Some(entity) = engine.registry.get_mut(id) else {
        return Ok(());
    };
    entity.updates += 1;

    match entity.kind {
        EntityKind::Player(_) => update_player(engine, id, dt),
        EntityKind::Enemy(_) => update_enemy(engine, id, dt),
        EntityKind::Bullet(_) => update_bullet(engine, id, dt),
        EntityKind::Explosion(_) => update_explosion(engine, id, dt),
        EntityKind::Ui(_) => return update_ui(engine, id, dt),
    }
    Ok(())
}

fn update_player(engine: &mut Engine, id: EntityId, dt: f32) {
    let direction = engine.input.direction();
    let fire = engine.input.fire();
    let tuning = engine.config.player;
    let bounds = engine.config.bounds;

    let Some(entity) = engine.registry.get_mut(id) else {
        return;
    };
    let Entity {
        position,
        rotation,
        half_extents,
        kind,
        ..
    } = entity;
    let EntityKind::Player(ship) = kind else {
        return;
    };

    ship.fire_cooldown = (ship.fire_cooldown - dt).max(0.0);
    if direction.is_nonzero() {
        *position = bounds.clamp(*position + direction.scale(tuning.speed * dt), *half_extents);
        *rotation = direction.heading();
    }

    let shot = if fire && ship.fire_cooldown <= 0.0 {
        ship.fire_cooldown = tuning.fire_cooldown;
        let heading = Vec2::from_heading(*rotation);
        Some((*position + heading.scale(half_extents.y + tuning.bullet_size), heading))
    } else {
        None
    };

    let moved = (ship.last_reported != Some(*position)).then(|| {
        ship.last_reported = Some(*position);
        OutboundCommand::player_move(*position, *rotation)
    });

    if let Some(command) = moved {
        engine.outbox.push(command);
    }
    if let Some((muzzle, heading)) = shot {
        let half = tuning.bullet_size * 0.5;
        let bullet = engine.registry.stage_add(Entity::new(
            muzzle,
            Vec2::new(half, half),
            EntityKind::Bullet(Bullet {
                velocity: heading.scale(tuning.bullet_speed),
            }),
        ));
        engine
            .registry
            .stage_add_collider(Collider::new(bullet, tuning.bullet_size, tuning.bullet_size));
    }
}

fn update_enemy(engine: &mut Engine, id: EntityId, dt: f32) {
    let target = engine
        .director
        .player()
        .filter(|_| !engine.director.is_player_dead())
        .and_then(|p| engine.registry.get(p))
        .map(|p| p.position);
    let bounds = engine.config.bounds;

    let Some(entity) = engine.registry.get_mut(id) else {
        return;
    };
    let Entity {
        position,
        rotation,
        half_extents,
        kind,
        ..
    } = entity;
    if let EntityKind::Enemy(enemy) = kind {
        enemy.step(position, rotation, *half_extents, target, &bounds, dt);
    }
}

fn update_bullet(engine: &mut Engine, id: EntityId, dt: f32) {
    if let Some(entity) = engine.registry.get_mut(id) {
        if let EntityKind::Bullet(bullet) = &entity.kind {
            entity.position += bullet.velocity.scale(dt);
        }
    }
}

fn update_explosion(engine: &mut Engine, id: EntityId, dt: f32) {
    let expired = match engine.registry.get_mut(id).map(|e| &mut e.kind) {
        Some(EntityKind::Explosion(explosion)) => {
            explosion.remaining -= dt;
            explosion.remaining <= 0.0
        }
        _ => false,
    };
    if expired {
        engine.registry.stage_remove(id);
    }
}

/// UI elements age every update; a button whose action is pending claims
/// it and performs it, which may change the scene.
fn update_ui(engine: &mut Engine, id: EntityId, dt: f32) -> Result<(), EngineError> {
    let action = match engine.registry.get_mut(id).map(|e| &mut e.kind) {
        Some(EntityKind::Ui(ui)) => {
            ui.age += dt;
            match ui.widget {
                Widget::Button(action) => Some(action),
                _ => None,
            }
        }
        _ => None,
    };

    match action {
        Some(action) if engine.input.consume(action) => engine.perform(action),
        _ => Ok(()),
    }
}

// =============================================================================
// COLLISIONS
// =============================================================================

enum Reaction {
    PlayerHit,
    BulletSpent,
    EnemyShot,
    Dodge(Vec2),
    Ignore,
}

/// Deliver one ordered collision to its receiving side.
///
/// Each side reacts only on its own behalf, so the outcome does not depend
/// on which side of a pair is delivered first.
pub(super) fn on_collision(engine: &mut Engine, collision: &Collision) -> Result<(), EngineError> {
    let (Some(this), Some(other)) = (
        engine.registry.get(collision.this_entity),
        engine.registry.get(collision.other_entity),
    ) else {
        return Ok(());
    };

    let reaction = match (&this.kind, &other.kind, collision.kind) {
        (EntityKind::Player(_), EntityKind::Enemy(_), ContactKind::Solid) => Reaction::PlayerHit,
        (EntityKind::Bullet(_), EntityKind::Enemy(_), ContactKind::Solid) => Reaction::BulletSpent,
        (EntityKind::Enemy(_), EntityKind::Bullet(_), ContactKind::Solid) => Reaction::EnemyShot,
        (EntityKind::Enemy(_), EntityKind::Bullet(bullet), ContactKind::Trigger) => {
            Reaction::Dodge(bullet.velocity)
        }
        _ => Reaction::Ignore,
    };

    match reaction {
        Reaction::PlayerHit => {
            engine.director.on_player_death(&mut LevelContext {
                registry: &mut engine.registry,
                rng: &mut engine.rng,
                config: &engine.config,
                now: engine.clock.level_time(),
            });
        }
        Reaction::BulletSpent => engine.registry.stage_remove(collision.this_entity),
        Reaction::EnemyShot => {
            let id = collision.this_entity;
            if let Some(points) = engine.director.claim_enemy(id, &engine.registry) {
                debug!(entity = ?id, points, score = engine.director.score(), "Enemy destroyed");
            }
            engine.registry.stage_remove(id);
        }
        Reaction::Dodge(bullet_velocity) => {
            if let Some(EntityKind::Enemy(enemy)) =
                engine.registry.get_mut(collision.this_entity).map(|e| &mut e.kind)
            {
                if enemy.dodge(bullet_velocity) {
                    debug!(entity = ?collision.this_entity, "Dodged");
                }
            }
        }
        Reaction::Ignore => {}
    }
    Ok(())
}
