//! End-to-end tick scenarios on a fixed clock.

use std::time::Duration;

use super::*;
use crate::core::vec2::Vec2;
use crate::game::enemy::{Enemy, EnemyKind};
use crate::game::entity::{Bullet, HudField, Widget};
use crate::game::spawn::{LevelSpec, SpawnPattern, WaveGrowth, WavePolicy};
use crate::world::{Collider, Entity};

const STEP_MS: u64 = 20;
const DEATH_INTERVAL: f32 = 0.5;
const RECOVERY: f32 = 4.0;
const START: Vec2 = Vec2 { x: 400.0, y: 480.0 };
/// One tick past a deadline, so float rounding cannot land on its edge.
const PAST: f32 = 0.02;

/// One Drifter per wave at `first_wave_at`; later waves go to the corners.
fn arena(lives: u32, first_wave_at: Vec2) -> LevelSpec {
    LevelSpec {
        name: "Arena".to_string(),
        player_start: START,
        starting_lives: lives,
        policy: WavePolicy {
            interval: 1000.0,
            recovery_offset: RECOVERY,
            enemy_kinds: vec![EnemyKind::Drifter],
            patterns: vec![SpawnPattern::Explicit, SpawnPattern::Corners],
            growth: WaveGrowth::Constant(1),
            max_count: 4,
            min_player_distance: 0.0,
            explicit_positions: vec![first_wave_at],
        },
    }
}

fn engine_with(level: LevelSpec) -> Engine {
    let config = EngineConfig {
        death_interval: DEATH_INTERVAL,
        levels: vec![level],
        ..EngineConfig::default()
    };
    let mut engine = Engine::with_clock(config, Clock::fixed(Duration::from_millis(STEP_MS)));
    engine.load_level(0).unwrap();
    engine
}

/// Tick until level time reaches `t` or the clock pauses.
fn run_until(engine: &mut Engine, t: f32) {
    for _ in 0..10_000 {
        if engine.clock().level_time() >= t || engine.clock().is_paused() {
            return;
        }
        engine.tick().unwrap();
    }
    panic!("level time stuck at {}", engine.clock().level_time());
}

fn player_colliders_enabled(engine: &Engine) -> Vec<bool> {
    let player = engine.director().player().unwrap();
    engine
        .registry()
        .colliders_of(player)
        .map(|(_, c)| c.enabled)
        .collect()
}

fn live_explosions(engine: &Engine) -> usize {
    engine
        .registry()
        .iter_live()
        .filter(|(_, e)| matches!(e.kind, EntityKind::Explosion(_)))
        .count()
}

/// Level whose first wave lands on the player: tick 1 spawns it, tick 2
/// commits it and the collision pass kills the player.
fn engine_after_death(lives: u32) -> Engine {
    let mut engine = engine_with(arena(lives, START));
    engine.tick().unwrap();
    assert_eq!(engine.director().enemies().len(), 1);
    assert!(!engine.director().is_player_dead());

    let outcome = engine.tick().unwrap();
    assert!(outcome.collisions >= 1);
    assert!(engine.director().is_player_dead());
    engine
}

// =========================================================================
// SCENARIOS
// =========================================================================

#[test]
fn test_enemy_contact_costs_a_life_and_schedules_recovery() {
    let mut engine = engine_after_death(3);
    let director = engine.director();

    assert_eq!(director.lives(), Some(2));
    assert!(director.is_player_dead());
    assert!(!director.is_game_over());
    assert!(director.enemies().is_empty());

    let died_at = director.death().unwrap().died_at();
    let event = director.pending_event().unwrap();
    assert!(event.recovery);
    assert_eq!(event.time, died_at + RECOVERY);
    assert_eq!(event.count, 1);

    let player = director.player().unwrap();
    assert!(!engine.registry().get(player).unwrap().enabled);

    // The explosion and the enemy removal commit on the next tick
    engine.tick().unwrap();
    assert_eq!(live_explosions(&engine), 1);
    assert!(
        !engine
            .registry()
            .iter_live()
            .any(|(_, e)| matches!(e.kind, EntityKind::Enemy(_)))
    );
}

#[test]
fn test_last_life_pauses_and_shows_game_over_after_one_interval() {
    let mut engine = engine_after_death(1);
    assert!(engine.director().is_game_over());
    assert!(engine.director().pending_event().is_none());
    let died_at = engine.director().death().unwrap().died_at();

    run_until(&mut engine, died_at + DEATH_INTERVAL - 0.05);
    assert!(!engine.clock().is_paused());
    assert!(!engine.director().death().unwrap().game_over_shown());

    run_until(&mut engine, died_at + DEATH_INTERVAL + PAST);
    assert!(engine.clock().is_paused());
    let level = engine.scenes().current().and_then(Scene::as_level).unwrap();
    assert!(level.is_game_over_shown());

    let records = engine.scoreboard().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level_name, "Arena");

    // Game over owns the pause
    assert!(!engine.set_paused(false));
    assert!(engine.clock().is_paused());
}

#[test]
fn test_lives_readout_reaches_zero_on_game_over() {
    let mut engine = engine_after_death(1);
    let died_at = engine.director().death().unwrap().died_at();
    run_until(&mut engine, died_at + DEATH_INTERVAL + PAST);
    assert!(engine.director().death().unwrap().game_over_shown());
    assert_eq!(engine.director().lives(), Some(0));

    let lives: Vec<String> = engine
        .snapshot()
        .sprites
        .into_iter()
        .filter(|s| s.kind == SpriteKind::Ui(Widget::Hud(HudField::Lives)))
        .filter_map(|s| s.text)
        .collect();
    assert_eq!(lives, vec!["LIVES 0".to_string()]);
}

#[test]
fn test_overlapping_solids_each_get_one_callback() {
    let mut engine = engine_with(arena(3, Vec2::new(60.0, 60.0)));
    let a = engine.registry_mut().stage_add(Entity::new(
        Vec2::new(200.0, 200.0),
        Vec2::new(5.0, 5.0),
        EntityKind::Explosion(crate::game::entity::Explosion { remaining: 10.0 }),
    ));
    let b = engine.registry_mut().stage_add(Entity::new(
        Vec2::new(209.0, 209.0),
        Vec2::new(5.0, 5.0),
        EntityKind::Explosion(crate::game::entity::Explosion { remaining: 10.0 }),
    ));
    engine.registry_mut().stage_add_collider(Collider::new(a, 10.0, 10.0));
    engine.registry_mut().stage_add_collider(Collider::new(b, 10.0, 10.0));

    // Boxes overlap by one unit on each axis; nothing else touches
    let outcome = engine.tick().unwrap();
    assert_eq!(outcome.collisions, 2);
}

#[test]
fn test_entity_added_before_tick_starts_and_updates_that_tick() {
    let mut engine = engine_with(arena(3, Vec2::new(60.0, 60.0)));
    engine.tick().unwrap();

    let bullet = engine.registry_mut().stage_add(Entity::new(
        Vec2::new(300.0, 300.0),
        Vec2::new(3.0, 3.0),
        EntityKind::Bullet(Bullet {
            velocity: Vec2::new(0.0, -100.0),
        }),
    ));
    let outcome = engine.tick().unwrap();

    let entity = engine.registry().get(bullet).unwrap();
    assert_eq!(entity.started_tick, Some(outcome.tick));
    assert_eq!(entity.updates, 1);
    assert!(entity.position.y < 300.0);
}

#[test]
fn test_ten_regular_waves_follow_fixed_interval() {
    let policy = WavePolicy {
        interval: 7.5,
        ..WavePolicy::default()
    };
    let mut last = 0.0;
    for wave in 0..10 {
        let event = policy.next_event(last, last, wave, false).unwrap();
        if wave == 0 {
            assert_eq!(event.time, 0.0);
        } else {
            assert_eq!(event.time, last + 7.5);
        }
        last = event.time;
    }
}

// =========================================================================
// PROPERTIES
// =========================================================================

#[test]
fn test_removal_and_addition_in_same_tick() {
    let mut engine = engine_with(arena(3, Vec2::new(60.0, 60.0)));
    engine.tick().unwrap();

    let old = engine.registry_mut().stage_add(Entity::new(
        Vec2::new(100.0, 300.0),
        Vec2::new(3.0, 3.0),
        EntityKind::Bullet(Bullet { velocity: Vec2::ZERO }),
    ));
    engine.tick().unwrap();
    assert!(engine.registry().is_live(old));

    engine.registry_mut().stage_remove(old);
    let new = engine.registry_mut().stage_add(Entity::new(
        Vec2::new(150.0, 300.0),
        Vec2::new(3.0, 3.0),
        EntityKind::Bullet(Bullet { velocity: Vec2::ZERO }),
    ));
    let outcome = engine.tick().unwrap();

    assert!(engine.registry().get(old).is_none());
    assert!(engine.registry().is_live(new));
    assert_eq!(engine.registry().get(new).unwrap().started_tick, Some(outcome.tick));

    // start never runs again
    engine.tick().unwrap();
    assert_eq!(engine.registry().get(new).unwrap().started_tick, Some(outcome.tick));
}

#[test]
fn test_body_and_sensor_of_one_enemy_never_collide() {
    let mut engine = engine_with(arena(3, Vec2::new(60.0, 60.0)));
    let dodger = engine.registry_mut().stage_add(Entity::new(
        Vec2::new(600.0, 150.0),
        Vec2::new(12.0, 12.0),
        EntityKind::Enemy(Enemy::new(EnemyKind::Dodger, Vec2::RIGHT, 0)),
    ));
    engine.registry_mut().stage_add_collider(Collider::new(dodger, 24.0, 24.0));
    engine
        .registry_mut()
        .stage_add_collider(Collider::new(dodger, 96.0, 96.0).trigger());

    let outcome = engine.tick().unwrap();
    assert_eq!(engine.registry().colliders_of(dodger).count(), 2);
    assert_eq!(outcome.collisions, 0);
}

#[test]
fn test_paused_level_only_updates_ui() {
    let mut engine = engine_with(arena(3, Vec2::new(60.0, 60.0)));
    engine.tick().unwrap();
    engine.tick().unwrap();
    let enemy = engine.director().enemies()[0];
    let player = engine.director().player().unwrap();

    // A bullet sitting on the enemy would collide if the pass ran
    let bullet = engine.registry_mut().stage_add(Entity::new(
        Vec2::new(60.0, 60.0),
        Vec2::new(3.0, 3.0),
        EntityKind::Bullet(Bullet { velocity: Vec2::ZERO }),
    ));
    engine.registry_mut().stage_add_collider(Collider::new(bullet, 6.0, 6.0));

    assert!(engine.set_paused(true));
    let level_time = engine.clock().level_time();
    let frozen: Vec<(EntityId, u32)> = [enemy, player]
        .iter()
        .map(|id| (*id, engine.registry().get(*id).unwrap().updates))
        .collect();

    engine.tick().unwrap();
    let hud: Vec<(EntityId, u32)> = engine
        .registry()
        .iter_live()
        .filter(|(_, e)| e.ui)
        .map(|(id, e)| (id, e.updates))
        .collect();
    assert!(!hud.is_empty());

    for _ in 0..5 {
        let outcome = engine.tick().unwrap();
        assert_eq!(outcome.collisions, 0);
    }

    for (id, updates) in frozen {
        assert_eq!(engine.registry().get(id).unwrap().updates, updates);
    }
    for (id, updates) in hud {
        assert_eq!(engine.registry().get(id).unwrap().updates, updates + 5);
    }
    assert!(engine.registry().is_live(bullet));
    assert_eq!(engine.registry().get(bullet).unwrap().updates, 0);
    assert_eq!(engine.clock().level_time(), level_time);
    let level = engine.scenes().current().and_then(Scene::as_level).unwrap();
    assert!(level.is_pause_shown());
}

#[test]
fn test_scene_load_leaves_nothing_from_previous_scene() {
    let mut engine = engine_with(arena(3, Vec2::new(60.0, 60.0)));
    for _ in 0..3 {
        engine.tick().unwrap();
    }
    let level_ids: Vec<EntityId> = engine.registry().live_ids().to_vec();
    assert!(level_ids.len() > 2);

    engine.load_main_menu().unwrap();
    for id in &level_ids {
        assert!(engine.registry().get(*id).is_none());
    }
    engine.tick().unwrap();
    assert!(level_ids.iter().all(|id| !engine.registry().is_live(*id)));
    assert!(!engine.director().is_active());
}

#[test]
fn test_death_sequence_collider_timing() {
    let mut engine = engine_after_death(3);
    let died_at = engine.director().death().unwrap().died_at();
    let player = engine.director().player().unwrap();

    // Still enabled on the death tick itself
    assert!(player_colliders_enabled(&engine).iter().all(|e| *e));

    engine.tick().unwrap();
    assert!(player_colliders_enabled(&engine).iter().all(|e| !*e));

    run_until(&mut engine, died_at + DEATH_INTERVAL + PAST);
    let entity = engine.registry().get(player).unwrap();
    assert!(entity.enabled);
    assert_eq!(entity.position, START);
    assert_eq!(entity.rotation, 0.0);
    assert!(player_colliders_enabled(&engine).iter().all(|e| !*e));

    run_until(&mut engine, died_at + 2.0 * DEATH_INTERVAL - 0.05);
    assert!(player_colliders_enabled(&engine).iter().all(|e| !*e));

    run_until(&mut engine, died_at + 2.0 * DEATH_INTERVAL + PAST);
    assert!(player_colliders_enabled(&engine).iter().all(|e| *e));
    assert!(!engine.director().is_player_dead());
    assert_eq!(engine.director().lives(), Some(2));
}

#[test]
fn test_shutdown_twice_releases_everything() {
    let mut engine = engine_with(arena(3, Vec2::new(60.0, 60.0)));
    let (outbound, _out_rx) = mpsc::unbounded_channel();
    let (render, _render_rx) = mpsc::unbounded_channel();
    let (frames, _frames_rx) = watch::channel(engine.snapshot());
    engine.attach(EngineSinks {
        outbound,
        render,
        frames,
    });
    engine.tick().unwrap();

    engine.shutdown();
    engine.shutdown();
    assert!(engine.is_shut_down());
    assert!(engine.sinks.is_none());
    assert!(engine.scenes().current().is_none());
    assert!(!engine.director().is_active());
    assert_eq!(engine.registry().live_count(), 0);
}
