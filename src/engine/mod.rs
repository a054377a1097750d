//! Engine Context
//!
//! One owned struct holds every piece of simulation state: clock, registry,
//! scenes, director, input, RNG and output buffers. Nothing is global; the
//! tick task owns the engine outright and drops it on shutdown.
//!
//! ## Tick order
//!
//! 1. advance the clock
//! 2. commit staged removals
//! 3. commit staged additions (each `start` hook runs first)
//! 4. level director step (skipped while paused)
//! 5. abort if a scene change happened
//! 6. update entities (UI only while paused), cull those that left the
//!    playfield, abort on a scene change after every single update
//! 7. collision pass (skipped while paused), abort on a scene change after
//!    every callback

mod behaviour;
#[cfg(test)]
mod scenarios;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::core::clock::Clock;
use crate::core::rng::DeterministicRng;
use crate::error::EngineError;
use crate::game::command::OutboundCommand;
use crate::game::director::{LevelContext, LevelDirector};
use crate::game::entity::{EntityKind, GameEntity, Registry};
use crate::game::input::{EngineCommand, InputState, MenuAction};
use crate::game::scene::{Scene, SceneManager};
use crate::game::score::Scoreboard;
use crate::render::{FrameSnapshot, RenderDelta, Sprite, SpriteKind};
use crate::scheduler::Simulation;
use crate::world::{CommitReport, EntityId, detect_collisions};

/// Result of a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Tick number (1-based)
    pub tick: u64,
    /// The tick stopped early because the scene changed
    pub aborted: bool,
    /// Entity update calls made
    pub updated: usize,
    /// Collision callbacks dispatched
    pub collisions: usize,
    /// A quit was requested; the loop should stop
    pub quit: bool,
}

/// Channels the engine publishes to when running under the scheduler.
#[derive(Debug)]
pub struct EngineSinks {
    /// Outbound commands for the transport
    pub outbound: mpsc::UnboundedSender<OutboundCommand>,
    /// Registration deltas for the renderer
    pub render: mpsc::UnboundedSender<RenderDelta>,
    /// Latest frame for the renderer
    pub frames: watch::Sender<FrameSnapshot>,
}

/// The simulation.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    clock: Clock,
    rng: DeterministicRng,
    registry: Registry,
    scenes: SceneManager,
    director: LevelDirector,
    input: InputState,
    scoreboard: Scoreboard,
    outbox: Vec<OutboundCommand>,
    sinks: Option<EngineSinks>,
    tick: u64,
    quit_requested: bool,
    shut_down: bool,
}

impl Engine {
    /// Engine on the host clock.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Clock::wall())
    }

    /// Engine on a caller-provided clock (tests use [`Clock::fixed`]).
    /// Out-of-range configuration is clamped first.
    pub fn with_clock(config: EngineConfig, mut clock: Clock) -> Self {
        let config = config.sanitized();
        clock.set_speed(config.settings.game_speed);
        Self {
            rng: DeterministicRng::new(config.rng_seed),
            config,
            clock,
            registry: Registry::new(),
            scenes: SceneManager::new(),
            director: LevelDirector::new(),
            input: InputState::new(),
            scoreboard: Scoreboard::new(),
            outbox: Vec::new(),
            sinks: None,
            tick: 0,
            quit_requested: false,
            shut_down: false,
        }
    }

    /// Load the main menu.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.load_main_menu()
    }

    /// Publish to channels instead of buffering. Everything already live is
    /// re-announced to the renderer.
    pub fn attach(&mut self, sinks: EngineSinks) {
        let _ = sinks.render.send(RenderDelta::Clear);
        for (id, entity) in self.registry.iter_live() {
            let _ = sinks.render.send(RenderDelta::Added(sprite_for(id, entity)));
        }
        self.sinks = Some(sinks);
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Run one tick.
    pub fn tick(&mut self) -> Result<TickOutcome, EngineError> {
        // Scene loads between ticks need no abort
        self.scenes.take_scene_changed();

        self.tick += 1;
        let tick = self.tick;
        let mut outcome = TickOutcome {
            tick,
            ..TickOutcome::default()
        };

        // 1. Clock
        let dt = self.clock.advance();

        // 2-3. Removals, then additions with their start hook
        let report = self.registry.commit(|_, entity| behaviour::start(entity, tick));
        self.forward_commit(&report);

        // 4. Level director
        if !self.clock.is_paused() {
            self.update_director();
        }

        // 5. Short-circuit
        if self.scenes.take_scene_changed() {
            outcome.aborted = true;
            return Ok(self.finish_tick(outcome));
        }

        // 6. Entity updates
        let paused = self.clock.is_paused();
        let ids: Vec<EntityId> = self.registry.live_ids().to_vec();
        for id in ids {
            let eligible = self
                .registry
                .get(id)
                .is_some_and(|e| e.enabled && (!paused || e.ui));
            if !eligible {
                continue;
            }

            behaviour::update(self, id, dt)?;
            outcome.updated += 1;

            if self.scenes.take_scene_changed() {
                outcome.aborted = true;
                return Ok(self.finish_tick(outcome));
            }
            if !paused {
                self.cull_if_outside(id);
            }
        }

        // 7. Collision pass
        if !paused {
            for collision in detect_collisions(&self.registry) {
                behaviour::on_collision(self, &collision)?;
                outcome.collisions += 1;

                if self.scenes.take_scene_changed() {
                    outcome.aborted = true;
                    return Ok(self.finish_tick(outcome));
                }
            }
        }

        Ok(self.finish_tick(outcome))
    }

    fn update_director(&mut self) {
        let report = self.director.update(&mut LevelContext {
            registry: &mut self.registry,
            rng: &mut self.rng,
            config: &self.config,
            now: self.clock.level_time(),
        });

        if let Some(record) = report.game_over {
            self.clock.set_paused(true);
            match self.scenes.level_mut() {
                Some(level) => level.show_game_over(&mut self.registry, &self.config.bounds, &record),
                None => warn!("Game over without a level scene"),
            }
            self.scoreboard.push(record);
        }
    }

    fn cull_if_outside(&mut self, id: EntityId) {
        let Some(entity) = self.registry.get(id) else {
            return;
        };
        if !entity.ui && self.config.bounds.is_outside(entity.position, entity.half_extents) {
            #[cfg(feature = "debug-tracing")]
            tracing::trace!(entity = ?id, kind = entity.kind.label(), "left playfield");
            self.registry.stage_remove(id);
        }
    }

    fn finish_tick(&mut self, mut outcome: TickOutcome) -> TickOutcome {
        if let Some(action) = self.input.clear_action() {
            debug!(?action, "Menu action not claimed by any button");
        }
        outcome.quit = self.quit_requested;
        self.publish();
        outcome
    }

    fn forward_commit(&mut self, report: &CommitReport) {
        let Some(sinks) = &self.sinks else {
            return;
        };
        for id in &report.removed {
            let _ = sinks.render.send(RenderDelta::Removed(*id));
        }
        for id in &report.added {
            if let Some(entity) = self.registry.get(*id) {
                let _ = sinks.render.send(RenderDelta::Added(sprite_for(*id, entity)));
            }
        }
    }

    fn publish(&mut self) {
        let Some(sinks) = &self.sinks else {
            return;
        };
        for command in self.outbox.drain(..) {
            let _ = sinks.outbound.send(command);
        }
        let frame = self.snapshot();
        if let Some(sinks) = &self.sinks {
            sinks.frames.send_replace(frame);
        }
    }

    // =========================================================================
    // COMMANDS AND ACTIONS
    // =========================================================================

    /// Apply an external command. Takes effect on the next tick.
    pub fn apply(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Move(direction) => self.input.set_direction(direction),
            EngineCommand::Fire(fire) => self.input.set_fire(fire),
            EngineCommand::TogglePause => {
                let paused = !self.clock.is_paused();
                self.set_paused(paused);
            }
            EngineCommand::Select(action) => self.input.select(action),
            EngineCommand::SetVolume(volume) => {
                self.config.settings.set_volume(volume);
                debug!(volume = self.config.settings.volume, "Volume set");
            }
            EngineCommand::SetGameSpeed(speed) => {
                self.config.settings.set_game_speed(speed);
                self.clock.set_speed(self.config.settings.game_speed);
                debug!(speed = self.config.settings.game_speed, "Game speed set");
            }
        }
    }

    /// Pause or resume the running level. Ignored outside a level and after
    /// game over. Returns whether anything changed.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        if !self.director.is_active() || self.director.is_game_over() {
            return false;
        }
        if self.clock.is_paused() == paused {
            return false;
        }
        self.clock.set_paused(paused);
        if let Some(level) = self.scenes.level_mut() {
            if paused {
                level.show_pause(&mut self.registry, &self.config.bounds);
            } else {
                level.hide_pause(&mut self.registry);
            }
        }
        info!(paused, "Pause toggled");
        true
    }

    /// Carry out a menu action.
    pub fn perform(&mut self, action: MenuAction) -> Result<(), EngineError> {
        debug!(?action, "Menu action");
        match action {
            MenuAction::Play(index) => self.load_level(index),
            MenuAction::Resume => {
                self.set_paused(false);
                Ok(())
            }
            MenuAction::Retry => self.reload_scene(),
            MenuAction::MainMenu => self.load_main_menu(),
            MenuAction::Quit => {
                self.request_quit("menu");
                Ok(())
            }
        }
    }

    /// Replace the current scene.
    pub fn load_scene(&mut self, scene: Scene) -> Result<(), EngineError> {
        self.scenes.load_scene(
            scene,
            &mut self.registry,
            &mut self.director,
            &mut self.clock,
            &self.config,
        )?;
        self.after_scene_change();
        Ok(())
    }

    /// Load a fresh copy of the current scene.
    pub fn reload_scene(&mut self) -> Result<(), EngineError> {
        self.scenes.reload_scene(
            &mut self.registry,
            &mut self.director,
            &mut self.clock,
            &self.config,
        )?;
        self.after_scene_change();
        Ok(())
    }

    /// Load the main menu.
    pub fn load_main_menu(&mut self) -> Result<(), EngineError> {
        let menu = Scene::main_menu(&self.config.levels);
        self.load_scene(menu)
    }

    /// Load the level at `index`. Unknown indices are logged and ignored.
    pub fn load_level(&mut self, index: usize) -> Result<(), EngineError> {
        let Some(spec) = self.config.levels.get(index).cloned() else {
            warn!(index, levels = self.config.levels.len(), "No such level");
            return Ok(());
        };
        self.load_scene(Scene::level(index, spec))
    }

    fn after_scene_change(&mut self) {
        self.input.reset();
        if let Some(sinks) = &self.sinks {
            let _ = sinks.render.send(RenderDelta::Clear);
        }
    }

    /// Ask the loop to stop after this tick and tell the transport.
    pub fn request_quit(&mut self, reason: &str) {
        if self.quit_requested {
            return;
        }
        info!(reason, "Quit requested");
        self.quit_requested = true;
        self.outbox.push(OutboundCommand::quit(reason));
    }

    /// Tear down the current scene and detach every sink. Safe to call
    /// more than once.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.scenes.shutdown(&mut self.registry, &mut self.director);
        self.input.reset();
        self.sinks = None;
        self.shut_down = true;
        info!(ticks = self.tick, "Engine shut down");
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Drawable view of every enabled live entity.
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            tick: self.tick,
            level_time: self.clock.level_time(),
            paused: self.clock.is_paused(),
            scene: self
                .scenes
                .current()
                .map(|s| s.name().to_string())
                .unwrap_or_default(),
            sprites: self
                .registry
                .iter_live()
                .filter(|(_, e)| e.enabled)
                .map(|(id, e)| sprite_for(id, e))
                .collect(),
        }
    }

    /// Drain buffered outbound commands (when no sink is attached).
    pub fn take_outbound(&mut self) -> Vec<OutboundCommand> {
        std::mem::take(&mut self.outbox)
    }

    /// Configuration in effect.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Clock.
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Entity registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Entity registry, for staging from outside a tick.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Scene manager.
    pub fn scenes(&self) -> &SceneManager {
        &self.scenes
    }

    /// Level director.
    pub fn director(&self) -> &LevelDirector {
        &self.director
    }

    /// Input state.
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Recorded scores.
    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// A quit was requested.
    pub fn is_quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// [`Engine::shutdown`] has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Simulation for Engine {
    type Command = EngineCommand;

    fn apply(&mut self, command: EngineCommand) {
        Engine::apply(self, command);
    }

    fn tick(&mut self) -> Result<TickOutcome, EngineError> {
        Engine::tick(self)
    }
}

/// Renderer view of one entity.
pub fn sprite_for(id: EntityId, entity: &GameEntity) -> Sprite {
    let (kind, text) = match &entity.kind {
        EntityKind::Player(_) => (SpriteKind::Player, None),
        EntityKind::Enemy(enemy) => (SpriteKind::Enemy(enemy.kind), None),
        EntityKind::Bullet(_) => (SpriteKind::Bullet, None),
        EntityKind::Explosion(_) => (SpriteKind::Explosion, None),
        EntityKind::Ui(ui) => (SpriteKind::Ui(ui.widget), Some(ui.text.clone())),
    };
    Sprite {
        id,
        kind,
        position: entity.position,
        rotation: entity.rotation,
        half_extents: entity.half_extents,
        text,
        drawable: entity.drawable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::Vec2;
    use crate::game::entity::Widget;
    use std::time::Duration;

    fn engine() -> Engine {
        Engine::with_clock(EngineConfig::default(), Clock::fixed(Duration::from_millis(20)))
    }

    #[test]
    fn test_start_loads_menu() {
        let mut engine = engine();
        engine.start().unwrap();
        let outcome = engine.tick().unwrap();
        assert!(!outcome.aborted);
        assert!(engine.registry().live_count() > 0);
        assert_eq!(engine.snapshot().scene, "main menu");
    }

    #[test]
    fn test_play_button_changes_scene_mid_tick() {
        let mut engine = engine();
        engine.start().unwrap();
        engine.tick().unwrap();

        engine.apply(EngineCommand::Select(MenuAction::Play(0)));
        let outcome = engine.tick().unwrap();
        assert!(outcome.aborted);
        assert_eq!(outcome.collisions, 0);
        assert!(engine.director().is_active());

        // Old menu entities are gone, the level is staged
        assert_eq!(engine.registry().live_count(), 0);
        engine.tick().unwrap();
        assert!(engine.director().player().is_some_and(|p| engine.registry().is_live(p)));
    }

    #[test]
    fn test_unclaimed_action_is_dropped() {
        let mut engine = engine();
        engine.start().unwrap();
        engine.tick().unwrap();
        engine.apply(EngineCommand::Select(MenuAction::Resume));
        engine.tick().unwrap();
        assert_eq!(engine.input().pending_action(), None);
    }

    #[test]
    fn test_quit_button_emits_command() {
        let mut engine = engine();
        engine.start().unwrap();
        engine.tick().unwrap();
        engine.apply(EngineCommand::Select(MenuAction::Quit));
        let outcome = engine.tick().unwrap();
        assert!(outcome.quit);
        let out = engine.take_outbound();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, crate::game::command::CommandKind::Quit);
    }

    #[test]
    fn test_pause_ignored_in_menu() {
        let mut engine = engine();
        engine.start().unwrap();
        assert!(!engine.set_paused(true));
        assert!(!engine.clock().is_paused());
    }

    #[test]
    fn test_game_speed_is_clamped() {
        let mut engine = engine();
        engine.apply(EngineCommand::SetGameSpeed(50.0));
        assert_eq!(engine.config().settings.game_speed, crate::config::GAME_SPEED_RANGE.1);
    }

    #[test]
    fn test_programmatic_config_is_clamped() {
        let config = EngineConfig {
            bounds: crate::core::vec2::Bounds::new(0.0, f32::NAN),
            death_interval: -3.0,
            levels: Vec::new(),
            ..EngineConfig::default()
        };
        let mut engine = Engine::with_clock(config, Clock::fixed(Duration::from_millis(20)));
        let bounds = engine.config().bounds;
        assert_eq!(bounds.width, 16.0);
        assert_eq!(bounds.height, 600.0);
        assert_eq!(engine.config().death_interval, 0.0);
        assert!(!engine.config().levels.is_empty());

        let wrapped = bounds.wrap(Vec2::new(-5.0, 700.0));
        assert!(wrapped.x.is_finite() && wrapped.y.is_finite());

        engine.load_level(0).unwrap();
        engine.tick().unwrap();
        assert!(engine.director().is_active());
    }

    #[test]
    fn test_bullet_leaving_playfield_is_culled() {
        let mut engine = engine();
        engine.load_level(0).unwrap();
        let id = engine.registry_mut().stage_add(crate::world::Entity::new(
            Vec2::new(400.0, 2.0),
            Vec2::new(3.0, 3.0),
            EntityKind::Bullet(crate::game::entity::Bullet {
                velocity: Vec2::new(0.0, -600.0),
            }),
        ));
        engine.tick().unwrap();
        assert!(engine.registry().is_live(id));
        engine.tick().unwrap();
        assert!(engine.registry().get(id).is_none());
    }

    #[test]
    fn test_snapshot_carries_hud_text() {
        let mut engine = engine();
        engine.load_level(0).unwrap();
        engine.tick().unwrap();
        engine.tick().unwrap();
        let frame = engine.snapshot();
        let score = frame
            .sprites
            .iter()
            .find(|s| s.kind == SpriteKind::Ui(Widget::Hud(crate::game::entity::HudField::Score)))
            .unwrap();
        assert_eq!(score.text.as_deref(), Some("SCORE 000000"));
    }
}
