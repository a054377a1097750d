//! Scene State Machine
//!
//! ```text
//! NoScene ──► Loading ──► Active ──► Unloading ──► Loading ──► ...
//!                                        └──────► NoScene (shutdown)
//! ```
//!
//! The old scene is fully torn down (UI removed, every live and staged
//! entity destroyed) before the new scene's `load` runs, so two scenes never
//! have entities registered at the same time.

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::core::clock::Clock;
use crate::core::vec2::{Bounds, Vec2};
use crate::error::EngineError;
use crate::game::director::{HudIds, LevelDirector};
use crate::game::entity::{HudField, PanelKind, Registry, Widget, ui_entity};
use crate::game::input::MenuAction;
use crate::game::score::ScoreRecord;
use crate::game::spawn::LevelSpec;
use crate::world::EntityId;

/// Scene manager state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneState {
    /// Nothing loaded
    NoScene,
    /// Inside `load_scene`, building the new scene
    Loading,
    /// A scene is current
    Active,
    /// Tearing the old scene down
    Unloading,
}

/// Main menu.
#[derive(Clone, Debug, PartialEq)]
pub struct MenuScene {
    levels: Vec<String>,
    ui: Vec<EntityId>,
}

/// A playable level and its overlays.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelScene {
    index: usize,
    spec: LevelSpec,
    ui: Vec<EntityId>,
    hud: HudIds,
    pause_panel: Vec<EntityId>,
    game_over_panel: Vec<EntityId>,
}

/// A loadable unit of UI and, for levels, gameplay.
#[derive(Clone, Debug, PartialEq)]
pub enum Scene {
    /// UI only
    Menu(MenuScene),
    /// Gameplay and HUD
    Level(LevelScene),
}

impl Scene {
    /// Main menu listing `levels`.
    pub fn main_menu(levels: &[LevelSpec]) -> Self {
        Scene::Menu(MenuScene {
            levels: levels.iter().map(|l| l.name.clone()).collect(),
            ui: Vec::new(),
        })
    }

    /// Level scene for `spec` (menu slot `index`).
    pub fn level(index: usize, spec: LevelSpec) -> Self {
        Scene::Level(LevelScene {
            index,
            spec,
            ui: Vec::new(),
            hud: HudIds::default(),
            pause_panel: Vec::new(),
            game_over_panel: Vec::new(),
        })
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Scene::Menu(_) => "main menu",
            Scene::Level(level) => &level.spec.name,
        }
    }

    /// Fresh, unloaded instance of the same scene.
    pub fn recreate(&self) -> Scene {
        match self {
            Scene::Menu(menu) => Scene::Menu(MenuScene {
                levels: menu.levels.clone(),
                ui: Vec::new(),
            }),
            Scene::Level(level) => Scene::level(level.index, level.spec.clone()),
        }
    }

    /// UI elements owned by this scene.
    pub fn ui(&self) -> Vec<EntityId> {
        match self {
            Scene::Menu(menu) => menu.ui.clone(),
            Scene::Level(level) => level
                .ui
                .iter()
                .chain(&level.pause_panel)
                .chain(&level.game_over_panel)
                .copied()
                .collect(),
        }
    }

    /// Level scene, if this is one.
    pub fn as_level(&self) -> Option<&LevelScene> {
        match self {
            Scene::Level(level) => Some(level),
            Scene::Menu(_) => None,
        }
    }

    /// Mutable level scene, if this is one.
    pub fn as_level_mut(&mut self) -> Option<&mut LevelScene> {
        match self {
            Scene::Level(level) => Some(level),
            Scene::Menu(_) => None,
        }
    }

    /// Stage this scene's UI.
    pub fn load(&mut self, registry: &mut Registry, bounds: &Bounds) {
        match self {
            Scene::Menu(menu) => {
                let cx = bounds.width * 0.5;
                let mut y = bounds.height * 0.25;
                menu.ui.push(registry.stage_add(ui_entity(Vec2::new(cx, y), Widget::Label, "ARCADE")));
                for (index, name) in menu.levels.iter().enumerate() {
                    y += 48.0;
                    menu.ui.push(registry.stage_add(ui_entity(
                        Vec2::new(cx, y),
                        Widget::Button(MenuAction::Play(index)),
                        format!("PLAY {}", name.to_uppercase()),
                    )));
                }
                y += 64.0;
                menu.ui.push(registry.stage_add(ui_entity(
                    Vec2::new(cx, y),
                    Widget::Button(MenuAction::Quit),
                    "QUIT",
                )));
            }
            Scene::Level(level) => {
                let mut hud = |field: HudField, x: f32| {
                    let id = registry.stage_add(ui_entity(Vec2::new(x, 16.0), Widget::Hud(field), ""));
                    level.ui.push(id);
                    Some(id)
                };
                let hud_ids = HudIds {
                    score: hud(HudField::Score, 80.0),
                    wave: hud(HudField::Wave, bounds.width * 0.35),
                    timer: hud(HudField::Timer, bounds.width * 0.65),
                    lives: hud(HudField::Lives, bounds.width - 80.0),
                };
                level.hud = hud_ids;
            }
        }
    }

    /// Destroy this scene's UI and every entity in the registry.
    pub fn cleanup(&mut self, registry: &mut Registry) -> Vec<EntityId> {
        for id in self.ui() {
            registry.stage_remove(id);
        }
        match self {
            Scene::Menu(menu) => menu.ui.clear(),
            Scene::Level(level) => {
                level.ui.clear();
                level.pause_panel.clear();
                level.game_over_panel.clear();
                level.hud = HudIds::default();
            }
        }
        registry.destroy_all()
    }
}

impl LevelScene {
    /// Level spec.
    pub fn spec(&self) -> &LevelSpec {
        &self.spec
    }

    /// Menu slot.
    pub fn index(&self) -> usize {
        self.index
    }

    /// HUD ids staged by `load`.
    pub fn hud(&self) -> HudIds {
        self.hud
    }

    /// Pause panel is up.
    pub fn is_pause_shown(&self) -> bool {
        !self.pause_panel.is_empty()
    }

    /// Game-over panel is up.
    pub fn is_game_over_shown(&self) -> bool {
        !self.game_over_panel.is_empty()
    }

    /// Stage the pause panel (no-op if already up).
    pub fn show_pause(&mut self, registry: &mut Registry, bounds: &Bounds) {
        if self.is_pause_shown() {
            return;
        }
        let c = bounds.center();
        self.pause_panel = vec![
            registry.stage_add(ui_entity(c, Widget::Panel(PanelKind::Pause), "PAUSED")),
            registry.stage_add(ui_entity(
                c + Vec2::new(0.0, 48.0),
                Widget::Button(MenuAction::Resume),
                "RESUME",
            )),
            registry.stage_add(ui_entity(
                c + Vec2::new(0.0, 96.0),
                Widget::Button(MenuAction::MainMenu),
                "QUIT TO MENU",
            )),
        ];
    }

    /// Stage removal of the pause panel.
    pub fn hide_pause(&mut self, registry: &mut Registry) {
        for id in self.pause_panel.drain(..) {
            registry.stage_remove(id);
        }
    }

    /// Stage the game-over panel.
    pub fn show_game_over(&mut self, registry: &mut Registry, bounds: &Bounds, record: &ScoreRecord) {
        self.hide_pause(registry);
        if self.is_game_over_shown() {
            return;
        }
        let c = bounds.center();
        self.game_over_panel = vec![
            registry.stage_add(ui_entity(c, Widget::Panel(PanelKind::GameOver), "GAME OVER")),
            registry.stage_add(ui_entity(
                c + Vec2::new(0.0, 40.0),
                Widget::Label,
                format!("SCORE {}  TIME {:.1}s", record.score, record.elapsed_time),
            )),
            registry.stage_add(ui_entity(c + Vec2::new(0.0, 88.0), Widget::Button(MenuAction::Retry), "RETRY")),
            registry.stage_add(ui_entity(
                c + Vec2::new(0.0, 136.0),
                Widget::Button(MenuAction::MainMenu),
                "MAIN MENU",
            )),
            registry.stage_add(ui_entity(c + Vec2::new(0.0, 184.0), Widget::Button(MenuAction::Quit), "QUIT")),
        ];
    }
}

// =============================================================================
// SCENE MANAGER
// =============================================================================

/// Owns the current scene and the scene-changed flag the tick checks.
#[derive(Debug)]
pub struct SceneManager {
    state: SceneState,
    current: Option<Scene>,
    scene_changed: bool,
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneManager {
    /// Create a manager with no scene.
    pub fn new() -> Self {
        Self {
            state: SceneState::NoScene,
            current: None,
            scene_changed: false,
        }
    }

    /// Replace the current scene with `scene`.
    ///
    /// Flags the running tick for abort, tears the old scene down, loads
    /// the new one and, for a level, starts the director. Fails with
    /// [`EngineError::SceneConflict`] if called while a load or teardown is
    /// still in progress.
    pub fn load_scene(
        &mut self,
        mut scene: Scene,
        registry: &mut Registry,
        director: &mut LevelDirector,
        clock: &mut Clock,
        config: &EngineConfig,
    ) -> Result<(), EngineError> {
        // Guards re-entry from scene load or teardown code; a load that
        // completes always leaves the manager `Active`.
        if matches!(self.state, SceneState::Loading | SceneState::Unloading) {
            return Err(EngineError::SceneConflict(self.state));
        }
        self.scene_changed = true;

        self.unload_current(registry, director);

        self.state = SceneState::Loading;
        debug_assert_eq!(registry.live_count() + registry.pending_len(), 0);
        scene.load(registry, &config.bounds);
        clock.set_paused(false);
        if let Scene::Level(level) = &scene {
            director.begin_level(level.spec.clone(), level.hud, registry, clock, config);
        }
        info!(scene = scene.name(), "Scene loaded");

        self.current = Some(scene);
        self.state = SceneState::Active;
        Ok(())
    }

    /// Load a fresh copy of the current scene.
    pub fn reload_scene(
        &mut self,
        registry: &mut Registry,
        director: &mut LevelDirector,
        clock: &mut Clock,
        config: &EngineConfig,
    ) -> Result<(), EngineError> {
        let fresh = self
            .current
            .as_ref()
            .map(Scene::recreate)
            .ok_or(EngineError::NoActiveScene)?;
        self.load_scene(fresh, registry, director, clock, config)
    }

    /// Tear down the current scene and return to `NoScene`. Safe to call
    /// repeatedly.
    pub fn shutdown(&mut self, registry: &mut Registry, director: &mut LevelDirector) {
        self.unload_current(registry, director);
        self.state = SceneState::NoScene;
    }

    fn unload_current(&mut self, registry: &mut Registry, director: &mut LevelDirector) {
        if let Some(mut old) = self.current.take() {
            self.state = SceneState::Unloading;
            director.end_level();
            let destroyed = old.cleanup(registry);
            info!(scene = old.name(), destroyed = destroyed.len(), "Scene unloaded");
        }
    }

    /// Read and clear the scene-changed flag.
    pub fn take_scene_changed(&mut self) -> bool {
        std::mem::take(&mut self.scene_changed)
    }

    /// A scene change happened since the flag was last taken.
    pub fn scene_changed(&self) -> bool {
        self.scene_changed
    }

    /// Current state.
    pub fn state(&self) -> SceneState {
        self.state
    }

    /// Current scene.
    pub fn current(&self) -> Option<&Scene> {
        self.current.as_ref()
    }

    /// Current scene, mutably.
    pub fn current_mut(&mut self) -> Option<&mut Scene> {
        self.current.as_mut()
    }

    /// Current level scene, if a level is loaded.
    pub fn level_mut(&mut self) -> Option<&mut LevelScene> {
        self.current.as_mut().and_then(Scene::as_level_mut)
    }
}
