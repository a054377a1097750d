//! Gameplay Entity Payloads
//!
//! The concrete `K` stored in the world registry.

use crate::core::vec2::Vec2;
use crate::game::enemy::Enemy;
use crate::game::input::MenuAction;
use crate::world::{Entity, EntityRegistry};

/// Entity with a gameplay payload.
pub type GameEntity = Entity<EntityKind>;

/// Registry of gameplay entities.
pub type Registry = EntityRegistry<EntityKind>;

/// Every kind of simulation object.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityKind {
    /// The controlled ship
    Player(PlayerShip),
    /// A hostile
    Enemy(Enemy),
    /// Player projectile
    Bullet(Bullet),
    /// Short-lived effect
    Explosion(Explosion),
    /// Menu/HUD element
    Ui(UiElement),
}

impl EntityKind {
    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Player(_) => "player",
            EntityKind::Enemy(_) => "enemy",
            EntityKind::Bullet(_) => "bullet",
            EntityKind::Explosion(_) => "explosion",
            EntityKind::Ui(_) => "ui",
        }
    }
}

/// Player ship state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerShip {
    /// Seconds until the next shot
    pub fire_cooldown: f32,
    /// Position last reported as an outbound move
    pub last_reported: Option<Vec2>,
}

/// Player bullet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bullet {
    /// Units per second
    pub velocity: Vec2,
}

/// Explosion effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Explosion {
    /// Seconds left before it removes itself
    pub remaining: f32,
}

/// Seconds an explosion stays on screen.
pub const EXPLOSION_LIFETIME: f32 = 0.8;

/// UI element.
#[derive(Clone, Debug, PartialEq)]
pub struct UiElement {
    /// What the element does
    pub widget: Widget,
    /// Displayed text
    pub text: String,
    /// Seconds since the element started updating (drives blinking)
    pub age: f32,
}

impl UiElement {
    /// Create a UI element.
    pub fn new(widget: Widget, text: impl Into<String>) -> Self {
        Self {
            widget,
            text: text.into(),
            age: 0.0,
        }
    }
}

/// UI element role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Widget {
    /// Static text
    Label,
    /// Text rewritten by the level director every tick
    Hud(HudField),
    /// Clickable button carrying its action
    Button(MenuAction),
    /// Panel background
    Panel(PanelKind),
}

/// HUD readouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HudField {
    /// Points
    Score,
    /// Level time
    Timer,
    /// Lives left
    Lives,
    /// Wave index
    Wave,
}

/// Overlay panels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelKind {
    /// Shown while paused
    Pause,
    /// Shown after the last life
    GameOver,
}

/// Helper: build a UI entity.
pub fn ui_entity(position: Vec2, widget: Widget, text: impl Into<String>) -> GameEntity {
    Entity::ui(position, EntityKind::Ui(UiElement::new(widget, text)))
}
