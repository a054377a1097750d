//! Entity record shared by every simulation object.

use crate::core::vec2::Vec2;

slotmap::new_key_type! {
    /// Stable generational handle to an entity. A handle is never reused
    /// for a different entity after removal.
    pub struct EntityId;
}

/// A simulation object. `K` carries the gameplay payload; the world layer
/// only looks at the shared transform and flags.
#[derive(Clone, Debug)]
pub struct Entity<K> {
    /// Centre position in playfield coordinates
    pub position: Vec2,
    /// Heading in radians (0 = up, clockwise positive)
    pub rotation: f32,
    /// Disabled entities are skipped by the update step
    pub enabled: bool,
    /// Has a visual representation for the renderer
    pub drawable: bool,
    /// UI entities keep updating while the simulation is paused and are
    /// never culled by the visible-bounds check
    pub ui: bool,
    /// Visual/culling extents (half width, half height)
    pub half_extents: Vec2,
    /// Tick on which the `start` hook ran (None while still staged)
    pub started_tick: Option<u64>,
    /// Number of update steps received
    pub updates: u32,
    /// Gameplay payload
    pub kind: K,
}

impl<K> Entity<K> {
    /// Create an enabled, drawable gameplay entity.
    pub fn new(position: Vec2, half_extents: Vec2, kind: K) -> Self {
        Self {
            position,
            rotation: 0.0,
            enabled: true,
            drawable: true,
            ui: false,
            half_extents,
            started_tick: None,
            updates: 0,
            kind,
        }
    }

    /// Create a UI entity.
    pub fn ui(position: Vec2, kind: K) -> Self {
        Self {
            ui: true,
            ..Self::new(position, Vec2::ZERO, kind)
        }
    }

    /// Builder: set rotation.
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: mark as having no visual representation.
    pub fn hidden(mut self) -> Self {
        self.drawable = false;
        self
    }
}
