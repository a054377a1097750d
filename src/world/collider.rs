//! Colliders and the pair test.

use serde::{Deserialize, Serialize};

use crate::core::vec2::Vec2;
use crate::world::entity::EntityId;

slotmap::new_key_type! {
    /// Stable generational handle to a collider.
    pub struct ColliderId;
}

/// Axis-aligned box attached to exactly one parent entity.
#[derive(Clone, Debug)]
pub struct Collider {
    /// Owning entity
    pub parent: EntityId,
    /// Full width
    pub width: f32,
    /// Full height
    pub height: f32,
    /// Offset of the box centre from the parent position
    pub offset: Vec2,
    /// Triggers report overlap without the solid two-sided gate
    pub trigger: bool,
    /// Disabled colliders are skipped by the collision pass
    pub enabled: bool,
}

impl Collider {
    /// Create an enabled, solid collider.
    pub fn new(parent: EntityId, width: f32, height: f32) -> Self {
        Self {
            parent,
            width,
            height,
            offset: Vec2::ZERO,
            trigger: false,
            enabled: true,
        }
    }

    /// Builder: make this a trigger.
    pub fn trigger(mut self) -> Self {
        self.trigger = true;
        self
    }

    /// Builder: offset the box from the parent position.
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// World-space box for a parent at `parent_position`. Rotation is ignored.
    #[inline]
    pub fn aabb(&self, parent_position: Vec2) -> Aabb {
        Aabb {
            center: parent_position + self.offset,
            half: Vec2::new(self.width * 0.5, self.height * 0.5),
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Box centre
    pub center: Vec2,
    /// Half extents
    pub half: Vec2,
}

impl Aabb {
    /// Strict overlap: boxes that only touch along an edge do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        (self.center.x - other.center.x).abs() < self.half.x + other.half.x
            && (self.center.y - other.center.y).abs() < self.half.y + other.half.y
    }
}

/// Which callback a contact produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactKind {
    /// Both colliders are solid
    Solid,
    /// At least one collider is a trigger
    Trigger,
}

/// Pair test: `None` when the boxes do not overlap, otherwise the kind of
/// callback the contact fires.
#[inline]
pub fn test_pair(a: &Aabb, a_trigger: bool, b: &Aabb, b_trigger: bool) -> Option<ContactKind> {
    if !a.overlaps(b) {
        return None;
    }
    if a_trigger || b_trigger {
        Some(ContactKind::Trigger)
    } else {
        Some(ContactKind::Solid)
    }
}
