//! Collision Pass
//!
//! Discrete, per-tick, axis-aligned detection over the live collider set.
//! Every ordered pair (A, B) of enabled colliders with different parents is
//! tested, so each side of an overlapping pair gets its own [`Collision`].
//!
//! Cost is O(n²) in live colliders. Which side of a pair is reported first
//! follows live-list insertion order; callers must not depend on it.

use crate::world::collider::{Aabb, ColliderId, ContactKind, test_pair};
use crate::world::entity::EntityId;
use crate::world::registry::EntityRegistry;

/// One ordered pairing, delivered only to `this_entity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Collision {
    /// Collider on the receiving side
    pub this: ColliderId,
    /// Collider on the other side
    pub other: ColliderId,
    /// Parent of `this`
    pub this_entity: EntityId,
    /// Parent of `other`
    pub other_entity: EntityId,
    /// Solid or trigger contact
    pub kind: ContactKind,
}

struct Candidate {
    id: ColliderId,
    parent: EntityId,
    aabb: Aabb,
    trigger: bool,
}

/// Detect every ordered collision among enabled live colliders.
///
/// Positions are sampled once, so the result does not depend on what the
/// callbacks later do to their entities.
pub fn detect_collisions<K>(registry: &EntityRegistry<K>) -> Vec<Collision> {
    let candidates: Vec<Candidate> = registry
        .live_colliders()
        .iter()
        .filter_map(|cid| {
            let collider = registry.collider(*cid)?;
            if !collider.enabled {
                return None;
            }
            let parent = registry.get(collider.parent)?;
            Some(Candidate {
                id: *cid,
                parent: collider.parent,
                aabb: collider.aabb(parent.position),
                trigger: collider.trigger,
            })
        })
        .collect();

    let mut collisions = Vec::new();
    for a in &candidates {
        for b in &candidates {
            // Same parent never collides (covers a == b)
            if a.parent == b.parent {
                continue;
            }
            if let Some(kind) = test_pair(&a.aabb, a.trigger, &b.aabb, b.trigger) {
                collisions.push(Collision {
                    this: a.id,
                    other: b.id,
                    this_entity: a.parent,
                    other_entity: b.parent,
                    kind,
                });
            }
        }
    }

    collisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::Vec2;
    use crate::world::collider::Collider;
    use crate::world::entity::Entity;
    use proptest::prelude::*;

    fn spawn(reg: &mut EntityRegistry<()>, x: f32, y: f32, size: f32) -> (EntityId, ColliderId) {
        let id = reg.stage_add(Entity::new(Vec2::new(x, y), Vec2::ZERO, ()));
        let cid = reg.stage_add_collider(Collider::new(id, size, size));
        (id, cid)
    }

    #[test]
    fn test_both_sides_reported_once() {
        let mut reg = EntityRegistry::new();
        let (a, ca) = spawn(&mut reg, 0.0, 0.0, 10.0);
        let (b, cb) = spawn(&mut reg, 9.0, 9.0, 10.0);
        reg.commit(|_, _| {});

        let hits = detect_collisions(&reg);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits.iter().filter(|c| c.this_entity == a).count(), 1);
        assert_eq!(hits.iter().filter(|c| c.this_entity == b).count(), 1);

        let a_side = hits.iter().find(|c| c.this == ca).unwrap();
        assert_eq!(a_side.other, cb);
        assert_eq!(a_side.kind, ContactKind::Solid);
    }

    #[test]
    fn test_same_parent_never_collides() {
        let mut reg = EntityRegistry::new();
        let (a, _) = spawn(&mut reg, 0.0, 0.0, 10.0);
        reg.stage_add_collider(Collider::new(a, 10.0, 10.0).trigger());
        reg.commit(|_, _| {});

        assert!(detect_collisions(&reg).is_empty());
    }

    #[test]
    fn test_disabled_collider_skipped() {
        let mut reg = EntityRegistry::new();
        let (a, _) = spawn(&mut reg, 0.0, 0.0, 10.0);
        spawn(&mut reg, 1.0, 1.0, 10.0);
        reg.commit(|_, _| {});

        reg.set_colliders_enabled(a, false);
        assert!(detect_collisions(&reg).is_empty());
    }

    #[test]
    fn test_staged_colliders_not_tested() {
        let mut reg = EntityRegistry::new();
        spawn(&mut reg, 0.0, 0.0, 10.0);
        spawn(&mut reg, 1.0, 1.0, 10.0);
        assert!(detect_collisions(&reg).is_empty());
    }

    #[test]
    fn test_offset_moves_box() {
        let mut reg = EntityRegistry::new();
        let (a, _) = spawn(&mut reg, 0.0, 0.0, 2.0);
        let (b, _) = spawn(&mut reg, 20.0, 0.0, 2.0);
        reg.stage_add_collider(Collider::new(a, 2.0, 2.0).with_offset(Vec2::new(19.5, 0.0)).trigger());
        reg.commit(|_, _| {});

        let hits = detect_collisions(&reg);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|c| c.kind == ContactKind::Trigger));
        assert!(hits.iter().any(|c| c.this_entity == b));
    }

    proptest! {
        #[test]
        fn prop_no_self_collision(positions in proptest::collection::vec((0.0f32..50.0, 0.0f32..50.0), 1..8)) {
            let mut reg = EntityRegistry::new();
            for (x, y) in &positions {
                let (id, _) = spawn(&mut reg, *x, *y, 8.0);
                // Second collider on the same parent
                reg.stage_add_collider(Collider::new(id, 8.0, 8.0));
            }
            reg.commit(|_, _| {});

            for hit in detect_collisions(&reg) {
                prop_assert_ne!(hit.this_entity, hit.other_entity);
            }
        }
    }
}
