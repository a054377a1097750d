//! Entity Registry
//!
//! Owns the live entity and collider sets. All mutation goes through
//! staging lists that are committed once, at the start of a tick:
//!
//! 1. staged entity removals (and every collider they own)
//! 2. staged collider removals
//! 3. staged entity additions, each `start` hook running before the entity
//!    joins the live set
//! 4. staged collider additions
//!
//! Staging is safe from any context, including while the caller is walking
//! a snapshot of the live ids.

use std::collections::HashSet;

use slotmap::SlotMap;
use tracing::{debug, trace};

use crate::world::collider::{Collider, ColliderId};
use crate::world::entity::{Entity, EntityId};

#[derive(Debug)]
struct EntitySlot<K> {
    entity: Entity<K>,
    live: bool,
}

#[derive(Debug)]
struct ColliderSlot {
    collider: Collider,
    live: bool,
}

/// What a commit changed. Used to feed the renderer's own staging lists.
#[derive(Debug, Default, Clone)]
pub struct CommitReport {
    /// Entities that became live, in commit order
    pub added: Vec<EntityId>,
    /// Entities that left the live set
    pub removed: Vec<EntityId>,
}

impl CommitReport {
    /// Nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Authoritative store of entities and colliders with a staged add/remove
/// protocol.
#[derive(Debug)]
pub struct EntityRegistry<K> {
    entities: SlotMap<EntityId, EntitySlot<K>>,
    /// Live entities in insertion order
    live: Vec<EntityId>,
    pending_add: Vec<EntityId>,
    pending_remove: Vec<EntityId>,

    colliders: SlotMap<ColliderId, ColliderSlot>,
    /// Live colliders in insertion order
    live_colliders: Vec<ColliderId>,
    pending_add_colliders: Vec<ColliderId>,
    pending_remove_colliders: Vec<ColliderId>,
}

impl<K> Default for EntityRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EntityRegistry<K> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entities: SlotMap::with_key(),
            live: Vec::new(),
            pending_add: Vec::new(),
            pending_remove: Vec::new(),
            colliders: SlotMap::with_key(),
            live_colliders: Vec::new(),
            pending_add_colliders: Vec::new(),
            pending_remove_colliders: Vec::new(),
        }
    }

    // =========================================================================
    // Staging
    // =========================================================================

    /// Stage an entity for addition. The returned id is valid immediately
    /// (colliders may reference it) but the entity only joins the live set
    /// at the next commit.
    pub fn stage_add(&mut self, entity: Entity<K>) -> EntityId {
        let id = self.entities.insert(EntitySlot {
            entity,
            live: false,
        });
        self.pending_add.push(id);
        trace!(entity = ?id, "staged add");
        id
    }

    /// Stage an entity for removal at the next commit.
    ///
    /// Removing an entity whose addition is still staged cancels the
    /// addition. Unknown or stale ids are ignored.
    pub fn stage_remove(&mut self, id: EntityId) {
        if self.entities.contains_key(id) {
            self.pending_remove.push(id);
            trace!(entity = ?id, "staged remove");
        }
    }

    /// Stage a collider for addition at the next commit.
    pub fn stage_add_collider(&mut self, collider: Collider) -> ColliderId {
        let id = self.colliders.insert(ColliderSlot {
            collider,
            live: false,
        });
        self.pending_add_colliders.push(id);
        id
    }

    /// Stage a collider for removal at the next commit.
    pub fn stage_remove_collider(&mut self, id: ColliderId) {
        if self.colliders.contains_key(id) {
            self.pending_remove_colliders.push(id);
        }
    }

    /// Number of staged operations waiting for the next commit.
    pub fn pending_len(&self) -> usize {
        self.pending_add.len()
            + self.pending_remove.len()
            + self.pending_add_colliders.len()
            + self.pending_remove_colliders.len()
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Apply every staged operation. Removals are applied before additions;
    /// `on_start` runs once for each added entity before it becomes live.
    pub fn commit<F>(&mut self, mut on_start: F) -> CommitReport
    where
        F: FnMut(EntityId, &mut Entity<K>),
    {
        let mut report = CommitReport::default();

        // 1. Entity removals
        let mut removed: HashSet<EntityId> = HashSet::new();
        for id in std::mem::take(&mut self.pending_remove) {
            let Some(slot) = self.entities.remove(id) else {
                continue; // duplicate or stale
            };
            if slot.live {
                report.removed.push(id);
            }
            removed.insert(id);
        }
        if !removed.is_empty() {
            self.live.retain(|id| !removed.contains(id));
            self.pending_add.retain(|id| !removed.contains(id));

            // Colliders go with their parent
            let orphaned: Vec<ColliderId> = self
                .colliders
                .iter()
                .filter(|(_, slot)| removed.contains(&slot.collider.parent))
                .map(|(cid, _)| cid)
                .collect();
            for cid in orphaned {
                self.colliders.remove(cid);
            }
        }

        // 2. Collider removals
        for cid in std::mem::take(&mut self.pending_remove_colliders) {
            self.colliders.remove(cid);
        }
        let colliders = &self.colliders;
        self.live_colliders.retain(|cid| colliders.contains_key(*cid));
        self.pending_add_colliders
            .retain(|cid| colliders.contains_key(*cid));

        // 3. Entity additions
        for id in std::mem::take(&mut self.pending_add) {
            let Some(slot) = self.entities.get_mut(id) else {
                continue;
            };
            on_start(id, &mut slot.entity);
            slot.live = true;
            self.live.push(id);
            report.added.push(id);
        }

        // 4. Collider additions
        for cid in std::mem::take(&mut self.pending_add_colliders) {
            let parent_exists = match self.colliders.get(cid) {
                Some(slot) => self.entities.contains_key(slot.collider.parent),
                None => continue,
            };
            if !parent_exists {
                debug!(collider = ?cid, "dropping collider whose parent is gone");
                self.colliders.remove(cid);
                continue;
            }
            if let Some(slot) = self.colliders.get_mut(cid) {
                slot.live = true;
            }
            self.live_colliders.push(cid);
        }

        report
    }

    /// Immediately drop every entity and collider, live or staged.
    ///
    /// Only scene teardown uses this; the caller must abandon any iteration
    /// over live ids it is performing.
    pub fn destroy_all(&mut self) -> Vec<EntityId> {
        let removed = std::mem::take(&mut self.live);
        self.entities.clear();
        self.pending_add.clear();
        self.pending_remove.clear();
        self.colliders.clear();
        self.live_colliders.clear();
        self.pending_add_colliders.clear();
        self.pending_remove_colliders.clear();
        debug!(count = removed.len(), "destroyed all entities");
        removed
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Live entity ids in insertion order.
    pub fn live_ids(&self) -> &[EntityId] {
        &self.live
    }

    /// Number of live entities.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Is the entity in the live set?
    pub fn is_live(&self, id: EntityId) -> bool {
        self.entities.get(id).is_some_and(|slot| slot.live)
    }

    /// Look up a live or staged entity.
    pub fn get(&self, id: EntityId) -> Option<&Entity<K>> {
        self.entities.get(id).map(|slot| &slot.entity)
    }

    /// Mutable lookup of a live or staged entity.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity<K>> {
        self.entities.get_mut(id).map(|slot| &mut slot.entity)
    }

    /// Iterate live entities in insertion order.
    pub fn iter_live(&self) -> impl Iterator<Item = (EntityId, &Entity<K>)> {
        self.live
            .iter()
            .filter_map(|id| self.entities.get(*id).map(|slot| (*id, &slot.entity)))
    }

    /// Live collider ids in insertion order.
    pub fn live_colliders(&self) -> &[ColliderId] {
        &self.live_colliders
    }

    /// Is the collider in the live set?
    pub fn is_collider_live(&self, id: ColliderId) -> bool {
        self.colliders.get(id).is_some_and(|slot| slot.live)
    }

    /// Look up a live or staged collider.
    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(id).map(|slot| &slot.collider)
    }

    /// Colliders (live or staged) owned by `parent`.
    pub fn colliders_of(&self, parent: EntityId) -> impl Iterator<Item = (ColliderId, &Collider)> {
        self.colliders
            .iter()
            .filter(move |(_, slot)| slot.collider.parent == parent)
            .map(|(cid, slot)| (cid, &slot.collider))
    }

    /// Enable or disable every collider owned by `parent`.
    ///
    /// Must not be called from inside a collision pass.
    pub fn set_colliders_enabled(&mut self, parent: EntityId, enabled: bool) {
        for (_, slot) in self.colliders.iter_mut() {
            if slot.collider.parent == parent {
                slot.collider.enabled = enabled;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::Vec2;

    fn entity(tag: u32) -> Entity<u32> {
        Entity::new(Vec2::ZERO, Vec2::new(1.0, 1.0), tag)
    }

    #[test]
    fn test_staged_add_is_not_live_until_commit() {
        let mut reg = EntityRegistry::new();
        let id = reg.stage_add(entity(1));

        assert!(!reg.is_live(id));
        assert!(reg.get(id).is_some());
        assert_eq!(reg.live_count(), 0);

        let report = reg.commit(|_, _| {});
        assert_eq!(report.added, vec![id]);
        assert!(reg.is_live(id));
        assert_eq!(reg.pending_len(), 0);
    }

    #[test]
    fn test_removal_commits_before_addition() {
        let mut reg = EntityRegistry::new();
        let old = reg.stage_add(entity(1));
        reg.commit(|_, _| {});

        let new = reg.stage_add(entity(2));
        reg.stage_remove(old);

        let mut started = Vec::new();
        let report = reg.commit(|id, e| started.push((id, e.kind)));

        assert_eq!(report.removed, vec![old]);
        assert_eq!(report.added, vec![new]);
        assert_eq!(started, vec![(new, 2)]);
        assert!(!reg.is_live(old));
        assert!(reg.get(old).is_none());
        assert_eq!(reg.live_ids(), &[new]);
    }

    #[test]
    fn test_start_runs_once() {
        let mut reg = EntityRegistry::new();
        reg.stage_add(entity(1));

        let mut starts = 0;
        reg.commit(|_, _| starts += 1);
        reg.commit(|_, _| starts += 1);
        assert_eq!(starts, 1);
    }

    #[test]
    fn test_remove_cancels_pending_add() {
        let mut reg = EntityRegistry::new();
        let id = reg.stage_add(entity(1));
        reg.stage_remove(id);

        let report = reg.commit(|_, _| panic!("cancelled entity must not start"));
        assert!(report.is_empty());
        assert!(!reg.is_live(id));
    }

    #[test]
    fn test_double_remove_is_harmless() {
        let mut reg = EntityRegistry::new();
        let id = reg.stage_add(entity(1));
        reg.commit(|_, _| {});

        reg.stage_remove(id);
        reg.stage_remove(id);
        let report = reg.commit(|_, _| {});
        assert_eq!(report.removed, vec![id]);

        // Stale id after removal
        reg.stage_remove(id);
        assert_eq!(reg.pending_len(), 0);
    }

    #[test]
    fn test_colliders_follow_parent() {
        let mut reg = EntityRegistry::new();
        let parent = reg.stage_add(entity(1));
        let c = reg.stage_add_collider(Collider::new(parent, 2.0, 2.0));
        reg.commit(|_, _| {});
        assert!(reg.is_collider_live(c));

        reg.stage_remove(parent);
        reg.commit(|_, _| {});
        assert!(reg.collider(c).is_none());
        assert!(reg.live_colliders().is_empty());
    }

    #[test]
    fn test_collider_for_cancelled_parent_is_dropped() {
        let mut reg = EntityRegistry::new();
        let parent = reg.stage_add(entity(1));
        let c = reg.stage_add_collider(Collider::new(parent, 2.0, 2.0));
        reg.stage_remove(parent);
        reg.commit(|_, _| {});
        assert!(!reg.is_collider_live(c));
        assert!(reg.live_colliders().is_empty());
    }

    #[test]
    fn test_set_colliders_enabled() {
        let mut reg = EntityRegistry::new();
        let parent = reg.stage_add(entity(1));
        let c1 = reg.stage_add_collider(Collider::new(parent, 2.0, 2.0));
        let c2 = reg.stage_add_collider(Collider::new(parent, 4.0, 4.0).trigger());
        reg.commit(|_, _| {});

        reg.set_colliders_enabled(parent, false);
        assert!(!reg.collider(c1).unwrap().enabled);
        assert!(!reg.collider(c2).unwrap().enabled);
        assert_eq!(reg.colliders_of(parent).count(), 2);
    }

    #[test]
    fn test_destroy_all_clears_everything() {
        let mut reg = EntityRegistry::new();
        let a = reg.stage_add(entity(1));
        reg.stage_add_collider(Collider::new(a, 1.0, 1.0));
        reg.commit(|_, _| {});
        reg.stage_add(entity(2));

        let removed = reg.destroy_all();
        assert_eq!(removed, vec![a]);
        assert_eq!(reg.live_count(), 0);
        assert_eq!(reg.pending_len(), 0);
        assert!(reg.live_colliders().is_empty());

        // Nothing resurrects on the next commit
        assert!(reg.commit(|_, _| {}).is_empty());
    }
}
