//! Render Task
//!
//! The renderer runs as its own periodic task and never touches the entity
//! registry. It learns about entities through [`RenderDelta`] messages,
//! stages them in its own lists, and commits those lists once at the start
//! of every draw pass. Transforms come from the latest [`FrameSnapshot`]
//! published by the tick task, which is replaced whole, never edited.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, trace};

use crate::core::vec2::Vec2;
use crate::game::enemy::EnemyKind;
use crate::game::entity::Widget;
use crate::world::EntityId;

/// Visual category of a sprite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpriteKind {
    /// Player ship
    Player,
    /// Enemy of a kind
    Enemy(EnemyKind),
    /// Bullet
    Bullet,
    /// Explosion effect
    Explosion,
    /// UI element
    Ui(Widget),
}

/// Drawable view of one entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    /// Entity this sprite mirrors
    pub id: EntityId,
    /// Category
    pub kind: SpriteKind,
    /// Centre position
    pub position: Vec2,
    /// Heading in radians
    pub rotation: f32,
    /// Half extents
    pub half_extents: Vec2,
    /// Text for UI elements
    pub text: Option<String>,
    /// Has a visual representation
    pub drawable: bool,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameSnapshot {
    /// Tick that produced this snapshot
    pub tick: u64,
    /// Level time at the end of that tick
    pub level_time: f32,
    /// Simulation paused
    pub paused: bool,
    /// Current scene name
    pub scene: String,
    /// Enabled live entities, in live order
    pub sprites: Vec<Sprite>,
}

/// Registration traffic from the tick task to the renderer.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderDelta {
    /// An entity became live
    Added(Sprite),
    /// An entity left the live set
    Removed(EntityId),
    /// The scene changed; forget everything registered so far
    Clear,
}

/// Output target.
pub trait Surface: Send {
    /// Called before the first sprite of a pass.
    fn begin_frame(&mut self, _frame: &FrameSnapshot) {}

    /// Draw one sprite.
    fn draw_sprite(&mut self, sprite: &Sprite);

    /// Called after the last sprite of a pass.
    fn end_frame(&mut self) {}
}

/// Anything the renderer can be asked to draw.
pub trait Drawable {
    /// Draw onto `surface`. Returns false when there is nothing to show,
    /// in which case the renderer stops tracking it.
    fn draw(&self, surface: &mut dyn Surface) -> bool;
}

impl Drawable for Sprite {
    fn draw(&self, surface: &mut dyn Surface) -> bool {
        if !self.drawable {
            return false;
        }
        surface.draw_sprite(self);
        true
    }
}

/// Discards output; used for the registration-time `draw` query.
struct Probe;

impl Surface for Probe {
    fn draw_sprite(&mut self, _sprite: &Sprite) {}
}

// =============================================================================
// TRACKER
// =============================================================================

/// The renderer's own registration set with staged mutation.
#[derive(Debug, Default)]
pub struct RenderTracker {
    tracked: HashSet<EntityId>,
    pending_add: Vec<Sprite>,
    pending_remove: Vec<EntityId>,
    clear_requested: bool,
}

impl RenderTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a delta for the next commit.
    pub fn stage(&mut self, delta: RenderDelta) {
        match delta {
            RenderDelta::Added(sprite) => self.pending_add.push(sprite),
            RenderDelta::Removed(id) => {
                if let Some(index) = self.pending_add.iter().position(|s| s.id == id) {
                    self.pending_add.remove(index);
                } else {
                    self.pending_remove.push(id);
                }
            }
            RenderDelta::Clear => {
                self.pending_add.clear();
                self.pending_remove.clear();
                self.clear_requested = true;
            }
        }
    }

    /// Apply staged changes: clear, removals, then additions. Each added
    /// sprite is asked once whether it draws anything.
    pub fn commit(&mut self) {
        if std::mem::take(&mut self.clear_requested) {
            self.tracked.clear();
        }
        for id in self.pending_remove.drain(..) {
            self.tracked.remove(&id);
        }
        for sprite in self.pending_add.drain(..) {
            if sprite.draw(&mut Probe) {
                self.tracked.insert(sprite.id);
            } else {
                trace!(entity = ?sprite.id, "not drawable, not tracked");
            }
        }
    }

    /// Commit, then draw every tracked sprite present in `frame`. Returns
    /// the number of sprites drawn.
    pub fn draw_pass(&mut self, frame: &FrameSnapshot, surface: &mut dyn Surface) -> usize {
        self.commit();
        surface.begin_frame(frame);
        let mut drawn = 0;
        for sprite in &frame.sprites {
            if self.tracked.contains(&sprite.id) && sprite.draw(surface) {
                drawn += 1;
            }
        }
        surface.end_frame();
        drawn
    }

    /// Is `id` tracked?
    pub fn is_tracked(&self, id: EntityId) -> bool {
        self.tracked.contains(&id)
    }

    /// Number of tracked entities.
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }
}

// =============================================================================
// TASK
// =============================================================================

/// Handle to a running render task.
#[derive(Debug)]
pub struct Renderer {
    task: JoinHandle<()>,
}

impl Renderer {
    /// Spawn the render task. Must be called inside a tokio runtime.
    pub fn spawn<S>(
        period: Duration,
        mut deltas: mpsc::UnboundedReceiver<RenderDelta>,
        frames: watch::Receiver<FrameSnapshot>,
        mut surface: S,
    ) -> Self
    where
        S: Surface + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut tracker = RenderTracker::new();

            loop {
                ticker.tick().await;

                let mut closed = false;
                loop {
                    match deltas.try_recv() {
                        Ok(delta) => tracker.stage(delta),
                        Err(mpsc::error::TryRecvError::Empty) => break,
                        Err(mpsc::error::TryRecvError::Disconnected) => {
                            closed = true;
                            break;
                        }
                    }
                }

                // Clone so the watch lock is not held while drawing
                let frame = frames.borrow().clone();
                let drawn = tracker.draw_pass(&frame, &mut surface);
                trace!(tick = frame.tick, drawn, "draw pass");

                if closed {
                    debug!("Render delta channel closed, renderer exiting");
                    break;
                }
            }
        });

        Self { task }
    }

    /// Cancel the render task. Idempotent.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// The task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Headless surface that logs a summary of each frame.
#[derive(Debug, Default)]
pub struct LogSurface {
    frames: u64,
    sprites: usize,
}

impl LogSurface {
    /// Create a logging surface.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Surface for LogSurface {
    fn begin_frame(&mut self, _frame: &FrameSnapshot) {
        self.sprites = 0;
    }

    fn draw_sprite(&mut self, _sprite: &Sprite) {
        self.sprites += 1;
    }

    fn end_frame(&mut self) {
        self.frames += 1;
        if self.frames.is_multiple_of(60) {
            debug!(frames = self.frames, sprites = self.sprites, "frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[derive(Default)]
    struct Recorder {
        drawn: Vec<EntityId>,
        frames: usize,
    }

    impl Surface for Recorder {
        fn draw_sprite(&mut self, sprite: &Sprite) {
            self.drawn.push(sprite.id);
        }

        fn end_frame(&mut self) {
            self.frames += 1;
        }
    }

    fn ids(n: usize) -> Vec<EntityId> {
        let mut map: SlotMap<EntityId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    fn sprite(id: EntityId, drawable: bool) -> Sprite {
        Sprite {
            id,
            kind: SpriteKind::Bullet,
            position: Vec2::ZERO,
            rotation: 0.0,
            half_extents: Vec2::new(1.0, 1.0),
            text: None,
            drawable,
        }
    }

    fn frame(sprites: Vec<Sprite>) -> FrameSnapshot {
        FrameSnapshot {
            sprites,
            ..FrameSnapshot::default()
        }
    }

    #[test]
    fn test_staged_until_draw_pass() {
        let ids = ids(2);
        let mut tracker = RenderTracker::new();
        tracker.stage(RenderDelta::Added(sprite(ids[0], true)));
        assert!(!tracker.is_tracked(ids[0]));

        let mut surface = Recorder::default();
        let drawn = tracker.draw_pass(&frame(vec![sprite(ids[0], true), sprite(ids[1], true)]), &mut surface);
        assert_eq!(drawn, 1);
        assert_eq!(surface.drawn, vec![ids[0]]);
    }

    #[test]
    fn test_non_drawable_not_tracked() {
        let ids = ids(1);
        let mut tracker = RenderTracker::new();
        tracker.stage(RenderDelta::Added(sprite(ids[0], false)));
        tracker.commit();
        assert_eq!(tracker.tracked_len(), 0);
    }

    #[test]
    fn test_remove_cancels_pending_add() {
        let ids = ids(1);
        let mut tracker = RenderTracker::new();
        tracker.stage(RenderDelta::Added(sprite(ids[0], true)));
        tracker.stage(RenderDelta::Removed(ids[0]));
        tracker.commit();
        assert!(!tracker.is_tracked(ids[0]));
    }

    #[test]
    fn test_clear_drops_earlier_adds_keeps_later() {
        let ids = ids(3);
        let mut tracker = RenderTracker::new();
        tracker.stage(RenderDelta::Added(sprite(ids[0], true)));
        tracker.commit();
        tracker.stage(RenderDelta::Added(sprite(ids[1], true)));
        tracker.stage(RenderDelta::Clear);
        tracker.stage(RenderDelta::Added(sprite(ids[2], true)));
        tracker.commit();

        assert!(!tracker.is_tracked(ids[0]));
        assert!(!tracker.is_tracked(ids[1]));
        assert!(tracker.is_tracked(ids[2]));
    }

    #[tokio::test]
    async fn test_render_task_draws_and_stops() {
        let ids = ids(1);
        let (delta_tx, delta_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = watch::channel(FrameSnapshot::default());
        let renderer = Renderer::spawn(Duration::from_millis(5), delta_rx, frame_rx, LogSurface::new());

        delta_tx.send(RenderDelta::Added(sprite(ids[0], true))).unwrap();
        frame_tx.send_replace(frame(vec![sprite(ids[0], true)]));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!renderer.is_finished());

        renderer.stop();
        renderer.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(renderer.is_finished());
    }

    #[tokio::test]
    async fn test_render_task_exits_when_sender_dropped() {
        let (delta_tx, delta_rx) = mpsc::unbounded_channel();
        let (_frame_tx, frame_rx) = watch::channel(FrameSnapshot::default());
        let renderer = Renderer::spawn(Duration::from_millis(5), delta_rx, frame_rx, LogSurface::new());
        drop(delta_tx);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(renderer.is_finished());
    }
}
