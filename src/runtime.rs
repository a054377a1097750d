//! Game Runtime
//!
//! Wires an [`Engine`] into the scheduler and a renderer into its own task,
//! and owns the shutdown order:
//!
//! 1. stop the scheduler (the engine is dropped with its task)
//! 2. detach input
//! 3. drop the remaining engine-side channels
//! 4. stop the renderer

use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::config::EngineConfig;
use crate::core::vec2::Vec2;
use crate::engine::{Engine, EngineSinks};
use crate::error::EngineError;
use crate::game::command::OutboundCommand;
use crate::game::input::{EngineCommand, MenuAction};
use crate::render::{FrameSnapshot, Renderer, Surface};
use crate::scheduler::{LoopStatus, Scheduler, SchedulerConfig};

/// Input capability handed to an external input layer.
#[derive(Clone, Debug)]
pub struct InputHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
}

impl InputHandle {
    fn send(&self, command: EngineCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Directional intent for the controlled ship.
    pub fn set_direction(&self, direction: Vec2) -> bool {
        self.send(EngineCommand::Move(direction))
    }

    /// Fire intent for the controlled ship.
    pub fn set_fire(&self, fire: bool) -> bool {
        self.send(EngineCommand::Fire(fire))
    }

    /// Activate a menu button.
    pub fn select(&self, action: MenuAction) -> bool {
        self.send(EngineCommand::Select(action))
    }

    /// Pause or resume.
    pub fn toggle_pause(&self) -> bool {
        self.send(EngineCommand::TogglePause)
    }

    /// Any other command.
    pub fn command(&self, command: EngineCommand) -> bool {
        self.send(command)
    }
}

/// A running session.
#[derive(Debug)]
pub struct GameRuntime {
    scheduler: Option<Scheduler>,
    input: Option<InputHandle>,
    frames: Option<watch::Receiver<FrameSnapshot>>,
    renderer: Option<Renderer>,
}

impl GameRuntime {
    /// Start a session on `surface`. Returns the runtime and the outbound
    /// command stream. Must be called inside a tokio runtime.
    pub fn start<S>(
        config: EngineConfig,
        surface: S,
    ) -> Result<(Self, mpsc::UnboundedReceiver<OutboundCommand>), EngineError>
    where
        S: Surface + 'static,
    {
        let config = config.sanitized();
        let scheduler_config = SchedulerConfig::from(&config);
        let render_period = config.render_period();

        let mut engine = Engine::new(config);
        engine.start()?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (render_tx, render_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = watch::channel(engine.snapshot());
        engine.attach(EngineSinks {
            outbound: outbound_tx,
            render: render_tx,
            frames: frame_tx,
        });

        let renderer = Renderer::spawn(render_period, render_rx, frame_rx.clone(), surface);
        let (scheduler, commands) = Scheduler::start(engine, scheduler_config);

        Ok((
            Self {
                scheduler: Some(scheduler),
                input: Some(InputHandle { commands }),
                frames: Some(frame_rx),
                renderer: Some(renderer),
            },
            outbound_rx,
        ))
    }

    /// Input capability, until shutdown.
    pub fn input(&self) -> Option<InputHandle> {
        self.input.clone()
    }

    /// Loop status, until shutdown.
    pub fn status(&self) -> Option<LoopStatus> {
        self.scheduler.as_ref().map(Scheduler::status)
    }

    /// Latest published frame, until shutdown.
    pub fn latest_frame(&self) -> Option<FrameSnapshot> {
        self.frames.as_ref().map(|rx| rx.borrow().clone())
    }

    /// Tear everything down in order. Safe to call more than once.
    pub fn shutdown(&mut self) {
        let was_running = self.scheduler.is_some();

        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
        self.input = None;
        self.frames = None;
        if let Some(renderer) = self.renderer.take() {
            renderer.stop();
        }

        if was_running {
            info!("Runtime shut down");
        }
    }

    /// Every handle has been released.
    pub fn is_shut_down(&self) -> bool {
        self.scheduler.is_none() && self.input.is_none() && self.frames.is_none() && self.renderer.is_none()
    }
}

impl Drop for GameRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::command::CommandKind;
    use crate::render::LogSurface;
    use std::time::Duration;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            tick_period_ms: 5,
            watchdog_timeout_ms: 50,
            render_period_ms: 5,
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_runtime_runs_menu_and_publishes_frames() {
        let (mut runtime, _outbound) = GameRuntime::start(fast_config(), LogSurface::new()).unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(runtime.status(), Some(LoopStatus::Running));
        let frame = runtime.latest_frame().unwrap();
        assert!(frame.tick > 0);
        assert_eq!(frame.scene, "main menu");
        runtime.shutdown();
    }

    #[tokio::test]
    async fn test_quit_from_menu_stops_loop_and_emits_command() {
        let (mut runtime, mut outbound) = GameRuntime::start(fast_config(), LogSurface::new()).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(runtime.input().unwrap().select(MenuAction::Quit));
        let command = tokio::time::timeout(Duration::from_millis(500), outbound.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(command.kind, CommandKind::Quit);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(runtime.status(), Some(LoopStatus::Stopped));
        runtime.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_twice_releases_everything() {
        let (mut runtime, _outbound) = GameRuntime::start(fast_config(), LogSurface::new()).unwrap();
        let input = runtime.input().unwrap();

        runtime.shutdown();
        runtime.shutdown();
        assert!(runtime.is_shut_down());
        assert!(runtime.input().is_none());
        assert!(runtime.status().is_none());

        // The tick task, and the engine's command receiver with it, goes away
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!input.set_fire(true));
    }
}
