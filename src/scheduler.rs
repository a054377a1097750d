//! Fixed-Period Scheduler
//!
//! Two tasks:
//!
//! - the tick task: a tokio interval that drains pending commands and calls
//!   [`Simulation::tick`] once per period. An error or panic ends it.
//! - the watchdog: runs once, after the timeout, and reports a fatal
//!   condition if the tick task has already ended without a status of its
//!   own (a panic). A tick error marks the loop dead immediately.
//!
//! [`Scheduler::stop`] aborts both and returns immediately; an in-flight
//! tick is not awaited.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, error, info};

use crate::config::EngineConfig;
use crate::engine::TickOutcome;
use crate::error::EngineError;

/// Something the scheduler can drive.
pub trait Simulation: Send + 'static {
    /// Commands accepted between ticks.
    type Command: Send + 'static;

    /// Apply one command. Called on the tick task, before the tick.
    fn apply(&mut self, command: Self::Command);

    /// Run one tick.
    fn tick(&mut self) -> Result<TickOutcome, EngineError>;
}

/// Observable loop state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoopStatus {
    /// Ticking
    Running,
    /// Ended by a quit or by [`Scheduler::stop`]
    Stopped,
    /// The tick task ended unexpectedly; the loop does not restart
    Dead(String),
}

/// Timing for the two tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Tick period
    pub period: Duration,
    /// Delay before the single watchdog check
    pub watchdog_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(20),
            watchdog_timeout: Duration::from_millis(1000),
        }
    }
}

impl From<&EngineConfig> for SchedulerConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            period: config.tick_period(),
            watchdog_timeout: config.watchdog_timeout(),
        }
    }
}

/// Handles to the tick task and its watchdog.
#[derive(Debug)]
pub struct Scheduler {
    tick_task: JoinHandle<()>,
    watchdog: JoinHandle<()>,
    status: Arc<watch::Sender<LoopStatus>>,
}

impl Scheduler {
    /// Start ticking `sim`. Returns the scheduler and the command sender.
    /// Must be called inside a tokio runtime.
    pub fn start<S: Simulation>(
        mut sim: S,
        config: SchedulerConfig,
    ) -> (Self, mpsc::UnboundedSender<S::Command>) {
        let (command_tx, mut commands) = mpsc::unbounded_channel::<S::Command>();
        let (status_tx, _) = watch::channel(LoopStatus::Running);
        let status = Arc::new(status_tx);

        let loop_status = status.clone();
        let period = config.period;
        let tick_task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                while let Ok(command) = commands.try_recv() {
                    sim.apply(command);
                }

                match sim.tick() {
                    Ok(outcome) if outcome.quit => {
                        info!(tick = outcome.tick, "Game loop stopped on quit");
                        loop_status.send_replace(LoopStatus::Stopped);
                        break;
                    }
                    Ok(_outcome) => {
                        #[cfg(feature = "debug-tracing")]
                        tracing::trace!(outcome = ?_outcome, "tick");
                    }
                    Err(e) => {
                        error!(error = %e, "Tick failed, game loop terminating");
                        loop_status.send_replace(LoopStatus::Dead(e.to_string()));
                        break;
                    }
                }
            }
        });

        let tick_abort = tick_task.abort_handle();
        let watchdog_status = status.clone();
        let timeout = config.watchdog_timeout;
        let watchdog = tokio::spawn(async move {
            sleep(timeout).await;

            if !tick_abort.is_finished() {
                debug!("Watchdog: game loop alive");
                return;
            }
            // Quit and tick errors publish their own status
            let settled = !matches!(*watchdog_status.borrow(), LoopStatus::Running);
            if settled {
                return;
            }

            let reason = "tick task panicked".to_string();
            error!(%reason, "FATAL: game loop is not running");
            watchdog_status.send_replace(LoopStatus::Dead(reason));
        });

        info!(period_ms = period.as_millis() as u64, "Game loop started");
        (
            Self {
                tick_task,
                watchdog,
                status,
            },
            command_tx,
        )
    }

    /// Cancel the tick task and the watchdog. Does not wait for an
    /// in-flight tick. Idempotent.
    pub fn stop(&self) {
        self.tick_task.abort();
        self.watchdog.abort();
        self.status.send_if_modified(|status| {
            if *status == LoopStatus::Running {
                *status = LoopStatus::Stopped;
                true
            } else {
                false
            }
        });
    }

    /// Current status.
    pub fn status(&self) -> LoopStatus {
        self.status.borrow().clone()
    }

    /// Watch status changes.
    pub fn subscribe(&self) -> watch::Receiver<LoopStatus> {
        self.status.subscribe()
    }

    /// The tick task has not ended yet.
    pub fn is_running(&self) -> bool {
        !self.tick_task.is_finished()
    }

    /// Convert a dead status into an error.
    pub fn check(&self) -> Result<(), EngineError> {
        match self.status() {
            LoopStatus::Dead(reason) => Err(EngineError::LoopDied(reason)),
            _ => Ok(()),
        }
    }
}
