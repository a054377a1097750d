//! Arcade Engine Demo
//!
//! Headless session: loads the main menu, plays the first level with a
//! scripted pilot for a few seconds, then quits through the menu path and
//! shuts the runtime down.
//!
//! Usage: `arcade-engine [config.json]`

use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use arcade_engine::{
    EngineConfig, GameRuntime, LoopStatus, MenuAction, VERSION, Vec2,
    game::CommandKind,
    render::LogSurface,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_file(&path).with_context(|| format!("loading {path}"))?,
        None => EngineConfig::default(),
    };

    info!("Arcade Engine v{}", VERSION);
    info!(
        tick_ms = config.tick_period_ms,
        levels = config.levels.len(),
        "Starting demo session"
    );

    let (mut runtime, mut outbound) =
        GameRuntime::start(config, LogSurface::new()).context("starting runtime")?;
    let input = runtime.input().context("runtime has no input")?;

    // Drain outbound traffic the way a transport would
    let transport = tokio::spawn(async move {
        let mut moves = 0u64;
        while let Some(command) = outbound.recv().await {
            match command.kind {
                CommandKind::PlayerMove => moves += 1,
                CommandKind::Quit => {
                    info!(payload = %command.payload, "Quit command received");
                    break;
                }
            }
        }
        moves
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    input.select(MenuAction::Play(0));

    // Scripted pilot: strafe and fire
    for step in 0..40u32 {
        let angle = step as f32 * 0.4;
        input.set_direction(Vec2::new(angle.cos(), angle.sin() * 0.3));
        input.set_fire(step % 3 != 0);
        tokio::time::sleep(Duration::from_millis(100)).await;

        if let Some(LoopStatus::Dead(reason)) = runtime.status() {
            warn!(%reason, "Game loop died");
            break;
        }
    }

    if let Some(frame) = runtime.latest_frame() {
        info!(
            tick = frame.tick,
            level_time = frame.level_time,
            sprites = frame.sprites.len(),
            scene = %frame.scene,
            "Final frame"
        );
    }

    // Back to the menu, then quit from it
    input.toggle_pause();
    tokio::time::sleep(Duration::from_millis(100)).await;
    input.select(MenuAction::MainMenu);
    tokio::time::sleep(Duration::from_millis(100)).await;
    input.select(MenuAction::Quit);

    match tokio::time::timeout(Duration::from_secs(2), transport).await {
        Ok(Ok(moves)) => info!(moves, "Transport drained"),
        Ok(Err(e)) => warn!(error = %e, "Transport task failed"),
        Err(_) => warn!("Timed out waiting for quit"),
    }

    runtime.shutdown();
    runtime.shutdown();
    info!("Demo complete");
    Ok(())
}
