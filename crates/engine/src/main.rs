//! Cometwave Engine - Main entry point.
//!
//! Runs the engine against the headless in-memory world. A game host links
//! the library instead and passes its own `WorldPorts` to `App::new`.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cometwave_engine::infrastructure::{
    clock::{SystemClock, SystemRandom},
    config_file::JsonConfigSource,
    despawn_file::JsonDespawnStore,
    headless::HeadlessWorld,
    settings::EngineSettings,
    world_context::WorldContext,
};
use cometwave_engine::use_cases::DespawnTiming;
use cometwave_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the binary may run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cometwave_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Cometwave Engine");

    let settings = EngineSettings::from_env();
    tracing::info!(
        config_path = %settings.config_path.display(),
        despawn_store_path = %settings.despawn_store_path.display(),
        natural_spawns = settings.natural_spawns,
        "Engine settings loaded"
    );

    let world = Arc::new(HeadlessWorld::default());
    let (context, rx) = WorldContext::new();

    let app = Arc::new(App::new(
        world.ports(),
        Arc::new(JsonConfigSource::new(&settings.config_path)),
        Arc::new(JsonDespawnStore::new(&settings.despawn_store_path)),
        Arc::new(context),
        Arc::new(SystemClock::new()),
        Arc::new(SystemRandom::new()),
        DespawnTiming {
            startup_grace: settings.startup_grace,
            ..DespawnTiming::default()
        },
    ));

    let report = app.reload_config().await;
    if report.used_defaults {
        tracing::warn!("Running with built-in comet defaults");
    }

    let handles = app.start_background_tasks(rx, &settings);
    tracing::info!(tasks = handles.len(), "Background tasks started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
