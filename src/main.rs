//! Moral Maze Engine - authoritative game rules & state backend
//!
//! The engine is the backend server that:
//! - Owns all authoritative game state in a single-writer tick loop
//! - Serves the Hero and Buddy clients via WebSocket
//! - Drives dilemma episodes through the vendor-agnostic AI boundary
//! - Persists the run snapshot to a single save artifact

mod application;
mod domain;
mod infrastructure;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::persistence;
use crate::infrastructure::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moralmaze_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Moral Maze Engine");

    // Load configuration
    let config = EngineConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Maze: {}x{}", config.maze_width, config.maze_height);
    tracing::info!("  Ages: {} -> {}", config.start_age, config.goal_age);
    tracing::info!("  AI provider: {}", config.ai_provider);
    tracing::info!("  Save: {}", config.save_path.display());

    // Initialize application state and the engine it fronts
    let (state, engine) = AppState::new(config)?;
    let state = Arc::new(state);
    tracing::info!("Application state initialized");

    // The single-writer tick loop owning all game state
    let engine_task = tokio::spawn(async move {
        engine.run().await;
    });

    // Autosave worker: periodically persist the latest published snapshot
    let autosave_task = {
        let snapshots = state.engine.snapshots.clone();
        let save_path = state.config.save_path.clone();
        let interval_secs = state.config.autosave_interval_secs;
        tokio::spawn(async move {
            tracing::info!("Starting autosave worker");
            let mut last_saved_tick = 0u64;
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(interval_secs)).await;
                let snapshot = snapshots.borrow().clone();
                if snapshot.run.tick == last_saved_tick {
                    continue;
                }
                match persistence::save_to_path(&save_path, &snapshot) {
                    Ok(()) => {
                        last_saved_tick = snapshot.run.tick;
                        tracing::debug!(tick = snapshot.run.tick, "snapshot autosaved");
                    }
                    Err(error) => {
                        tracing::error!(%error, "autosave failed");
                    }
                }
            }
        })
    };

    tracing::info!("Background workers started");

    // Build the router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(infrastructure::websocket::ws_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(error) = result {
                tracing::error!("Server error: {}", error);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping workers...");
            // Persist one final snapshot before going down.
            let snapshot = state.engine.snapshots.borrow().clone();
            if let Err(error) = persistence::save_to_path(&state.config.save_path, &snapshot) {
                tracing::error!(%error, "final save failed");
            }
            engine_task.abort();
            autosave_task.abort();
            tracing::info!("Workers stopped");
        }
    }

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
