//! Shared application state

use std::sync::Arc;

use anyhow::Result;

use crate::application::ports::outbound::DilemmaPort;
use crate::application::services::{EngineHandle, GameEngine};
use crate::infrastructure::ai::MockDilemmaProvider;
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::persistence;

/// Shared application state
///
/// Holds only the channel ends into the engine task; all mutable game
/// state lives inside the tick loop.
pub struct AppState {
    pub config: EngineConfig,
    pub engine: EngineHandle,
}

impl AppState {
    /// Build the state and the engine it fronts. The engine is returned
    /// unstarted so `main` can spawn it alongside the other workers.
    pub fn new(config: EngineConfig) -> Result<(Self, GameEngine)> {
        let provider = build_provider(&config);
        let params = config.engine_params();

        let (engine, handle) = if config.resume && persistence::has_save(&config.save_path) {
            match persistence::load_from_path(&config.save_path) {
                Ok(snapshot) => {
                    tracing::info!(
                        path = %config.save_path.display(),
                        tick = snapshot.run.tick,
                        "resuming saved run"
                    );
                    GameEngine::from_snapshot(params, provider, snapshot)
                }
                Err(error) => {
                    // Fail closed: report and start fresh, never load a
                    // partially-understood artifact.
                    tracing::error!(%error, "save artifact unusable, starting a fresh run");
                    GameEngine::new(params, provider, chrono::Utc::now())
                }
            }
        } else {
            GameEngine::new(params, provider, chrono::Utc::now())
        };

        Ok((
            Self {
                config,
                engine: handle,
            },
            engine,
        ))
    }
}

fn build_provider(config: &EngineConfig) -> Arc<dyn DilemmaPort> {
    match config.ai_provider.as_str() {
        "mock" => Arc::new(MockDilemmaProvider::new()),
        other => {
            tracing::warn!(provider = other, "unknown AI provider, falling back to mock");
            Arc::new(MockDilemmaProvider::new())
        }
    }
}
