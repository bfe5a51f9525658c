//! Application configuration

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::services::EngineParams;
use crate::domain::maze::MutationConfig;
use crate::domain::value_objects::SkillTable;

/// Engine configuration loaded from environment
///
/// Everything the core consumes arrives here once, at construction time;
/// the engine itself never reads the environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maze dimensions in cells
    pub maze_width: i32,
    pub maze_height: i32,
    /// Fixed maze seed; unset draws a random seed per run
    pub maze_seed: Option<u64>,

    /// Hero age at run start
    pub start_age: u32,
    /// Age at which the run is won
    pub goal_age: u32,
    /// Age units advanced per resolved-dilemma growth point
    pub age_units_per_growth: f32,

    /// Tick loop interval in milliseconds
    pub tick_interval_ms: u64,
    /// Bound on every AI boundary call
    pub ai_timeout_ms: u64,
    /// AI provider selection ("mock" is the only built-in)
    pub ai_provider: String,

    /// Save artifact location
    pub save_path: PathBuf,
    /// Seconds between periodic autosaves
    pub autosave_interval_secs: u64,
    /// Load the save artifact on start when one exists
    pub resume: bool,

    /// WebSocket server port
    pub server_port: u16,

    /// Maze mutation schedule
    pub mutation: MutationConfig,
    /// Per-skill charge constants
    pub skills: SkillTable,
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            maze_width: parse_var("MORALMAZE_MAZE_WIDTH", 24)?,
            maze_height: parse_var("MORALMAZE_MAZE_HEIGHT", 18)?,
            maze_seed: parse_optional_var("MORALMAZE_MAZE_SEED")?,

            start_age: parse_var("MORALMAZE_START_AGE", 10)?,
            goal_age: parse_var("MORALMAZE_GOAL_AGE", 90)?,
            age_units_per_growth: parse_var("MORALMAZE_AGE_PER_GROWTH", 1.0)?,

            tick_interval_ms: parse_var("MORALMAZE_TICK_INTERVAL_MS", 100)?,
            ai_timeout_ms: parse_var("MORALMAZE_AI_TIMEOUT_MS", 8_000)?,
            ai_provider: env::var("MORALMAZE_AI_PROVIDER").unwrap_or_else(|_| "mock".to_string()),

            save_path: env::var("MORALMAZE_SAVE_PATH")
                .unwrap_or_else(|_| "./save/profile.json".to_string())
                .into(),
            autosave_interval_secs: parse_var("MORALMAZE_AUTOSAVE_SECS", 15)?,
            resume: parse_var("MORALMAZE_RESUME", true)?,

            server_port: parse_var("MORALMAZE_SERVER_PORT", 8000)?,

            mutation: MutationConfig::default(),
            skills: SkillTable::default(),
        })
    }

    /// The opaque parameter bundle handed to the engine.
    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            maze_width: self.maze_width,
            maze_height: self.maze_height,
            maze_seed: self.maze_seed,
            start_age: self.start_age,
            goal_age: self.goal_age,
            age_units_per_growth: self.age_units_per_growth,
            tick_interval_ms: self.tick_interval_ms,
            ai_timeout_ms: self.ai_timeout_ms,
            mutation: self.mutation.clone(),
            skills: self.skills.clone(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} must be a valid value, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_optional_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a valid value, got '{}'", name, raw)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        // Variables are namespaced, so a clean test environment gets the
        // defaults matching the live game's tuning.
        let config = EngineConfig::from_env().expect("defaults load");
        assert_eq!(config.maze_width, 24);
        assert_eq!(config.maze_height, 18);
        assert_eq!(config.goal_age, 90);
        assert_eq!(config.ai_provider, "mock");

        let params = config.engine_params();
        assert_eq!(params.tick_interval_ms, 100);
        assert_eq!(params.skills, SkillTable::default());
    }
}
