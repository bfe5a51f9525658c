//! Application services - Use case implementations
//!
//! The game controller owns the tick loop and all mutable state; the
//! episode service manages the AI-bound dilemma lifecycle; the action
//! service applies client actions to character state.

pub mod action_service;
pub mod engine;
pub mod episode_service;

pub use engine::{
    ClientCommand, ClientEnvelope, EngineHandle, EngineParams, EngineReply, GameEngine,
};
pub use episode_service::{EpisodeService, PollOutcome, Resolution};
