//! Application layer - Use case orchestration over the domain
//!
//! Contains the game controller (tick loop), the dilemma episode manager,
//! the action application service, and the outbound port to the AI boundary.

pub mod ports;
pub mod services;
