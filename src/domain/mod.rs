//! Domain layer - Core game rules and state with no external dependencies
//!
//! This layer contains:
//! - Value Objects: positions, directions, actions, skills, growth traits
//! - Maze Topology: grid generation, mutation schedule, connectivity invariant
//! - Charge Scheduler: generic timed-resource pools shared by every skill
//! - Entities: Hero, Buddy, traps, dilemma episodes, the timeline
//! - Progression: age/stage advancement and the run lifecycle machine
//! - Snapshot: the full serializable game state published each tick

pub mod charge;
pub mod entities;
pub mod maze;
pub mod progression;
pub mod rng;
pub mod snapshot;
pub mod value_objects;
