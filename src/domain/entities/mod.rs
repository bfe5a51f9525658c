//! Domain entities - Core game objects with identity

mod character;
mod episode;
mod timeline;
mod trap;

pub use character::{Buddy, ChargeSet, Hero};
pub use episode::{DilemmaEpisode, EpisodeFeedback, EpisodeState, SubmitError};
pub use timeline::{EpisodeRecord, LifecycleEvent, LifecycleRecord, Timeline, TimelineEntry};
pub use trap::Trap;
