//! AI boundary adapters
//!
//! Only the built-in mock provider lives in-tree; real vendors plug in
//! behind the same `DilemmaPort`.

mod mock;

pub use mock::MockDilemmaProvider;
