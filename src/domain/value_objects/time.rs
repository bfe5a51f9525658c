//! Engine-internal logical clock
//!
//! All recharge intervals, effect durations, trap timers and mutation
//! schedules are expressed in engine time: milliseconds since run start,
//! advanced by the tick loop. Wall-clock time (`chrono`) only appears in run
//! metadata, which keeps replays of the same seed and action log
//! reproducible under variable tick rates.

use serde::{Deserialize, Serialize};

/// A point on the engine's logical clock, in milliseconds since run start.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EngineTime(u64);

impl EngineTime {
    pub const ZERO: EngineTime = EngineTime(0);

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// A later point on the clock.
    pub fn plus(&self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Milliseconds elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn since(&self, earlier: EngineTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Advance the clock in place by one tick's dt.
    pub fn advance(&mut self, dt_millis: u64) {
        self.0 = self.0.saturating_add(dt_millis);
    }
}

impl std::fmt::Display for EngineTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_and_since() {
        let t = EngineTime::from_millis(1_000);
        assert_eq!(t.plus(500).as_millis(), 1_500);
        assert_eq!(t.plus(500).since(t), 500);
        assert_eq!(t.since(t.plus(500)), 0);
    }

    #[test]
    fn test_advance() {
        let mut t = EngineTime::ZERO;
        t.advance(100);
        t.advance(100);
        assert_eq!(t, EngineTime::from_millis(200));
    }
}
