//! Placed traps - hidden mines and medkits
//!
//! A trap stays invisible to the Hero's client until its reveal time, and
//! disappears unused at its expiry.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{CellPos, EngineTime, TrapId, TrapKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trap {
    pub id: TrapId,
    pub kind: TrapKind,
    pub cell: CellPos,
    pub placed_at: EngineTime,
    pub reveal_at: EngineTime,
    pub expires_at: EngineTime,
}

impl Trap {
    pub fn new(
        id: TrapId,
        kind: TrapKind,
        cell: CellPos,
        placed_at: EngineTime,
        reveal_ms: u64,
        expire_ms: u64,
    ) -> Self {
        Self {
            id,
            kind,
            cell,
            placed_at,
            reveal_at: placed_at.plus(reveal_ms),
            expires_at: placed_at.plus(expire_ms),
        }
    }

    pub fn is_visible(&self, now: EngineTime) -> bool {
        now >= self.reveal_at
    }

    pub fn is_expired(&self, now: EngineTime) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_then_expire() {
        let trap = Trap::new(
            TrapId::derived(1, 0),
            TrapKind::Mine,
            CellPos::new(2, 2),
            EngineTime::from_millis(1_000),
            30_000,
            60_000,
        );
        assert!(!trap.is_visible(EngineTime::from_millis(30_999)));
        assert!(trap.is_visible(EngineTime::from_millis(31_000)));
        assert!(!trap.is_expired(EngineTime::from_millis(60_999)));
        assert!(trap.is_expired(EngineTime::from_millis(61_000)));
    }
}
