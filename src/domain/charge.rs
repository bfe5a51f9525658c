//! Charge scheduler - generic timed-resource pools
//!
//! One `ChargePool` per (entity, skill). Consumption and recharge are
//! expressed against the engine clock, not tick counts, so behavior is
//! stable under variable tick rates. Skills with an activation delay track
//! it as a distinct armed-at timestamp; it gates the one-time warm-up grant
//! and is never conflated with the steady-state interval.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{DenyReason, EngineTime, SkillKind, SkillSpec};

/// Result of a consumption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consume {
    Granted {
        /// Expiry of the active effect started by this consumption, if the
        /// skill has a duration.
        effect_until: Option<EngineTime>,
    },
    Denied(DenyReason),
}

impl Consume {
    pub fn is_granted(&self) -> bool {
        matches!(self, Consume::Granted { .. })
    }
}

/// What a scheduler tick did to one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChargeTick {
    /// Charges granted this tick (warm-up or steady-state).
    pub granted: u8,
    /// The pool's active effect elapsed this tick; character state must be
    /// notified so the matching status is cleared.
    pub effect_expired: bool,
}

/// A consumable, rechargeable resource for one skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargePool {
    pub kind: SkillKind,
    current: u8,
    max: u8,
    recharge_interval_ms: Option<u64>,
    recharge_amount: u8,
    #[serde(default)]
    next_recharge_at: Option<EngineTime>,
    /// One-time activation gate; cleared after the warm-up grant.
    #[serde(default)]
    armed_at: Option<EngineTime>,
    warmup_grant: u8,
    effect_duration_ms: Option<u64>,
    #[serde(default)]
    effect_until: Option<EngineTime>,
}

impl ChargePool {
    pub fn from_spec(kind: SkillKind, spec: &SkillSpec, now: EngineTime) -> Self {
        let armed_at = spec.warmup_ms.map(|ms| now.plus(ms));
        // Steady-state recharging starts once the pool is armed; pools
        // without a warm-up start their interval clock immediately.
        let next_recharge_at = match (armed_at, spec.recharge_ms) {
            (None, Some(interval)) => Some(now.plus(interval)),
            _ => None,
        };
        Self {
            kind,
            current: spec.initial.min(spec.max),
            max: spec.max,
            recharge_interval_ms: spec.recharge_ms,
            recharge_amount: spec.recharge_amount,
            next_recharge_at,
            armed_at,
            warmup_grant: spec.warmup_grant,
            effect_duration_ms: spec.effect_ms,
            effect_until: None,
        }
    }

    pub fn current(&self) -> u8 {
        self.current
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn effect_until(&self) -> Option<EngineTime> {
        self.effect_until
    }

    pub fn effect_active(&self, now: EngineTime) -> bool {
        self.effect_until.is_some_and(|until| until > now)
    }

    /// Attempt to spend one charge. Denied with `NoCharge` when empty; a
    /// pool never goes below zero or above its max.
    pub fn try_consume(&mut self, now: EngineTime) -> Consume {
        if self.current == 0 {
            return Consume::Denied(DenyReason::NoCharge);
        }
        self.current -= 1;
        let effect_until = self.effect_duration_ms.map(|ms| now.plus(ms));
        if effect_until.is_some() {
            self.effect_until = effect_until;
        }
        Consume::Granted { effect_until }
    }

    /// Grant charges outside the recharge schedule (age-tier bonuses).
    pub fn grant(&mut self, amount: u8) {
        self.current = self.current.saturating_add(amount).min(self.max);
    }

    /// Raise the cap (age-tier unlock), optionally filling the new room.
    pub fn raise_max(&mut self, amount: u8, fill: bool) {
        self.max = self.max.saturating_add(amount);
        if fill {
            self.grant(amount);
        }
    }

    /// Explicit floor override: ensure at least `floor` charges are held.
    /// Used for guarantees like the Hero's age-tier Escape, not recharging.
    pub fn ensure_at_least(&mut self, floor: u8) {
        if self.current < floor.min(self.max) {
            self.current = floor.min(self.max);
        }
    }

    /// Advance the pool to `now`: resolve the warm-up gate, apply every
    /// elapsed steady-state interval, and expire the active effect.
    pub fn tick(&mut self, now: EngineTime) -> ChargeTick {
        let mut report = ChargeTick::default();

        if let Some(armed_at) = self.armed_at {
            if now >= armed_at {
                let before = self.current;
                self.grant(self.warmup_grant);
                report.granted += self.current - before;
                self.armed_at = None;
                self.next_recharge_at = self.recharge_interval_ms.map(|ms| now.plus(ms));
            }
        }

        if let (Some(interval), Some(mut next_at)) =
            (self.recharge_interval_ms, self.next_recharge_at)
        {
            // Catch up every elapsed interval; the clock keeps sliding even
            // at a full pool so a consume never gets an instant refill.
            while next_at <= now {
                let before = self.current;
                self.grant(self.recharge_amount);
                report.granted += self.current - before;
                next_at = next_at.plus(interval);
            }
            self.next_recharge_at = Some(next_at);
        }

        if let Some(until) = self.effect_until {
            if until <= now {
                self.effect_until = None;
                report.effect_expired = true;
            }
        }

        report
    }
}
