//! Hero and Buddy - the two player-controlled characters
//!
//! The Hero carries the life-run state (health, age, growth traits); the
//! Buddy only carries position and its skill pools. Both map skills to
//! charge pools through the same scheduler contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::charge::{ChargePool, ChargeTick};
use crate::domain::value_objects::{
    CellPos, ClientRole, EngineTime, GrowthTraits, SkillKind, SkillTable, Stage, StatusEffect,
    StatusKind, SubCell,
};

/// Charge pools keyed by skill, in deterministic order.
pub type ChargeSet = BTreeMap<SkillKind, ChargePool>;

/// The life-running character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hero {
    pub position: CellPos,
    #[serde(default)]
    pub subcell: SubCell,
    pub health: u8,
    pub age: u32,
    pub stage: Stage,
    #[serde(default)]
    pub traits: GrowthTraits,
    #[serde(default)]
    pub status: BTreeMap<StatusKind, StatusEffect>,
    pub charges: ChargeSet,
    /// Age-tier bookkeeping: bonus jump charges already granted.
    #[serde(default)]
    pub jump_bonus_awarded: u32,
    /// Last age checkpoint at which an escape charge was granted.
    #[serde(default)]
    pub escape_last_age: u32,
    /// Last age checkpoint at which a shield charge was granted.
    #[serde(default)]
    pub shield_last_age: u32,
}

impl Hero {
    pub fn new(position: CellPos, start_age: u32, table: &SkillTable, now: EngineTime) -> Self {
        let mut charges = ChargeSet::new();
        charges.insert(
            SkillKind::Jump,
            ChargePool::from_spec(SkillKind::Jump, &table.hero_jump, now),
        );
        charges.insert(
            SkillKind::Escape,
            ChargePool::from_spec(SkillKind::Escape, &table.hero_escape, now),
        );
        charges.insert(
            SkillKind::Shield,
            ChargePool::from_spec(SkillKind::Shield, &table.hero_shield, now),
        );
        Self {
            position,
            subcell: SubCell::CENTERED,
            health: 100,
            age: start_age,
            stage: Stage::for_age(start_age),
            traits: GrowthTraits::default(),
            status: BTreeMap::new(),
            charges,
            jump_bonus_awarded: 0,
            escape_last_age: start_age,
            shield_last_age: start_age,
        }
    }

    pub fn pool(&self, kind: SkillKind) -> Option<&ChargePool> {
        self.charges.get(&kind)
    }

    pub fn pool_mut(&mut self, kind: SkillKind) -> Option<&mut ChargePool> {
        self.charges.get_mut(&kind)
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.status.contains_key(&kind)
    }

    pub fn add_status(&mut self, kind: StatusKind, applied_by: ClientRole, until: EngineTime) {
        self.status
            .insert(kind, StatusEffect::new(kind, applied_by, until));
    }

    pub fn clear_status(&mut self, kind: StatusKind) -> bool {
        self.status.remove(&kind).is_some()
    }

    /// Drop expired statuses and report which kinds were cleared.
    pub fn expire_statuses(&mut self, now: EngineTime) -> Vec<StatusKind> {
        let expired: Vec<StatusKind> = self
            .status
            .values()
            .filter(|effect| effect.is_expired(now))
            .map(|effect| effect.kind)
            .collect();
        for kind in &expired {
            self.status.remove(kind);
        }
        expired
    }

    pub fn is_shielded(&self, now: EngineTime) -> bool {
        self.status
            .get(&StatusKind::Shielded)
            .is_some_and(|effect| !effect.is_expired(now))
    }

    /// Apply damage, clamped at zero. Returns the new health.
    pub fn apply_damage(&mut self, amount: u8) -> u8 {
        self.health = self.health.saturating_sub(amount);
        self.health
    }

    /// Heal, clamped at 100. Returns the new health.
    pub fn apply_heal(&mut self, amount: u8) -> u8 {
        self.health = self.health.saturating_add(amount).min(100);
        self.health
    }

    /// Relocate the Hero, recentering the sub-cell offset.
    pub fn relocate(&mut self, to: CellPos) {
        self.position = to;
        self.subcell = SubCell::CENTERED;
    }

    /// Advance every pool to `now`. Returns per-skill reports in pool order.
    pub fn tick_charges(&mut self, now: EngineTime) -> Vec<(SkillKind, ChargeTick)> {
        self.charges
            .iter_mut()
            .map(|(kind, pool)| (*kind, pool.tick(now)))
            .collect()
    }
}

/// The disruptive/helpful second character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buddy {
    pub position: CellPos,
    #[serde(default)]
    pub subcell: SubCell,
    pub charges: ChargeSet,
}

impl Buddy {
    pub fn new(position: CellPos, table: &SkillTable, now: EngineTime) -> Self {
        let mut charges = ChargeSet::new();
        for (kind, spec) in [
            (SkillKind::Jump, &table.buddy_jump),
            (SkillKind::Freeze, &table.freeze),
            (SkillKind::Frontier, &table.frontier),
            (SkillKind::Dissolve, &table.dissolve),
            (SkillKind::Lift, &table.lift),
            (SkillKind::Blink, &table.blink),
            (SkillKind::Trap, &table.trap),
        ] {
            charges.insert(kind, ChargePool::from_spec(kind, spec, now));
        }
        Self {
            position,
            subcell: SubCell::CENTERED,
            charges,
        }
    }

    pub fn pool(&self, kind: SkillKind) -> Option<&ChargePool> {
        self.charges.get(&kind)
    }

    pub fn pool_mut(&mut self, kind: SkillKind) -> Option<&mut ChargePool> {
        self.charges.get_mut(&kind)
    }

    pub fn relocate(&mut self, to: CellPos) {
        self.position = to;
        self.subcell = SubCell::CENTERED;
    }

    pub fn tick_charges(&mut self, now: EngineTime) -> Vec<(SkillKind, ChargeTick)> {
        self.charges
            .iter_mut()
            .map(|(kind, pool)| (*kind, pool.tick(now)))
            .collect()
    }
}
