//! Progression and lifecycle - age, stage, and the run's terminal states
//!
//! `Active -> Won` when the Hero's age reaches the goal; `Active -> Dead`
//! on empty health or a lethal out-of-bounds fall. Terminal states freeze
//! character mutation; only restart is accepted afterwards.
//!
//! The mapping from resolved-dilemma growth to age advancement is
//! configuration, not a hard-coded formula: each growth point advances age
//! by `age_units_per_growth`, with a fractional carry so non-integer ratios
//! accumulate instead of truncating.

use serde::{Deserialize, Serialize};

use crate::domain::entities::Hero;
use crate::domain::value_objects::{SkillKind, SkillTable, Stage};

/// How a run ended in death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    HealthDepleted,
    FallOut,
}

/// The run lifecycle machine. Terminal variants never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    Active,
    Won,
    Dead { cause: DeathCause },
}

impl Lifecycle {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Lifecycle::Active)
    }
}

/// Result of applying growth to the Hero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeAdvance {
    pub from: u32,
    pub to: u32,
    pub stage_changed: bool,
}

/// Age/stage advancement and age-tier charge unlocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progression {
    pub start_age: u32,
    pub goal_age: u32,
    /// Configured growth-to-age mapping.
    pub age_units_per_growth: f32,
    /// Fractional age not yet applied.
    #[serde(default)]
    growth_carry: f32,
}

impl Progression {
    pub fn new(start_age: u32, goal_age: u32, age_units_per_growth: f32) -> Self {
        Self {
            start_age,
            goal_age,
            age_units_per_growth,
            growth_carry: 0.0,
        }
    }

    /// Apply a resolved dilemma's growth delta: advance age (never below
    /// the start age), recompute the stage, and grant age-tier charges.
    pub fn apply_growth(&mut self, hero: &mut Hero, growth_delta: i32, table: &SkillTable) -> AgeAdvance {
        let from = hero.age;
        let scaled = growth_delta as f32 * self.age_units_per_growth + self.growth_carry;
        let whole = scaled.trunc() as i32;
        self.growth_carry = scaled.fract();

        let advanced = (hero.age as i32 + whole).max(self.start_age as i32) as u32;
        hero.age = advanced;

        let new_stage = Stage::for_age(hero.age);
        let stage_changed = new_stage != hero.stage;
        hero.stage = new_stage;

        self.grant_age_tier_charges(hero, table);

        AgeAdvance {
            from,
            to: hero.age,
            stage_changed,
        }
    }

    /// Age-tier unlocks, explicit overrides on top of the schedulers:
    /// +1 Jump max per 5 years lived, +1 Escape per 10 years (the pool is
    /// guaranteed at least one charge at each tier), +1 Shield per 20
    /// years capped at one held charge.
    pub fn grant_age_tier_charges(&self, hero: &mut Hero, _table: &SkillTable) {
        let age = hero.age;
        let expected_jump_bonus = age.saturating_sub(self.start_age) / 5;
        if expected_jump_bonus > hero.jump_bonus_awarded {
            let delta = (expected_jump_bonus - hero.jump_bonus_awarded) as u8;
            if let Some(pool) = hero.pool_mut(SkillKind::Jump) {
                pool.raise_max(delta, true);
            }
            hero.jump_bonus_awarded = expected_jump_bonus;
        }

        while age >= hero.escape_last_age + 10 {
            if let Some(pool) = hero.pool_mut(SkillKind::Escape) {
                pool.grant(1);
                pool.ensure_at_least(1);
            }
            hero.escape_last_age += 10;
        }

        while age >= hero.shield_last_age + 20 {
            if let Some(pool) = hero.pool_mut(SkillKind::Shield) {
                pool.grant(1);
            }
            hero.shield_last_age += 20;
        }
    }

    /// Evaluate terminal transitions. `fell_out` reports a lethal
    /// out-of-bounds event from this tick, which bypasses the health check.
    pub fn evaluate(&self, hero: &Hero, fell_out: bool) -> Option<Lifecycle> {
        if fell_out {
            return Some(Lifecycle::Dead {
                cause: DeathCause::FallOut,
            });
        }
        if hero.health == 0 {
            return Some(Lifecycle::Dead {
                cause: DeathCause::HealthDepleted,
            });
        }
        if hero.age >= self.goal_age {
            return Some(Lifecycle::Won);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{CellPos, EngineTime};

    fn hero(start_age: u32) -> (Hero, SkillTable) {
        let table = SkillTable::default();
        let hero = Hero::new(CellPos::new(0, 0), start_age, &table, EngineTime::ZERO);
        (hero, table)
    }

    #[test]
    fn test_goal_age_reached_wins() {
        let (mut h, table) = hero(10);
        let mut progression = Progression::new(10, 60, 1.0);

        // Enough growth to add 50 age units.
        for _ in 0..10 {
            progression.apply_growth(&mut h, 5, &table);
        }
        assert_eq!(h.age, 60);
        assert_eq!(progression.evaluate(&h, false), Some(Lifecycle::Won));
    }

    #[test]
    fn test_age_never_drops_below_start() {
        let (mut h, table) = hero(10);
        let mut progression = Progression::new(10, 90, 1.0);
        progression.apply_growth(&mut h, -2, &table);
        assert_eq!(h.age, 10);
    }

    #[test]
    fn test_fractional_mapping_accumulates() {
        let (mut h, table) = hero(10);
        let mut progression = Progression::new(10, 90, 0.5);
        progression.apply_growth(&mut h, 1, &table);
        assert_eq!(h.age, 10);
        progression.apply_growth(&mut h, 1, &table);
        assert_eq!(h.age, 11);
    }

    #[test]
    fn test_stage_recomputed() {
        let (mut h, table) = hero(10);
        let mut progression = Progression::new(10, 90, 1.0);
        let advance = progression.apply_growth(&mut h, 5, &table);
        assert_eq!(h.age, 15);
        assert!(advance.stage_changed);
        assert_eq!(h.stage, Stage::Teen);
    }

    #[test]
    fn test_jump_bonus_per_five_years() {
        let (mut h, table) = hero(10);
        let mut progression = Progression::new(10, 90, 1.0);
        let base_max = h.pool(SkillKind::Jump).unwrap().max();

        progression.apply_growth(&mut h, 5, &table);
        assert_eq!(h.pool(SkillKind::Jump).unwrap().max(), base_max + 1);
        progression.apply_growth(&mut h, 5, &table);
        assert_eq!(h.pool(SkillKind::Jump).unwrap().max(), base_max + 2);
    }

    #[test]
    fn test_escape_guaranteed_at_tier() {
        let (mut h, table) = hero(10);
        let mut progression = Progression::new(10, 90, 1.0);

        // Burn the initial escape charge.
        h.pool_mut(SkillKind::Escape)
            .unwrap()
            .try_consume(EngineTime::ZERO);
        assert_eq!(h.pool(SkillKind::Escape).unwrap().current(), 0);

        progression.apply_growth(&mut h, 5, &table);
        progression.apply_growth(&mut h, 5, &table);
        assert_eq!(h.age, 20);
        assert!(h.pool(SkillKind::Escape).unwrap().current() >= 1);
    }

    #[test]
    fn test_death_transitions() {
        let (mut h, _table) = hero(10);
        let progression = Progression::new(10, 90, 1.0);

        assert_eq!(progression.evaluate(&h, false), None);
        assert_eq!(
            progression.evaluate(&h, true),
            Some(Lifecycle::Dead {
                cause: DeathCause::FallOut
            })
        );
        h.health = 0;
        assert_eq!(
            progression.evaluate(&h, false),
            Some(Lifecycle::Dead {
                cause: DeathCause::HealthDepleted
            })
        );
    }
}
