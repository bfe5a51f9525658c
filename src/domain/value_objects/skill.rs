//! Skill kinds, status effects, and the per-skill constants table
//!
//! Every ability is a tagged variant over the same charge-pool contract;
//! adding a skill means adding a variant and a `SkillSpec` row, not a new
//! type hierarchy.

use serde::{Deserialize, Serialize};

use super::action::ClientRole;
use super::time::EngineTime;

/// Every chargeable ability in the game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    /// Hero or Buddy: leap 2-3 tiles in a direction.
    Jump,
    /// Hero: break out of a freeze or lift grab.
    Escape,
    /// Hero: temporary damage immunity.
    Shield,
    /// Buddy: freeze the Hero in place and chip their health.
    Freeze,
    /// Buddy: burst-open nearby walls for a while.
    Frontier,
    /// Buddy: temporarily suppress a decision node.
    Dissolve,
    /// Buddy: grab the Hero and throw them.
    Lift,
    /// Buddy: teleport near the Hero.
    Blink,
    /// Buddy: place a hidden mine or medkit.
    Trap,
}

impl SkillKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            SkillKind::Jump => "Jump",
            SkillKind::Escape => "Escape",
            SkillKind::Shield => "Shield",
            SkillKind::Freeze => "Freeze",
            SkillKind::Frontier => "Frontier",
            SkillKind::Dissolve => "Dissolve",
            SkillKind::Lift => "Lift",
            SkillKind::Blink => "Blink",
            SkillKind::Trap => "Trap",
        }
    }
}

/// A transient condition on a character.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Cannot move or jump.
    Frozen,
    /// Held by the Buddy, waiting to be thrown.
    Lifted,
    /// Immune to damage and freezes.
    Shielded,
    /// Mid-air after a throw; eligible for a roll continuation.
    Tumbling,
}

/// A status effect with its owner and expiry on the engine clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    /// Which client's action applied this effect.
    pub applied_by: ClientRole,
    pub until: EngineTime,
}

impl StatusEffect {
    pub fn new(kind: StatusKind, applied_by: ClientRole, until: EngineTime) -> Self {
        Self {
            kind,
            applied_by,
            until,
        }
    }

    pub fn is_expired(&self, now: EngineTime) -> bool {
        self.until <= now
    }
}

/// Trap flavors the Buddy can place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrapKind {
    Mine,
    Medkit,
}

impl TrapKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            TrapKind::Mine => "Mine",
            TrapKind::Medkit => "Medkit",
        }
    }
}

/// Charge-pool constants for one skill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillSpec {
    /// Charges available at run start.
    pub initial: u8,
    pub max: u8,
    /// Steady-state recharge interval; `None` for purely age-granted skills.
    pub recharge_ms: Option<u64>,
    /// Charges granted per elapsed interval.
    pub recharge_amount: u8,
    /// One-time activation delay before the first grant is eligible.
    /// Tracked as a distinct armed-at timestamp, never folded into the
    /// steady-state interval.
    pub warmup_ms: Option<u64>,
    /// Charges granted when the warm-up elapses.
    pub warmup_grant: u8,
    /// Duration of the active effect started on consumption, if any.
    pub effect_ms: Option<u64>,
}

/// All per-skill constants plus the combat numbers that go with them.
///
/// Defaults mirror the live game's tuning. The whole table arrives as part
/// of the opaque configuration bundle at engine construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillTable {
    pub hero_jump: SkillSpec,
    pub hero_escape: SkillSpec,
    pub hero_shield: SkillSpec,
    pub buddy_jump: SkillSpec,
    pub freeze: SkillSpec,
    pub frontier: SkillSpec,
    pub dissolve: SkillSpec,
    pub lift: SkillSpec,
    pub blink: SkillSpec,
    pub trap: SkillSpec,

    /// Health chipped off the Hero by a landed freeze.
    pub freeze_damage: u8,
    /// How long the Hero stays frozen.
    pub frozen_ms: u64,
    /// Damage dealt by a trap's harmful branch.
    pub trap_damage: u8,
    /// Health restored by a trap's helpful branch.
    pub trap_heal: u8,
    /// Probability that a mine damages (a medkit heals) rather than the inverse.
    pub trap_primary_chance: f64,
    /// Delay before a placed trap becomes visible to the Hero's client.
    pub trap_reveal_ms: u64,
    /// Lifetime of an untriggered trap.
    pub trap_expire_ms: u64,
    /// Walls opened by one Frontier burst.
    pub frontier_burst: usize,
    /// How long Frontier openings stay open before regrowing.
    pub frontier_restore_ms: u64,
    /// How long a dissolved decision node stays suppressed.
    pub dissolve_suppress_ms: u64,
    /// How long a lift grab holds before auto-release.
    pub lift_hold_ms: u64,
    /// Window after a throw during which a roll continuation is allowed.
    pub tumble_ms: u64,
    /// Inclusive jump/throw distance range in tiles.
    pub jump_min_tiles: i32,
    pub jump_max_tiles: i32,
    /// Blink lands within this Manhattan radius of the Hero.
    pub blink_radius: i32,
    /// Maximum straight-line grab distance for Lift.
    pub lift_reach: i32,
    pub shield_duration_ms: u64,
}

impl Default for SkillTable {
    fn default() -> Self {
        Self {
            hero_jump: SkillSpec {
                initial: 2,
                max: 2,
                recharge_ms: None,
                recharge_amount: 0,
                warmup_ms: None,
                warmup_grant: 0,
                effect_ms: None,
            },
            hero_escape: SkillSpec {
                initial: 1,
                max: 9,
                recharge_ms: None,
                recharge_amount: 0,
                warmup_ms: None,
                warmup_grant: 0,
                effect_ms: None,
            },
            hero_shield: SkillSpec {
                initial: 1,
                max: 1,
                recharge_ms: None,
                recharge_amount: 0,
                warmup_ms: None,
                warmup_grant: 0,
                effect_ms: Some(10_000),
            },
            buddy_jump: SkillSpec {
                initial: 2,
                max: 4,
                recharge_ms: Some(15_000),
                recharge_amount: 1,
                warmup_ms: None,
                warmup_grant: 0,
                effect_ms: None,
            },
            freeze: SkillSpec {
                initial: 0,
                max: 3,
                recharge_ms: Some(30_000),
                recharge_amount: 1,
                warmup_ms: Some(10_000),
                warmup_grant: 2,
                effect_ms: Some(5_000),
            },
            frontier: SkillSpec {
                initial: 0,
                max: 5,
                recharge_ms: Some(20_000),
                recharge_amount: 2,
                warmup_ms: Some(10_000),
                warmup_grant: 2,
                effect_ms: None,
            },
            dissolve: SkillSpec {
                initial: 1,
                max: 2,
                recharge_ms: Some(15_000),
                recharge_amount: 1,
                warmup_ms: None,
                warmup_grant: 0,
                effect_ms: None,
            },
            lift: SkillSpec {
                initial: 0,
                max: 2,
                recharge_ms: Some(20_000),
                recharge_amount: 1,
                warmup_ms: Some(10_000),
                warmup_grant: 1,
                effect_ms: None,
            },
            blink: SkillSpec {
                initial: 1,
                max: 2,
                recharge_ms: Some(20_000),
                recharge_amount: 1,
                warmup_ms: None,
                warmup_grant: 0,
                effect_ms: None,
            },
            trap: SkillSpec {
                initial: 1,
                max: 2,
                recharge_ms: Some(20_000),
                recharge_amount: 1,
                warmup_ms: None,
                warmup_grant: 0,
                effect_ms: None,
            },

            freeze_damage: 5,
            frozen_ms: 5_000,
            trap_damage: 30,
            trap_heal: 20,
            trap_primary_chance: 0.8,
            trap_reveal_ms: 30_000,
            trap_expire_ms: 60_000,
            frontier_burst: 2,
            frontier_restore_ms: 20_000,
            dissolve_suppress_ms: 15_000,
            lift_hold_ms: 10_000,
            tumble_ms: 2_000,
            jump_min_tiles: 2,
            jump_max_tiles: 3,
            blink_radius: 3,
            lift_reach: 2,
            shield_duration_ms: 10_000,
        }
    }
}
