//! Client actions and their outcomes
//!
//! Both clients speak the same action vocabulary; which actions a role may
//! perform is enforced when the action is applied. Every rejection carries
//! an explicit reason that the boundary surfaces to the originating client.

use serde::{Deserialize, Serialize};

use super::direction::Direction;
use super::position::CellPos;
use super::skill::{StatusKind, TrapKind};
use super::time::EngineTime;

/// Which client a connection (and an action) belongs to.
///
/// Ordering matters: timestamp ties in the merged action queue are broken
/// by client id, Hero first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    Hero,
    Buddy,
}

impl ClientRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            ClientRole::Hero => "Hero",
            ClientRole::Buddy => "Buddy",
        }
    }
}

impl std::fmt::Display for ClientRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Everything a client can ask the engine to do with its character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Move { direction: Direction },
    Jump { direction: Direction },
    ShieldOn,
    EscapeBreak,
    FreezeAt { target: CellPos },
    FrontierOpen,
    DissolveAt { node: CellPos },
    LiftGrab { target: CellPos },
    LiftThrow { direction: Direction },
    LiftRoll { direction: Direction },
    TrapPlace { kind: TrapKind, cell: CellPos },
    Blink,
}

impl Action {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Action::Move { .. } => "move",
            Action::Jump { .. } => "jump",
            Action::ShieldOn => "shield_on",
            Action::EscapeBreak => "escape_break",
            Action::FreezeAt { .. } => "freeze_at",
            Action::FrontierOpen => "frontier_open",
            Action::DissolveAt { .. } => "dissolve_at",
            Action::LiftGrab { .. } => "lift_grab",
            Action::LiftThrow { .. } => "lift_throw",
            Action::LiftRoll { .. } => "lift_roll",
            Action::TrapPlace { .. } => "trap_place",
            Action::Blink => "blink",
        }
    }
}

/// Why an action was rejected. A denied action changes no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The relevant charge pool is empty.
    NoCharge,
    /// A timer forbids this right now (frozen, shield already up, warm-up).
    OnCooldown,
    /// A wall blocks the movement.
    Blocked,
    /// The target cell or entity does not satisfy the skill's constraints.
    InvalidTarget,
    /// The Hero must answer the open dilemma before moving on.
    DecisionPending,
    /// The run has ended; only restart is accepted.
    RunOver,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::NoCharge => "no_charge",
            DenyReason::OnCooldown => "on_cooldown",
            DenyReason::Blocked => "blocked",
            DenyReason::InvalidTarget => "invalid_target",
            DenyReason::DecisionPending => "decision_pending",
            DenyReason::RunOver => "run_over",
        }
    }
}

/// What a trap did when it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrapEffect {
    Damage,
    Heal,
}

/// State changes produced by an applied action, for logs, the timeline and
/// the client boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldEvent {
    Moved {
        actor: ClientRole,
        from: CellPos,
        to: CellPos,
    },
    Jumped {
        actor: ClientRole,
        from: CellPos,
        to: CellPos,
        distance: i32,
    },
    TrapPlaced {
        kind: TrapKind,
        cell: CellPos,
    },
    TrapTriggered {
        kind: TrapKind,
        effect: TrapEffect,
        amount: u8,
        hero_health: u8,
        shield_absorbed: bool,
    },
    HeroFrozen {
        until: EngineTime,
    },
    FreezeAbsorbed,
    ShieldRaised {
        until: EngineTime,
    },
    EscapeBroke {
        cleared: Vec<StatusKind>,
    },
    WallsBurstOpen {
        cells: Vec<CellPos>,
    },
    NodeDissolved {
        node: CellPos,
        restore_at: EngineTime,
    },
    BuddyBlinked {
        to: CellPos,
    },
    HeroLifted {
        until: EngineTime,
    },
    HeroThrown {
        to: CellPos,
        fell_out: bool,
    },
    HeroRolled {
        to: CellPos,
        fell_out: bool,
    },
    DecisionTriggered {
        node: CellPos,
    },
}

/// Result of asking the engine to apply one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Applied { events: Vec<WorldEvent> },
    Denied { reason: DenyReason },
}

impl ActionOutcome {
    pub fn denied(reason: DenyReason) -> Self {
        ActionOutcome::Denied { reason }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied { .. })
    }

    pub fn events(&self) -> &[WorldEvent] {
        match self {
            ActionOutcome::Applied { events } => events,
            ActionOutcome::Denied { .. } => &[],
        }
    }

    /// Whether any event in this outcome is a lethal out-of-bounds fall.
    pub fn fell_out(&self) -> bool {
        self.events().iter().any(|event| {
            matches!(
                event,
                WorldEvent::HeroThrown { fell_out: true, .. }
                    | WorldEvent::HeroRolled { fell_out: true, .. }
            )
        })
    }
}
