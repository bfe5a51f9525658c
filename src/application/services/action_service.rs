//! Action application - the Character State operation layer
//!
//! Every action first asks the charge scheduler to consume the relevant
//! charge; a denial is a no-op that reports its reason, never a silent
//! drop. Validation runs before consumption so a denied action changes no
//! state at all. Probabilistic outcomes (jump distances, trap branches,
//! blink targets) draw from the seeded run RNG.

use crate::domain::charge::Consume;
use crate::domain::entities::Trap;
use crate::domain::rng::GameRng;
use crate::domain::snapshot::GameSnapshot;
use crate::domain::value_objects::{
    Action, ActionOutcome, CellPos, ClientRole, DenyReason, Direction, EngineTime, SkillKind,
    SkillTable, StatusKind, TrapEffect, TrapId, TrapKind, WorldEvent,
};

/// Apply one client action against the authoritative state.
pub fn apply(
    snapshot: &mut GameSnapshot,
    rng: &mut GameRng,
    now: EngineTime,
    table: &SkillTable,
    actor: ClientRole,
    action: &Action,
) -> ActionOutcome {
    match (actor, action) {
        (ClientRole::Hero, Action::Move { direction }) => {
            hero_move(snapshot, rng, now, table, *direction)
        }
        (ClientRole::Hero, Action::Jump { direction }) => {
            hero_jump(snapshot, rng, now, table, *direction)
        }
        (ClientRole::Hero, Action::ShieldOn) => shield_on(snapshot, now),
        (ClientRole::Hero, Action::EscapeBreak) => escape_break(snapshot, now),
        (ClientRole::Buddy, Action::Move { direction }) => buddy_move(snapshot, *direction),
        (ClientRole::Buddy, Action::Jump { direction }) => {
            buddy_jump(snapshot, rng, now, table, *direction)
        }
        (ClientRole::Buddy, Action::FreezeAt { target }) => {
            freeze_at(snapshot, now, table, *target)
        }
        (ClientRole::Buddy, Action::FrontierOpen) => frontier_open(snapshot, rng, now, table),
        (ClientRole::Buddy, Action::DissolveAt { node }) => {
            dissolve_at(snapshot, now, table, *node)
        }
        (ClientRole::Buddy, Action::LiftGrab { target }) => {
            lift_grab(snapshot, now, table, *target)
        }
        (ClientRole::Buddy, Action::LiftThrow { direction }) => {
            lift_throw(snapshot, rng, now, table, *direction)
        }
        (ClientRole::Buddy, Action::LiftRoll { direction }) => {
            lift_roll(snapshot, rng, now, table, *direction)
        }
        (ClientRole::Buddy, Action::TrapPlace { kind, cell }) => {
            trap_place(snapshot, now, table, *kind, *cell)
        }
        (ClientRole::Buddy, Action::Blink) => blink(snapshot, rng, now, table),
        // The remaining combinations are the other client's skills.
        _ => ActionOutcome::denied(DenyReason::InvalidTarget),
    }
}

/// Hero movement gates: frozen and lifted heroes stay put, and an open
/// dilemma must be answered before walking on.
fn hero_movement_gate(snapshot: &GameSnapshot) -> Option<DenyReason> {
    if snapshot.hero.has_status(StatusKind::Frozen)
        || snapshot.hero.has_status(StatusKind::Lifted)
    {
        return Some(DenyReason::OnCooldown);
    }
    if snapshot.open_choice_episode().is_some() {
        return Some(DenyReason::DecisionPending);
    }
    None
}

fn hero_move(
    snapshot: &mut GameSnapshot,
    rng: &mut GameRng,
    now: EngineTime,
    table: &SkillTable,
    direction: Direction,
) -> ActionOutcome {
    if let Some(reason) = hero_movement_gate(snapshot) {
        return ActionOutcome::denied(reason);
    }
    let from = snapshot.hero.position;
    if !snapshot.maze.can_move(from, direction) {
        return ActionOutcome::denied(DenyReason::Blocked);
    }
    let to = from.step(direction);
    snapshot.hero.relocate(to);
    let mut events = vec![WorldEvent::Moved {
        actor: ClientRole::Hero,
        from,
        to,
    }];
    trigger_trap_if_present(snapshot, rng, now, table, to, &mut events);
    ActionOutcome::Applied { events }
}

fn jump_candidates(
    snapshot: &GameSnapshot,
    from: CellPos,
    direction: Direction,
    table: &SkillTable,
) -> Vec<(CellPos, i32)> {
    (table.jump_min_tiles..=table.jump_max_tiles)
        .map(|distance| (from.step_by(direction, distance), distance))
        .filter(|(pos, _)| snapshot.maze.contains(*pos))
        .collect()
}

fn hero_jump(
    snapshot: &mut GameSnapshot,
    rng: &mut GameRng,
    now: EngineTime,
    table: &SkillTable,
    direction: Direction,
) -> ActionOutcome {
    if let Some(reason) = hero_movement_gate(snapshot) {
        return ActionOutcome::denied(reason);
    }
    let from = snapshot.hero.position;
    let candidates = jump_candidates(snapshot, from, direction, table);
    if candidates.is_empty() {
        return ActionOutcome::denied(DenyReason::InvalidTarget);
    }
    if let Some(pool) = snapshot.hero.pool_mut(SkillKind::Jump) {
        if let Consume::Denied(reason) = pool.try_consume(now) {
            return ActionOutcome::denied(reason);
        }
    }
    let &(to, distance) = match rng.choose(&candidates) {
        Some(candidate) => candidate,
        None => return ActionOutcome::denied(DenyReason::InvalidTarget),
    };
    snapshot.hero.relocate(to);
    let mut events = vec![WorldEvent::Jumped {
        actor: ClientRole::Hero,
        from,
        to,
        distance,
    }];
    trigger_trap_if_present(snapshot, rng, now, table, to, &mut events);
    ActionOutcome::Applied { events }
}

fn shield_on(snapshot: &mut GameSnapshot, now: EngineTime) -> ActionOutcome {
    if snapshot.hero.is_shielded(now) {
        return ActionOutcome::denied(DenyReason::OnCooldown);
    }
    let consume = match snapshot.hero.pool_mut(SkillKind::Shield) {
        Some(pool) => pool.try_consume(now),
        None => Consume::Denied(DenyReason::NoCharge),
    };
    match consume {
        Consume::Granted { effect_until } => {
            let until = effect_until.unwrap_or(now);
            snapshot
                .hero
                .add_status(StatusKind::Shielded, ClientRole::Hero, until);
            ActionOutcome::Applied {
                events: vec![WorldEvent::ShieldRaised { until }],
            }
        }
        Consume::Denied(reason) => ActionOutcome::denied(reason),
    }
}

fn escape_break(snapshot: &mut GameSnapshot, now: EngineTime) -> ActionOutcome {
    let holds: Vec<StatusKind> = [StatusKind::Frozen, StatusKind::Lifted]
        .into_iter()
        .filter(|kind| snapshot.hero.has_status(*kind))
        .collect();
    if holds.is_empty() {
        return ActionOutcome::denied(DenyReason::InvalidTarget);
    }
    let consume = match snapshot.hero.pool_mut(SkillKind::Escape) {
        Some(pool) => pool.try_consume(now),
        None => Consume::Denied(DenyReason::NoCharge),
    };
    if let Consume::Denied(reason) = consume {
        return ActionOutcome::denied(reason);
    }
    for kind in &holds {
        snapshot.hero.clear_status(*kind);
    }
    ActionOutcome::Applied {
        events: vec![WorldEvent::EscapeBroke { cleared: holds }],
    }
}

fn buddy_move(snapshot: &mut GameSnapshot, direction: Direction) -> ActionOutcome {
    let from = snapshot.buddy.position;
    if !snapshot.maze.can_move(from, direction) {
        return ActionOutcome::denied(DenyReason::Blocked);
    }
    let to = from.step(direction);
    snapshot.buddy.relocate(to);
    ActionOutcome::Applied {
        events: vec![WorldEvent::Moved {
            actor: ClientRole::Buddy,
            from,
            to,
        }],
    }
}

fn buddy_jump(
    snapshot: &mut GameSnapshot,
    rng: &mut GameRng,
    now: EngineTime,
    table: &SkillTable,
    direction: Direction,
) -> ActionOutcome {
    let from = snapshot.buddy.position;
    let candidates = jump_candidates(snapshot, from, direction, table);
    if candidates.is_empty() {
        return ActionOutcome::denied(DenyReason::InvalidTarget);
    }
    if let Some(pool) = snapshot.buddy.pool_mut(SkillKind::Jump) {
        if let Consume::Denied(reason) = pool.try_consume(now) {
            return ActionOutcome::denied(reason);
        }
    }
    let &(to, distance) = match rng.choose(&candidates) {
        Some(candidate) => candidate,
        None => return ActionOutcome::denied(DenyReason::InvalidTarget),
    };
    snapshot.buddy.relocate(to);
    ActionOutcome::Applied {
        events: vec![WorldEvent::Jumped {
            actor: ClientRole::Buddy,
            from,
            to,
            distance,
        }],
    }
}

fn freeze_at(
    snapshot: &mut GameSnapshot,
    now: EngineTime,
    table: &SkillTable,
    target: CellPos,
) -> ActionOutcome {
    if target != snapshot.hero.position {
        return ActionOutcome::denied(DenyReason::InvalidTarget);
    }
    if snapshot.hero.has_status(StatusKind::Frozen) {
        return ActionOutcome::denied(DenyReason::OnCooldown);
    }
    let consume = match snapshot.buddy.pool_mut(SkillKind::Freeze) {
        Some(pool) => pool.try_consume(now),
        None => Consume::Denied(DenyReason::NoCharge),
    };
    if let Consume::Denied(reason) = consume {
        return ActionOutcome::denied(reason);
    }
    if snapshot.hero.is_shielded(now) {
        // The charge is spent; the shield eats both the chip damage and
        // the freeze status.
        return ActionOutcome::Applied {
            events: vec![WorldEvent::FreezeAbsorbed],
        };
    }
    snapshot.hero.apply_damage(table.freeze_damage);
    let until = now.plus(table.frozen_ms);
    snapshot
        .hero
        .add_status(StatusKind::Frozen, ClientRole::Buddy, until);
    ActionOutcome::Applied {
        events: vec![WorldEvent::HeroFrozen { until }],
    }
}

fn frontier_open(
    snapshot: &mut GameSnapshot,
    rng: &mut GameRng,
    now: EngineTime,
    table: &SkillTable,
) -> ActionOutcome {
    let buddy_pos = snapshot.buddy.position;
    let mut candidates: Vec<(CellPos, Direction)> = Vec::new();
    for cell in snapshot.maze.cells() {
        if cell.pos.manhattan(buddy_pos) > 2 {
            continue;
        }
        for dir in [Direction::East, Direction::South] {
            if snapshot.maze.contains(cell.pos.step(dir)) && cell.walls.has(dir) {
                candidates.push((cell.pos, dir));
            }
        }
    }
    if candidates.is_empty() {
        return ActionOutcome::denied(DenyReason::InvalidTarget);
    }
    if let Some(pool) = snapshot.buddy.pool_mut(SkillKind::Frontier) {
        if let Consume::Denied(reason) = pool.try_consume(now) {
            return ActionOutcome::denied(reason);
        }
    }
    let mut opened = Vec::new();
    for _ in 0..table.frontier_burst {
        if candidates.is_empty() {
            break;
        }
        let pick = rng.gen_range_usize(0..candidates.len());
        let (pos, dir) = candidates.swap_remove(pick);
        snapshot
            .maze
            .open_wall_until(pos, dir, now.plus(table.frontier_restore_ms));
        opened.push(pos);
    }
    ActionOutcome::Applied {
        events: vec![WorldEvent::WallsBurstOpen { cells: opened }],
    }
}

fn dissolve_at(
    snapshot: &mut GameSnapshot,
    now: EngineTime,
    table: &SkillTable,
    node: CellPos,
) -> ActionOutcome {
    if !snapshot.maze.is_decision_node(node) || snapshot.maze.is_dissolved(node) {
        return ActionOutcome::denied(DenyReason::InvalidTarget);
    }
    if let Some(pool) = snapshot.buddy.pool_mut(SkillKind::Dissolve) {
        if let Consume::Denied(reason) = pool.try_consume(now) {
            return ActionOutcome::denied(reason);
        }
    }
    let restore_at = now.plus(table.dissolve_suppress_ms);
    if snapshot.maze.dissolve_node(node, restore_at).is_err() {
        return ActionOutcome::denied(DenyReason::InvalidTarget);
    }
    ActionOutcome::Applied {
        events: vec![WorldEvent::NodeDissolved { node, restore_at }],
    }
}

fn lift_grab(
    snapshot: &mut GameSnapshot,
    now: EngineTime,
    table: &SkillTable,
    target: CellPos,
) -> ActionOutcome {
    if target != snapshot.hero.position {
        return ActionOutcome::denied(DenyReason::InvalidTarget);
    }
    // Straight-line grabs only, within reach.
    match snapshot.buddy.position.straight_line_distance(target) {
        Some(distance) if distance <= table.lift_reach => {}
        _ => return ActionOutcome::denied(DenyReason::InvalidTarget),
    }
    if snapshot.hero.has_status(StatusKind::Lifted) {
        return ActionOutcome::denied(DenyReason::OnCooldown);
    }
    if let Some(pool) = snapshot.buddy.pool_mut(SkillKind::Lift) {
        if let Consume::Denied(reason) = pool.try_consume(now) {
            return ActionOutcome::denied(reason);
        }
    }
    let until = now.plus(table.lift_hold_ms);
    snapshot
        .hero
        .add_status(StatusKind::Lifted, ClientRole::Buddy, until);
    ActionOutcome::Applied {
        events: vec![WorldEvent::HeroLifted { until }],
    }
}

fn lift_throw(
    snapshot: &mut GameSnapshot,
    rng: &mut GameRng,
    now: EngineTime,
    table: &SkillTable,
    direction: Direction,
) -> ActionOutcome {
    if !snapshot.hero.has_status(StatusKind::Lifted) {
        return ActionOutcome::denied(DenyReason::InvalidTarget);
    }
    let distance = rng.gen_range(table.jump_min_tiles..table.jump_max_tiles + 1);
    let to = snapshot.buddy.position.step_by(direction, distance);
    snapshot.hero.clear_status(StatusKind::Lifted);
    snapshot.hero.relocate(to);

    if snapshot.maze.is_out_of_bounds(to) {
        // Lethal fall: routed to the lifecycle machine by the controller,
        // bypassing the normal health check.
        return ActionOutcome::Applied {
            events: vec![WorldEvent::HeroThrown {
                to,
                fell_out: true,
            }],
        };
    }
    snapshot
        .hero
        .add_status(StatusKind::Tumbling, ClientRole::Buddy, now.plus(table.tumble_ms));
    let mut events = vec![WorldEvent::HeroThrown {
        to,
        fell_out: false,
    }];
    trigger_trap_if_present(snapshot, rng, now, table, to, &mut events);
    ActionOutcome::Applied { events }
}

fn lift_roll(
    snapshot: &mut GameSnapshot,
    rng: &mut GameRng,
    now: EngineTime,
    table: &SkillTable,
    direction: Direction,
) -> ActionOutcome {
    if !snapshot.hero.has_status(StatusKind::Tumbling) {
        return ActionOutcome::denied(DenyReason::InvalidTarget);
    }
    let to = snapshot.hero.position.step(direction);
    snapshot.hero.relocate(to);
    if snapshot.maze.is_out_of_bounds(to) {
        return ActionOutcome::Applied {
            events: vec![WorldEvent::HeroRolled {
                to,
                fell_out: true,
            }],
        };
    }
    let mut events = vec![WorldEvent::HeroRolled {
        to,
        fell_out: false,
    }];
    trigger_trap_if_present(snapshot, rng, now, table, to, &mut events);
    ActionOutcome::Applied { events }
}

fn trap_place(
    snapshot: &mut GameSnapshot,
    now: EngineTime,
    table: &SkillTable,
    kind: TrapKind,
    cell: CellPos,
) -> ActionOutcome {
    if !snapshot.maze.contains(cell) || snapshot.buddy.position.manhattan(cell) > 1 {
        return ActionOutcome::denied(DenyReason::InvalidTarget);
    }
    if let Some(pool) = snapshot.buddy.pool_mut(SkillKind::Trap) {
        if let Consume::Denied(reason) = pool.try_consume(now) {
            return ActionOutcome::denied(reason);
        }
    }
    // One trap per tile; a new placement replaces the old one.
    snapshot.traps.retain(|trap| trap.cell != cell);
    let id = TrapId::derived(snapshot.run.seed, snapshot.run.trap_seq);
    snapshot.run.trap_seq += 1;
    snapshot.traps.push(Trap::new(
        id,
        kind,
        cell,
        now,
        table.trap_reveal_ms,
        table.trap_expire_ms,
    ));
    ActionOutcome::Applied {
        events: vec![WorldEvent::TrapPlaced { kind, cell }],
    }
}

fn blink(
    snapshot: &mut GameSnapshot,
    rng: &mut GameRng,
    now: EngineTime,
    table: &SkillTable,
) -> ActionOutcome {
    let hero_pos = snapshot.hero.position;
    let mut candidates = Vec::new();
    for dx in -table.blink_radius..=table.blink_radius {
        for dy in -table.blink_radius..=table.blink_radius {
            let reach = dx.abs() + dy.abs();
            if reach == 0 || reach > table.blink_radius {
                continue;
            }
            let pos = CellPos::new(hero_pos.x + dx, hero_pos.y + dy);
            if snapshot.maze.contains(pos) {
                candidates.push(pos);
            }
        }
    }
    if candidates.is_empty() {
        return ActionOutcome::denied(DenyReason::InvalidTarget);
    }
    if let Some(pool) = snapshot.buddy.pool_mut(SkillKind::Blink) {
        if let Consume::Denied(reason) = pool.try_consume(now) {
            return ActionOutcome::denied(reason);
        }
    }
    let &to = match rng.choose(&candidates) {
        Some(candidate) => candidate,
        None => return ActionOutcome::denied(DenyReason::InvalidTarget),
    };
    snapshot.buddy.relocate(to);
    ActionOutcome::Applied {
        events: vec![WorldEvent::BuddyBlinked { to }],
    }
}

/// Fire the trap under a landing Hero, if any. The shield absorbs the
/// health change but the trap is still consumed.
fn trigger_trap_if_present(
    snapshot: &mut GameSnapshot,
    rng: &mut GameRng,
    now: EngineTime,
    table: &SkillTable,
    cell: CellPos,
    events: &mut Vec<WorldEvent>,
) {
    let Some(index) = snapshot
        .traps
        .iter()
        .position(|trap| trap.cell == cell && !trap.is_expired(now))
    else {
        return;
    };
    let trap = snapshot.traps.remove(index);

    let primary = rng.gen_bool(table.trap_primary_chance);
    let effect = match (trap.kind, primary) {
        (TrapKind::Mine, true) | (TrapKind::Medkit, false) => TrapEffect::Damage,
        (TrapKind::Mine, false) | (TrapKind::Medkit, true) => TrapEffect::Heal,
    };
    let amount = match effect {
        TrapEffect::Damage => table.trap_damage,
        TrapEffect::Heal => table.trap_heal,
    };
    let shield_absorbed = snapshot.hero.is_shielded(now);
    if !shield_absorbed {
        match effect {
            TrapEffect::Damage => snapshot.hero.apply_damage(amount),
            TrapEffect::Heal => snapshot.hero.apply_heal(amount),
        };
    }
    events.push(WorldEvent::TrapTriggered {
        kind: trap.kind,
        effect,
        amount,
        hero_health: snapshot.hero.health,
        shield_absorbed,
    });
}
