//! Maze topology - grid, walls, decision nodes, and the mutation schedule
//!
//! The maze is carved once per run with a DFS backtracker, then mutates on
//! an interval: walls vanish (opening passages), vanished walls regrow, and
//! decision nodes occasionally drift. Regrowing is the dangerous half; a
//! closure candidate that would disconnect the Hero from the exit or from
//! any unresolved decision node is excluded before selection, never chosen
//! and rolled back.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::domain::rng::GameRng;
use crate::domain::value_objects::{CellPos, Direction, EngineTime};

/// Grid bounds accepted by the generator; anything outside falls back to
/// the minimal grid instead of crashing the run.
const MIN_DIMENSION: i32 = 2;
const MAX_DIMENSION: i32 = 128;
const FALLBACK_WIDTH: i32 = 4;
const FALLBACK_HEIGHT: i32 = 4;
const FALLBACK_SEED: u64 = 1;

/// Minimum number of decision nodes in a generated maze.
const MIN_DECISION_NODES: usize = 5;
/// Chance a 3+-opening cell is marked as a decision node.
const DECISION_NODE_CHANCE: f64 = 0.3;

/// Wall presence per direction for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Walls {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl Default for Walls {
    fn default() -> Self {
        Self::closed()
    }
}

impl Walls {
    pub fn closed() -> Self {
        Self {
            north: true,
            south: true,
            east: true,
            west: true,
        }
    }

    pub fn has(&self, direction: Direction) -> bool {
        match direction {
            Direction::North => self.north,
            Direction::South => self.south,
            Direction::East => self.east,
            Direction::West => self.west,
        }
    }

    pub fn set(&mut self, direction: Direction, present: bool) {
        match direction {
            Direction::North => self.north = present,
            Direction::South => self.south = present,
            Direction::East => self.east = present,
            Direction::West => self.west = present,
        }
    }

    pub fn open_count(&self) -> usize {
        Direction::ALL.iter().filter(|d| !self.has(**d)).count()
    }
}

/// One cell of the maze grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeCell {
    pub pos: CellPos,
    pub walls: Walls,
    pub decision_node: bool,
}

/// A wall opened by mutation (or a Frontier burst), scheduled to regrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VanishedWall {
    pub pos: CellPos,
    pub direction: Direction,
    pub regrow_at: EngineTime,
}

/// A decision node temporarily suppressed by the Buddy's Dissolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DissolvedNode {
    pub pos: CellPos,
    pub restore_at: EngineTime,
}

/// Mutation schedule knobs; part of the engine configuration bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationConfig {
    pub interval_ms: u64,
    /// Walls opened per mutation cycle.
    pub max_vanish: usize,
    /// Open edges closed per mutation cycle (beyond scheduled regrows).
    pub max_close: usize,
    pub regrow_after_ms: u64,
    /// Chance per cycle that one unresolved decision node drifts.
    pub drift_chance: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            max_vanish: 2,
            max_close: 1,
            regrow_after_ms: 20_000,
            drift_chance: 0.15,
        }
    }
}

/// What a mutation cycle changed, for logs and client deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MutationEvent {
    WallOpened { pos: CellPos, direction: Direction },
    WallClosed { pos: CellPos, direction: Direction },
    NodeDrifted { from: CellPos, to: CellPos },
    NodeRestored { pos: CellPos },
}

/// Refusal raised when a requested topology change would break the
/// connectivity invariant. Treated as an internal fatal condition by
/// callers that believe the change is safe.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MazeError {
    #[error("closing wall {direction} of {pos} would disconnect a required cell")]
    WouldDisconnect { pos: CellPos, direction: Direction },
    #[error("{pos} is not inside the maze")]
    OutOfBounds { pos: CellPos },
}

/// The maze grid plus its mutation bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MazeTopology {
    width: i32,
    height: i32,
    seed: u64,
    /// Row-major cell storage.
    grid: Vec<MazeCell>,
    start: CellPos,
    exit: CellPos,
    #[serde(default)]
    vanished: Vec<VanishedWall>,
    #[serde(default)]
    dissolved: Vec<DissolvedNode>,
    #[serde(default)]
    next_mutation_at: EngineTime,
}

impl MazeTopology {
    /// Carve a maze deterministically from `seed`. Malformed dimensions
    /// yield the fixed minimal fallback grid rather than failing the run.
    pub fn generate(seed: u64, width: i32, height: i32) -> Self {
        if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&width)
            || !(MIN_DIMENSION..=MAX_DIMENSION).contains(&height)
        {
            tracing::warn!(
                width,
                height,
                "rejected maze dimensions, using fallback grid"
            );
            return Self::generate(FALLBACK_SEED, FALLBACK_WIDTH, FALLBACK_HEIGHT);
        }

        let mut rng = GameRng::new(seed);
        let mut grid: Vec<MazeCell> = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                grid.push(MazeCell {
                    pos: CellPos::new(x, y),
                    walls: Walls::closed(),
                    decision_node: false,
                });
            }
        }

        let mut maze = Self {
            width,
            height,
            seed,
            grid,
            start: CellPos::new(0, 0),
            exit: CellPos::new(width - 1, height - 1),
            vanished: Vec::new(),
            dissolved: Vec::new(),
            next_mutation_at: EngineTime::ZERO,
        };

        maze.carve(&mut rng);
        maze.mark_decision_nodes(&mut rng);
        maze
    }

    /// DFS backtracker over the closed grid.
    fn carve(&mut self, rng: &mut GameRng) {
        let mut visited = vec![false; self.grid.len()];
        let mut stack = vec![self.start];
        visited[self.index_of(self.start).unwrap_or(0)] = true;

        while let Some(&current) = stack.last() {
            let mut unvisited: Vec<Direction> = Direction::ALL
                .into_iter()
                .filter(|dir| {
                    self.index_of(current.step(*dir))
                        .map(|idx| !visited[idx])
                        .unwrap_or(false)
                })
                .collect();

            if unvisited.is_empty() {
                stack.pop();
                continue;
            }

            // Stable pick order: the candidate list is built in ALL order,
            // so the same seed always carves the same maze.
            let pick = rng.gen_range_usize(0..unvisited.len());
            let direction = unvisited.swap_remove(pick);
            let next = current.step(direction);
            self.set_wall(current, direction, false);
            if let Some(idx) = self.index_of(next) {
                visited[idx] = true;
            }
            stack.push(next);
        }
    }

    /// Mark branch cells as decision nodes, then back-fill to the minimum.
    fn mark_decision_nodes(&mut self, rng: &mut GameRng) {
        let mut marked = 0usize;
        for idx in 0..self.grid.len() {
            if self.grid[idx].walls.open_count() >= 3 && rng.gen_bool(DECISION_NODE_CHANCE) {
                self.grid[idx].decision_node = true;
                marked += 1;
            }
        }

        if marked < MIN_DECISION_NODES {
            let mut candidates: Vec<usize> = (0..self.grid.len())
                .filter(|&idx| {
                    !self.grid[idx].decision_node && self.grid[idx].walls.open_count() >= 2
                })
                .collect();
            rng.shuffle(&mut candidates);
            for idx in candidates.into_iter().take(MIN_DECISION_NODES - marked) {
                self.grid[idx].decision_node = true;
            }
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn start(&self) -> CellPos {
        self.start
    }

    pub fn exit(&self) -> CellPos {
        self.exit
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        (0..self.width).contains(&pos.x) && (0..self.height).contains(&pos.y)
    }

    /// Lethal-fall detection for the lift/throw mechanic.
    pub fn is_out_of_bounds(&self, pos: CellPos) -> bool {
        !self.contains(pos)
    }

    fn index_of(&self, pos: CellPos) -> Option<usize> {
        if self.contains(pos) {
            Some((pos.y * self.width + pos.x) as usize)
        } else {
            None
        }
    }

    pub fn cell(&self, pos: CellPos) -> Option<&MazeCell> {
        self.index_of(pos).map(|idx| &self.grid[idx])
    }

    pub fn cells(&self) -> impl Iterator<Item = &MazeCell> {
        self.grid.iter()
    }

    /// All decision-node cells, whether or not currently suppressed.
    pub fn decision_nodes(&self) -> impl Iterator<Item = &MazeCell> {
        self.grid.iter().filter(|cell| cell.decision_node)
    }

    pub fn is_decision_node(&self, pos: CellPos) -> bool {
        self.cell(pos).is_some_and(|cell| cell.decision_node)
    }

    pub fn is_dissolved(&self, pos: CellPos) -> bool {
        self.dissolved.iter().any(|node| node.pos == pos)
    }

    pub fn dissolved_nodes(&self) -> &[DissolvedNode] {
        &self.dissolved
    }

    /// Suppress a decision node until `restore_at`.
    pub fn dissolve_node(&mut self, pos: CellPos, restore_at: EngineTime) -> Result<(), MazeError> {
        if !self.is_decision_node(pos) {
            return Err(MazeError::OutOfBounds { pos });
        }
        if !self.is_dissolved(pos) {
            self.dissolved.push(DissolvedNode { pos, restore_at });
        }
        Ok(())
    }

    /// Whether a step from `pos` toward `direction` is passable.
    pub fn can_move(&self, pos: CellPos, direction: Direction) -> bool {
        let target = pos.step(direction);
        self.contains(target)
            && self
                .cell(pos)
                .is_some_and(|cell| !cell.walls.has(direction))
    }

    /// Set both sides of a wall.
    fn set_wall(&mut self, pos: CellPos, direction: Direction, present: bool) {
        if let Some(idx) = self.index_of(pos) {
            self.grid[idx].walls.set(direction, present);
        }
        let neighbor = pos.step(direction);
        if let Some(idx) = self.index_of(neighbor) {
            self.grid[idx].walls.set(direction.opposite(), present);
        }
    }

    /// Open a wall and schedule its regrowth. Used by mutation and by the
    /// Buddy's Frontier burst.
    pub fn open_wall_until(&mut self, pos: CellPos, direction: Direction, regrow_at: EngineTime) {
        self.set_wall(pos, direction, false);
        self.vanished.push(VanishedWall {
            pos,
            direction,
            regrow_at,
        });
    }

    /// Close a wall, refusing if that would break the connectivity
    /// invariant for `hero` and `required` cells.
    pub fn try_close_wall(
        &mut self,
        pos: CellPos,
        direction: Direction,
        hero: CellPos,
        required: &[CellPos],
    ) -> Result<(), MazeError> {
        self.set_wall(pos, direction, true);
        if self.invariant_holds(hero, required) {
            Ok(())
        } else {
            self.set_wall(pos, direction, false);
            Err(MazeError::WouldDisconnect { pos, direction })
        }
    }

    /// Every cell reachable from `from` through open walls.
    pub fn connected_set(&self, from: CellPos) -> BTreeSet<CellPos> {
        let mut seen = BTreeSet::new();
        if !self.contains(from) {
            return seen;
        }
        let mut queue = VecDeque::from([from]);
        seen.insert(from);
        while let Some(pos) = queue.pop_front() {
            for dir in Direction::ALL {
                if self.can_move(pos, dir) {
                    let next = pos.step(dir);
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }

    /// The connectivity invariant: the Hero's cell reaches the exit and
    /// every required (unresolved decision node) cell.
    pub fn invariant_holds(&self, hero: CellPos, required: &[CellPos]) -> bool {
        let reachable = self.connected_set(hero);
        reachable.contains(&self.exit) && required.iter().all(|pos| reachable.contains(pos))
    }

    /// BFS shortest path, used to rank closure candidates.
    pub fn shortest_path(&self, from: CellPos, to: CellPos) -> Option<Vec<CellPos>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        let mut parents: HashMap<CellPos, CellPos> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        let mut seen = BTreeSet::from([from]);
        while let Some(pos) = queue.pop_front() {
            if pos == to {
                let mut path = vec![to];
                let mut cursor = to;
                while let Some(&parent) = parents.get(&cursor) {
                    path.push(parent);
                    cursor = parent;
                }
                path.reverse();
                return Some(path);
            }
            for dir in Direction::ALL {
                if self.can_move(pos, dir) {
                    let next = pos.step(dir);
                    if seen.insert(next) {
                        parents.insert(next, pos);
                        queue.push_back(next);
                    }
                }
            }
        }
        None
    }

    /// Advance the mutation schedule to `now`.
    ///
    /// Dissolved-node restores happen at their own timestamps; the
    /// vanish/regrow/drift cycle only runs when the mutation interval has
    /// elapsed. `required` lists the unresolved decision-node cells the
    /// invariant must keep reachable.
    pub fn mutate(
        &mut self,
        now: EngineTime,
        hero: CellPos,
        required: &[CellPos],
        rng: &mut GameRng,
        config: &MutationConfig,
    ) -> Vec<MutationEvent> {
        let mut events = Vec::new();

        let due: Vec<DissolvedNode> = self
            .dissolved
            .iter()
            .copied()
            .filter(|node| node.restore_at <= now)
            .collect();
        if !due.is_empty() {
            self.dissolved.retain(|node| node.restore_at > now);
            for node in due {
                events.push(MutationEvent::NodeRestored { pos: node.pos });
            }
        }

        if now < self.next_mutation_at {
            return events;
        }
        self.next_mutation_at = now.plus(config.interval_ms);

        self.regrow_due_walls(now, hero, required, &mut events);
        self.vanish_walls(now, rng, config, &mut events);
        self.close_walls(hero, required, rng, config, &mut events);
        if rng.gen_bool(config.drift_chance) {
            self.drift_node(hero, required, rng, &mut events);
        }

        events
    }

    /// Regrow vanished walls whose timer elapsed; closures that would break
    /// the invariant are deferred, not dropped.
    fn regrow_due_walls(
        &mut self,
        now: EngineTime,
        hero: CellPos,
        required: &[CellPos],
        events: &mut Vec<MutationEvent>,
    ) {
        let mut pending = std::mem::take(&mut self.vanished);
        for wall in pending.iter_mut() {
            if wall.regrow_at > now {
                continue;
            }
            match self.try_close_wall(wall.pos, wall.direction, hero, required) {
                Ok(()) => {
                    events.push(MutationEvent::WallClosed {
                        pos: wall.pos,
                        direction: wall.direction,
                    });
                    // Mark handled; filtered out below.
                    wall.regrow_at = EngineTime::ZERO;
                }
                Err(_) => {
                    // Deferred: the passage is load-bearing right now.
                    wall.regrow_at = now.plus(self.regrow_defer_ms());
                }
            }
        }
        pending.retain(|wall| wall.regrow_at != EngineTime::ZERO);
        self.vanished = pending;
    }

    fn regrow_defer_ms(&self) -> u64 {
        5_000
    }

    /// Unique interior edges, enumerated east/south so each wall appears once.
    fn interior_edges(&self, present: bool) -> Vec<(CellPos, Direction)> {
        let mut edges = Vec::new();
        for cell in &self.grid {
            for dir in [Direction::East, Direction::South] {
                if self.contains(cell.pos.step(dir)) && cell.walls.has(dir) == present {
                    edges.push((cell.pos, dir));
                }
            }
        }
        edges
    }

    /// Open up to `max_vanish` walls; opening a passage can only add edges
    /// to the connectivity graph, so no invariant check is needed.
    fn vanish_walls(
        &mut self,
        now: EngineTime,
        rng: &mut GameRng,
        config: &MutationConfig,
        events: &mut Vec<MutationEvent>,
    ) {
        for _ in 0..config.max_vanish {
            let candidates = self.interior_edges(true);
            if candidates.is_empty() {
                return;
            }
            let &(pos, direction) = match rng.choose(&candidates) {
                Some(edge) => edge,
                None => return,
            };
            self.open_wall_until(pos, direction, now.plus(config.regrow_after_ms));
            events.push(MutationEvent::WallOpened { pos, direction });
        }
    }

    /// Close up to `max_close` open edges. Candidates violating the
    /// invariant are excluded up front; survivors are ranked by a cost that
    /// penalizes edges on the Hero's path to the nearest unresolved
    /// decision node, and the pick is random among the cheapest.
    fn close_walls(
        &mut self,
        hero: CellPos,
        required: &[CellPos],
        rng: &mut GameRng,
        config: &MutationConfig,
        events: &mut Vec<MutationEvent>,
    ) {
        for _ in 0..config.max_close {
            let penalized = self.hot_path_edges(hero, required);
            let mut candidates: Vec<(CellPos, Direction, u32)> = Vec::new();
            for (pos, direction) in self.interior_edges(false) {
                // Exclusion before selection: tentatively close and check.
                self.set_wall(pos, direction, true);
                let safe = self.invariant_holds(hero, required);
                self.set_wall(pos, direction, false);
                if !safe {
                    continue;
                }
                let cost = if penalized.contains(&edge_key(pos, direction)) {
                    10
                } else {
                    0
                };
                candidates.push((pos, direction, cost));
            }
            let Some(min_cost) = candidates.iter().map(|c| c.2).min() else {
                return;
            };
            let cheapest: Vec<(CellPos, Direction)> = candidates
                .into_iter()
                .filter(|c| c.2 == min_cost)
                .map(|c| (c.0, c.1))
                .collect();
            let &(pos, direction) = match rng.choose(&cheapest) {
                Some(edge) => edge,
                None => return,
            };
            self.set_wall(pos, direction, true);
            // Also drop it from the vanished list if it was an opened wall.
            self.vanished
                .retain(|wall| edge_key(wall.pos, wall.direction) != edge_key(pos, direction));
            events.push(MutationEvent::WallClosed { pos, direction });
        }
    }

    /// Edges on the shortest path from the Hero to the nearest unresolved
    /// decision node.
    fn hot_path_edges(&self, hero: CellPos, required: &[CellPos]) -> BTreeSet<(CellPos, CellPos)> {
        let mut edges = BTreeSet::new();
        let nearest = required
            .iter()
            .filter_map(|&node| self.shortest_path(hero, node).map(|p| (node, p.len())))
            .min_by_key(|(_, len)| *len)
            .map(|(node, _)| node);
        if let Some(node) = nearest {
            if let Some(path) = self.shortest_path(hero, node) {
                for pair in path.windows(2) {
                    edges.insert(normalize_edge(pair[0], pair[1]));
                }
            }
        }
        edges
    }

    /// Move one unresolved decision node to an adjacent reachable cell.
    fn drift_node(
        &mut self,
        hero: CellPos,
        required: &[CellPos],
        rng: &mut GameRng,
        events: &mut Vec<MutationEvent>,
    ) {
        let candidates: Vec<CellPos> = required
            .iter()
            .copied()
            .filter(|pos| self.is_decision_node(*pos) && !self.is_dissolved(*pos))
            .collect();
        let Some(&from) = rng.choose(&candidates) else {
            return;
        };
        let reachable = self.connected_set(hero);
        let targets: Vec<CellPos> = Direction::ALL
            .into_iter()
            .map(|dir| from.step(dir))
            .filter(|pos| {
                self.contains(*pos) && !self.is_decision_node(*pos) && reachable.contains(pos)
            })
            .collect();
        let Some(&to) = rng.choose(&targets) else {
            return;
        };
        if let Some(idx) = self.index_of(from) {
            self.grid[idx].decision_node = false;
        }
        if let Some(idx) = self.index_of(to) {
            self.grid[idx].decision_node = true;
        }
        events.push(MutationEvent::NodeDrifted { from, to });
    }

    /// Renderer-friendly boolean grid of size `(2w+1) x (2h+1)`, `true`
    /// where a wall stands.
    pub fn wall_grid(&self) -> (Vec<Vec<bool>>, (usize, usize)) {
        let grid_w = (self.width * 2 + 1) as usize;
        let grid_h = (self.height * 2 + 1) as usize;
        let mut walls = vec![vec![true; grid_h]; grid_w];

        for cell in &self.grid {
            let px = (2 * cell.pos.x + 1) as usize;
            let py = (2 * cell.pos.y + 1) as usize;
            walls[px][py] = false;
            if !cell.walls.north {
                walls[px][py - 1] = false;
            }
            if !cell.walls.south {
                walls[px][py + 1] = false;
            }
            if !cell.walls.west {
                walls[px - 1][py] = false;
            }
            if !cell.walls.east {
                walls[px + 1][py] = false;
            }
        }

        (walls, (grid_w, grid_h))
    }
}

fn normalize_edge(a: CellPos, b: CellPos) -> (CellPos, CellPos) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn edge_key(pos: CellPos, direction: Direction) -> (CellPos, CellPos) {
    normalize_edge(pos, pos.step(direction))
}
