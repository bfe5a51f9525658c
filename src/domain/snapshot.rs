//! GameSnapshot - the complete serializable game state
//!
//! The snapshot is the only object shared outward: the persistence adapter
//! round-trips it, and the client boundary publishes an immutable copy at
//! the end of every tick. The game controller is its sole writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Buddy, DilemmaEpisode, Hero, Timeline, Trap};
use crate::domain::maze::MazeTopology;
use crate::domain::progression::{Lifecycle, Progression};
use crate::domain::rng::GameRngState;
use crate::domain::value_objects::{CellPos, EngineTime, EpisodeId, RunId};

/// Run identity and clock state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: RunId,
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    /// Tick counter, also the snapshot's publication key.
    #[serde(default)]
    pub tick: u64,
    /// Engine clock at the end of the last tick.
    #[serde(default)]
    pub now: EngineTime,
    pub lifecycle: Lifecycle,
    /// Per-run counters backing derived (replay-stable) episode/trap ids.
    #[serde(default)]
    pub episode_seq: u64,
    #[serde(default)]
    pub trap_seq: u64,
}

/// The full authoritative state of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub run: RunMetadata,
    pub maze: MazeTopology,
    pub hero: Hero,
    pub buddy: Buddy,
    #[serde(default)]
    pub traps: Vec<Trap>,
    #[serde(default)]
    pub episodes: Vec<DilemmaEpisode>,
    #[serde(default)]
    pub timeline: Timeline,
    pub progression: Progression,
    #[serde(default)]
    pub rng_state: GameRngState,
    /// Narrative recap, set on terminal transition (local fallback first,
    /// replaced by the AI boundary's summary if one arrives).
    #[serde(default)]
    pub life_summary: Option<String>,
}

impl GameSnapshot {
    /// Decision-node cells with no settled or open episode suppression:
    /// the cells the connectivity invariant must keep reachable.
    pub fn unresolved_decision_nodes(&self) -> Vec<CellPos> {
        self.maze
            .decision_nodes()
            .map(|cell| cell.pos)
            .filter(|pos| !self.maze.is_dissolved(*pos))
            .filter(|pos| {
                !self
                    .episodes
                    .iter()
                    .any(|episode| episode.node == *pos && episode.is_settled())
            })
            .collect()
    }

    /// Whether `node` can trigger a new episode right now.
    pub fn node_can_trigger(&self, node: CellPos) -> bool {
        self.maze.is_decision_node(node)
            && !self.maze.is_dissolved(node)
            && !self
                .episodes
                .iter()
                .any(|episode| episode.node == node && (episode.is_settled() || episode.is_open()))
    }

    pub fn episode(&self, id: EpisodeId) -> Option<&DilemmaEpisode> {
        self.episodes.iter().find(|episode| episode.id == id)
    }

    pub fn episode_mut(&mut self, id: EpisodeId) -> Option<&mut DilemmaEpisode> {
        self.episodes.iter_mut().find(|episode| episode.id == id)
    }

    /// The episode currently awaiting the Hero's answer, if any.
    pub fn open_choice_episode(&self) -> Option<&DilemmaEpisode> {
        self.episodes.iter().find(|episode| {
            episode.state == crate::domain::entities::EpisodeState::AwaitingChoice
        })
    }

    pub fn trap_at(&self, cell: CellPos) -> Option<&Trap> {
        self.traps.iter().find(|trap| trap.cell == cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{EngineTime, SkillTable};

    pub(crate) fn sample_snapshot(seed: u64) -> GameSnapshot {
        let table = SkillTable::default();
        let maze = MazeTopology::generate(seed, 12, 9);
        let start = maze.start();
        let buddy_start = CellPos::new((start.x + 1).min(maze.width() - 1), start.y);
        GameSnapshot {
            run: RunMetadata {
                run_id: RunId::derived(seed, 0),
                seed,
                started_at: DateTime::<Utc>::UNIX_EPOCH,
                tick: 0,
                now: EngineTime::ZERO,
                lifecycle: Lifecycle::Active,
                episode_seq: 0,
                trap_seq: 0,
            },
            hero: Hero::new(start, 10, &table, EngineTime::ZERO),
            buddy: Buddy::new(buddy_start, &table, EngineTime::ZERO),
            maze,
            traps: Vec::new(),
            episodes: Vec::new(),
            timeline: Timeline::new(),
            progression: Progression::new(10, 90, 1.0),
            rng_state: GameRngState::default(),
            life_summary: None,
        }
    }

    #[test]
    fn test_unresolved_nodes_track_episodes() {
        let mut snapshot = sample_snapshot(77);
        let node = snapshot
            .maze
            .decision_nodes()
            .next()
            .expect("decision node")
            .pos;
        let before = snapshot.unresolved_decision_nodes();
        assert!(before.contains(&node));
        assert!(snapshot.node_can_trigger(node));

        let mut episode =
            DilemmaEpisode::open(EpisodeId::derived(77, 0), node, EngineTime::ZERO);
        episode.begin_generation();
        episode.expire();
        snapshot.episodes.push(episode);

        assert!(!snapshot.unresolved_decision_nodes().contains(&node));
        assert!(!snapshot.node_can_trigger(node));
    }

    #[test]
    fn test_serde_round_trip_is_exact() {
        let snapshot = sample_snapshot(20251103);
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: GameSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, back);
    }
}
