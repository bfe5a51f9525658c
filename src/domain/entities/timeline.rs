//! The run timeline - append-only history for the end-of-run recap
//!
//! Owned exclusively by the progression machine. Entries are captured data,
//! never references into live state, and are immutable once appended.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::progression::DeathCause;
use crate::domain::value_objects::{CellPos, EngineTime, EpisodeId, GrowthTraits, Stage};

/// Terminal lifecycle happenings recorded for the recap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    GoalReached { age: u32 },
    Died { cause: DeathCause },
}

/// A resolved dilemma, captured at resolution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode_id: EpisodeId,
    pub node: CellPos,
    pub prompt: String,
    pub options: Vec<String>,
    pub chosen_index: usize,
    pub chosen_text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub growth_delta: i32,
    #[serde(default)]
    pub value_delta: GrowthTraits,
    /// Multi-voice AI feedback, captured verbatim.
    #[serde(default)]
    pub voices: BTreeMap<String, String>,
    pub age_at_decision: u32,
    pub stage_at_decision: Stage,
    pub at: EngineTime,
}

/// A lifecycle transition, captured when it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub event: LifecycleEvent,
    pub age: u32,
    pub at: EngineTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEntry {
    Episode(EpisodeRecord),
    Lifecycle(LifecycleRecord),
}

/// Append-only ordered history of the run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_episode(&mut self, record: EpisodeRecord) {
        self.entries.push(TimelineEntry::Episode(record));
    }

    pub fn push_lifecycle(&mut self, record: LifecycleRecord) {
        self.entries.push(TimelineEntry::Lifecycle(record));
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn episodes(&self) -> impl Iterator<Item = &EpisodeRecord> {
        self.entries.iter().filter_map(|entry| match entry {
            TimelineEntry::Episode(record) => Some(record),
            TimelineEntry::Lifecycle(_) => None,
        })
    }

    /// Whether an episode id is already recorded; used to guard against a
    /// double append on repeated submissions.
    pub fn contains_episode(&self, id: EpisodeId) -> bool {
        self.episodes().any(|record| record.episode_id == id)
    }

    /// All tags from resolved dilemmas, oldest first; fed back into the
    /// generation context so the AI avoids repeating themes.
    pub fn history_tags(&self) -> Vec<String> {
        self.episodes()
            .flat_map(|record| record.tags.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(counter: u64) -> EpisodeRecord {
        EpisodeRecord {
            episode_id: EpisodeId::derived(9, counter),
            node: CellPos::new(1, 1),
            prompt: "p".into(),
            options: vec!["a".into(), "b".into()],
            chosen_index: 0,
            chosen_text: "a".into(),
            tags: vec!["honesty".into()],
            growth_delta: 3,
            value_delta: GrowthTraits::default(),
            voices: BTreeMap::new(),
            age_at_decision: 12,
            stage_at_decision: Stage::Preteen,
            at: EngineTime::from_millis(100),
        }
    }

    #[test]
    fn test_append_and_guard() {
        let mut timeline = Timeline::new();
        timeline.push_episode(record(0));
        assert_eq!(timeline.len(), 1);
        assert!(timeline.contains_episode(EpisodeId::derived(9, 0)));
        assert!(!timeline.contains_episode(EpisodeId::derived(9, 1)));
    }

    #[test]
    fn test_order_preserved() {
        let mut timeline = Timeline::new();
        timeline.push_episode(record(0));
        timeline.push_lifecycle(LifecycleRecord {
            event: LifecycleEvent::GoalReached { age: 90 },
            age: 90,
            at: EngineTime::from_millis(500),
        });
        assert!(matches!(timeline.entries()[0], TimelineEntry::Episode(_)));
        assert!(matches!(
            timeline.entries()[1],
            TimelineEntry::Lifecycle(_)
        ));
    }
}
