//! Snapshot serialization and the on-disk save artifact
//!
//! `load(save(snapshot))` reproduces every field exactly; unknown fields in
//! a save are ignored and missing optional fields take their defaults, so
//! older artifacts keep loading. Corrupt data fails closed: the error is
//! reported and no partial state ever escapes.

use std::fs;
use std::path::Path;

use crate::domain::snapshot::GameSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// The artifact cannot be understood; a fresh run must be offered.
    #[error("save artifact is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("save I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize a snapshot to the save wire format.
pub fn save(snapshot: &GameSnapshot) -> Result<Vec<u8>, SaveError> {
    Ok(serde_json::to_vec_pretty(snapshot)?)
}

/// Deserialize a snapshot, failing closed on any corruption.
pub fn load(bytes: &[u8]) -> Result<GameSnapshot, SaveError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write the artifact atomically: a temp file next to the target, then a
/// rename, so a crash mid-write never leaves a torn save.
pub fn save_to_path(path: &Path, snapshot: &GameSnapshot) -> Result<(), SaveError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = save(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<GameSnapshot, SaveError> {
    let bytes = fs::read(path)?;
    load(&bytes)
}

pub fn has_save(path: &Path) -> bool {
    path.exists()
}

pub fn delete_save(path: &Path) -> Result<(), SaveError> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Buddy, Hero, Timeline};
    use crate::domain::maze::MazeTopology;
    use crate::domain::progression::{Lifecycle, Progression};
    use crate::domain::rng::GameRngState;
    use crate::domain::snapshot::RunMetadata;
    use crate::domain::value_objects::{CellPos, EngineTime, RunId, SkillTable};
    use chrono::{DateTime, Utc};

    fn snapshot(seed: u64) -> GameSnapshot {
        let table = SkillTable::default();
        let maze = MazeTopology::generate(seed, 10, 8);
        let start = maze.start();
        GameSnapshot {
            run: RunMetadata {
                run_id: RunId::derived(seed, 0),
                seed,
                started_at: DateTime::<Utc>::UNIX_EPOCH,
                tick: 42,
                now: EngineTime::from_millis(4_200),
                lifecycle: Lifecycle::Active,
                episode_seq: 2,
                trap_seq: 1,
            },
            hero: Hero::new(start, 10, &table, EngineTime::ZERO),
            buddy: Buddy::new(CellPos::new(1, 0), &table, EngineTime::ZERO),
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
    fn test_round_trip_reproduces_every_field() {
        let original = snapshot(20251103);
        let bytes = save(&original).unwrap();
        let restored = load(&bytes).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_corrupt_artifact_fails_closed() {
        let result = load(b"{\"run\": \"not a run\"");
        assert!(matches!(result, Err(SaveError::Corrupt(_))));
    }

    #[test]
    fn test_missing_optional_fields_take_defaults() {
        let original = snapshot(7);
        let mut value: serde_json::Value =
            serde_json::from_slice(&save(&original).unwrap()).unwrap();
        let object = value.as_object_mut().unwrap();
        object.remove("traps");
        object.remove("episodes");
        object.remove("life_summary");

        let restored = load(serde_json::to_vec(&value).unwrap().as_slice())
            .expect("missing optional fields default, not fail");
        assert!(restored.traps.is_empty());
        assert!(restored.episodes.is_empty());
        assert!(restored.life_summary.is_none());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let original = snapshot(9);
        let mut value: serde_json::Value =
            serde_json::from_slice(&save(&original).unwrap()).unwrap();
        value
            .as_object_mut()
            .unwrap()
            .insert("from_the_future".to_string(), serde_json::json!(true));

        let restored = load(serde_json::to_vec(&value).unwrap().as_slice()).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_path_round_trip() {
        let dir = std::env::temp_dir().join(format!("moralmaze-save-test-{}", std::process::id()));
        let path = dir.join("profile.json");
        let original = snapshot(11);

        save_to_path(&path, &original).unwrap();
        assert!(has_save(&path));
        let restored = load_from_path(&path).unwrap();
        assert_eq!(original, restored);

        delete_save(&path).unwrap();
        assert!(!has_save(&path));
        let _ = fs::remove_dir_all(&dir);
    }
}
