//! Persistence of the engine state between runs.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::quality::QualityState;

const DEFAULT_STATE_DIR: &str = ".pattern-qa";
const STATE_FILE: &str = "state.json";

#[derive(Debug, thiserror::Error)]
pub enum StateFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid state file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Trait abstracting how engine state is persisted.
pub trait StateStore {
    /// The saved state, or `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<QualityState>, StateFileError>;
    fn save(&self, state: &QualityState) -> Result<PathBuf, StateFileError>;
    fn exists(&self) -> bool;
}

/// Filesystem-backed store writing `<dir>/state.json`.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `PATTERN_QA_STATE_DIR` if set, otherwise `.pattern-qa`.
    pub fn from_env() -> Self {
        match env::var("PATTERN_QA_STATE_DIR") {
            Ok(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::new(DEFAULT_STATE_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }
}

impl Default for FileStateStore {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_DIR)
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<Option<QualityState>, StateFileError> {
        let path = self.path();
        if !path.is_file() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| StateFileError::Json { path, source })
    }

    /// Write via a temp file in the same directory, then rename over the
    /// old state.
    fn save(&self, state: &QualityState) -> Result<PathBuf, StateFileError> {
        let path = self.path();
        let json = serde_json::to_string_pretty(state).map_err(|source| StateFileError::Json {
            path: path.clone(),
            source,
        })?;

        fs::create_dir_all(&self.dir)?;
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(json.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|e| e.error)?;

        debug!("Saved state to {}", path.display());
        Ok(path)
    }

    fn exists(&self) -> bool {
        self.path().is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{AssessmentInput, QualityEngine};
    use crate::test_utils::suite_with_scores;

    #[test]
    fn missing_state_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state"));
        assert!(!store.exists());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state"));

        let mut engine = QualityEngine::default();
        engine.assess_pattern_quality(AssessmentInput::new("p", suite_with_scores("p", 88.0)));
        let state = engine.export_quality_data();

        let path = store.save(&state).unwrap();
        assert_eq!(path, dir.path().join("state").join("state.json"));
        assert_eq!(store.load().unwrap(), Some(state));

        // no stray temp files left behind
        let entries = fs::read_dir(store.dir()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn corrupt_state_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(StateFileError::Json { .. })));
    }
}
