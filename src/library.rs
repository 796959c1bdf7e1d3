//! Pattern library access.
//!
//! A library on disk is a directory of patterns:
//!
//! ```text
//! <root>/<name>/system.md      pattern instructions
//! <root>/<name>/samples.json   [{"id": .., "content": ..}, ...]
//! <root>/<name>/samples/*.md   one sample per file (used when samples.json is absent)
//! <root>/<name>/usage.json     {"user_rating": 4.5, "usage_count": 120}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::models::{PatternArtifact, SampleInput, UsageMetrics};

const PATTERN_FILE: &str = "system.md";
const SAMPLES_FILE: &str = "samples.json";
const SAMPLES_DIR: &str = "samples";
const USAGE_FILE: &str = "usage.json";

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Pattern '{0}' not found")]
    NotFound(String),
    #[error("Invalid pattern name '{0}'")]
    InvalidName(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Source of patterns, their samples and usage telemetry.
pub trait PatternLibrary: Send + Sync {
    /// Names of every pattern, sorted.
    fn list_patterns(&self) -> Result<Vec<String>, LibraryError>;

    fn load_pattern_artifact(&self, name: &str) -> Result<PatternArtifact, LibraryError>;

    /// Sample inputs for a pattern; empty when it has none.
    fn load_sample_inputs(&self, name: &str) -> Result<Vec<SampleInput>, LibraryError>;

    fn usage_metrics(&self, name: &str) -> Result<Option<UsageMetrics>, LibraryError>;
}

/// Filesystem-backed pattern library.
#[derive(Debug, Clone)]
pub struct FsPatternLibrary {
    root: PathBuf,
}

impl FsPatternLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn pattern_dir(&self, name: &str) -> Result<PathBuf, LibraryError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.contains('\0');
        if !valid {
            return Err(LibraryError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// The pattern's instruction text.
    pub fn read_pattern_text(&self, name: &str) -> Result<String, LibraryError> {
        let path = self.pattern_dir(name)?.join(PATTERN_FILE);
        if !path.is_file() {
            return Err(LibraryError::NotFound(name.to_string()));
        }
        read(&path)
    }
}

fn read(path: &Path) -> Result<String, LibraryError> {
    fs::read_to_string(path).map_err(|source| LibraryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LibraryError> {
    let json = read(path)?;
    serde_json::from_str(&json).map_err(|source| LibraryError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn is_sample_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext == "md" || ext == "txt")
}

impl PatternLibrary for FsPatternLibrary {
    fn list_patterns(&self) -> Result<Vec<String>, LibraryError> {
        let entries = fs::read_dir(&self.root).map_err(|source| LibraryError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LibraryError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.join(PATTERN_FILE).is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn load_pattern_artifact(&self, name: &str) -> Result<PatternArtifact, LibraryError> {
        let text = self.read_pattern_text(name)?;
        Ok(PatternArtifact::from_markdown(name, &text))
    }

    fn load_sample_inputs(&self, name: &str) -> Result<Vec<SampleInput>, LibraryError> {
        let dir = self.pattern_dir(name)?;
        if !dir.is_dir() {
            return Err(LibraryError::NotFound(name.to_string()));
        }

        let samples_file = dir.join(SAMPLES_FILE);
        if samples_file.is_file() {
            let samples: Vec<SampleInput> = read_json(&samples_file)?;
            debug!("Loaded {} samples for '{}' from {}", samples.len(), name, SAMPLES_FILE);
            return Ok(samples);
        }

        let samples_dir = dir.join(SAMPLES_DIR);
        if !samples_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&samples_dir)
            .map_err(|source| LibraryError::Io {
                path: samples_dir.clone(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_sample_file(path))
            .collect();
        paths.sort();

        let mut samples = Vec::with_capacity(paths.len());
        for path in paths {
            let id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            match fs::read_to_string(&path) {
                Ok(content) => samples.push(SampleInput::new(id, content)),
                Err(e) => warn!("Skipping unreadable sample {}: {}", path.display(), e),
            }
        }
        debug!("Loaded {} samples for '{}' from {}/", samples.len(), name, SAMPLES_DIR);
        Ok(samples)
    }

    fn usage_metrics(&self, name: &str) -> Result<Option<UsageMetrics>, LibraryError> {
        let path = self.pattern_dir(name)?.join(USAGE_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }
}
