//! Feature flags for optional behaviours.
//!
//! Features can be enabled via:
//! - CLI: `--features parallel-tests,strict-execution`
//! - Environment: `PATTERN_QA_FEATURES=parallel-tests`

use std::collections::HashSet;
use std::env;
use std::sync::OnceLock;

use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};

/// Available feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    /// Run a pattern's samples concurrently.
    ParallelTests,
    /// Never fall back to simulated output when the executor is unavailable.
    StrictExecution,
}

/// Set of enabled features.
#[derive(Debug, Clone, Default)]
pub struct Features {
    enabled: HashSet<Feature>,
}

static GLOBAL_FEATURES: OnceLock<Features> = OnceLock::new();

impl Features {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        match env::var("PATTERN_QA_FEATURES") {
            Ok(value) => Self::parse_list(&value),
            Err(_) => Self::new(),
        }
    }

    /// Parse a comma-separated list, skipping unknown names with a warning.
    pub fn parse_list(value: &str) -> Self {
        let mut features = Self::new();
        for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match Feature::from_str(name, true) {
                Ok(feature) => features.enable(feature),
                Err(_) => warn!("Unknown feature '{}' in PATTERN_QA_FEATURES", name),
            }
        }
        features
    }

    pub fn enable(&mut self, feature: Feature) {
        self.enabled.insert(feature);
    }

    pub fn disable(&mut self, feature: Feature) {
        self.enabled.remove(&feature);
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.enabled.contains(&feature)
    }

    /// Merge with CLI overrides.
    pub fn with_overrides(mut self, cli_features: Option<&[Feature]>) -> Self {
        for feature in cli_features.unwrap_or_default() {
            self.enable(*feature);
        }
        self
    }

    pub fn global() -> &'static Features {
        GLOBAL_FEATURES.get_or_init(Features::from_env)
    }

    /// Initialize the global feature set. Only the first call has an effect.
    pub fn init_global(features: Features) {
        let _ = GLOBAL_FEATURES.set(features);
    }

    pub fn enabled_features(&self) -> impl Iterator<Item = Feature> + '_ {
        self.enabled.iter().copied()
    }
}
