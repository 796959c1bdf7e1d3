//! Engine configuration.
//!
//! Every lookup table the engine consults (weights, thresholds, the strategy
//! catalog) lives here and is injected at construction, so engines with
//! different settings can coexist.
//!
//! # Configuration
//!
//! - CLI argument: `--config <FILE>`
//! - Environment variable: `PATTERN_QA_CONFIG`
//!
//! Missing fields in the file fall back to the defaults below.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::quality::category::{Category, CategoryMap};
use crate::quality::recommend::StrategyCatalog;
use crate::quality::suite::SuiteConfig;
use crate::quality::tester::TesterConfig;
use crate::quality::trend::DEFAULT_HISTORY_CAPACITY;
use crate::quality::validator::ValidatorConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Gate used to decide certification and tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificationThresholds {
    pub overall: f64,
    /// Minimum output category score.
    pub functionality: f64,
    pub reliability: f64,
    /// Standards checks (of six) that must pass.
    pub standards_checks: usize,
    pub max_critical_issues: usize,
    /// Requirements (of five) needed for certification.
    pub required_met: usize,
    pub platinum: f64,
    pub gold: f64,
    pub silver: f64,
}

impl Default for CertificationThresholds {
    fn default() -> Self {
        Self {
            overall: 75.0,
            functionality: 80.0,
            reliability: 85.0,
            standards_checks: 5,
            max_critical_issues: 0,
            required_met: 4,
            platinum: 95.0,
            gold: 90.0,
            silver: 85.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub weights: CategoryMap<f64>,
    /// Per-category minimums for `meets_threshold`; `None` leaves a category
    /// ungated.
    pub category_thresholds: CategoryMap<Option<f64>>,
    pub overall_threshold: f64,
    /// Categories below this get a recommendation.
    pub recommendation_threshold: f64,
    /// Categories below this raise a critical issue.
    pub critical_threshold: f64,
    /// Categories below this (and above the critical line) raise a warning.
    pub warning_threshold: f64,
    pub certification: CertificationThresholds,
    pub history_capacity: usize,
    pub validator: ValidatorConfig,
    pub tester: TesterConfig,
    pub suite: SuiteConfig,
    pub strategies: StrategyCatalog,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            weights: CategoryMap::from_fn(default_weight),
            category_thresholds: CategoryMap::from_fn(default_threshold),
            overall_threshold: 70.0,
            recommendation_threshold: 80.0,
            critical_threshold: 50.0,
            warning_threshold: 70.0,
            certification: CertificationThresholds::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            validator: ValidatorConfig::default(),
            tester: TesterConfig::default(),
            suite: SuiteConfig::default(),
            strategies: StrategyCatalog::default(),
        }
    }
}

fn default_weight(category: Category) -> f64 {
    match category {
        Category::Syntax => 0.15,
        Category::Structure => 0.20,
        Category::Output => 0.25,
        Category::Integration => 0.10,
        Category::Performance => 0.10,
        Category::Usability => 0.10,
        Category::Maintainability => 0.05,
        Category::Documentation => 0.05,
    }
}

fn default_threshold(category: Category) -> Option<f64> {
    match category {
        Category::Syntax => Some(75.0),
        Category::Structure => Some(70.0),
        Category::Output => Some(75.0),
        Category::Integration => Some(65.0),
        Category::Performance => Some(60.0),
        Category::Usability | Category::Maintainability | Category::Documentation => None,
    }
}

impl QualityConfig {
    /// Load from a JSON file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `PATTERN_QA_CONFIG` if set, otherwise defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var("PATTERN_QA_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Merge with a CLI override. An explicit path wins over the environment.
    pub fn with_overrides(self, path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(self),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some((category, weight)) = self
            .weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "weight for {} must be a non-negative number, got {}",
                category, weight
            )));
        }
        let total: f64 = self.weights.iter().map(|(_, w)| *w).sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(ConfigError::Invalid(format!(
                "category weights must sum to 1.0, got {:.3}",
                total
            )));
        }

        let thresholds = self
            .category_thresholds
            .iter()
            .filter_map(|(c, t)| t.map(|t| (c.to_string(), t)))
            .chain([
                ("overall".to_string(), self.overall_threshold),
                ("recommendation".to_string(), self.recommendation_threshold),
                ("critical".to_string(), self.critical_threshold),
                ("warning".to_string(), self.warning_threshold),
            ]);
        for (name, value) in thresholds {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} threshold must be within 0-100, got {}",
                    name, value
                )));
            }
        }

        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.certification.required_met > 5 || self.certification.standards_checks > 6 {
            return Err(ConfigError::Invalid(
                "certification counts exceed the number of requirements".to_string(),
            ));
        }
        Ok(())
    }

    pub fn weight(&self, category: Category) -> f64 {
        self.weights[category]
    }

    pub fn threshold(&self, category: Category) -> Option<f64> {
        self.category_thresholds[category]
    }
}
