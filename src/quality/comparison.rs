//! Saving assessments to disk and comparing two of them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::quality::category::{Category, CategoryMap};
use crate::quality::types::QualityAssessment;

const DEFAULT_ASSESSMENTS_DIR: &str = ".pattern-qa/assessments";

/// Category moves smaller than this are noise.
const SIGNIFICANT_DELTA: f64 = 1.0;

/// Before/after view of one pattern's assessments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentComparison {
    pub before: QualityAssessment,
    pub after: QualityAssessment,
    pub overall_delta: i16,
    pub category_deltas: CategoryMap<f64>,
    pub improvements: Vec<String>,
    pub regressions: Vec<String>,
}

impl AssessmentComparison {
    pub fn improved(&self) -> bool {
        self.overall_delta > 0
    }
}

pub fn default_assessments_dir() -> PathBuf {
    PathBuf::from(DEFAULT_ASSESSMENTS_DIR)
}

/// `<pattern>_<timestamp>.json`, using the assessment's own timestamp.
pub fn default_assessment_filename(assessment: &QualityAssessment) -> String {
    format!(
        "{}_{}.json",
        assessment.pattern_name,
        assessment.assessed_at.format("%Y%m%d_%H%M%S")
    )
}

/// Save an assessment as pretty JSON. With no `path`, writes into the
/// default directory.
pub fn save_assessment(
    assessment: &QualityAssessment,
    path: Option<&Path>,
) -> Result<PathBuf, std::io::Error> {
    let save_path = match path {
        Some(p) => p.to_path_buf(),
        None => default_assessments_dir().join(default_assessment_filename(assessment)),
    };

    if let Some(parent) = save_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(assessment).map_err(std::io::Error::other)?;
    fs::write(&save_path, json)?;
    Ok(save_path)
}

pub fn load_assessment(path: &Path) -> Result<QualityAssessment, std::io::Error> {
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(std::io::Error::other)
}

/// Saved assessments in `dir`, sorted by filename.
pub fn list_assessments(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut assessments = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "json") {
            assessments.push(path);
        }
    }
    assessments.sort();
    Ok(assessments)
}

pub fn compare_assessments(
    before: QualityAssessment,
    after: QualityAssessment,
) -> AssessmentComparison {
    let overall_delta = after.overall_score as i16 - before.overall_score as i16;
    let category_deltas =
        CategoryMap::from_fn(|category| after.scores[category] - before.scores[category]);

    let describe = |category: Category, delta: f64| format!("{}: {:+.1}", category.name(), delta);
    let improvements = category_deltas
        .iter()
        .filter(|(_, delta)| **delta > SIGNIFICANT_DELTA)
        .map(|(c, delta)| describe(c, *delta))
        .collect();
    let regressions = category_deltas
        .iter()
        .filter(|(_, delta)| **delta < -SIGNIFICANT_DELTA)
        .map(|(c, delta)| describe(c, *delta))
        .collect();

    AssessmentComparison {
        before,
        after,
        overall_delta,
        category_deltas,
        improvements,
        regressions,
    }
}
