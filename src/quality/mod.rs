//! Pattern quality assessment.
//!
//! This module scores analysis patterns across eight categories, grades and
//! certifies them, tracks each pattern's score history and turns weak
//! categories into ranked recommendations and action items.
//!
//! [`QualityEngine`] is the entry point: feed it a [`TestSuiteResult`] from
//! [`SuiteRunner`] and it returns a [`QualityAssessment`].

pub mod aggregator;
pub mod category;
pub mod comparison;
pub mod config;
pub mod extractor;
pub mod metrics;
pub mod recommend;
pub mod report;
pub mod suite;
pub mod tester;
pub mod trend;
pub mod types;
pub mod validator;

pub use category::{Category, CategoryMap, CategoryScores};
pub use comparison::{compare_assessments, load_assessment, save_assessment, AssessmentComparison};
pub use config::{CertificationThresholds, ConfigError, QualityConfig};
pub use metrics::{QualityMetrics, QualityReport, ReportPeriod};
pub use report::OutputFormat;
pub use suite::{SubTest, SubTestResult, SuiteRunner, TestSuiteResult};
pub use tester::{OutputTester, TestResult, TestSummary};
pub use trend::{HistoryStore, InMemoryHistory};
pub use types::{
    ActionItem, ActionStatus, CertificationStatus, CertificationTier, GoalProgress, Grade,
    Priority, QualityAssessment, QualityGoal, QualityHistoryEntry, Recommendation, Trend,
};
pub use validator::{StructuralValidator, ValidationReport};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::models::{Issue, UsageMetrics};

use aggregator::CertificationInput;
use metrics::ReportInput;

/// Version written into exported state documents.
pub const STATE_VERSION: u32 = 1;

/// Everything needed to assess one pattern.
#[derive(Debug, Clone)]
pub struct AssessmentInput {
    pub pattern_name: String,
    pub suite: TestSuiteResult,
    pub artifact_text: Option<String>,
    pub usage: Option<UsageMetrics>,
    /// Validation score for the reliability requirement; defaults to the
    /// mean of the syntax and structure scores.
    pub validation_score: Option<f64>,
}

impl AssessmentInput {
    pub fn new(pattern_name: impl Into<String>, suite: TestSuiteResult) -> Self {
        Self {
            pattern_name: pattern_name.into(),
            suite,
            artifact_text: None,
            usage: None,
            validation_score: None,
        }
    }

    pub fn with_artifact_text(mut self, text: impl Into<String>) -> Self {
        self.artifact_text = Some(text.into());
        self
    }

    pub fn with_usage(mut self, usage: UsageMetrics) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_validation_score(mut self, score: f64) -> Self {
        self.validation_score = Some(score);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Invalid quality data: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Unsupported quality data version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("Inconsistent quality data: {0}")]
    InvalidState(String),
}

/// The engine's full state as one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityState {
    pub version: u32,
    pub config: QualityConfig,
    pub assessments: BTreeMap<String, QualityAssessment>,
    pub history: BTreeMap<String, Vec<QualityHistoryEntry>>,
    #[serde(default)]
    pub goals: Vec<QualityGoal>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default = "first_action_id")]
    pub next_action_id: u64,
    pub exported_at: DateTime<Utc>,
}

fn first_action_id() -> u64 {
    1
}

impl QualityState {
    fn check(&self) -> Result<(), ImportError> {
        if self.version != STATE_VERSION {
            return Err(ImportError::UnsupportedVersion {
                found: self.version,
                expected: STATE_VERSION,
            });
        }
        self.config
            .validate()
            .map_err(|e| ImportError::InvalidState(e.to_string()))?;

        if let Some((key, assessment)) = self
            .assessments
            .iter()
            .find(|(key, a)| **key != a.pattern_name)
        {
            return Err(ImportError::InvalidState(format!(
                "assessment stored under '{}' belongs to '{}'",
                key, assessment.pattern_name
            )));
        }
        for assessment in self.assessments.values() {
            check_scores(&assessment.pattern_name, &assessment.scores, assessment.overall_score)?;
            let expected = Grade::from_score(assessment.overall_score);
            if assessment.grade != expected {
                return Err(ImportError::InvalidState(format!(
                    "'{}' has grade {} but overall score {} (grade {})",
                    assessment.pattern_name, assessment.grade, assessment.overall_score, expected
                )));
            }
        }
        for (pattern, entries) in &self.history {
            for entry in entries {
                check_scores(pattern, &entry.scores, entry.overall_score)?;
            }
        }
        if let Some(goal) = self.goals.iter().find(|g| g.target_score > 100) {
            return Err(ImportError::InvalidState(format!(
                "goal for '{}' targets {}",
                goal.pattern, goal.target_score
            )));
        }
        if let Some(max_id) = self.action_items.iter().map(|item| item.id).max() {
            if self.next_action_id <= max_id {
                return Err(ImportError::InvalidState(format!(
                    "next action id {} collides with existing id {}",
                    self.next_action_id, max_id
                )));
            }
        }
        Ok(())
    }
}

fn check_scores(pattern: &str, scores: &CategoryScores, overall: u8) -> Result<(), ImportError> {
    if overall > 100 {
        return Err(ImportError::InvalidState(format!(
            "'{}' has overall score {}",
            pattern, overall
        )));
    }
    if let Some((category, score)) = scores
        .iter()
        .find(|(_, score)| !(0.0..=100.0).contains(*score))
    {
        return Err(ImportError::InvalidState(format!(
            "'{}' has {} score {}",
            pattern, category, score
        )));
    }
    Ok(())
}

/// Assesses patterns and keeps their latest assessments, history, goals and
/// action items.
pub struct QualityEngine {
    config: QualityConfig,
    assessments: BTreeMap<String, QualityAssessment>,
    history: Box<dyn HistoryStore>,
    goals: Vec<QualityGoal>,
    action_items: Vec<ActionItem>,
    next_action_id: u64,
}

impl Default for QualityEngine {
    fn default() -> Self {
        Self::new(QualityConfig::default())
    }
}

impl QualityEngine {
    pub fn new(config: QualityConfig) -> Self {
        let history = Box::new(InMemoryHistory::new(config.history_capacity));
        Self::with_history(config, history)
    }

    pub fn with_history(config: QualityConfig, history: Box<dyn HistoryStore>) -> Self {
        Self {
            config,
            assessments: BTreeMap::new(),
            history,
            goals: Vec::new(),
            action_items: Vec::new(),
            next_action_id: first_action_id(),
        }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// A suite runner using this engine's validator, tester and suite settings.
    pub fn suite_runner(&self) -> SuiteRunner {
        SuiteRunner::new(
            StructuralValidator::new(self.config.validator.clone()),
            OutputTester::new(self.config.tester.clone()),
            self.config.suite.clone(),
        )
    }

    pub fn assess_pattern_quality(&mut self, input: AssessmentInput) -> QualityAssessment {
        self.assess_pattern_quality_at(input, Utc::now())
    }

    /// Assess with an explicit timestamp.
    pub fn assess_pattern_quality_at(
        &mut self,
        input: AssessmentInput,
        now: DateTime<Utc>,
    ) -> QualityAssessment {
        let name = input.pattern_name.clone();

        if let Some(error) = &input.suite.error {
            warn!("Test suite for '{}' failed: {}", name, error);
            let assessment = self.failed_assessment(&name, error, now);
            self.assessments.insert(name, assessment.clone());
            return assessment;
        }

        let config = &self.config;
        let scores = extractor::extract_scores(
            &input.suite,
            input.artifact_text.as_deref(),
            input.usage.as_ref(),
            &config.validator,
        );
        let (overall_score, grade, meets_threshold) = aggregator::aggregate(&scores, config);
        debug!(
            "'{}' scored {} ({}), failing categories: {:?}",
            name,
            overall_score,
            grade,
            aggregator::failing_categories(&scores, config)
        );

        let recommendations = recommend::recommendations(&scores, config);
        let mut issues = recommend::category_issues(&scores, config);
        issues.extend(input.suite.critical_issues().into_iter().cloned());
        let warnings = recommend::warnings(&scores, config);

        let validation_score = input.validation_score.unwrap_or(
            (scores[Category::Syntax] + scores[Category::Structure]) / 2.0,
        );
        let mut certification = aggregator::certify(
            CertificationInput {
                overall: overall_score,
                scores: &scores,
                validation_score,
                critical_issues: issues.len(),
                compliance: &input.suite.compliance,
            },
            &config.certification,
        );
        certification.next_steps = recommend::next_steps(&certification, &config.certification);

        let simulated_samples = input.suite.summary.simulated;
        if simulated_samples > 0 {
            warn!(
                "'{}' used simulated output for {} of {} samples",
                name, simulated_samples, input.suite.summary.total
            );
            certification.withhold(format!(
                "Re-run with a real executor: {} of {} samples were simulated",
                simulated_samples, input.suite.summary.total
            ));
        }

        self.history.append(
            &name,
            QualityHistoryEntry {
                timestamp: now,
                overall_score,
                scores,
                simulated: simulated_samples > 0,
            },
        );
        let trend = trend::trend_for(self.history.as_ref(), &name);

        let assessment = QualityAssessment {
            pattern_name: name.clone(),
            scores,
            overall_score,
            grade,
            meets_threshold,
            trend,
            recommendations,
            issues,
            warnings,
            certification,
            simulated_samples,
            assessed_at: now,
        };
        info!(
            "Assessed '{}': {} ({}), trend {}, certification {}",
            name, overall_score, grade, trend, assessment.certification.tier
        );

        self.update_action_items(&assessment, now);
        self.assessments.insert(name, assessment.clone());
        assessment
    }

    fn failed_assessment(&self, name: &str, error: &str, now: DateTime<Utc>) -> QualityAssessment {
        let scores = CategoryMap::from_fn(|_| 0.0);
        let issues = vec![Issue::critical(
            "suite",
            format!("Test suite failed: {}", error),
            "Fix the pattern or its samples and re-run the assessment",
        )];
        let mut certification = aggregator::certify(
            CertificationInput {
                overall: 0,
                scores: &scores,
                validation_score: 0.0,
                critical_issues: issues.len(),
                compliance: &validator::ComplianceChecks::default(),
            },
            &self.config.certification,
        );
        certification.next_steps = vec![format!("Fix the test suite failure: {}", error)];

        QualityAssessment {
            pattern_name: name.to_string(),
            scores,
            overall_score: 0,
            grade: Grade::F,
            meets_threshold: false,
            trend: trend::trend_for(self.history.as_ref(), name),
            recommendations: Vec::new(),
            issues,
            warnings: Vec::new(),
            certification,
            simulated_samples: 0,
            assessed_at: now,
        }
    }

    /// Open items for new critical/high recommendations; close items whose
    /// category is no longer recommended.
    fn update_action_items(&mut self, assessment: &QualityAssessment, now: DateTime<Utc>) {
        let pattern = &assessment.pattern_name;

        for item in self
            .action_items
            .iter_mut()
            .filter(|item| item.is_open() && item.pattern == *pattern)
        {
            let still_recommended = assessment
                .recommendations
                .iter()
                .any(|r| r.category == item.category);
            if !still_recommended {
                debug!("Closing action item {} for '{}'", item.id, pattern);
                item.status = ActionStatus::Done;
                item.closed_at = Some(now);
            }
        }

        for rec in assessment
            .recommendations
            .iter()
            .filter(|r| r.priority <= Priority::High)
        {
            let existing = self.action_items.iter_mut().find(|item| {
                item.is_open() && item.pattern == *pattern && item.category == rec.category
            });
            match existing {
                Some(item) => {
                    item.priority = rec.priority;
                    item.steps = rec.action_items.clone();
                }
                None => {
                    self.action_items.push(ActionItem {
                        id: self.next_action_id,
                        pattern: pattern.clone(),
                        category: rec.category,
                        priority: rec.priority,
                        title: format!("{}: {}", pattern, rec.title),
                        steps: rec.action_items.clone(),
                        status: ActionStatus::Open,
                        created_at: now,
                        closed_at: None,
                    });
                    self.next_action_id += 1;
                }
            }
        }
    }

    /// Latest assessment of a pattern.
    pub fn assessment(&self, pattern: &str) -> Option<&QualityAssessment> {
        self.assessments.get(pattern)
    }

    pub fn assessments(&self) -> impl Iterator<Item = &QualityAssessment> {
        self.assessments.values()
    }

    /// A pattern's history, oldest first.
    pub fn history(&self, pattern: &str) -> Vec<QualityHistoryEntry> {
        self.history.entries(pattern)
    }

    pub fn quality_metrics(&self) -> QualityMetrics {
        metrics::quality_metrics(self.assessments.values())
    }

    pub fn generate_quality_report(&self, period: ReportPeriod) -> QualityReport {
        self.generate_quality_report_at(period, Utc::now())
    }

    pub fn generate_quality_report_at(&self, period: ReportPeriod, now: DateTime<Utc>) -> QualityReport {
        metrics::build_report(
            ReportInput {
                assessments: self.assessments.values().collect(),
                action_items: &self.action_items,
                goals: &self.goals,
                config: &self.config,
            },
            period,
            now,
        )
    }

    /// Set (or replace) a pattern's goal. Targets above 100 are capped.
    pub fn set_goal(
        &mut self,
        pattern: impl Into<String>,
        target_score: u8,
        description: Option<String>,
    ) -> &QualityGoal {
        self.set_goal_at(pattern, target_score, description, Utc::now())
    }

    pub fn set_goal_at(
        &mut self,
        pattern: impl Into<String>,
        target_score: u8,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> &QualityGoal {
        let goal = QualityGoal {
            pattern: pattern.into(),
            target_score: target_score.min(100),
            description,
            created_at: now,
        };
        let index = match self.goals.iter().position(|g| g.pattern == goal.pattern) {
            Some(index) => {
                self.goals[index] = goal;
                index
            }
            None => {
                self.goals.push(goal);
                self.goals.len() - 1
            }
        };
        &self.goals[index]
    }

    pub fn goals(&self) -> &[QualityGoal] {
        &self.goals
    }

    pub fn goal_progress(&self) -> Vec<GoalProgress> {
        self.goals
            .iter()
            .map(|goal| {
                let current_score = self.assessments.get(&goal.pattern).map(|a| a.overall_score);
                let achieved = current_score.is_some_and(|s| s >= goal.target_score);
                GoalProgress {
                    goal: goal.clone(),
                    current_score,
                    achieved,
                    remaining: goal.target_score.saturating_sub(current_score.unwrap_or(0)),
                }
            })
            .collect()
    }

    pub fn action_items(&self) -> &[ActionItem] {
        &self.action_items
    }

    pub fn open_action_items(&self) -> impl Iterator<Item = &ActionItem> {
        self.action_items.iter().filter(|item| item.is_open())
    }

    pub fn export_quality_data(&self) -> QualityState {
        QualityState {
            version: STATE_VERSION,
            config: self.config.clone(),
            assessments: self.assessments.clone(),
            history: self.history.snapshot(),
            goals: self.goals.clone(),
            action_items: self.action_items.clone(),
            next_action_id: self.next_action_id,
            exported_at: Utc::now(),
        }
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.export_quality_data())
    }

    /// Replace the whole state. On error nothing changes.
    pub fn import_quality_data(&mut self, state: QualityState) -> Result<(), ImportError> {
        state.check()?;

        info!(
            "Importing {} assessments exported at {}",
            state.assessments.len(),
            state.exported_at
        );
        self.history.set_capacity(state.config.history_capacity);
        self.history.restore(state.history);
        self.config = state.config;
        self.assessments = state.assessments;
        self.goals = state.goals;
        self.action_items = state.action_items;
        self.next_action_id = state.next_action_id;
        Ok(())
    }

    pub fn import_json(&mut self, json: &str) -> Result<(), ImportError> {
        let state: QualityState = serde_json::from_str(json)?;
        self.import_quality_data(state)
    }
}
