//! Records produced by the quality engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Issue;
use crate::quality::category::{Category, CategoryScores};

/// Letter grade for an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Grade::A,
            80..=89 => Grade::B,
            70..=79 => Grade::C,
            60..=69 => Grade::D,
            _ => Grade::F,
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{}", letter)
    }
}

/// Direction of a pattern's recent scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Improving => write!(f, "improving"),
            Trend::Stable => write!(f, "stable"),
            Trend::Declining => write!(f, "declining"),
        }
    }
}

/// Recommendation priority; orders critical first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Critical => write!(f, "critical"),
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Effort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effort::Low => write!(f, "low"),
            Effort::Medium => write!(f, "medium"),
            Effort::High => write!(f, "high"),
        }
    }
}

/// A ranked improvement for one underperforming category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: Category,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub action_items: Vec<String>,
    /// Expected gain in overall score points.
    pub estimated_impact: u8,
    pub estimated_effort: Effort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningImpact {
    High,
    Medium,
}

/// Non-blocking notice for a category in the warning band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub category: Category,
    pub message: String,
    pub impact: WarningImpact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificationTier {
    #[default]
    None,
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl std::fmt::Display for CertificationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Bronze => write!(f, "bronze"),
            Self::Silver => write!(f, "silver"),
            Self::Gold => write!(f, "gold"),
            Self::Platinum => write!(f, "platinum"),
        }
    }
}

/// One named certification requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationRequirement {
    pub name: String,
    pub threshold: f64,
    pub actual: f64,
    pub met: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CertificationStatus {
    pub certified: bool,
    pub tier: CertificationTier,
    pub requirements: Vec<CertificationRequirement>,
    pub next_steps: Vec<String>,
}

impl CertificationStatus {
    pub fn requirements_met(&self) -> usize {
        self.requirements.iter().filter(|r| r.met).count()
    }

    /// Drop the tier but keep the evaluated requirements.
    pub fn withhold(&mut self, reason: String) {
        self.certified = false;
        self.tier = CertificationTier::None;
        self.next_steps.insert(0, reason);
    }
}

/// The verdict for one pattern at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub pattern_name: String,
    pub scores: CategoryScores,
    pub overall_score: u8,
    pub grade: Grade,
    pub meets_threshold: bool,
    pub trend: Trend,
    pub recommendations: Vec<Recommendation>,
    /// Critical issues only.
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
    pub certification: CertificationStatus,
    /// Samples whose output came from the simulator rather than a real run.
    #[serde(default)]
    pub simulated_samples: usize,
    pub assessed_at: DateTime<Utc>,
}

impl QualityAssessment {
    pub fn is_simulated(&self) -> bool {
        self.simulated_samples > 0
    }
}

/// Snapshot kept in a pattern's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub overall_score: u8,
    pub scores: CategoryScores,
    /// Simulated entries are kept but do not move the trend.
    #[serde(default)]
    pub simulated: bool,
}

impl From<&QualityAssessment> for QualityHistoryEntry {
    fn from(assessment: &QualityAssessment) -> Self {
        Self {
            timestamp: assessment.assessed_at,
            overall_score: assessment.overall_score,
            scores: assessment.scores,
            simulated: assessment.is_simulated(),
        }
    }
}

/// Target overall score for a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGoal {
    pub pattern: String,
    pub target_score: u8,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal: QualityGoal,
    pub current_score: Option<u8>,
    pub achieved: bool,
    /// Points still needed; zero once achieved.
    pub remaining: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Open,
    Done,
}

/// Tracked follow-up for a critical or high recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: u64,
    pub pattern: String,
    pub category: Category,
    pub priority: Priority,
    pub title: String,
    pub steps: Vec<String>,
    pub status: ActionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl ActionItem {
    pub fn is_open(&self) -> bool {
        self.status == ActionStatus::Open
    }
}
