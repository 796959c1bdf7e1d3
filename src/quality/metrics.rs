//! Library-wide read-side projections: metrics and periodic reports.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::quality::category::{Category, CategoryMap};
use crate::quality::config::QualityConfig;
use crate::quality::types::{
    ActionItem, Grade, Priority, QualityAssessment, QualityGoal, Trend,
};

/// Patterns listed in the top and needing-attention lists.
const LEADERBOARD_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternScore {
    pub pattern: String,
    pub overall_score: u8,
    pub grade: Grade,
    pub trend: Trend,
}

impl From<&QualityAssessment> for PatternScore {
    fn from(assessment: &QualityAssessment) -> Self {
        Self {
            pattern: assessment.pattern_name.clone(),
            overall_score: assessment.overall_score,
            grade: assessment.grade,
            trend: assessment.trend,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendCounts {
    pub improving: usize,
    pub stable: usize,
    pub declining: usize,
}

/// Snapshot of quality across every assessed pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub total_patterns: usize,
    pub patterns_passing_threshold: usize,
    /// Patterns whose latest assessment used simulated output.
    #[serde(default)]
    pub simulated_patterns: usize,
    pub average_quality_score: f64,
    pub quality_distribution: BTreeMap<Grade, usize>,
    pub trend_analysis: TrendCounts,
    pub top_performing_patterns: Vec<PatternScore>,
    pub patterns_needing_attention: Vec<PatternScore>,
}

pub fn quality_metrics<'a>(
    assessments: impl IntoIterator<Item = &'a QualityAssessment>,
) -> QualityMetrics {
    let assessments: Vec<&QualityAssessment> = assessments.into_iter().collect();
    let total = assessments.len();

    let mut quality_distribution: BTreeMap<Grade, usize> =
        Grade::ALL.iter().map(|g| (*g, 0)).collect();
    let mut trend_analysis = TrendCounts::default();
    for assessment in &assessments {
        *quality_distribution.entry(assessment.grade).or_default() += 1;
        match assessment.trend {
            Trend::Improving => trend_analysis.improving += 1,
            Trend::Stable => trend_analysis.stable += 1,
            Trend::Declining => trend_analysis.declining += 1,
        }
    }

    let mut ranked: Vec<&QualityAssessment> = assessments.clone();
    ranked.sort_by(|a, b| {
        b.overall_score
            .cmp(&a.overall_score)
            .then_with(|| a.pattern_name.cmp(&b.pattern_name))
    });

    let mut attention: Vec<&QualityAssessment> = assessments
        .iter()
        .copied()
        .filter(|a| !a.meets_threshold || a.trend == Trend::Declining)
        .collect();
    attention.sort_by(|a, b| {
        a.overall_score
            .cmp(&b.overall_score)
            .then_with(|| a.pattern_name.cmp(&b.pattern_name))
    });

    QualityMetrics {
        total_patterns: total,
        patterns_passing_threshold: assessments.iter().filter(|a| a.meets_threshold).count(),
        simulated_patterns: assessments.iter().filter(|a| a.is_simulated()).count(),
        average_quality_score: average(assessments.iter().map(|a| a.overall_score as f64)),
        quality_distribution,
        trend_analysis,
        top_performing_patterns: ranked
            .iter()
            .filter(|a| a.meets_threshold)
            .take(LEADERBOARD_SIZE)
            .map(|a| PatternScore::from(*a))
            .collect(),
        patterns_needing_attention: attention
            .iter()
            .take(LEADERBOARD_SIZE)
            .map(|a| PatternScore::from(*a))
            .collect(),
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Window a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Day,
    #[default]
    Week,
    Month,
    All,
}

impl ReportPeriod {
    /// Earliest timestamp included, or `None` for everything.
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Day => Some(now - Duration::days(1)),
            Self::Week => Some(now - Duration::weeks(1)),
            Self::Month => Some(now - Duration::days(30)),
            Self::All => None,
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.since(now).map_or(true, |since| timestamp >= since)
    }
}

impl std::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
            Self::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for ReportPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Day),
            "week" | "weekly" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            "all" => Ok(Self::All),
            _ => Err(format!(
                "Unknown period: '{}'. Valid options: day, week, month, all",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub patterns_assessed: usize,
    pub average_score: f64,
    pub passing_threshold: usize,
    pub certified: usize,
    pub critical_issues: usize,
    #[serde(default)]
    pub simulated: usize,
    /// Mean score per category across the period's assessments.
    pub category_averages: CategoryMap<f64>,
}

/// One step in the report's action plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlanItem {
    pub pattern: String,
    pub category: Category,
    pub priority: Priority,
    pub title: String,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub period: ReportPeriod,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub pattern_assessments: Vec<QualityAssessment>,
    pub system_recommendations: Vec<String>,
    pub action_plan: Vec<ActionPlanItem>,
}

/// Everything a report reads, borrowed from the engine.
pub struct ReportInput<'a> {
    pub assessments: Vec<&'a QualityAssessment>,
    pub action_items: &'a [ActionItem],
    pub goals: &'a [QualityGoal],
    pub config: &'a QualityConfig,
}

pub fn build_report(input: ReportInput<'_>, period: ReportPeriod, now: DateTime<Utc>) -> QualityReport {
    let mut in_period: Vec<&QualityAssessment> = input
        .assessments
        .into_iter()
        .filter(|a| period.contains(a.assessed_at, now))
        .collect();
    in_period.sort_by(|a, b| a.pattern_name.cmp(&b.pattern_name));

    let category_averages = CategoryMap::from_fn(|category| {
        average(in_period.iter().map(|a| a.scores[category]))
    });
    let summary = ReportSummary {
        patterns_assessed: in_period.len(),
        average_score: average(in_period.iter().map(|a| a.overall_score as f64)),
        passing_threshold: in_period.iter().filter(|a| a.meets_threshold).count(),
        certified: in_period.iter().filter(|a| a.certification.certified).count(),
        critical_issues: in_period.iter().map(|a| a.issues.len()).sum(),
        simulated: in_period.iter().filter(|a| a.is_simulated()).count(),
        category_averages,
    };

    let system_recommendations =
        system_recommendations(&in_period, &summary, input.goals, input.config);

    let mut action_plan: Vec<ActionPlanItem> = input
        .action_items
        .iter()
        .filter(|item| item.is_open())
        .filter(|item| in_period.iter().any(|a| a.pattern_name == item.pattern))
        .map(|item| ActionPlanItem {
            pattern: item.pattern.clone(),
            category: item.category,
            priority: item.priority,
            title: item.title.clone(),
            steps: item.steps.clone(),
        })
        .collect();
    action_plan.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.pattern.cmp(&b.pattern))
            .then_with(|| a.category.cmp(&b.category))
    });

    QualityReport {
        period,
        generated_at: now,
        summary,
        pattern_assessments: in_period.into_iter().cloned().collect(),
        system_recommendations,
        action_plan,
    }
}

fn system_recommendations(
    assessments: &[&QualityAssessment],
    summary: &ReportSummary,
    goals: &[QualityGoal],
    config: &QualityConfig,
) -> Vec<String> {
    if assessments.is_empty() {
        return vec!["No patterns were assessed in this period; run an assessment".to_string()];
    }

    let mut recommendations = Vec::new();

    if summary.simulated > 0 {
        recommendations.push(format!(
            "{} assessment(s) used simulated output; re-run them with a real executor",
            summary.simulated
        ));
    }

    let mut weak: Vec<(Category, f64)> = summary
        .category_averages
        .iter()
        .filter(|(_, avg)| **avg < config.warning_threshold)
        .map(|(c, avg)| (c, *avg))
        .collect();
    weak.sort_by(|a, b| a.1.total_cmp(&b.1));
    for (category, avg) in weak {
        let strategy = config
            .strategies
            .strategies(category)
            .first()
            .cloned()
            .unwrap_or_default();
        recommendations.push(format!(
            "{} averages {:.0} across the library: {}",
            category.name(),
            avg,
            strategy
        ));
    }

    let failing = assessments.len() - summary.passing_threshold;
    if failing * 4 > assessments.len() {
        recommendations.push(format!(
            "{} of {} patterns miss the quality threshold; review them before release",
            failing,
            assessments.len()
        ));
    }

    let declining: Vec<&str> = assessments
        .iter()
        .filter(|a| a.trend == Trend::Declining)
        .map(|a| a.pattern_name.as_str())
        .collect();
    if !declining.is_empty() {
        recommendations.push(format!(
            "Investigate declining patterns: {}",
            declining.join(", ")
        ));
    }

    if summary.critical_issues > 0 {
        recommendations.push(format!(
            "Resolve {} critical issue(s) before certification",
            summary.critical_issues
        ));
    }

    for goal in goals {
        let current = assessments
            .iter()
            .find(|a| a.pattern_name == goal.pattern)
            .map(|a| a.overall_score);
        if let Some(current) = current.filter(|c| *c < goal.target_score) {
            recommendations.push(format!(
                "'{}' is {} points short of its goal of {}",
                goal.pattern,
                goal.target_score - current,
                goal.target_score
            ));
        }
    }

    recommendations
}
