//! Recommendations, issues and warnings derived from category scores.

use serde::{Deserialize, Serialize};

use crate::models::Issue;
use crate::quality::category::{Category, CategoryMap, CategoryScores};
use crate::quality::config::{CertificationThresholds, QualityConfig};
use crate::quality::types::{
    CertificationStatus, CertificationTier, Effort, Priority, Recommendation, Warning,
    WarningImpact,
};

/// Action items recommended per category.
const ACTIONS_PER_RECOMMENDATION: usize = 3;

/// Share of the weighted gap a recommendation is expected to recover.
const IMPACT_FACTOR: f64 = 0.7;

/// Canned improvement strategies, ordered most effective first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyCatalog {
    strategies: CategoryMap<Vec<String>>,
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self {
            strategies: CategoryMap::from_fn(|category| {
                default_strategies(category)
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
        }
    }
}

impl StrategyCatalog {
    pub fn new(strategies: CategoryMap<Vec<String>>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self, category: Category) -> &[String] {
        &self.strategies[category]
    }

    /// The first `n` strategies for a category.
    pub fn top(&self, category: Category, n: usize) -> Vec<String> {
        self.strategies[category].iter().take(n).cloned().collect()
    }
}

fn default_strategies(category: Category) -> &'static [&'static str] {
    match category {
        Category::Syntax => &[
            "Open with an IDENTITY and PURPOSE section that names the expert role",
            "Add an OUTPUT INSTRUCTIONS section with explicit format rules",
            "Expand terse instructions so the pattern explains what good output looks like",
            "Use consistent top-level `#` headings for every block",
        ],
        Category::Structure => &[
            "List at least three concrete analysis steps under STEPS",
            "Declare each output section by name in an OUTPUT SECTIONS block",
            "Order blocks as IDENTITY, STEPS, OUTPUT, OUTPUT INSTRUCTIONS, INPUT",
        ],
        Category::Output => &[
            "Name every required output section in the output instructions",
            "Ask for specific examples and figures instead of general statements",
            "Require prioritized (HIGH/MEDIUM/LOW) recommendations",
            "Specify an explicit scoring format where ratings are expected",
        ],
        Category::Integration => &[
            "End the pattern with an INPUT section so callers know where content goes",
            "Require markdown headings so downstream tools can split the output",
            "Give each output section a distinct, stable name",
        ],
        Category::Performance => &[
            "Remove redundant or repeated instructions",
            "Narrow the requested output to what consumers actually use",
            "Split very broad patterns into focused ones",
        ],
        Category::Usability => &[
            "Describe the analysis as step-by-step guidance",
            "Include a short example of the expected output",
            "State output constraints in a dedicated instructions block",
        ],
        Category::Maintainability => &[
            "Split the pattern into clearly titled top-level sections",
            "Use bullet lists for steps and constraints",
            "Keep identity, steps and output declarations in separate blocks",
            "Mark where the input goes with an INPUT section",
        ],
        Category::Documentation => &[
            "Explain the pattern's role and goal in the identity block",
            "Document each analysis step on its own line",
            "Document output format rules in OUTPUT INSTRUCTIONS",
        ],
    }
}

pub fn priority_for(score: f64) -> Priority {
    if score < 60.0 {
        Priority::Critical
    } else if score < 70.0 {
        Priority::High
    } else {
        Priority::Medium
    }
}

/// Effort to close the gap to the recommendation line.
pub fn effort_for(score: f64, target: f64) -> Effort {
    let gap = target - score;
    if gap <= 10.0 {
        Effort::Low
    } else if gap <= 25.0 {
        Effort::Medium
    } else {
        Effort::High
    }
}

pub fn estimated_impact(score: f64, weight: f64) -> u8 {
    ((100.0 - score) * weight * IMPACT_FACTOR).round().clamp(0.0, 100.0) as u8
}

/// One recommendation per category below the recommendation line, ranked by
/// priority then impact.
pub fn recommendations(scores: &CategoryScores, config: &QualityConfig) -> Vec<Recommendation> {
    let target = config.recommendation_threshold;
    let mut recommendations: Vec<Recommendation> = scores
        .iter()
        .filter(|(_, score)| **score < target)
        .map(|(category, score)| {
            let score = *score;
            Recommendation {
                category,
                priority: priority_for(score),
                title: format!("Improve {}", category.name()),
                description: format!(
                    "{} scored {:.0}, below the {:.0} target",
                    category.name(),
                    score,
                    target
                ),
                action_items: config
                    .strategies
                    .top(category, ACTIONS_PER_RECOMMENDATION),
                estimated_impact: estimated_impact(score, config.weight(category)),
                estimated_effort: effort_for(score, target),
            }
        })
        .collect();

    recommendations.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(b.estimated_impact.cmp(&a.estimated_impact))
    });
    recommendations
}

/// Critical issues for categories below the critical line.
pub fn category_issues(scores: &CategoryScores, config: &QualityConfig) -> Vec<Issue> {
    scores
        .iter()
        .filter(|(_, score)| **score < config.critical_threshold)
        .map(|(category, score)| {
            Issue::critical(
                category.to_string(),
                format!("{} score {:.0} is critically low", category.name(), score),
                config
                    .strategies
                    .strategies(category)
                    .first()
                    .cloned()
                    .unwrap_or_default(),
            )
        })
        .collect()
}

/// Warnings for categories between the critical and warning lines.
pub fn warnings(scores: &CategoryScores, config: &QualityConfig) -> Vec<Warning> {
    scores
        .iter()
        .filter(|(_, score)| {
            **score >= config.critical_threshold && **score < config.warning_threshold
        })
        .map(|(category, score)| Warning {
            category,
            message: format!("{} score {:.0} needs attention", category.name(), score),
            impact: if *score < 60.0 {
                WarningImpact::High
            } else {
                WarningImpact::Medium
            },
        })
        .collect()
}

/// What to do next: fix every unmet requirement, then aim for the next tier.
pub fn next_steps(status: &CertificationStatus, thresholds: &CertificationThresholds) -> Vec<String> {
    let mut steps: Vec<String> = status
        .requirements
        .iter()
        .filter(|r| !r.met)
        .map(|r| match r.name.as_str() {
            "critical_issues" => format!(
                "Resolve {} critical issue(s)",
                r.actual as usize
            ),
            "standards_compliance" => format!(
                "Pass at least {} of 6 standards checks (currently {})",
                r.threshold as usize, r.actual as usize
            ),
            name => format!(
                "Raise {} from {:.0} to {:.0}",
                name.replace('_', " "),
                r.actual,
                r.threshold
            ),
        })
        .collect();

    let next_tier = match status.tier {
        CertificationTier::Bronze => Some(("silver", thresholds.silver)),
        CertificationTier::Silver => Some(("gold", thresholds.gold)),
        CertificationTier::Gold => Some(("platinum", thresholds.platinum)),
        CertificationTier::None | CertificationTier::Platinum => None,
    };
    if let Some((tier, overall)) = next_tier {
        steps.push(format!(
            "Reach an overall score of {:.0} for {} certification",
            overall, tier
        ));
    }
    steps
}
