//! Weighted overall score, grade, threshold gate and certification.

use crate::quality::category::{Category, CategoryMap, CategoryScores};
use crate::quality::config::{CertificationThresholds, QualityConfig};
use crate::quality::types::{
    CertificationRequirement, CertificationStatus, CertificationTier, Grade,
};
use crate::quality::validator::ComplianceChecks;
use crate::utils::{clamp_score, round_score};

/// Points lost from reliability per critical issue.
const RELIABILITY_PENALTY_PER_CRITICAL: f64 = 20.0;

/// Requirements met for silver and gold, whatever `required_met` is.
const TIER_REQUIREMENTS_MET: usize = 4;

/// Weighted sum of the category scores, rounded to 0-100.
pub fn overall_score(scores: &CategoryScores, weights: &CategoryMap<f64>) -> u8 {
    let total: f64 = Category::ALL
        .iter()
        .map(|c| clamp_score(scores[*c]) * weights[*c])
        .sum();
    round_score(total)
}

/// True iff the overall score and every gated category meet their minimums.
pub fn meets_threshold(scores: &CategoryScores, overall: u8, config: &QualityConfig) -> bool {
    overall as f64 >= config.overall_threshold
        && failing_categories(scores, config).is_empty()
}

/// Gated categories that fall below their minimum.
pub fn failing_categories(scores: &CategoryScores, config: &QualityConfig) -> Vec<Category> {
    config
        .category_thresholds
        .iter()
        .filter_map(|(category, threshold)| {
            threshold.filter(|t| scores[category] < *t).map(|_| category)
        })
        .collect()
}

/// 60% validation score, 40% critical-issue headroom.
pub fn reliability_score(validation_score: f64, critical_issues: usize) -> f64 {
    let headroom =
        (100.0 - RELIABILITY_PENALTY_PER_CRITICAL * critical_issues as f64).max(0.0);
    0.6 * clamp_score(validation_score) + 0.4 * headroom
}

/// Evidence the certification gate looks at.
#[derive(Debug, Clone, Copy)]
pub struct CertificationInput<'a> {
    pub overall: u8,
    pub scores: &'a CategoryScores,
    pub validation_score: f64,
    pub critical_issues: usize,
    pub compliance: &'a ComplianceChecks,
}

/// Evaluate the five requirements and pick a tier. Next steps are left empty.
pub fn certify(input: CertificationInput<'_>, thresholds: &CertificationThresholds) -> CertificationStatus {
    let overall = input.overall as f64;
    let functionality = input.scores[Category::Output];
    let reliability = reliability_score(input.validation_score, input.critical_issues);
    let standards = input.compliance.standards_met();

    let requirements = vec![
        requirement("overall", thresholds.overall, overall, overall >= thresholds.overall),
        requirement(
            "functionality",
            thresholds.functionality,
            functionality,
            functionality >= thresholds.functionality,
        ),
        requirement(
            "reliability",
            thresholds.reliability,
            reliability,
            reliability >= thresholds.reliability,
        ),
        requirement(
            "standards_compliance",
            thresholds.standards_checks as f64,
            standards as f64,
            standards >= thresholds.standards_checks,
        ),
        requirement(
            "critical_issues",
            thresholds.max_critical_issues as f64,
            input.critical_issues as f64,
            input.critical_issues <= thresholds.max_critical_issues,
        ),
    ];

    let met = requirements.iter().filter(|r| r.met).count();
    let certified = met >= thresholds.required_met;
    let tier = if !certified {
        CertificationTier::None
    } else if overall >= thresholds.platinum && met == requirements.len() {
        CertificationTier::Platinum
    } else if overall >= thresholds.gold && met >= TIER_REQUIREMENTS_MET {
        CertificationTier::Gold
    } else if overall >= thresholds.silver && met >= TIER_REQUIREMENTS_MET {
        CertificationTier::Silver
    } else {
        CertificationTier::Bronze
    };

    CertificationStatus {
        certified,
        tier,
        requirements,
        next_steps: Vec::new(),
    }
}

fn requirement(name: &str, threshold: f64, actual: f64, met: bool) -> CertificationRequirement {
    CertificationRequirement {
        name: name.to_string(),
        threshold,
        actual,
        met,
    }
}

/// Grade, threshold verdict and overall score in one pass.
pub fn aggregate(scores: &CategoryScores, config: &QualityConfig) -> (u8, Grade, bool) {
    let overall = overall_score(scores, &config.weights);
    (
        overall,
        Grade::from_score(overall),
        meets_threshold(scores, overall, config),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(f: impl Fn(Category) -> f64) -> CategoryScores {
        CategoryMap::from_fn(f)
    }

    fn all_checks() -> ComplianceChecks {
        ComplianceChecks {
            has_identity: true,
            has_purpose: true,
            has_steps: true,
            has_output: true,
            has_instructions: true,
            follows_structure: true,
            meets_minimum_word_count: true,
            has_required_output_sections: true,
        }
    }

    #[test]
    fn overall_is_weighted_sum() {
        let config = QualityConfig::default();
        let uniform = scores(|_| 80.0);
        assert_eq!(overall_score(&uniform, &config.weights), 80);

        let mixed = scores(|c| if c == Category::Output { 55.0 } else { 95.0 });
        // 0.25 * 55 + 0.75 * 95 = 85
        assert_eq!(overall_score(&mixed, &config.weights), 85);
    }

    #[test]
    fn overall_is_deterministic() {
        let config = QualityConfig::default();
        let input = scores(|c| 50.0 + c as u8 as f64 * 6.0);
        let first = aggregate(&input, &config);
        for _ in 0..10 {
            assert_eq!(aggregate(&input, &config), first);
        }
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let config = QualityConfig::default();
        assert_eq!(overall_score(&scores(|_| 250.0), &config.weights), 100);
        assert_eq!(overall_score(&scores(|_| -40.0), &config.weights), 0);
    }

    #[test]
    fn single_failing_category_fails_threshold() {
        let config = QualityConfig::default();
        let input = scores(|c| if c == Category::Syntax { 40.0 } else { 100.0 });
        let (overall, grade, meets) = aggregate(&input, &config);

        assert_eq!(overall, 91);
        assert_eq!(grade, Grade::A);
        assert!(!meets);
        assert_eq!(failing_categories(&input, &config), vec![Category::Syntax]);
    }

    #[test]
    fn ungated_categories_do_not_fail_threshold() {
        let config = QualityConfig::default();
        let input = scores(|c| if c == Category::Documentation { 10.0 } else { 90.0 });
        let (_, _, meets) = aggregate(&input, &config);
        assert!(meets);
    }

    #[test]
    fn reliability_formula() {
        assert_eq!(reliability_score(100.0, 0), 100.0);
        assert_eq!(reliability_score(80.0, 1), 0.6 * 80.0 + 0.4 * 80.0);
        assert_eq!(reliability_score(100.0, 9), 60.0);
    }

    #[test]
    fn perfect_pattern_is_platinum() {
        let input = scores(|_| 100.0);
        let status = certify(
            CertificationInput {
                overall: 100,
                scores: &input,
                validation_score: 100.0,
                critical_issues: 0,
                compliance: &all_checks(),
            },
            &CertificationThresholds::default(),
        );
        assert!(status.certified);
        assert_eq!(status.tier, CertificationTier::Platinum);
        assert_eq!(status.requirements_met(), 5);
    }

    #[test]
    fn high_overall_with_few_requirements_is_uncertified() {
        let input = scores(|c| if c == Category::Output { 60.0 } else { 100.0 });
        let status = certify(
            CertificationInput {
                overall: 99,
                scores: &input,
                validation_score: 50.0,
                critical_issues: 2,
                compliance: &ComplianceChecks::default(),
            },
            &CertificationThresholds::default(),
        );
        assert!(status.requirements_met() < 4);
        assert!(!status.certified);
        assert_eq!(status.tier, CertificationTier::None);
    }

    #[test]
    fn tiers_follow_overall_when_certified() {
        let input = scores(|_| 100.0);
        let tier_for = |overall: u8, critical: usize| {
            certify(
                CertificationInput {
                    overall,
                    scores: &input,
                    validation_score: 100.0,
                    critical_issues: critical,
                    compliance: &all_checks(),
                },
                &CertificationThresholds::default(),
            )
            .tier
        };

        // one critical issue: four of five met, platinum out of reach
        assert_eq!(tier_for(97, 1), CertificationTier::Gold);
        assert_eq!(tier_for(92, 0), CertificationTier::Gold);
        assert_eq!(tier_for(87, 0), CertificationTier::Silver);
        assert_eq!(tier_for(80, 0), CertificationTier::Bronze);
    }

    #[test]
    fn lenient_certification_stays_bronze_below_four_met() {
        let thresholds = CertificationThresholds {
            required_met: 3,
            ..CertificationThresholds::default()
        };
        let input = scores(|_| 100.0);
        let status = certify(
            CertificationInput {
                overall: 95,
                scores: &input,
                validation_score: 100.0,
                critical_issues: 1,
                compliance: &ComplianceChecks::default(),
            },
            &thresholds,
        );

        assert_eq!(status.requirements_met(), 3);
        assert!(status.certified);
        assert_eq!(status.tier, CertificationTier::Bronze);
    }
}
