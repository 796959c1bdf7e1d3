//! Maps validator and tester evidence onto the eight category scores.

use crate::models::UsageMetrics;
use crate::pattern::{PatternDocument, Section};
use crate::quality::category::{Category, CategoryMap, CategoryScores};
use crate::quality::suite::{SubTest, TestSuiteResult};
use crate::quality::validator::{SectionKind, ValidatorConfig};
use crate::utils::clamp_score;

/// Artifact features the usability, maintainability and documentation
/// scores are derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtifactSignals {
    pub step_by_step: bool,
    pub has_examples: bool,
    pub has_output_instructions: bool,
    pub top_level_sections: usize,
    pub has_canonical_sections: bool,
    pub has_list_formatting: bool,
    pub has_input_placeholder: bool,
    pub identity_chars: usize,
    pub steps: usize,
}

impl ArtifactSignals {
    /// Signals for `text`, finding blocks by the validator's section markers.
    pub fn from_text(text: &str, markers: &ValidatorConfig) -> Self {
        let document = PatternDocument::parse(text);
        let lowered = text.to_lowercase();
        let output = markers.marker(SectionKind::Output);
        let instructions = markers.marker(SectionKind::Instructions);
        let identity = document.section_with(markers.marker(SectionKind::Identity));
        let steps = document.section_with(markers.marker(SectionKind::Steps));

        Self {
            step_by_step: lowered.contains("step-by-step")
                || lowered.contains("step by step")
                || steps.is_some(),
            has_examples: ["example", "sample", "for instance"]
                .iter()
                .any(|term| lowered.contains(term)),
            has_output_instructions: document
                .output_instructions_with(output, instructions)
                .is_some(),
            top_level_sections: document.sections.len(),
            has_canonical_sections: identity.is_some()
                && steps.is_some()
                && document.output_block_with(output, instructions).is_some(),
            has_list_formatting: document.has_list_formatting(),
            has_input_placeholder: document.has_input_placeholder(),
            identity_chars: identity.map_or(0, |s| s.body.chars().count()),
            steps: steps.map_or(0, |s| Section::list_items(s).len()),
        }
    }
}

/// Normalized score of a named sub-test; 0 when it is missing.
pub fn sub_test_score(suite: &TestSuiteResult, test: SubTest) -> f64 {
    suite.sub_test(test).map_or(0.0, |s| s.normalized())
}

pub fn usability_score(signals: Option<&ArtifactSignals>, usage: Option<&UsageMetrics>) -> f64 {
    let mut score: f64 = 70.0;
    if let Some(signals) = signals {
        if signals.step_by_step {
            score += 10.0;
        }
        if signals.has_examples {
            score += 10.0;
        }
        if signals.has_output_instructions {
            score += 10.0;
        }
    }
    if let Some(usage) = usage {
        if usage.user_rating > 4.0 {
            score += 10.0;
        }
        if usage.usage_count > 100 {
            score += 5.0;
        }
    }
    score.min(100.0)
}

pub fn maintainability_score(signals: Option<&ArtifactSignals>) -> f64 {
    let mut score: f64 = 60.0;
    if let Some(signals) = signals {
        if signals.top_level_sections >= 4 {
            score += 15.0;
        }
        if signals.has_canonical_sections {
            score += 15.0;
        }
        if signals.has_list_formatting && signals.has_input_placeholder {
            score += 10.0;
        }
    }
    score.min(100.0)
}

pub fn documentation_score(signals: Option<&ArtifactSignals>) -> f64 {
    let mut score: f64 = 50.0;
    if let Some(signals) = signals {
        if signals.identity_chars > 200 {
            score += 20.0;
        }
        if signals.steps >= 3 {
            score += 15.0;
        }
        if signals.has_output_instructions {
            score += 15.0;
        }
    }
    score.min(100.0)
}

/// All eight category scores, each clamped to 0-100.
pub fn extract_scores(
    suite: &TestSuiteResult,
    artifact_text: Option<&str>,
    usage: Option<&UsageMetrics>,
    markers: &ValidatorConfig,
) -> CategoryScores {
    let signals = artifact_text.map(|text| ArtifactSignals::from_text(text, markers));
    let signals = signals.as_ref();

    CategoryMap::from_fn(|category| {
        let raw = match category {
            Category::Syntax => sub_test_score(suite, SubTest::Syntax),
            Category::Structure => sub_test_score(suite, SubTest::Structure),
            Category::Output => sub_test_score(suite, SubTest::Output),
            Category::Integration => sub_test_score(suite, SubTest::Integration),
            Category::Performance => sub_test_score(suite, SubTest::Performance),
            Category::Usability => usability_score(signals, usage),
            Category::Maintainability => maintainability_score(signals),
            Category::Documentation => documentation_score(signals),
        };
        clamp_score(raw)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::suite::SubTestResult;
    use crate::quality::validator::SectionMarker;
    use crate::test_utils::{complete_pattern, pattern_without_instructions};

    fn suite_with(sub_tests: Vec<SubTestResult>) -> TestSuiteResult {
        let mut suite = TestSuiteResult::failed("p", "unused");
        suite.error = None;
        suite.sub_tests = sub_tests;
        suite
    }

    #[test]
    fn sub_tests_are_normalized() {
        let suite = suite_with(vec![
            SubTestResult::new(SubTest::Integration, 4.0, 5.0, 70.0),
            SubTestResult::new(SubTest::Syntax, 85.0, 100.0, 70.0),
        ]);
        let scores = extract_scores(&suite, None, None, &ValidatorConfig::default());

        assert_eq!(scores[Category::Integration], 80.0);
        assert_eq!(scores[Category::Syntax], 85.0);
        // missing sub-tests score zero
        assert_eq!(scores[Category::Output], 0.0);
    }

    #[test]
    fn extreme_raw_scores_are_clamped() {
        let suite = suite_with(vec![
            SubTestResult::new(SubTest::Syntax, -50.0, 100.0, 70.0),
            SubTestResult::new(SubTest::Output, 500.0, 100.0, 70.0),
            SubTestResult::new(SubTest::Performance, 10.0, -1.0, 70.0),
        ]);
        let scores = extract_scores(&suite, None, None, &ValidatorConfig::default());

        for (_, score) in scores.iter() {
            assert!((0.0..=100.0).contains(score));
        }
        assert_eq!(scores[Category::Syntax], 0.0);
        assert_eq!(scores[Category::Output], 100.0);
        assert_eq!(scores[Category::Performance], 0.0);
    }

    #[test]
    fn artifact_free_scores_use_base_values() {
        let suite = suite_with(Vec::new());
        let scores = extract_scores(&suite, None, None, &ValidatorConfig::default());

        assert_eq!(scores[Category::Usability], 70.0);
        assert_eq!(scores[Category::Maintainability], 60.0);
        assert_eq!(scores[Category::Documentation], 50.0);
    }

    #[test]
    fn complete_pattern_maxes_artifact_scores() {
        let suite = suite_with(Vec::new());
        let scores = extract_scores(&suite, Some(&complete_pattern()), None, &ValidatorConfig::default());

        assert_eq!(scores[Category::Usability], 100.0);
        assert_eq!(scores[Category::Maintainability], 100.0);
        assert_eq!(scores[Category::Documentation], 100.0);
    }

    #[test]
    fn missing_instructions_lowers_usability_and_documentation() {
        let suite = suite_with(Vec::new());
        let scores = extract_scores(
            &suite,
            Some(&pattern_without_instructions()),
            None,
            &ValidatorConfig::default(),
        );

        assert_eq!(scores[Category::Usability], 90.0);
        assert_eq!(scores[Category::Maintainability], 100.0);
        assert_eq!(scores[Category::Documentation], 85.0);
    }

    #[test]
    fn custom_markers_feed_documentation() {
        let text = "\
# IDENTITY and PURPOSE

You are an expert analyst who reads technical essays and extracts the claims that matter.

# PROCEDURE

- Read the input twice
- Extract every claim
- Rate each claim on evidence

# OUTPUT INSTRUCTIONS

- Only output markdown
";
        let markers = ValidatorConfig {
            section_markers: vec![SectionMarker::new(SectionKind::Steps, "PROCEDURE")],
            ..ValidatorConfig::default()
        };

        assert_eq!(ArtifactSignals::from_text(text, &ValidatorConfig::default()).steps, 0);
        let signals = ArtifactSignals::from_text(text, &markers);
        assert_eq!(signals.steps, 3);
        assert_eq!(documentation_score(Some(&signals)), 80.0);
    }

    #[test]
    fn usage_metrics_add_to_usability() {
        let usage = UsageMetrics {
            user_rating: 4.5,
            usage_count: 250,
        };
        assert_eq!(usability_score(None, Some(&usage)), 85.0);

        let signals = ArtifactSignals {
            step_by_step: true,
            has_examples: true,
            has_output_instructions: true,
            ..ArtifactSignals::default()
        };
        assert_eq!(usability_score(Some(&signals), Some(&usage)), 100.0);
    }

    #[test]
    fn rating_of_exactly_four_earns_nothing() {
        let usage = UsageMetrics {
            user_rating: 4.0,
            usage_count: 100,
        };
        assert_eq!(usability_score(None, Some(&usage)), 70.0);
    }
}
