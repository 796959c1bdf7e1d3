//! Shared test fixtures.

use chrono::{DateTime, Utc};

use crate::models::{PatternArtifact, SampleInput};
use crate::quality::aggregator;
use crate::quality::category::CategoryMap;
use crate::quality::config::QualityConfig;
use crate::quality::recommend;
use crate::quality::suite::{SubTest, SubTestResult, TestSuiteResult};
use crate::quality::tester::TestSummary;
use crate::quality::types::{CertificationStatus, Grade, QualityAssessment, Trend};
use crate::quality::validator::ComplianceChecks;

const IDENTITY: &str = "# IDENTITY and PURPOSE

You are an expert analyst who extracts the most valuable ideas, insights and \
recommendations from any piece of content. Your goal is to help the reader understand \
what the author is really saying, which claims are backed by evidence, and what a \
practitioner should do differently after reading it. Work through the material step by \
step and ground every point in a concrete example taken from the input itself.

Take a deep breath and think about how a careful editor would read this content before \
you begin. Favour clarity over cleverness and never invent facts that the input does \
not support. When the input is thin, say so plainly and keep the sections short rather \
than padding them with generic advice.
";

const STEPS: &str = "# STEPS

- Read the entire input carefully, twice if it is long
- Identify the core argument and the evidence offered for it
- Extract the most surprising, insightful and useful ideas
- Separate opinions from claims that are supported by data
- Rank the recommendations by their expected effect on the reader
";

const OUTPUT_SECTIONS: &str = "# OUTPUT SECTIONS

- SUMMARY: A short summary of the content and who produced it
- IDEAS: The most important ideas, one bullet each
- RECOMMENDATIONS: Prioritized actions, each marked HIGH, MEDIUM or LOW
";

const OUTPUT_INSTRUCTIONS: &str = "# OUTPUT INSTRUCTIONS

- Output valid markdown with one heading per section
- Use bullet points rather than numbered lists
- Give a specific example from the input for every recommendation
- Do not repeat the same idea across different sections
- Do not add warnings or notes outside of the requested sections
";

const INPUT: &str = "# INPUT

INPUT:
";

/// A pattern that passes every structural check.
pub fn complete_pattern() -> String {
    [IDENTITY, STEPS, OUTPUT_SECTIONS, OUTPUT_INSTRUCTIONS, INPUT].join("\n")
}

/// The complete pattern without its output-instructions block.
pub fn pattern_without_instructions() -> String {
    [IDENTITY, STEPS, OUTPUT_SECTIONS, INPUT].join("\n")
}

/// Artifact declaring SUMMARY, IDEAS and RECOMMENDATIONS.
pub fn sample_artifact() -> PatternArtifact {
    PatternArtifact::from_markdown("extract_wisdom", &complete_pattern())
}

/// Output that covers every declared section and trips every content signal.
pub fn rich_output() -> String {
    "# SUMMARY

The article argues that small, specific habits compound into large gains. Teams that \
ship 3 small improvements per week outperform teams that ship one large release per \
month by 40% on delivery metrics.

## IDEAS

- Specific, measurable goals beat vague ambitions; for example, reduce review time to \
24 hours instead of asking people to review faster.
- Feedback loops shorter than one week improve quality by roughly 25%.
- Teams that test changes in production-like environments catch 60% more regressions.
- Removing low-value meetings frees about 4 hours per engineer each week.

## RECOMMENDATIONS

- HIGH: Implement a weekly review cadence and track cycle time as the primary metric.
- HIGH: Add automated tests to every change before merge and consider an 80% coverage target.
- MEDIUM: Optimize onboarding by pairing new engineers for their first 2 weeks.
- LOW: Remove recurring meetings that have no written agenda.

We recommend starting with the two HIGH priority items, since they change the most \
outcomes within the first month.
"
    .to_string()
}

/// Samples with the given ids.
pub fn samples(ids: &[&str]) -> Vec<SampleInput> {
    ids.iter()
        .map(|id| SampleInput::new(*id, format!("Sample content for {}", id)))
        .collect()
}

/// A completed suite whose five sub-tests all normalize to `score`, with
/// every compliance check passing.
pub fn suite_with_scores(pattern: &str, score: f64) -> TestSuiteResult {
    let mut suite = TestSuiteResult::failed(pattern, "unused");
    suite.error = None;
    suite.summary = TestSummary::from_results(&[]);
    suite.compliance = ComplianceChecks {
        has_identity: true,
        has_purpose: true,
        has_steps: true,
        has_output: true,
        has_instructions: true,
        follows_structure: true,
        meets_minimum_word_count: true,
        has_required_output_sections: true,
    };
    suite.sub_tests = SubTest::ALL
        .iter()
        .map(|test| SubTestResult::new(*test, score, 100.0, 70.0))
        .collect();
    suite
}

/// An assessment with every category at `score`.
pub fn make_assessment(pattern: &str, score: u8, at: DateTime<Utc>) -> QualityAssessment {
    let config = QualityConfig::default();
    let scores = CategoryMap::from_fn(|_| score as f64);
    QualityAssessment {
        pattern_name: pattern.to_string(),
        scores,
        overall_score: score,
        grade: Grade::from_score(score),
        meets_threshold: aggregator::meets_threshold(&scores, score, &config),
        trend: Trend::Stable,
        recommendations: recommend::recommendations(&scores, &config),
        issues: recommend::category_issues(&scores, &config),
        warnings: recommend::warnings(&scores, &config),
        certification: CertificationStatus::default(),
        simulated_samples: 0,
        assessed_at: at,
    }
}
