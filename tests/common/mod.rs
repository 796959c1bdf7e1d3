//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use chrono::Utc;

use pattern_qa::models::Issue;
use pattern_qa::quality::validator::ComplianceChecks;
use pattern_qa::quality::{StructuralValidator, SubTest, SubTestResult, TestSuiteResult, TestSummary};

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

pub fn complete_pattern() -> String {
    [IDENTITY, STEPS, OUTPUT_SECTIONS, OUTPUT_INSTRUCTIONS, INPUT].join("\n")
}

pub fn pattern_without_instructions() -> String {
    [IDENTITY, STEPS, OUTPUT_SECTIONS, INPUT].join("\n")
}

/// A finished suite with the given normalized sub-test scores, in
/// `SubTest::ALL` order, and compliance taken from `checks`.
pub fn suite(pattern: &str, scores: [f64; 5], checks: ComplianceChecks) -> TestSuiteResult {
    TestSuiteResult {
        pattern_name: pattern.to_string(),
        sub_tests: SubTest::ALL
            .iter()
            .zip(scores)
            .map(|(test, score)| SubTestResult::new(*test, score, 100.0, 70.0))
            .collect(),
        compliance: checks,
        test_results: Vec::new(),
        summary: TestSummary::from_results(&[]),
        error: None,
        completed_at: Utc::now(),
    }
}

/// Every compliance check passing.
pub fn all_checks() -> ComplianceChecks {
    StructuralValidator::default().validate(&complete_pattern()).checks
}

/// The suite a pattern gets when the validator scores its text and the
/// remaining sub-tests score `output`, `integration` and `performance`.
pub fn validated_suite(
    pattern: &str,
    text: &str,
    output: f64,
    integration: f64,
    performance: f64,
) -> TestSuiteResult {
    let report = StructuralValidator::default().validate(text);
    suite(
        pattern,
        [
            report.syntax_score,
            report.structure_score,
            output,
            integration,
            performance,
        ],
        report.checks,
    )
}

/// Attach critical issues to the suite's first sub-test.
pub fn with_critical_issues(mut suite: TestSuiteResult, count: usize) -> TestSuiteResult {
    let issues = (0..count)
        .map(|i| Issue::critical("syntax", format!("problem {}", i), "fix it"))
        .collect();
    if let Some(first) = suite.sub_tests.first_mut() {
        first.issues = issues;
    }
    suite
}
