//! Test suite assembly.
//!
//! A suite combines the structural validator, the output tester and two
//! suite-level sub-tests (integration and performance) into one
//! [`TestSuiteResult`], the evidence the category extractor works from.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::execution::PatternExecutor;
use crate::models::{Issue, PatternArtifact, SampleInput};
use crate::pattern::PatternDocument;
use crate::quality::category::Category;
use crate::quality::tester::{OutputTester, TestResult, TestSummary};
use crate::quality::validator::{ComplianceChecks, StructuralValidator, ValidationReport};
use crate::utils::{clamp_score, word_count};

/// Highest output score a run with only simulated samples can reach.
pub const SIMULATED_OUTPUT_CAP: f64 = 50.0;

/// Named sub-tests, each feeding one category score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTest {
    Syntax,
    Structure,
    Output,
    Integration,
    Performance,
}

impl SubTest {
    pub const ALL: [SubTest; 5] = [
        SubTest::Syntax,
        SubTest::Structure,
        SubTest::Output,
        SubTest::Integration,
        SubTest::Performance,
    ];

    pub fn category(&self) -> Category {
        match self {
            Self::Syntax => Category::Syntax,
            Self::Structure => Category::Structure,
            Self::Output => Category::Output,
            Self::Integration => Category::Integration,
            Self::Performance => Category::Performance,
        }
    }
}

impl std::fmt::Display for SubTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.category())
    }
}

/// Score of one sub-test on its own scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTestResult {
    pub test: SubTest,
    pub score: f64,
    pub max_score: f64,
    pub passed: bool,
    pub issues: Vec<Issue>,
}

impl SubTestResult {
    pub fn new(test: SubTest, score: f64, max_score: f64, pass_score: f64) -> Self {
        let mut result = Self {
            test,
            score,
            max_score,
            passed: false,
            issues: Vec::new(),
        };
        result.passed = result.normalized() >= pass_score;
        result
    }

    pub fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        self.issues = issues;
        self
    }

    /// Score rescaled to 0-100; a non-positive scale yields 0.
    pub fn normalized(&self) -> f64 {
        if self.max_score <= 0.0 {
            return 0.0;
        }
        clamp_score(self.score / self.max_score * 100.0)
    }
}

/// Everything measured about one pattern in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub pattern_name: String,
    pub sub_tests: Vec<SubTestResult>,
    pub compliance: ComplianceChecks,
    pub test_results: Vec<TestResult>,
    pub summary: TestSummary,
    /// Set when the suite could not be produced at all.
    #[serde(default)]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl TestSuiteResult {
    /// A suite for a pattern that could not be tested.
    pub fn failed(pattern_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            pattern_name: pattern_name.into(),
            sub_tests: Vec::new(),
            compliance: ComplianceChecks::default(),
            test_results: Vec::new(),
            summary: TestSummary::from_results(&[]),
            error: Some(error.into()),
            completed_at: Utc::now(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn sub_test(&self, test: SubTest) -> Option<&SubTestResult> {
        self.sub_tests.iter().find(|s| s.test == test)
    }

    /// Critical issues raised anywhere in the suite.
    pub fn critical_issues(&self) -> Vec<&Issue> {
        self.sub_tests
            .iter()
            .flat_map(|s| s.issues.iter())
            .filter(|issue| issue.is_critical())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Normalized score a sub-test needs to pass.
    pub pass_score: f64,
    /// Average per-sample latency above this costs performance points.
    pub latency_budget_ms: u64,
    /// Instruction length above this costs performance points.
    pub max_instruction_words: usize,
    /// Share of outputs that must be markdown-structured.
    pub min_structured_outputs: f64,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            pass_score: 70.0,
            latency_budget_ms: 30_000,
            max_instruction_words: 2_000,
            min_structured_outputs: 0.8,
        }
    }
}

/// Runs the full test suite for a pattern.
pub struct SuiteRunner {
    validator: StructuralValidator,
    tester: OutputTester,
    config: SuiteConfig,
}

impl SuiteRunner {
    pub fn new(validator: StructuralValidator, tester: OutputTester, config: SuiteConfig) -> Self {
        Self {
            validator,
            tester,
            config,
        }
    }

    /// Run up to `max_parallel` samples at once.
    pub fn with_parallelism(mut self, max_parallel: usize) -> Self {
        self.tester = self.tester.with_parallelism(max_parallel);
        self
    }

    pub fn run(
        &self,
        artifact: &PatternArtifact,
        samples: &[SampleInput],
        executor: &dyn PatternExecutor,
    ) -> TestSuiteResult {
        let report = self.validator.validate(&artifact.instructions);
        if report.malformed {
            warn!("Pattern '{}' is malformed", artifact.name);
        }

        let test_results = if samples.is_empty() {
            warn!("Pattern '{}' has no sample inputs", artifact.name);
            Vec::new()
        } else {
            self.tester.run(artifact, samples, executor)
        };
        let summary = TestSummary::from_results(&test_results);
        info!(
            "Suite for '{}': {}/{} samples passed, health {}",
            artifact.name, summary.passed, summary.total, summary.health
        );

        let sub_tests = vec![
            self.syntax(&report),
            self.structure(&report),
            self.output(&summary, &test_results),
            self.integration(artifact, &test_results),
            self.performance(artifact, &test_results),
        ];

        TestSuiteResult {
            pattern_name: artifact.name.clone(),
            sub_tests,
            compliance: report.checks,
            test_results,
            summary,
            error: None,
            completed_at: Utc::now(),
        }
    }

    fn syntax(&self, report: &ValidationReport) -> SubTestResult {
        SubTestResult::new(SubTest::Syntax, report.syntax_score, 100.0, self.config.pass_score)
            .with_issues(issues_in(report, Category::Syntax))
    }

    fn structure(&self, report: &ValidationReport) -> SubTestResult {
        SubTestResult::new(
            SubTest::Structure,
            report.structure_score,
            100.0,
            self.config.pass_score,
        )
        .with_issues(issues_in(report, Category::Structure))
    }

    fn output(&self, summary: &TestSummary, results: &[TestResult]) -> SubTestResult {
        let output = Category::Output.to_string();
        let mut issues: Vec<Issue> = Vec::new();
        if results.is_empty() {
            issues.push(Issue::major(
                output.clone(),
                "No sample inputs were tested",
                "Add sample inputs for this pattern",
            ));
        }
        for issue in results.iter().flat_map(|r| r.issues.iter()) {
            if !issues
                .iter()
                .any(|seen| seen.severity == issue.severity && seen.message == issue.message)
            {
                issues.push(issue.clone());
            }
        }

        if summary.simulated > 0 {
            issues.push(Issue::major(
                output,
                format!(
                    "{} of {} outputs were simulated",
                    summary.simulated, summary.total
                ),
                "Re-run the assessment with a real executor",
            ));
        }

        SubTestResult::new(
            SubTest::Output,
            output_score(summary, results),
            100.0,
            self.config.pass_score,
        )
        .with_issues(issues)
    }

    /// One point per check: input slot, declared sections, structured
    /// outputs, no execution failures, unique section names.
    fn integration(&self, artifact: &PatternArtifact, results: &[TestResult]) -> SubTestResult {
        let category = Category::Integration.to_string();
        let document = PatternDocument::parse(&artifact.instructions);
        let mut issues = Vec::new();
        let mut score = 0.0;

        if document.has_input_placeholder() {
            score += 1.0;
        } else {
            issues.push(Issue::major(
                category.clone(),
                "No input placeholder",
                "End the pattern with an INPUT section so callers know where content goes",
            ));
        }

        if !artifact.output_sections.is_empty() {
            score += 1.0;
        } else {
            issues.push(Issue::major(
                category.clone(),
                "No declared output sections for downstream consumers",
                "Declare the output sections explicitly",
            ));
        }

        let structured = results
            .iter()
            .filter(|r| r.analysis.format_compliance.has_markdown_structure)
            .count();
        if !results.is_empty()
            && structured as f64 >= self.config.min_structured_outputs * results.len() as f64
        {
            score += 1.0;
        } else {
            issues.push(Issue::minor(
                category.clone(),
                format!(
                    "{} of {} outputs are markdown-structured",
                    structured,
                    results.len()
                ),
                "Require markdown headings in the output instructions",
            ));
        }

        let failures = execution_failures(results);
        if failures == 0 {
            score += 1.0;
        } else {
            issues.push(Issue::major(
                category.clone(),
                format!("{} samples failed to execute", failures),
                "Check the pattern against the failing samples",
            ));
        }

        let mut seen = HashSet::new();
        let unique = artifact
            .output_sections
            .iter()
            .all(|name| !name.trim().is_empty() && seen.insert(name.to_uppercase()));
        if unique {
            score += 1.0;
        } else {
            issues.push(Issue::minor(
                category,
                "Declared output sections are empty or duplicated",
                "Give every output section a distinct name",
            ));
        }

        SubTestResult::new(SubTest::Integration, score, 5.0, self.config.pass_score)
            .with_issues(issues)
    }

    /// Deductions from 100 for latency, instruction length and failures.
    fn performance(&self, artifact: &PatternArtifact, results: &[TestResult]) -> SubTestResult {
        let category = Category::Performance.to_string();
        let budget = self.config.latency_budget_ms;
        let mut issues = Vec::new();
        let mut score: f64 = 100.0;

        if !results.is_empty() {
            let total: u64 = results.iter().map(|r| r.elapsed_ms).sum();
            let average = total / results.len() as u64;
            let slowest = results.iter().map(|r| r.elapsed_ms).max().unwrap_or(0);

            if average > budget {
                score -= 30.0;
                issues.push(Issue::major(
                    category.clone(),
                    format!("Average execution time {}ms exceeds {}ms", average, budget),
                    "Trim the pattern or narrow the requested output",
                ));
            }
            if slowest > budget.saturating_mul(2) {
                score -= 20.0;
                issues.push(Issue::minor(
                    category.clone(),
                    format!("Slowest sample took {}ms", slowest),
                    "Check whether the slow sample needs a tighter scope",
                ));
            }

            let failure_rate = execution_failures(results) as f64 / results.len() as f64;
            score -= 30.0 * failure_rate;
        }

        let words = word_count(&artifact.instructions);
        if words > self.config.max_instruction_words {
            score -= 20.0;
            issues.push(Issue::minor(
                category,
                format!(
                    "Pattern is {} words, more than {}",
                    words, self.config.max_instruction_words
                ),
                "Remove redundant instructions",
            ));
        }

        SubTestResult::new(
            SubTest::Performance,
            clamp_score(score),
            100.0,
            self.config.pass_score,
        )
        .with_issues(issues)
    }
}

fn issues_in(report: &ValidationReport, category: Category) -> Vec<Issue> {
    let tag = category.to_string();
    report
        .issues
        .iter()
        .filter(|issue| issue.category == tag)
        .cloned()
        .collect()
}

/// Mean score of the genuine outputs. When every output was simulated the
/// mean is capped at [`SIMULATED_OUTPUT_CAP`].
fn output_score(summary: &TestSummary, results: &[TestResult]) -> f64 {
    let genuine: Vec<f64> = results
        .iter()
        .filter(|r| !r.simulated)
        .map(|r| r.score as f64)
        .collect();
    if genuine.is_empty() {
        return summary.average_score.min(SIMULATED_OUTPUT_CAP);
    }
    genuine.iter().sum::<f64>() / genuine.len() as f64
}

fn execution_failures(results: &[TestResult]) -> usize {
    results.iter().filter(|r| r.critical_issues() > 0).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::RecordedExecutor;
    use crate::quality::tester::SimulatedExecutor;
    use crate::test_utils::{complete_pattern, rich_output, samples};

    fn runner() -> SuiteRunner {
        SuiteRunner::new(
            StructuralValidator::default(),
            OutputTester::default(),
            SuiteConfig::default(),
        )
    }

    fn artifact() -> PatternArtifact {
        PatternArtifact::from_markdown("extract_wisdom", &complete_pattern())
    }

    fn recorded(ids: &[&str]) -> RecordedExecutor {
        let mut executor = RecordedExecutor::new();
        for id in ids {
            executor.insert(*id, rich_output());
        }
        executor
    }

    #[test]
    fn complete_pattern_scores_full_marks() {
        let ids = ["a", "b"];
        let suite = runner().run(&artifact(), &samples(&ids), &recorded(&ids));

        assert!(!suite.is_failed());
        assert_eq!(suite.sub_tests.len(), 5);
        for sub_test in &suite.sub_tests {
            assert_eq!(sub_test.normalized(), 100.0, "{:?}", sub_test);
            assert!(sub_test.passed);
        }
        assert!(suite.critical_issues().is_empty());
    }

    #[test]
    fn integration_counts_execution_failures() {
        let suite = runner().run(&artifact(), &samples(&["a", "missing"]), &recorded(&["a"]));

        let integration = suite.sub_test(SubTest::Integration).unwrap();
        // failure costs the execution check and the structured-output ratio
        assert_eq!(integration.score, 3.0);
        assert_eq!(integration.normalized(), 60.0);

        let performance = suite.sub_test(SubTest::Performance).unwrap();
        assert_eq!(performance.score, 85.0);
        assert_eq!(suite.critical_issues().len(), 1);
    }

    #[test]
    fn duplicate_section_names_fail_integration_check() {
        let artifact = artifact().with_output_sections(vec![
            "SUMMARY".to_string(),
            "summary".to_string(),
        ]);
        let suite = runner().run(&artifact, &samples(&["a"]), &recorded(&["a"]));
        let integration = suite.sub_test(SubTest::Integration).unwrap();
        assert!(integration
            .issues
            .iter()
            .any(|i| i.message.contains("duplicated")));
    }

    #[test]
    fn long_instructions_cost_performance() {
        let config = SuiteConfig {
            max_instruction_words: 10,
            ..SuiteConfig::default()
        };
        let runner = SuiteRunner::new(
            StructuralValidator::default(),
            OutputTester::default(),
            config,
        );
        let suite = runner.run(&artifact(), &samples(&["a"]), &recorded(&["a"]));
        assert_eq!(suite.sub_test(SubTest::Performance).unwrap().score, 80.0);
    }

    #[test]
    fn no_samples_zeroes_output() {
        let suite = runner().run(&artifact(), &[], &SimulatedExecutor);
        let output = suite.sub_test(SubTest::Output).unwrap();
        assert_eq!(output.normalized(), 0.0);
        assert!(!output.passed);
    }

    #[test]
    fn simulated_outputs_cap_the_output_score() {
        let suite = runner().run(&artifact(), &samples(&["a", "b"]), &SimulatedExecutor);
        let output = suite.sub_test(SubTest::Output).unwrap();

        assert_eq!(suite.summary.simulated, 2);
        assert!(output.normalized() <= SIMULATED_OUTPUT_CAP);
        assert!(output
            .issues
            .iter()
            .any(|i| i.message == "2 of 2 outputs were simulated"));
    }

    #[test]
    fn malformed_pattern_issue_lands_on_syntax() {
        let artifact = PatternArtifact::new("broken", "");
        let suite = runner().run(&artifact, &samples(&["a"]), &SimulatedExecutor);

        assert_eq!(suite.sub_test(SubTest::Syntax).unwrap().score, 0.0);
        assert_eq!(suite.sub_test(SubTest::Structure).unwrap().score, 0.0);
        assert_eq!(suite.sub_test(SubTest::Syntax).unwrap().issues.len(), 1);
    }

    #[test]
    fn normalization_handles_degenerate_scales() {
        let result = SubTestResult::new(SubTest::Output, 5.0, 0.0, 70.0);
        assert_eq!(result.normalized(), 0.0);

        let result = SubTestResult::new(SubTest::Output, -3.0, 5.0, 70.0);
        assert_eq!(result.normalized(), 0.0);

        let result = SubTestResult::new(SubTest::Output, 12.0, 5.0, 70.0);
        assert_eq!(result.normalized(), 100.0);
    }

    #[test]
    fn failed_suite_carries_error() {
        let suite = TestSuiteResult::failed("gone", "pattern not found");
        assert!(suite.is_failed());
        assert!(suite.sub_tests.is_empty());
        assert_eq!(suite.summary.total, 0);
    }
}
