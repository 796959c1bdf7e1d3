//! Output testing: runs a pattern against sample inputs and scores what comes
//! back.
//!
//! Each sample is isolated: an execution failure becomes a zero-score result
//! with one critical issue and the remaining samples still run.

pub mod signals;
pub mod simulate;

pub use simulate::{simulate_output, SimulatedExecutor};

use std::thread;
use std::time::Instant;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::execution::PatternExecutor;
use crate::models::{Issue, PatternArtifact, SampleInput, Severity};
use crate::quality::category::Category;
use crate::utils::{round_score, word_count};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesterConfig {
    /// Minimum words for output to count as complete.
    pub min_output_words: usize,
    /// Minimum characters for output to count as professional.
    pub min_professional_chars: usize,
    pub pass_score: u8,
    /// Fraction of declared sections that must appear for a pass.
    pub min_section_coverage: f64,
    /// Actionability below this raises a minor issue.
    pub min_actionability: u8,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            min_output_words: 100,
            min_professional_chars: 100,
            pass_score: 70,
            min_section_coverage: 0.8,
            min_actionability: 50,
        }
    }
}

/// Content-quality signals found in generated output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentQuality {
    pub has_examples: bool,
    pub has_recommendations: bool,
    pub has_metrics: bool,
    pub has_priority_markers: bool,
    pub is_professional: bool,
    pub meets_length: bool,
}

impl ContentQuality {
    pub fn fraction(&self) -> f64 {
        fraction(&[
            self.has_examples,
            self.has_recommendations,
            self.has_metrics,
            self.has_priority_markers,
            self.is_professional,
            self.meets_length,
        ])
    }
}

/// Format-compliance signals found in generated output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatCompliance {
    pub has_markdown_structure: bool,
    pub includes_declared_section: bool,
    pub consistent_formatting: bool,
    pub has_scoring_format: bool,
    pub meets_word_count: bool,
}

impl FormatCompliance {
    pub fn fraction(&self) -> f64 {
        fraction(&[
            self.has_markdown_structure,
            self.includes_declared_section,
            self.consistent_formatting,
            self.has_scoring_format,
            self.meets_word_count,
        ])
    }
}

fn fraction(flags: &[bool]) -> f64 {
    if flags.is_empty() {
        return 0.0;
    }
    flags.iter().filter(|f| **f).count() as f64 / flags.len() as f64
}

/// Structured analysis of one piece of generated output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputAnalysis {
    pub sections_expected: usize,
    pub sections_matched: usize,
    pub generated_sections: Vec<String>,
    pub content_quality: ContentQuality,
    pub format_compliance: FormatCompliance,
    pub specificity_score: u8,
    pub actionability_score: u8,
    pub word_count: usize,
}

impl OutputAnalysis {
    /// Share of declared sections present; 1 when none are declared.
    pub fn section_coverage(&self) -> f64 {
        if self.sections_expected == 0 {
            1.0
        } else {
            self.sections_matched as f64 / self.sections_expected as f64
        }
    }

    /// Weighted 0-100 score: coverage 40%, content 30%, format 20%,
    /// specificity/actionability 10%.
    pub fn score(&self) -> u8 {
        let quality = (self.specificity_score as f64 + self.actionability_score as f64) / 2.0;
        round_score(
            40.0 * self.section_coverage()
                + 30.0 * self.content_quality.fraction()
                + 20.0 * self.format_compliance.fraction()
                + 10.0 * quality / 100.0,
        )
    }
}

/// Outcome of running one sample through one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub sample_id: String,
    pub passed: bool,
    pub score: u8,
    pub elapsed_ms: u64,
    #[serde(default)]
    pub simulated: bool,
    pub analysis: OutputAnalysis,
    pub issues: Vec<Issue>,
}

impl TestResult {
    /// Zero-score result for a sample that produced no output.
    pub fn execution_failure(sample_id: impl Into<String>, error: &str, elapsed_ms: u64) -> Self {
        Self {
            sample_id: sample_id.into(),
            passed: false,
            score: 0,
            elapsed_ms,
            simulated: false,
            analysis: OutputAnalysis::default(),
            issues: vec![Issue::critical(
                Category::Output.to_string(),
                format!("Execution failed: {}", error),
                "Check that the executor is reachable and the pattern accepts this input",
            )],
        }
    }

    pub fn critical_issues(&self) -> usize {
        self.issues.iter().filter(|i| i.is_critical()).count()
    }
}

/// Overall health of a test suite run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteHealth {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl std::fmt::Display for SuiteHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "excellent"),
            Self::Good => write!(f, "good"),
            Self::Fair => write!(f, "fair"),
            Self::Poor => write!(f, "poor"),
        }
    }
}

/// Aggregate view over a set of test results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub average_score: f64,
    pub pass_rate: f64,
    pub critical_issues: usize,
    pub simulated: usize,
    pub health: SuiteHealth,
}

impl TestSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let critical_issues = results.iter().map(TestResult::critical_issues).sum();
        let (average_score, pass_rate) = if total == 0 {
            (0.0, 0.0)
        } else {
            (
                results.iter().map(|r| r.score as f64).sum::<f64>() / total as f64,
                passed as f64 / total as f64,
            )
        };

        Self {
            total,
            passed,
            failed: total - passed,
            average_score,
            pass_rate,
            critical_issues,
            simulated: results.iter().filter(|r| r.simulated).count(),
            health: classify_health(average_score, pass_rate, critical_issues),
        }
    }
}

pub fn classify_health(average_score: f64, pass_rate: f64, critical_issues: usize) -> SuiteHealth {
    if average_score >= 85.0 && pass_rate >= 0.9 && critical_issues == 0 {
        SuiteHealth::Excellent
    } else if average_score >= 70.0 && pass_rate >= 0.8 && critical_issues == 0 {
        SuiteHealth::Good
    } else if average_score >= 60.0 && pass_rate >= 0.6 {
        SuiteHealth::Fair
    } else {
        SuiteHealth::Poor
    }
}

/// Runs and scores sample inputs against a pattern.
#[derive(Debug, Clone)]
pub struct OutputTester {
    config: TesterConfig,
    max_parallel: usize,
}

impl Default for OutputTester {
    fn default() -> Self {
        Self::new(TesterConfig::default())
    }
}

impl OutputTester {
    pub fn new(config: TesterConfig) -> Self {
        Self {
            config,
            max_parallel: 1,
        }
    }

    /// Set maximum samples executed concurrently.
    pub fn with_parallelism(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn config(&self) -> &TesterConfig {
        &self.config
    }

    /// Analyze output text against the artifact's declarations.
    pub fn analyze(&self, artifact: &PatternArtifact, output: &str) -> OutputAnalysis {
        let generated_sections = signals::section_headers(output);
        let sections_matched =
            signals::matched_sections(&artifact.output_sections, &generated_sections);
        let min_words = self.config.min_output_words;
        let meets_length = signals::meets_word_count(output, min_words);

        OutputAnalysis {
            sections_expected: artifact.output_sections.len(),
            sections_matched,
            generated_sections,
            content_quality: ContentQuality {
                has_examples: signals::has_examples(output),
                has_recommendations: signals::has_recommendations(output),
                has_metrics: signals::has_metrics(output),
                has_priority_markers: signals::has_priority_markers(output),
                is_professional: signals::is_professional(
                    output,
                    self.config.min_professional_chars,
                ),
                meets_length,
            },
            format_compliance: FormatCompliance {
                has_markdown_structure: signals::has_markdown_structure(output),
                includes_declared_section: signals::includes_declared_section(
                    output,
                    &artifact.output_sections,
                ),
                consistent_formatting: signals::has_consistent_formatting(output),
                has_scoring_format: !artifact.has_scoring || signals::has_scoring_pattern(output),
                meets_word_count: meets_length,
            },
            specificity_score: signals::specificity_score(output),
            actionability_score: signals::actionability_score(output),
            word_count: word_count(output),
        }
    }

    /// Score output that is already in hand.
    pub fn evaluate(
        &self,
        artifact: &PatternArtifact,
        sample: &SampleInput,
        output: &str,
        elapsed_ms: u64,
        simulated: bool,
    ) -> TestResult {
        let analysis = self.analyze(artifact, output);
        let score = analysis.score();
        let coverage_met = analysis.sections_matched as f64
            >= self.config.min_section_coverage * analysis.sections_expected as f64;
        let mut issues = self.issues_for(artifact, &analysis, simulated);
        if let Some(expected) = sample.expected_quality {
            if !simulated && score < expected.min_score() {
                issues.push(Issue::minor(
                    Category::Output.to_string(),
                    format!(
                        "Sample '{}' is labelled {} quality but scored {}",
                        sample.id, expected, score
                    ),
                    "Compare the output for this sample against the pattern's instructions",
                ));
            }
        }

        TestResult {
            sample_id: sample.id.clone(),
            passed: score >= self.config.pass_score && coverage_met,
            score,
            elapsed_ms,
            simulated,
            analysis,
            issues,
        }
    }

    /// Execute one sample and score it; failures become zero-score results.
    pub fn run_sample(
        &self,
        artifact: &PatternArtifact,
        sample: &SampleInput,
        executor: &dyn PatternExecutor,
    ) -> TestResult {
        let started = Instant::now();
        let outcome = executor.run(artifact, sample);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                let result =
                    self.evaluate(artifact, sample, &output.text, elapsed_ms, output.simulated);
                debug!(
                    "  {} -> {} ({}/{} sections){}",
                    sample.id,
                    result.score,
                    result.analysis.sections_matched,
                    result.analysis.sections_expected,
                    if result.simulated { " [simulated]" } else { "" }
                );
                result
            }
            Err(err) => {
                warn!("Sample '{}' failed: {}", sample.id, err);
                TestResult::execution_failure(&sample.id, &err.to_string(), elapsed_ms)
            }
        }
    }

    /// Run every sample; results come back in input order.
    pub fn run(
        &self,
        artifact: &PatternArtifact,
        samples: &[SampleInput],
        executor: &dyn PatternExecutor,
    ) -> Vec<TestResult> {
        info!(
            "Testing '{}' against {} samples ({} parallel)",
            artifact.name,
            samples.len(),
            self.max_parallel
        );

        if self.max_parallel <= 1 {
            return samples
                .iter()
                .map(|sample| self.run_sample(artifact, sample, executor))
                .collect();
        }

        let mut results = Vec::with_capacity(samples.len());
        for chunk in samples.chunks(self.max_parallel) {
            let batch: Vec<TestResult> = thread::scope(|scope| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|sample| {
                        (
                            sample,
                            scope.spawn(move || self.run_sample(artifact, sample, executor)),
                        )
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|(sample, handle)| {
                        handle.join().unwrap_or_else(|_| {
                            TestResult::execution_failure(
                                &sample.id,
                                "executor panicked",
                                0,
                            )
                        })
                    })
                    .collect()
            });
            results.extend(batch);
        }
        results
    }

    fn issues_for(
        &self,
        artifact: &PatternArtifact,
        analysis: &OutputAnalysis,
        simulated: bool,
    ) -> Vec<Issue> {
        let output = Category::Output.to_string();
        let mut issues = Vec::new();

        if analysis.sections_matched < analysis.sections_expected {
            let headers: Vec<String> = analysis.generated_sections.clone();
            let missing: Vec<&str> = artifact
                .output_sections
                .iter()
                .filter(|s| signals::matched_sections(std::slice::from_ref(*s), &headers) == 0)
                .map(String::as_str)
                .collect();
            issues.push(Issue::major(
                output.clone(),
                format!(
                    "Missing {} of {} declared sections: {}",
                    analysis.sections_expected - analysis.sections_matched,
                    analysis.sections_expected,
                    missing.join(", ")
                ),
                "Make the output instructions name every section explicitly",
            ));
        }
        if artifact.has_scoring && !analysis.format_compliance.has_scoring_format {
            issues.push(Issue::major(
                output.clone(),
                "Pattern asks for scores but the output contains none",
                "Specify the scoring format (e.g. `Score: N/10`) in the output instructions",
            ));
        }
        if artifact.has_prioritization && !analysis.content_quality.has_priority_markers {
            issues.push(Issue::major(
                output.clone(),
                "Pattern asks for prioritized output but no item is marked",
                "Require an explicit HIGH/MEDIUM/LOW marker on each item",
            ));
        }
        if !analysis.content_quality.meets_length {
            issues.push(Issue::minor(
                output.clone(),
                format!(
                    "Output has {} words, fewer than {}",
                    analysis.word_count, self.config.min_output_words
                ),
                "Ask for more detail per section",
            ));
        }
        if !analysis.content_quality.is_professional {
            issues.push(Issue::minor(
                output.clone(),
                "Output is too short or uses unprofessional language",
                "Set tone expectations in the output instructions",
            ));
        }
        if analysis.actionability_score < self.config.min_actionability {
            issues.push(Issue::minor(
                output.clone(),
                format!("Low actionability ({})", analysis.actionability_score),
                "Ask for concrete, prioritized recommendations",
            ));
        }
        if simulated {
            issues.push(Issue::new(
                Severity::Minor,
                output,
                "Output was simulated; content signals are placeholders",
                "Run with a real executor to measure output quality",
            ));
        }
        issues
    }
}
