//! Structural validation of pattern artifacts.
//!
//! The validator never fails: malformed text is reported as a critical issue
//! and zeroes both structural sub-scores.

use serde::{Deserialize, Serialize};

use crate::models::{Issue, Severity};
use crate::pattern::{PatternDocument, Section};
use crate::quality::category::Category;
use crate::utils::word_count;

/// Kind of block a marker identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Identity,
    Purpose,
    Steps,
    Output,
    Instructions,
}

impl SectionKind {
    fn default_marker(&self) -> &'static str {
        match self {
            Self::Identity => "IDENTITY",
            Self::Purpose => "PURPOSE",
            Self::Steps => "STEPS",
            Self::Output => "OUTPUT",
            Self::Instructions => "INSTRUCTIONS",
        }
    }
}

/// Heading marker used to find a block of a given kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMarker {
    pub kind: SectionKind,
    pub marker: String,
}

impl SectionMarker {
    pub fn new(kind: SectionKind, marker: impl Into<String>) -> Self {
        Self {
            kind,
            marker: marker.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub section_markers: Vec<SectionMarker>,
    /// Terms that make an identity block read as a role description.
    pub role_terms: Vec<String>,
    pub min_word_count: usize,
    pub min_identity_chars: usize,
    pub min_steps: usize,
    pub min_step_chars: usize,
    pub min_output_sections: usize,
    pub min_section_name_chars: usize,
    /// Output sections every pattern must declare.
    pub required_output_sections: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            section_markers: [
                SectionKind::Identity,
                SectionKind::Purpose,
                SectionKind::Steps,
                SectionKind::Output,
                SectionKind::Instructions,
            ]
            .iter()
            .map(|kind| SectionMarker::new(*kind, kind.default_marker()))
            .collect(),
            role_terms: [
                "expert",
                "you are",
                "specialist",
                "analyst",
                "assistant",
                "consultant",
                "reviewer",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_word_count: 200,
            min_identity_chars: 20,
            min_steps: 3,
            min_step_chars: 10,
            min_output_sections: 3,
            min_section_name_chars: 3,
            required_output_sections: Vec::new(),
        }
    }
}

impl ValidatorConfig {
    /// Heading marker for `kind`, falling back to the built-in one.
    pub fn marker(&self, kind: SectionKind) -> &str {
        self.section_markers
            .iter()
            .find(|m| m.kind == kind)
            .map(|m| m.marker.as_str())
            .unwrap_or_else(|| kind.default_marker())
    }
}

/// Pass/fail facts about a pattern's structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceChecks {
    pub has_identity: bool,
    pub has_purpose: bool,
    pub has_steps: bool,
    pub has_output: bool,
    pub has_instructions: bool,
    pub follows_structure: bool,
    pub meets_minimum_word_count: bool,
    pub has_required_output_sections: bool,
}

impl ComplianceChecks {
    pub fn get(&self, check: ComplianceCheck) -> bool {
        match check {
            ComplianceCheck::Identity => self.has_identity,
            ComplianceCheck::Purpose => self.has_purpose,
            ComplianceCheck::Steps => self.has_steps,
            ComplianceCheck::Output => self.has_output,
            ComplianceCheck::Instructions => self.has_instructions,
            ComplianceCheck::Structure => self.follows_structure,
            ComplianceCheck::WordCount => self.meets_minimum_word_count,
            ComplianceCheck::RequiredOutputSections => self.has_required_output_sections,
        }
    }

    /// The six checks that count towards standards compliance.
    pub fn standards_checks(&self) -> [bool; 6] {
        [
            self.has_identity,
            self.has_purpose,
            self.has_steps,
            self.has_output,
            self.has_instructions,
            self.follows_structure,
        ]
    }

    pub fn standards_met(&self) -> usize {
        self.standards_checks().iter().filter(|c| **c).count()
    }
}

/// One structural check with its fixed deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceCheck {
    Identity,
    Purpose,
    Steps,
    Output,
    Instructions,
    Structure,
    WordCount,
    RequiredOutputSections,
}

impl ComplianceCheck {
    pub const ALL: [ComplianceCheck; 8] = [
        ComplianceCheck::Identity,
        ComplianceCheck::Purpose,
        ComplianceCheck::Instructions,
        ComplianceCheck::WordCount,
        ComplianceCheck::Steps,
        ComplianceCheck::Output,
        ComplianceCheck::Structure,
        ComplianceCheck::RequiredOutputSections,
    ];

    /// Which sub-score a failure is deducted from.
    pub fn category(&self) -> Category {
        match self {
            Self::Identity | Self::Purpose | Self::Instructions | Self::WordCount => {
                Category::Syntax
            }
            Self::Steps | Self::Output | Self::Structure | Self::RequiredOutputSections => {
                Category::Structure
            }
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Identity | Self::Steps | Self::Output => Severity::Critical,
            Self::Purpose | Self::Instructions | Self::Structure | Self::RequiredOutputSections => {
                Severity::Major
            }
            Self::WordCount => Severity::Minor,
        }
    }

    pub fn deduction(&self) -> f64 {
        match self {
            Self::Identity | Self::Steps | Self::Output => 20.0,
            Self::Instructions | Self::RequiredOutputSections => 15.0,
            Self::Purpose | Self::Structure => 10.0,
            Self::WordCount => 5.0,
        }
    }

    fn failure(&self, config: &ValidatorConfig) -> (String, String) {
        match self {
            Self::Identity => (
                format!(
                    "Identity block missing, shorter than {} characters, or not framed as a role",
                    config.min_identity_chars
                ),
                "Open with an IDENTITY section that describes the expert role the model plays"
                    .to_string(),
            ),
            Self::Purpose => (
                "No stated purpose".to_string(),
                "Describe the goal of the pattern in the IDENTITY and PURPOSE section".to_string(),
            ),
            Self::Steps => (
                format!(
                    "Fewer than {} substantive steps (each at least {} characters)",
                    config.min_steps, config.min_step_chars
                ),
                "List the analysis steps as bullet points in a STEPS section".to_string(),
            ),
            Self::Output => (
                format!(
                    "Fewer than {} declared output sections",
                    config.min_output_sections
                ),
                "Declare each expected output section in an OUTPUT SECTIONS block".to_string(),
            ),
            Self::Instructions => (
                "No output instructions block".to_string(),
                "Add an OUTPUT INSTRUCTIONS section describing format constraints".to_string(),
            ),
            Self::Structure => (
                "Sections are missing or out of canonical order".to_string(),
                "Order blocks as IDENTITY, STEPS, OUTPUT INSTRUCTIONS".to_string(),
            ),
            Self::WordCount => (
                format!("Pattern is shorter than {} words", config.min_word_count),
                "Expand the steps and instructions with more detail".to_string(),
            ),
            Self::RequiredOutputSections => (
                format!(
                    "Required output sections not declared: {}",
                    config.required_output_sections.join(", ")
                ),
                "Declare every required output section".to_string(),
            ),
        }
    }
}

/// Outcome of validating one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: ComplianceChecks,
    pub issues: Vec<Issue>,
    pub syntax_score: f64,
    pub structure_score: f64,
    pub malformed: bool,
}

impl ValidationReport {
    fn malformed(reason: &str) -> Self {
        Self {
            checks: ComplianceChecks::default(),
            issues: vec![Issue::critical(
                Category::Syntax.to_string(),
                format!("Malformed pattern: {}", reason),
                "Fix the pattern file so it parses as markdown with top-level sections",
            )],
            syntax_score: 0.0,
            structure_score: 0.0,
            malformed: true,
        }
    }

    /// Mean of the syntax and structure sub-scores.
    pub fn validation_score(&self) -> f64 {
        (self.syntax_score + self.structure_score) / 2.0
    }
}

/// Checks a pattern's declared sections and instructions.
#[derive(Debug, Clone, Default)]
pub struct StructuralValidator {
    config: ValidatorConfig,
}

impl StructuralValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn validate(&self, text: &str) -> ValidationReport {
        if let Some(reason) = malformed_reason(text) {
            return ValidationReport::malformed(reason);
        }

        let document = PatternDocument::parse(text);
        let checks = self.run_checks(text, &document);

        let mut report = ValidationReport {
            checks,
            issues: Vec::new(),
            syntax_score: 100.0,
            structure_score: 100.0,
            malformed: false,
        };

        for check in ComplianceCheck::ALL {
            if checks.get(check) {
                continue;
            }
            let (message, suggestion) = check.failure(&self.config);
            let category = check.category();
            report.issues.push(Issue::new(
                check.severity(),
                category.to_string(),
                message,
                suggestion,
            ));
            let score = match category {
                Category::Syntax => &mut report.syntax_score,
                _ => &mut report.structure_score,
            };
            *score = (*score - check.deduction()).max(0.0);
        }

        report
    }

    fn run_checks(&self, text: &str, document: &PatternDocument) -> ComplianceChecks {
        let config = &self.config;
        let identity = document.section_with(config.marker(SectionKind::Identity));
        let output_block = self.output_block(document);
        let declared = output_block
            .map(Section::declared_sections)
            .unwrap_or_default();

        let identity_position = document.position_of(config.marker(SectionKind::Identity));
        let steps_position = document.position_of(config.marker(SectionKind::Steps));
        let instructions_position =
            document.position_of(config.marker(SectionKind::Instructions));

        ComplianceChecks {
            has_identity: identity.is_some_and(|s| self.is_role_description(&s.body)),
            has_purpose: document
                .section_with(config.marker(SectionKind::Purpose))
                .is_some()
                || identity.is_some_and(|s| states_purpose(&s.body)),
            has_steps: self.substantive_steps(document) >= config.min_steps,
            has_output: declared
                .iter()
                .filter(|name| name.chars().count() >= config.min_section_name_chars)
                .count()
                >= config.min_output_sections,
            has_instructions: instructions_position.is_some(),
            follows_structure: matches!(
                (identity_position, steps_position, instructions_position),
                (Some(i), Some(s), Some(o)) if i < s && s < o
            ),
            meets_minimum_word_count: word_count(text) >= config.min_word_count,
            has_required_output_sections: config.required_output_sections.iter().all(|required| {
                declared
                    .iter()
                    .any(|name| name.to_uppercase().contains(&required.to_uppercase()))
            }),
        }
    }

    fn output_block<'a>(&self, document: &'a PatternDocument) -> Option<&'a Section> {
        document.output_block_with(
            self.config.marker(SectionKind::Output),
            self.config.marker(SectionKind::Instructions),
        )
    }

    fn substantive_steps(&self, document: &PatternDocument) -> usize {
        document
            .section_with(self.config.marker(SectionKind::Steps))
            .map(|s| {
                s.list_items()
                    .iter()
                    .filter(|step| step.chars().count() >= self.config.min_step_chars)
                    .count()
            })
            .unwrap_or(0)
    }

    fn is_role_description(&self, identity: &str) -> bool {
        let lowered = identity.to_lowercase();
        identity.trim().chars().count() >= self.config.min_identity_chars
            && self
                .config
                .role_terms
                .iter()
                .any(|term| lowered.contains(&term.to_lowercase()))
    }
}

fn states_purpose(identity: &str) -> bool {
    let lowered = identity.to_lowercase();
    ["purpose", "goal", "your task", "you will"]
        .iter()
        .any(|term| lowered.contains(term))
}

fn malformed_reason(text: &str) -> Option<&'static str> {
    if text.trim().is_empty() {
        Some("pattern text is empty")
    } else if text.contains('\0') {
        Some("pattern text contains binary data")
    } else if !PatternDocument::parse(text).has_headings() {
        Some("pattern has no top-level sections")
    } else {
        None
    }
}
