use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::pattern::PatternDocument;

/// An analysis pattern as loaded from the library.
///
/// The raw instruction text is kept verbatim; everything else is derived from
/// it once, at load time, and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternArtifact {
    pub name: String,
    pub instructions: String,
    /// Section names the pattern asks the model to emit.
    pub output_sections: Vec<String>,
    /// The pattern asks for numeric scores or ratings.
    pub has_scoring: bool,
    /// The pattern asks for prioritized (HIGH/MEDIUM/LOW) output.
    pub has_prioritization: bool,
}

impl PatternArtifact {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            output_sections: Vec::new(),
            has_scoring: false,
            has_prioritization: false,
        }
    }

    pub fn with_output_sections(mut self, sections: Vec<String>) -> Self {
        self.output_sections = sections;
        self
    }

    pub fn with_scoring(mut self, has_scoring: bool) -> Self {
        self.has_scoring = has_scoring;
        self
    }

    pub fn with_prioritization(mut self, has_prioritization: bool) -> Self {
        self.has_prioritization = has_prioritization;
        self
    }

    /// Build an artifact from a pattern's markdown source.
    pub fn from_markdown(name: impl Into<String>, markdown: &str) -> Self {
        let document = PatternDocument::parse(markdown);
        let lowered = markdown.to_lowercase();
        let has_scoring = ["score", "rating", "rate each", "out of 10", "out of 100"]
            .iter()
            .any(|term| lowered.contains(term));
        let has_prioritization = lowered.contains("priorit")
            || ["HIGH", "MEDIUM", "LOW"]
                .iter()
                .filter(|marker| markdown.contains(*marker))
                .count()
                >= 2;

        Self {
            name: name.into(),
            instructions: markdown.to_string(),
            output_sections: document.declared_output_sections(),
            has_scoring,
            has_prioritization,
        }
    }
}

/// Expected quality label attached to a sample input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedQuality {
    High,
    Medium,
    Low,
}

impl ExpectedQuality {
    /// Lowest output score consistent with the label.
    pub fn min_score(&self) -> u8 {
        match self {
            Self::High => 80,
            Self::Medium => 60,
            Self::Low => 0,
        }
    }
}

impl Display for ExpectedQuality {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for ExpectedQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!("Unknown expected quality: {}", s)),
        }
    }
}

/// One test case fed to a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleInput {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub expected_quality: Option<ExpectedQuality>,
}

impl SampleInput {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            expected_quality: None,
        }
    }

    pub fn with_expected_quality(mut self, quality: ExpectedQuality) -> Self {
        self.expected_quality = Some(quality);
        self
    }
}

/// Optional usage telemetry for a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    pub user_rating: f64,
    pub usage_count: u64,
}

/// Issue severity, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
        }
    }
}

/// A problem found while validating or testing a pattern.
///
/// Issues never abort anything: they are recorded and drive score deductions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub category: String,
    pub message: String,
    pub suggestion: String,
}

impl Issue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn critical(
        category: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Critical, category, message, suggestion)
    }

    pub fn major(
        category: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Major, category, message, suggestion)
    }

    pub fn minor(
        category: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Minor, category, message, suggestion)
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_critical_first() {
        let mut severities = vec![Severity::Minor, Severity::Critical, Severity::Major];
        severities.sort();
        assert_eq!(
            severities,
            vec![Severity::Critical, Severity::Major, Severity::Minor]
        );
    }

    #[test]
    fn expected_quality_parse() {
        assert_eq!(
            "HIGH".parse::<ExpectedQuality>().unwrap(),
            ExpectedQuality::High
        );
        assert_eq!(
            " low ".parse::<ExpectedQuality>().unwrap(),
            ExpectedQuality::Low
        );
        assert!("great".parse::<ExpectedQuality>().is_err());
    }

    #[test]
    fn artifact_from_markdown_detects_scoring() {
        let markdown = "# IDENTITY\nYou are an expert.\n\n# OUTPUT SECTIONS\n- SUMMARY: a summary\n- SCORE: rate each idea out of 10\n";
        let artifact = PatternArtifact::from_markdown("rate_ideas", markdown);

        assert_eq!(artifact.name, "rate_ideas");
        assert!(artifact.has_scoring);
        assert!(!artifact.has_prioritization);
        assert_eq!(artifact.output_sections, vec!["SUMMARY", "SCORE"]);
    }

    #[test]
    fn issue_display() {
        let issue = Issue::major("structure", "Missing steps", "Add a STEPS section");
        assert_eq!(issue.to_string(), "[major] structure: Missing steps");
    }
}
