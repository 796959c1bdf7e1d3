//! Rendering assessments, metrics, reports and comparisons for output.

use clap::ValueEnum;
use serde::Serialize;

use crate::quality::category::Category;
use crate::quality::comparison::AssessmentComparison;
use crate::quality::metrics::{QualityMetrics, QualityReport};
use crate::quality::types::{GoalProgress, QualityAssessment};

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output.
    #[default]
    Pretty,
    Json,
    Markdown,
    /// One line per pattern.
    Compact,
}

/// Width of the score bar in pretty output.
const BAR_WIDTH: usize = 20;

pub fn format_assessment(
    assessment: &QualityAssessment,
    format: OutputFormat,
    verbose: bool,
) -> String {
    match format {
        OutputFormat::Pretty => assessment_pretty(assessment, verbose),
        OutputFormat::Json => to_json(assessment),
        OutputFormat::Markdown => assessment_markdown(assessment, verbose),
        OutputFormat::Compact => assessment_compact(assessment),
    }
}

pub fn format_metrics(metrics: &QualityMetrics, format: OutputFormat) -> String {
    match format {
        OutputFormat::Pretty | OutputFormat::Markdown => metrics_text(metrics, format),
        OutputFormat::Json => to_json(metrics),
        OutputFormat::Compact => format!(
            "{} patterns, {} passing, avg {:.1}",
            metrics.total_patterns,
            metrics.patterns_passing_threshold,
            metrics.average_quality_score
        ),
    }
}

pub fn format_report(report: &QualityReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Pretty => report_pretty(report),
        OutputFormat::Json => to_json(report),
        OutputFormat::Markdown => report_markdown(report),
        OutputFormat::Compact => report
            .pattern_assessments
            .iter()
            .map(assessment_compact)
            .collect(),
    }
}

pub fn format_comparison(comparison: &AssessmentComparison, format: OutputFormat) -> String {
    match format {
        OutputFormat::Pretty => comparison_pretty(comparison),
        OutputFormat::Json => to_json(comparison),
        OutputFormat::Markdown => comparison_markdown(comparison),
        OutputFormat::Compact => format!(
            "{}: {} -> {} ({:+})",
            comparison.after.pattern_name,
            comparison.before.overall_score,
            comparison.after.overall_score,
            comparison.overall_delta
        ),
    }
}

pub fn format_goal_progress(progress: &[GoalProgress], format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(&progress);
    }
    if progress.is_empty() {
        return "No quality goals set\n".to_string();
    }

    let mut output = String::new();
    for p in progress {
        let current = p
            .current_score
            .map_or_else(|| "not assessed".to_string(), |s| s.to_string());
        let status = if p.achieved {
            "achieved".to_string()
        } else {
            format!("{} to go", p.remaining)
        };
        output.push_str(&format!(
            "{} target {} current {} ({})\n",
            p.goal.pattern, p.goal.target_score, current, status
        ));
    }
    output
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Error: {}", e))
}

fn score_bar(score: f64) -> String {
    let filled = ((score.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn assessment_pretty(assessment: &QualityAssessment, verbose: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!("Pattern: {}\n", assessment.pattern_name));
    output.push_str(&format!(
        "Overall Score: {} (grade {}, {})\n",
        assessment.overall_score,
        assessment.grade,
        if assessment.meets_threshold {
            "meets threshold"
        } else {
            "below threshold"
        }
    ));
    output.push_str(&format!("Trend: {}\n", assessment.trend));
    if assessment.is_simulated() {
        output.push_str(&format!(
            "Simulated: {} samples (scores are not genuine quality signal)\n",
            assessment.simulated_samples
        ));
    }
    output.push_str(&format!(
        "Certification: {} ({}/{} requirements)\n\n",
        assessment.certification.tier,
        assessment.certification.requirements_met(),
        assessment.certification.requirements.len()
    ));

    output.push_str("Scores:\n");
    for (category, score) in assessment.scores.iter() {
        output.push_str(&format!(
            "  {:<16} {} {:>5.1}\n",
            category.name(),
            score_bar(*score),
            score
        ));
    }
    output.push('\n');

    if !assessment.issues.is_empty() {
        output.push_str("Critical Issues:\n");
        for issue in &assessment.issues {
            output.push_str(&format!("  ! [{}] {}\n", issue.category, issue.message));
        }
        output.push('\n');
    }

    if !assessment.warnings.is_empty() {
        output.push_str("Warnings:\n");
        for warning in &assessment.warnings {
            output.push_str(&format!("  ~ {}\n", warning.message));
        }
        output.push('\n');
    }

    if !assessment.recommendations.is_empty() {
        output.push_str("Recommendations:\n");
        for rec in &assessment.recommendations {
            output.push_str(&format!(
                "  [{}] {} (impact +{}, effort {})\n",
                rec.priority, rec.title, rec.estimated_impact, rec.estimated_effort
            ));
            if verbose {
                output.push_str(&format!("      {}\n", rec.description));
                for item in &rec.action_items {
                    output.push_str(&format!("      - {}\n", item));
                }
            }
        }
        output.push('\n');
    }

    if verbose && !assessment.certification.next_steps.is_empty() {
        output.push_str("Next Steps:\n");
        for step in &assessment.certification.next_steps {
            output.push_str(&format!("  - {}\n", step));
        }
    }

    output
}

fn assessment_markdown(assessment: &QualityAssessment, verbose: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Quality Assessment: {}\n\n**Overall Score**: {} ({})\n**Meets Threshold**: {}\n**Trend**: {}\n**Certification**: {}\n\n",
        assessment.pattern_name,
        assessment.overall_score,
        assessment.grade,
        if assessment.meets_threshold { "yes" } else { "no" },
        assessment.trend,
        assessment.certification.tier
    ));
    if assessment.is_simulated() {
        output.push_str(&format!(
            "> Simulated output for {} samples; scores are not genuine quality signal.\n\n",
            assessment.simulated_samples
        ));
    }

    output.push_str("## Scores\n\n| Category | Score |\n|----------|-------|\n");
    for (category, score) in assessment.scores.iter() {
        output.push_str(&format!("| {} | {:.1} |\n", category.name(), score));
    }
    output.push('\n');

    if !assessment.issues.is_empty() {
        output.push_str("## Critical Issues\n\n");
        for issue in &assessment.issues {
            output.push_str(&format!("- **{}**: {}\n", issue.category, issue.message));
        }
        output.push('\n');
    }

    if !assessment.recommendations.is_empty() {
        output.push_str("## Recommendations\n\n");
        for rec in &assessment.recommendations {
            output.push_str(&format!(
                "### {} ({})\n\n{}\n\n",
                rec.title, rec.priority, rec.description
            ));
            if verbose {
                for item in &rec.action_items {
                    output.push_str(&format!("- {}\n", item));
                }
                output.push('\n');
            }
        }
    }

    output
}

fn assessment_compact(assessment: &QualityAssessment) -> String {
    let abbreviated: Vec<String> = assessment
        .scores
        .iter()
        .map(|(category, score)| {
            let id = category.to_string();
            format!("{}:{:.0}", &id[..3.min(id.len())], score)
        })
        .collect();
    format!(
        "{} {} {} [{}] {}{}\n",
        assessment.pattern_name,
        assessment.overall_score,
        assessment.grade,
        abbreviated.join(" "),
        assessment.trend,
        if assessment.is_simulated() { " (simulated)" } else { "" }
    )
}

fn metrics_text(metrics: &QualityMetrics, format: OutputFormat) -> String {
    let markdown = format == OutputFormat::Markdown;
    let heading = |title: &str| {
        if markdown {
            format!("## {}\n\n", title)
        } else {
            format!("{}:\n", title)
        }
    };
    let mut output = String::new();

    if markdown {
        output.push_str("# Quality Metrics\n\n");
    }
    output.push_str(&format!(
        "Patterns: {}\nPassing threshold: {}\nAverage score: {:.1}\n",
        metrics.total_patterns, metrics.patterns_passing_threshold, metrics.average_quality_score
    ));
    if metrics.simulated_patterns > 0 {
        output.push_str(&format!("Simulated: {}\n", metrics.simulated_patterns));
    }
    output.push('\n');

    output.push_str(&heading("Grade Distribution"));
    for (grade, count) in &metrics.quality_distribution {
        output.push_str(&format!("  {}: {}\n", grade, count));
    }
    output.push('\n');

    output.push_str(&heading("Trends"));
    output.push_str(&format!(
        "  improving: {}\n  stable: {}\n  declining: {}\n\n",
        metrics.trend_analysis.improving,
        metrics.trend_analysis.stable,
        metrics.trend_analysis.declining
    ));

    if !metrics.top_performing_patterns.is_empty() {
        output.push_str(&heading("Top Performing"));
        for p in &metrics.top_performing_patterns {
            output.push_str(&format!("  {} {} ({})\n", p.pattern, p.overall_score, p.grade));
        }
        output.push('\n');
    }

    if !metrics.patterns_needing_attention.is_empty() {
        output.push_str(&heading("Needs Attention"));
        for p in &metrics.patterns_needing_attention {
            output.push_str(&format!(
                "  {} {} ({}, {})\n",
                p.pattern, p.overall_score, p.grade, p.trend
            ));
        }
    }

    output
}

fn report_pretty(report: &QualityReport) -> String {
    let mut output = String::new();
    let summary = &report.summary;

    output.push_str(&format!(
        "Quality Report ({}), generated {}\n\n",
        report.period,
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    output.push_str(&format!(
        "Assessed: {}  Passing: {}  Certified: {}  Average: {:.1}  Critical issues: {}  Simulated: {}\n\n",
        summary.patterns_assessed,
        summary.passing_threshold,
        summary.certified,
        summary.average_score,
        summary.critical_issues,
        summary.simulated
    ));

    if summary.patterns_assessed > 0 {
        output.push_str("Category Averages:\n");
        for category in Category::ALL {
            let avg = summary.category_averages[category];
            output.push_str(&format!(
                "  {:<16} {} {:>5.1}\n",
                category.name(),
                score_bar(avg),
                avg
            ));
        }
        output.push('\n');

        output.push_str("Patterns:\n");
        for assessment in &report.pattern_assessments {
            output.push_str("  ");
            output.push_str(&assessment_compact(assessment));
        }
        output.push('\n');
    }

    if !report.system_recommendations.is_empty() {
        output.push_str("Recommendations:\n");
        for rec in &report.system_recommendations {
            output.push_str(&format!("  - {}\n", rec));
        }
        output.push('\n');
    }

    if !report.action_plan.is_empty() {
        output.push_str("Action Plan:\n");
        for item in &report.action_plan {
            output.push_str(&format!(
                "  [{}] {}: {}\n",
                item.priority, item.pattern, item.title
            ));
        }
    }

    output
}

fn report_markdown(report: &QualityReport) -> String {
    let mut output = String::new();
    let summary = &report.summary;

    output.push_str(&format!(
        "# Quality Report\n\n**Period**: {}\n**Generated**: {}\n\n",
        report.period,
        report.generated_at.to_rfc3339()
    ));
    output.push_str(&format!(
        "## Summary\n\n| Metric | Value |\n|--------|-------|\n| Patterns assessed | {} |\n| Passing threshold | {} |\n| Certified | {} |\n| Average score | {:.1} |\n| Critical issues | {} |\n| Simulated | {} |\n\n",
        summary.patterns_assessed,
        summary.passing_threshold,
        summary.certified,
        summary.average_score,
        summary.critical_issues,
        summary.simulated
    ));

    if !report.pattern_assessments.is_empty() {
        output.push_str("## Patterns\n\n| Pattern | Score | Grade | Trend | Certification |\n|---------|-------|-------|-------|---------------|\n");
        for a in &report.pattern_assessments {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                a.pattern_name, a.overall_score, a.grade, a.trend, a.certification.tier
            ));
        }
        output.push('\n');
    }

    if !report.system_recommendations.is_empty() {
        output.push_str("## Recommendations\n\n");
        for rec in &report.system_recommendations {
            output.push_str(&format!("- {}\n", rec));
        }
        output.push('\n');
    }

    if !report.action_plan.is_empty() {
        output.push_str("## Action Plan\n\n");
        for item in &report.action_plan {
            output.push_str(&format!(
                "- **{}** ({}, {}): {}\n",
                item.pattern, item.category, item.priority, item.title
            ));
        }
    }

    output
}

fn comparison_pretty(comparison: &AssessmentComparison) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Assessment Comparison: {}\n\nBefore: {} -> After: {} ({:+})\n\n",
        comparison.after.pattern_name,
        comparison.before.overall_score,
        comparison.after.overall_score,
        comparison.overall_delta
    ));

    if !comparison.improvements.is_empty() {
        output.push_str("Improvements:\n");
        for imp in &comparison.improvements {
            output.push_str(&format!("  + {}\n", imp));
        }
        output.push('\n');
    }

    if !comparison.regressions.is_empty() {
        output.push_str("Regressions:\n");
        for reg in &comparison.regressions {
            output.push_str(&format!("  - {}\n", reg));
        }
        output.push('\n');
    }

    output
}

fn comparison_markdown(comparison: &AssessmentComparison) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Assessment Comparison: {}\n\n**Before**: {}\n**After**: {}\n**Change**: {:+}\n\n",
        comparison.after.pattern_name,
        comparison.before.overall_score,
        comparison.after.overall_score,
        comparison.overall_delta
    ));

    if !comparison.improvements.is_empty() {
        output.push_str("## Improvements\n\n");
        for imp in &comparison.improvements {
            output.push_str(&format!("- {}\n", imp));
        }
        output.push('\n');
    }

    if !comparison.regressions.is_empty() {
        output.push_str("## Regressions\n\n");
        for reg in &comparison.regressions {
            output.push_str(&format!("- {}\n", reg));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::comparison::compare_assessments;
    use crate::quality::metrics::quality_metrics;
    use crate::test_utils::make_assessment;
    use chrono::{TimeZone, Utc};

    fn assessment(score: u8) -> QualityAssessment {
        make_assessment("summarize", score, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn pretty_format_includes_score_and_grade() {
        let output = format_assessment(&assessment(84), OutputFormat::Pretty, false);
        assert!(output.contains("Overall Score: 84 (grade B"));
        assert!(output.contains("Output Quality"));
    }

    #[test]
    fn compact_format_is_one_line() {
        let output = format_assessment(&assessment(84), OutputFormat::Compact, false);
        assert_eq!(output.lines().count(), 1);
        assert!(output.contains("out:84"));
    }

    #[test]
    fn json_format_is_valid() {
        let output = format_assessment(&assessment(72), OutputFormat::Json, false);
        let parsed: Result<QualityAssessment, _> = serde_json::from_str(&output);
        assert_eq!(parsed.unwrap(), assessment(72));
    }

    #[test]
    fn simulated_assessment_is_marked() {
        let mut simulated = assessment(84);
        simulated.simulated_samples = 2;

        let pretty = format_assessment(&simulated, OutputFormat::Pretty, false);
        assert!(pretty.contains("Simulated: 2 samples"));
        let compact = format_assessment(&simulated, OutputFormat::Compact, false);
        assert!(compact.trim_end().ends_with("(simulated)"));

        let plain = format_assessment(&assessment(84), OutputFormat::Pretty, false);
        assert!(!plain.contains("Simulated"));

        let metrics = quality_metrics(&[simulated, assessment(91)]);
        assert_eq!(metrics.simulated_patterns, 1);
        assert!(format_metrics(&metrics, OutputFormat::Pretty).contains("Simulated: 1"));
    }

    #[test]
    fn score_bar_scales() {
        assert_eq!(score_bar(0.0).chars().filter(|c| *c == '█').count(), 0);
        assert_eq!(score_bar(50.0).chars().filter(|c| *c == '█').count(), 10);
        assert_eq!(score_bar(150.0).chars().filter(|c| *c == '█').count(), 20);
    }

    #[test]
    fn metrics_markdown_has_headings() {
        let assessments = vec![assessment(91)];
        let output = format_metrics(&quality_metrics(&assessments), OutputFormat::Markdown);
        assert!(output.starts_with("# Quality Metrics"));
        assert!(output.contains("## Grade Distribution"));
    }

    #[test]
    fn comparison_compact_shows_delta() {
        let comparison = compare_assessments(assessment(70), assessment(78));
        let output = format_comparison(&comparison, OutputFormat::Compact);
        assert_eq!(output, "summarize: 70 -> 78 (+8)");
    }
}
