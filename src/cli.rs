use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::execution::ExecutorProvider;
use crate::features::Feature;
use crate::quality::{OutputFormat, ReportPeriod};

/// Command line interface definition for pattern-qa.
#[derive(Parser, Debug)]
#[command(name = "pattern-qa")]
#[command(about = "Assess, score and certify the quality of analysis patterns")]
#[command(version)]
pub struct Cli {
    /// Pattern library directory (one sub-directory per pattern)
    #[arg(long, global = true, env = "PATTERN_QA_LIBRARY", default_value = "patterns")]
    pub library: PathBuf,

    /// Quality configuration file (JSON); overrides PATTERN_QA_CONFIG
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Execution backend: claude, opencode or simulated
    #[arg(long, global = true, value_parser = parse_provider)]
    pub executor: Option<ExecutorProvider>,

    /// Model passed to the execution backend
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Enable feature flags (comma-separated)
    #[arg(long, global = true, value_enum, value_delimiter = ',')]
    pub features: Option<Vec<Feature>>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

fn parse_provider(value: &str) -> Result<ExecutorProvider, String> {
    value.parse()
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the test suite for patterns and assess their quality
    Assess(AssessArgs),
    /// Library-wide quality metrics
    Metrics(FormatArgs),
    /// Quality report for a period
    Report(ReportArgs),
    /// Compare two saved assessments
    Compare(CompareArgs),
    /// Set a quality goal for a pattern, or show goal progress
    Goal(GoalArgs),
    /// List open action items
    Actions(FormatArgs),
    /// Export the engine state as JSON
    Export(ExportArgs),
    /// Replace the engine state with a previously exported document
    Import(ImportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AssessArgs {
    /// Patterns to assess
    #[arg(value_name = "PATTERN", required_unless_present = "all")]
    pub patterns: Vec<String>,

    /// Assess every pattern in the library
    #[arg(long, conflicts_with = "patterns")]
    pub all: bool,

    /// Use simulated output instead of running the executor
    #[arg(long)]
    pub simulate: bool,

    /// Number of samples to run concurrently
    #[arg(long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Include issues and recommendations in the output
    #[arg(long)]
    pub full: bool,

    /// Save each assessment as JSON (optionally to a specific file)
    #[arg(long, value_name = "FILE")]
    pub save: Option<Option<PathBuf>>,

    /// Compare against a previously saved assessment
    #[arg(long, value_name = "FILE")]
    pub compare: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct FormatArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Period covered: day, week, month or all
    #[arg(long, default_value = "week")]
    pub period: ReportPeriod,

    /// Output format
    #[arg(long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// Earlier assessment file
    pub before: PathBuf,

    /// Later assessment file
    pub after: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct GoalArgs {
    /// Pattern to set a goal for; omit to show progress on every goal
    #[arg(requires = "target")]
    pub pattern: Option<String>,

    /// Target overall score
    #[arg(long, requires = "pattern", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub target: Option<u8>,

    /// What the goal is for
    #[arg(short, long)]
    pub description: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Exported state document
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assess_requires_patterns_or_all() {
        assert!(Cli::try_parse_from(["pattern-qa", "assess"]).is_err());
        assert!(Cli::try_parse_from(["pattern-qa", "assess", "--all"]).is_ok());

        let cli = Cli::try_parse_from(["pattern-qa", "assess", "a", "b", "--save"]).unwrap();
        match cli.command {
            Command::Assess(args) => {
                assert_eq!(args.patterns, vec!["a", "b"]);
                assert_eq!(args.save, Some(None));
                assert_eq!(args.format, OutputFormat::Pretty);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pattern-qa",
            "metrics",
            "--executor",
            "simulated",
            "--features",
            "parallel-tests,strict-execution",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.executor, Some(ExecutorProvider::Simulated));
        assert_eq!(
            cli.features,
            Some(vec![Feature::ParallelTests, Feature::StrictExecution])
        );
        assert_eq!(cli.verbosity, 2);
    }

    #[test]
    fn goal_target_is_bounded() {
        assert!(Cli::try_parse_from(["pattern-qa", "goal", "p", "--target", "101"]).is_err());
        assert!(Cli::try_parse_from(["pattern-qa", "goal", "p"]).is_err());
        assert!(Cli::try_parse_from(["pattern-qa", "goal"]).is_ok());

        let cli =
            Cli::try_parse_from(["pattern-qa", "goal", "p", "--target", "90", "-d", "ship it"])
                .unwrap();
        match cli.command {
            Command::Goal(args) => {
                assert_eq!(args.pattern.as_deref(), Some("p"));
                assert_eq!(args.target, Some(90));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn report_period_parses() {
        let cli = Cli::try_parse_from(["pattern-qa", "report", "--period", "monthly"]).unwrap();
        match cli.command {
            Command::Report(args) => assert_eq!(args.period, ReportPeriod::Month),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
