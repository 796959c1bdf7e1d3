//! Deterministic stand-in for real pattern execution.

use crate::execution::{ExecutionError, PatternExecutor};
use crate::models::{PatternArtifact, SampleInput};

/// Produces placeholder output from the declared output sections alone.
///
/// The same declared sections always yield the same text. Results produced
/// this way are flagged as simulated and must not be read as quality signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedExecutor;

impl PatternExecutor for SimulatedExecutor {
    fn execute(
        &self,
        artifact: &PatternArtifact,
        _sample: &SampleInput,
    ) -> Result<String, ExecutionError> {
        Ok(simulate_output(&artifact.output_sections))
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

pub fn simulate_output(sections: &[String]) -> String {
    let mut output = String::from("# SIMULATED OUTPUT\n\n");
    if sections.is_empty() {
        output.push_str("- Placeholder content; the pattern declares no output sections.\n");
        return output;
    }

    for section in sections {
        output.push_str(&format!("## {}\n\n", section));
        output.push_str(&format!("- Placeholder content for {}.\n\n", section));
    }
    output
}
