use log::{debug, warn};

use crate::execution::PatternExecutor;
use crate::library::{LibraryError, PatternLibrary};
use crate::quality::{AssessmentInput, SuiteRunner, TestSuiteResult};

/// Loads a pattern from the library and runs its test suite.
pub struct PatternRunner<'a, L: PatternLibrary> {
    library: &'a L,
    suite: &'a SuiteRunner,
    executor: &'a dyn PatternExecutor,
}

impl<'a, L: PatternLibrary> PatternRunner<'a, L> {
    pub fn new(library: &'a L, suite: &'a SuiteRunner, executor: &'a dyn PatternExecutor) -> Self {
        Self {
            library,
            suite,
            executor,
        }
    }

    /// Everything the engine needs to assess `name`. A pattern that cannot
    /// be loaded yields a failed suite rather than an error, so one broken
    /// pattern does not stop a library-wide run.
    pub fn prepare(&self, name: &str) -> AssessmentInput {
        match self.try_prepare(name) {
            Ok(input) => input,
            Err(err) => {
                warn!("Cannot test '{}': {}", name, err);
                AssessmentInput::new(name, TestSuiteResult::failed(name, err.to_string()))
            }
        }
    }

    fn try_prepare(&self, name: &str) -> Result<AssessmentInput, LibraryError> {
        let artifact = self.library.load_pattern_artifact(name)?;
        let samples = self.library.load_sample_inputs(name)?;
        let usage = match self.library.usage_metrics(name) {
            Ok(usage) => usage,
            Err(err) => {
                warn!("Ignoring usage metrics for '{}': {}", name, err);
                None
            }
        };
        debug!(
            "Running suite for '{}' with {} samples",
            name,
            samples.len()
        );

        let suite = self.suite.run(&artifact, &samples, self.executor);
        let mut input =
            AssessmentInput::new(name, suite).with_artifact_text(artifact.instructions);
        if let Some(usage) = usage {
            input = input.with_usage(usage);
        }
        Ok(input)
    }
}
