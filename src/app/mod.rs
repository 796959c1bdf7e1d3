mod runner;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::cancel;
use crate::cli::{
    AssessArgs, Command, CompareArgs, ExportArgs, FormatArgs, GoalArgs, ImportArgs, ReportArgs,
};
use crate::execution::{ExecutorConfig, ExecutorProvider, PatternExecutor};
use crate::features::{Feature, Features};
use crate::library::{LibraryError, PatternLibrary};
use crate::quality::comparison::default_assessment_filename;
use crate::quality::report::{
    format_assessment, format_comparison, format_goal_progress, format_metrics, format_report,
};
use crate::quality::{
    self, ConfigError, ImportError, QualityAssessment, QualityConfig, QualityEngine, QualityState,
};
use crate::state_store::{StateFileError, StateStore};

pub use runner::PatternRunner;

/// Samples run at once when parallel tests are enabled without `--parallel`.
const DEFAULT_PARALLELISM: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error(transparent)]
    State(#[from] StateFileError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    User(String),
}

pub struct App<L: PatternLibrary, S: StateStore> {
    library: L,
    state_store: S,
    engine: QualityEngine,
    executor_config: ExecutorConfig,
    features: Features,
}

impl<L: PatternLibrary, S: StateStore> App<L, S> {
    pub fn new(
        library: L,
        state_store: S,
        config: QualityConfig,
        executor_config: ExecutorConfig,
        features: Features,
    ) -> Self {
        Self {
            library,
            state_store,
            engine: QualityEngine::new(config),
            executor_config,
            features,
        }
    }

    pub fn engine(&self) -> &QualityEngine {
        &self.engine
    }

    pub fn run(&mut self, command: Command) -> Result<(), AppError> {
        self.load_state()?;
        match command {
            Command::Assess(opts) => self.handle_assess(opts),
            Command::Metrics(opts) => self.handle_metrics(opts),
            Command::Report(opts) => self.handle_report(opts),
            Command::Compare(opts) => self.handle_compare(opts),
            Command::Goal(opts) => self.handle_goal(opts),
            Command::Actions(opts) => self.handle_actions(opts),
            Command::Export(opts) => self.handle_export(opts),
            Command::Import(opts) => self.handle_import(opts),
        }
    }

    /// Restore saved assessments, history, goals and action items. The
    /// configuration in effect for this run wins over the saved one.
    fn load_state(&mut self) -> Result<(), AppError> {
        let Some(mut state) = self.state_store.load()? else {
            return Ok(());
        };
        state.config = self.engine.config().clone();
        self.engine.import_quality_data(state)?;
        Ok(())
    }

    fn save_state(&self) -> Result<(), AppError> {
        let path = self.state_store.save(&self.engine.export_quality_data())?;
        info!("State saved to {}", path.display());
        Ok(())
    }

    fn executor(&self, simulate: bool) -> Arc<dyn PatternExecutor> {
        let mut config = self
            .executor_config
            .clone()
            .with_strict(self.features.is_enabled(Feature::StrictExecution));
        if simulate {
            config = config.with_provider(ExecutorProvider::Simulated);
        }
        config.create_executor()
    }

    fn handle_assess(&mut self, opts: AssessArgs) -> Result<(), AppError> {
        let names = if opts.all {
            self.library.list_patterns()?
        } else {
            opts.patterns.clone()
        };
        if names.is_empty() {
            return Err(AppError::User("No patterns to assess".to_string()));
        }

        let previous = match &opts.compare {
            Some(path) => Some(quality::load_assessment(path).map_err(|e| {
                AppError::User(format!("Failed to load comparison: {}", e))
            })?),
            None => None,
        };

        let parallel = opts.parallel.or_else(|| {
            self.features
                .is_enabled(Feature::ParallelTests)
                .then_some(DEFAULT_PARALLELISM)
        });
        let mut suite = self.engine.suite_runner();
        if let Some(max_parallel) = parallel {
            suite = suite.with_parallelism(max_parallel);
        }
        let executor = self.executor(opts.simulate);

        info!("Assessing {} patterns", names.len());
        let mut assessed = 0;
        for name in &names {
            if cancel::is_cancelled() {
                warn!(
                    "Cancelled after {} of {} patterns",
                    assessed,
                    names.len()
                );
                break;
            }

            let input = PatternRunner::new(&self.library, &suite, executor.as_ref()).prepare(name);
            let assessment = self.engine.assess_pattern_quality(input);
            assessed += 1;

            match previous.as_ref().filter(|p| p.pattern_name == assessment.pattern_name) {
                Some(before) => {
                    let comparison = quality::compare_assessments(before.clone(), assessment.clone());
                    println!("{}", format_comparison(&comparison, opts.format));
                }
                None => println!("{}", format_assessment(&assessment, opts.format, opts.full)),
            }

            if let Some(save_path) = &opts.save {
                let target = save_target(save_path.as_deref(), &assessment, names.len());
                let path = quality::save_assessment(&assessment, target.as_deref())
                    .map_err(|e| AppError::User(format!("Failed to save assessment: {}", e)))?;
                info!("Assessment saved to: {}", path.display());
            }
        }

        if let Some(before) = &previous {
            if !names.contains(&before.pattern_name) {
                warn!(
                    "Comparison file is for '{}', which was not assessed",
                    before.pattern_name
                );
            }
        }

        self.save_state()
    }

    fn handle_metrics(&self, opts: FormatArgs) -> Result<(), AppError> {
        let metrics = self.engine.quality_metrics();
        println!("{}", format_metrics(&metrics, opts.format));
        Ok(())
    }

    fn handle_report(&self, opts: ReportArgs) -> Result<(), AppError> {
        let report = self.engine.generate_quality_report(opts.period);
        println!("{}", format_report(&report, opts.format));
        Ok(())
    }

    fn handle_compare(&self, opts: CompareArgs) -> Result<(), AppError> {
        let before = quality::load_assessment(&opts.before)
            .map_err(|e| AppError::User(format!("Failed to load 'before' assessment: {}", e)))?;

        let after = quality::load_assessment(&opts.after)
            .map_err(|e| AppError::User(format!("Failed to load 'after' assessment: {}", e)))?;

        if before.pattern_name != after.pattern_name {
            warn!(
                "Comparing different patterns: '{}' and '{}'",
                before.pattern_name, after.pattern_name
            );
        }

        let comparison = quality::compare_assessments(before, after);
        println!("{}", format_comparison(&comparison, opts.format));
        Ok(())
    }

    fn handle_goal(&mut self, opts: GoalArgs) -> Result<(), AppError> {
        if let (Some(pattern), Some(target)) = (opts.pattern, opts.target) {
            if self.engine.assessment(&pattern).is_none() {
                warn!("'{}' has not been assessed yet", pattern);
            }
            let goal = self.engine.set_goal(pattern, target, opts.description);
            info!("Goal set: '{}' -> {}", goal.pattern, goal.target_score);
            self.save_state()?;
        }

        let progress = self.engine.goal_progress();
        println!("{}", format_goal_progress(&progress, opts.format));
        Ok(())
    }

    fn handle_actions(&self, opts: FormatArgs) -> Result<(), AppError> {
        let open: Vec<_> = self.engine.open_action_items().collect();
        if opts.format == quality::OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&open)?);
            return Ok(());
        }

        if open.is_empty() {
            println!("No open action items.");
            return Ok(());
        }
        for item in open {
            println!(
                "#{} [{}] {} ({})",
                item.id, item.priority, item.title, item.category
            );
            for step in &item.steps {
                println!("    - {}", step);
            }
        }
        Ok(())
    }

    fn handle_export(&self, opts: ExportArgs) -> Result<(), AppError> {
        let json = self.engine.export_json()?;
        match opts.path {
            Some(path) => {
                write_file(&path, &json)?;
                info!("Exported quality data to {}", path.display());
            }
            None => println!("{}", json),
        }
        Ok(())
    }

    fn handle_import(&mut self, opts: ImportArgs) -> Result<(), AppError> {
        let json = fs::read_to_string(&opts.path)?;
        let state: QualityState = serde_json::from_str(&json).map_err(ImportError::from)?;
        let count = state.assessments.len();
        self.engine.import_quality_data(state)?;
        self.save_state()?;
        info!(
            "Imported {} assessments from {}",
            count,
            opts.path.display()
        );
        Ok(())
    }
}

/// Where `--save` writes an assessment. With several patterns an explicit
/// path is treated as a directory.
fn save_target(
    path: Option<&Path>,
    assessment: &QualityAssessment,
    pattern_count: usize,
) -> Option<PathBuf> {
    match path {
        Some(dir) if pattern_count > 1 => Some(dir.join(default_assessment_filename(assessment))),
        Some(file) => Some(file.to_path_buf()),
        None => None,
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}
