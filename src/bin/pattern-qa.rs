use clap::Parser;
use log::LevelFilter;

use pattern_qa::app::{App, AppError};
use pattern_qa::cancel;
use pattern_qa::cli::Cli;
use pattern_qa::execution::ExecutorConfig;
use pattern_qa::features::Features;
use pattern_qa::library::FsPatternLibrary;
use pattern_qa::quality::QualityConfig;
use pattern_qa::state_store::FileStateStore;

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity flags
    let log_level = if cli.quiet {
        LevelFilter::Error
    } else {
        match cli.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_target(false)
        .format_timestamp(None)
        .init();

    // Feature flags from environment, then CLI overrides
    let features = Features::from_env().with_overrides(cli.features.as_deref());
    Features::init_global(features);
    for feature in Features::global().enabled_features() {
        log::debug!("Feature enabled: {:?}", feature);
    }

    if let Err(err) = run(cli) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let config = QualityConfig::from_env()?.with_overrides(cli.config.as_deref())?;
    let executor_config = ExecutorConfig::from_env().with_overrides(cli.executor, cli.model);

    cancel::register_handler();

    let mut app = App::new(
        FsPatternLibrary::new(cli.library),
        FileStateStore::from_env(),
        config,
        executor_config,
        Features::global().clone(),
    );
    app.run(cli.command)
}
