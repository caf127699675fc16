use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

/// Every option doubles as an environment variable, so a bare `prophecy`
/// invocation is fully driven by the environment.
#[derive(Parser)]
#[command(name = "prophecy")]
#[command(
    author,
    version,
    about = "Deploy, seed and smoke-test a prediction contract"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "PROPHECY_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a Prophecy.toml configuration file.
    ///
    /// If not provided, ./Prophecy.toml is used when it exists. Any key can
    /// also be set through a PROPHECY_<KEY> environment variable, which takes
    /// precedence over the file.
    #[arg(long, alias = "conf", env = "PROPHECY_CONFIG")]
    pub config: Option<PathBuf>,
}
