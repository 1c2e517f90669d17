//! Command-line parsing for the steppar error tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! sweep and fitting code. Strings that carry domain meaning (statistic method,
//! parameter selection) are parsed later, in `app`, so that bad values surface
//! as the crate's own configuration errors.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::InterpMethod;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "steppar",
    version,
    about = "Profile-likelihood confidence bounds for model parameters (steppar)"
)]
pub struct Cli {
    /// Log verbosity (trace, debug, info, warn, error).
    #[arg(long, global = true, env = "STEPPAR_LOG", default_value_t = tracing::Level::INFO)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Step every selected parameter and compute its confidence bounds.
    Errors(ErrorsArgs),
    /// Replace the model's data with a seeded random draw from the model.
    Simulate(SimulateArgs),
    /// Print a stored ledger and the Δstat profiles.
    Report(ReportArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ErrorsArgs {
    /// Model description file (JSON).
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Target Δstat (2.706 is 90% for one parameter).
    #[arg(long, env = "STEPPAR_LEVEL", default_value_t = 2.706)]
    pub level: f64,

    /// Fit statistic: `cstat` or `chi`.
    #[arg(long, env = "STEPPAR_STATISTIC", default_value = "cstat")]
    pub statistic: String,

    /// Parameters to sweep: `all` or a comma-separated id list (`1,3,5`).
    #[arg(long, default_value = "all")]
    pub select: String,

    /// Parameter names to freeze before anything else (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub blacklist: Vec<String>,

    /// Worker threads for the statistic evaluation (0 = rayon default).
    #[arg(long, env = "STEPPAR_CORES", default_value_t = 0)]
    pub cores: usize,

    /// Curve interpolation method.
    #[arg(long, env = "STEPPAR_INTERP", value_enum, default_value_t = InterpMethod::Linear)]
    pub interp: InterpMethod,

    /// Skip the SVG profile figures (written by default).
    #[arg(long)]
    pub no_plot: bool,

    /// Discard any checkpoint and start from scratch.
    #[arg(long)]
    pub fresh: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Model description file (JSON).
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Noise model: `cstat` (Poisson) or `chi` (Gaussian).
    #[arg(long, env = "STEPPAR_STATISTIC", default_value = "cstat")]
    pub statistic: String,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output file (default: `<name>_error.json` next to the model).
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    /// Model description file (JSON).
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Skip the ASCII profiles.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,
}
