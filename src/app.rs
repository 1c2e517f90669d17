//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - turns them into a sweep configuration
//! - dispatches to the shared workflows in `pipeline`
//! - prints reports/plots

use clap::Parser;

use crate::cli::{Command, ErrorsArgs, ReportArgs, SimulateArgs};
use crate::domain::{ConfigError, Selection, StatMethod, SweepConfig};
use crate::error::AppError;
use crate::interp::Interpolant;
use crate::plot::{AsciiProfile, render_profile_plot};
use crate::steppar::SweepRequest;

pub mod pipeline;

use pipeline::ErrorsRunConfig;

/// Entry point for the `steppar` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();

    // A subscriber may already be installed (e.g. when driven from tests).
    let _ = tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Command::Errors(args) => handle_errors(&args),
        Command::Simulate(args) => handle_simulate(&args),
        Command::Report(args) => handle_report(&args),
    }
}

fn handle_errors(args: &ErrorsArgs) -> Result<(), AppError> {
    let config = errors_config_from_args(args)?;
    let run = pipeline::run_errors(&config)?;

    println!(
        "{}",
        crate::report::format_sweep_summary(&run.model_name, &run.report, &config.sweep)
    );
    println!("{}", crate::report::format_ledger(&run.report.ledger));

    println!("Checkpoint: {}", run.checkpoint_path.display());
    println!("Ledger: {}", run.ledger_path.display());
    if let Some(dir) = &run.plot_dir {
        println!("Plots: {}", dir.display());
    }
    Ok(())
}

fn handle_simulate(args: &SimulateArgs) -> Result<(), AppError> {
    let statistic: StatMethod = args.statistic.parse()?;
    let path = pipeline::run_simulate(&args.model, statistic, args.seed, args.output.as_deref())?;
    println!("Simulated data written to {}", path.display());
    Ok(())
}

fn handle_report(args: &ReportArgs) -> Result<(), AppError> {
    let stored = pipeline::load_report(&args.model)?;

    println!("=== steppar - stored errors ===");
    println!("Model: {}", stored.model_name);
    if let Some((level, statistic, interp)) = stored.settings {
        println!(
            "Statistic: {statistic} | level {}={level} | interpolation: {interp}",
            statistic.delta_label()
        );
    }
    println!();
    println!("{}", crate::report::format_ledger(&stored.ledger));

    let Some((level, statistic, interp)) = stored.settings else {
        return Ok(());
    };
    if args.no_plot {
        return Ok(());
    }

    for profile in &stored.profiles {
        let Some(result) = stored.ledger.iter().find(|r| r.id == profile.id) else {
            continue;
        };
        let curve = Interpolant::build(interp, &profile.samples)
            .ok()
            .map(|c| c.grid(args.width * 4));
        let plot = render_profile_plot(
            &AsciiProfile {
                name: &result.name,
                samples: &profile.samples,
                curve: curve.as_deref(),
                level,
                bounds: Some((result.lower_bound(), result.upper_bound())),
                label: statistic.delta_label(),
            },
            args.width,
            args.height,
        );
        println!("{plot}");
    }
    Ok(())
}

/// Convert parsed CLI args into the run configuration.
///
/// Statistic method and selection are parsed here so that bad values surface as
/// configuration errors (exit code 2).
pub fn errors_config_from_args(args: &ErrorsArgs) -> Result<ErrorsRunConfig, ConfigError> {
    let statistic: StatMethod = args.statistic.parse()?;
    let selection: Selection = args.select.parse()?;

    let sweep = SweepConfig::new(args.level, statistic, args.interp);
    sweep.validate()?;

    Ok(ErrorsRunConfig {
        model: args.model.clone(),
        sweep,
        request: SweepRequest {
            selection,
            blacklist: args
                .blacklist
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            cores: args.cores,
        },
        plot: !args.no_plot,
        fresh: args.fresh,
    })
}
