//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments and loads settings
//! - loads or builds the isochrone grid
//! - runs normalisation, estimation and optional Monte-Carlo errors
//! - prints summaries and writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, EstimateArgs, GridArgs};
use crate::config::Settings;
use crate::error::AppError;
use crate::fit::MonteCarloConfig;

pub mod pipeline;

/// Entry point for the `isoage` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_tracing();

    let settings = Settings::load(cli.config.as_deref())?;
    match cli.command {
        Command::Build(args) => handle_build(&settings, &args),
        Command::Estimate(args) => handle_estimate(&settings, &args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("iso_ages=info"));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_build(settings: &Settings, args: &GridArgs) -> Result<(), AppError> {
    let request = args.request(settings.mass_steps, settings.age_steps);
    let run = pipeline::run_build(settings, &request)?;
    println!(
        "{}",
        crate::report::format_grid_summary(&run.model_code, &run.cached, &run.status)
    );
    Ok(())
}

fn handle_estimate(settings: &Settings, args: &EstimateArgs) -> Result<(), AppError> {
    let request = args.grid.request(settings.mass_steps, settings.age_steps);
    let options = estimate_options_from_args(settings, args)?;
    let run = pipeline::run_estimate(settings, &request, &options)?;

    println!(
        "{}",
        crate::report::format_grid_summary(&run.grid.model_code, &run.grid.cached, &run.grid.status)
    );
    println!(
        "{}",
        crate::report::format_estimate_summary(run.catalog.row_errors.len(), &run.table.cuts, &run.fits)
    );
    println!("{}", crate::report::format_star_table(&run.catalog.ids, &run.fits));

    // Optional exports.
    if args.export.is_some() || args.export_json.is_some() {
        let rows = crate::io::export::result_rows(&run.catalog.ids, &run.fits);
        if let Some(path) = &args.export {
            crate::io::export::write_results_csv(path, &rows)?;
        }
        if let Some(path) = &args.export_json {
            crate::io::export::write_results_json(path, &rows)?;
        }
    }
    if args.verbose {
        let path = crate::report::age_report_path(&args.catalog, args.grid.model);
        crate::report::write_age_report(&path, &run.fits)?;
    }

    Ok(())
}

pub fn estimate_options_from_args(
    settings: &Settings,
    args: &EstimateArgs,
) -> Result<pipeline::EstimateOptions, AppError> {
    let binary_fraction = args.binary_fraction.unwrap_or(settings.binary_fraction);
    if !(0.0..=1.0).contains(&binary_fraction) {
        return Err(AppError::new(2, "--binary-fraction must lie in [0, 1]."));
    }
    let draws = args.draws.unwrap_or(settings.monte_carlo_draws);
    if args.monte_carlo && draws < 2 {
        return Err(AppError::new(2, "--draws must be >= 2."));
    }

    Ok(pipeline::EstimateOptions {
        catalog: args.catalog.clone(),
        border_age: args.border_age,
        monte_carlo: args.monte_carlo.then_some(MonteCarloConfig {
            draws,
            seed: args.seed,
        }),
        binary_fraction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate_args(extra: &[&str]) -> EstimateArgs {
        let mut argv = vec!["isoage", "estimate", "--catalog", "stars.csv"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Estimate(args) => args,
            Command::Build(_) => panic!("expected estimate"),
        }
    }

    #[test]
    fn options_fall_back_to_settings() {
        let settings = Settings {
            binary_fraction: 0.3,
            monte_carlo_draws: 25,
            ..Settings::default()
        };
        let opts = estimate_options_from_args(&settings, &estimate_args(&["--monte-carlo"])).unwrap();
        assert_eq!(opts.binary_fraction, 0.3);
        assert_eq!(opts.monte_carlo, Some(MonteCarloConfig { draws: 25, seed: 0 }));
    }

    #[test]
    fn monte_carlo_is_off_unless_requested() {
        let opts = estimate_options_from_args(&Settings::default(), &estimate_args(&[])).unwrap();
        assert!(opts.monte_carlo.is_none());
    }

    #[test]
    fn rejects_out_of_range_binary_fraction() {
        let err = estimate_options_from_args(&Settings::default(), &estimate_args(&["--binary-fraction", "1.5"]))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
