//! Command-line parsing for the isochrone age/mass estimator.
//!
//! Argument parsing stays here; the pipeline works on plain domain types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{GridRequest, Model, Survey};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "isoage", version, about = "Stellar age and mass estimates from isochrone grids")]
pub struct Cli {
    /// Settings file (TOML). Defaults apply when omitted.
    #[arg(long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load the isochrone grid from cache, or build and store it.
    Build(GridArgs),
    /// Estimate ages and masses for every star of a catalog.
    Estimate(EstimateArgs),
}

/// Options selecting a grid.
#[derive(Debug, Args, Clone)]
pub struct GridArgs {
    /// Evolutionary model.
    #[arg(short = 'm', long, value_enum, default_value_t = Model::BtSettl)]
    pub model: Model,

    /// Surveys to include (repeatable).
    #[arg(short = 's', long = "survey", value_enum, num_args = 1.., default_values_t = [Survey::Gaia, Survey::TwoMass])]
    pub surveys: Vec<Survey>,

    /// Lower mass bound (M_sun).
    #[arg(long, default_value_t = 0.01)]
    pub mass_min: f64,

    /// Upper mass bound (M_sun).
    #[arg(long, default_value_t = 1.4)]
    pub mass_max: f64,

    /// Lower age bound (Myr).
    #[arg(long, default_value_t = 1.0)]
    pub age_min: f64,

    /// Upper age bound (Myr).
    #[arg(long, default_value_t = 1000.0)]
    pub age_max: f64,

    /// Mass steps (overrides the settings file).
    #[arg(long)]
    pub mass_steps: Option<usize>,

    /// Age steps (overrides the settings file).
    #[arg(long)]
    pub age_steps: Option<usize>,

    /// Metallicity [Fe/H].
    #[arg(long, allow_negative_numbers = true)]
    pub feh: Option<f64>,

    /// Alpha enhancement [a/Fe].
    #[arg(long, allow_negative_numbers = true)]
    pub afe: Option<f64>,

    /// Rotational velocity v/v_crit.
    #[arg(long)]
    pub v_vcrit: Option<f64>,

    /// Spot filling factor.
    #[arg(long)]
    pub fspot: Option<f64>,

    /// Use magnetic tracks (dartmouth).
    #[arg(long)]
    pub magnetic: bool,
}

impl GridArgs {
    /// Turn the arguments into a grid request; steps fall back to the given defaults.
    pub fn request(&self, default_mass_steps: usize, default_age_steps: usize) -> GridRequest {
        GridRequest {
            mass_range: [self.mass_min, self.mass_max],
            age_range: [self.age_min, self.age_max],
            mass_steps: self.mass_steps.unwrap_or(default_mass_steps),
            age_steps: self.age_steps.unwrap_or(default_age_steps),
            feh: self.feh,
            afe: self.afe,
            v_vcrit: self.v_vcrit,
            fspot: self.fspot,
            magnetic: self.magnetic,
            ..GridRequest::new(self.model, self.surveys.clone())
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct EstimateArgs {
    /// Catalog CSV with parallaxes and photometry.
    #[arg(short = 'c', long, value_name = "CSV")]
    pub catalog: PathBuf,

    #[command(flatten)]
    pub grid: GridArgs,

    /// Assign the youngest grid age to stars below the youngest isochrone.
    #[arg(long)]
    pub border_age: bool,

    /// Compute Monte-Carlo uncertainties.
    #[arg(long)]
    pub monte_carlo: bool,

    /// Number of Monte-Carlo draws (overrides the settings file).
    #[arg(long)]
    pub draws: Option<usize>,

    /// Seed for the Monte-Carlo draws.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Unresolved binary fraction in [0, 1] (overrides the settings file).
    #[arg(long)]
    pub binary_fraction: Option<f64>,

    /// Export per-star results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export per-star results to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Also write `<catalog stem>_ages_<model>.txt` next to the catalog.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_estimate_with_repeated_surveys() {
        let cli = Cli::try_parse_from([
            "isoage",
            "estimate",
            "--catalog",
            "stars.csv",
            "--model",
            "mist",
            "--survey",
            "gaia",
            "--survey",
            "2mass",
            "--feh",
            "-0.5",
            "--monte-carlo",
            "--seed",
            "7",
        ])
        .unwrap();
        let Command::Estimate(args) = cli.command else {
            panic!("expected estimate");
        };
        assert_eq!(args.grid.model, Model::Mist);
        assert_eq!(args.grid.surveys, vec![Survey::Gaia, Survey::TwoMass]);
        assert_eq!(args.grid.feh, Some(-0.5));
        assert!(args.monte_carlo);
        assert_eq!(args.seed, 7);
    }

    #[test]
    fn request_uses_default_steps_unless_overridden() {
        let cli = Cli::try_parse_from(["isoage", "build", "--mass-steps", "50"]).unwrap();
        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        let req = args.request(1000, 500);
        assert_eq!(req.mass_steps, 50);
        assert_eq!(req.age_steps, 500);
        assert_eq!(req.model, Model::BtSettl);
        assert_eq!(req.surveys, vec![Survey::Gaia, Survey::TwoMass]);
    }

    #[test]
    fn model_names_accept_dashes() {
        let cli = Cli::try_parse_from(["isoage", "build", "--model", "ames-dusty"]).unwrap();
        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.model, Model::AmesDusty);
    }
}
