//! Shared domain types.
//!
//! These types are intentionally small, `Copy` where possible, and
//! serializable so they can be:
//!
//! - stored inside the grid cache artifact (`GridParameters`, `Filter`)
//! - exported to CSV/JSON (`ChannelFit`, `StarFit`)
//! - parsed straight from the command line (`Model`, `Survey`)

use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Stellar-evolution model families with precomputed tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    #[value(name = "bt_settl", alias = "bt-settl")]
    BtSettl,
    #[value(name = "ames_cond", alias = "ames-cond")]
    AmesCond,
    #[value(name = "ames_dusty", alias = "ames-dusty")]
    AmesDusty,
    Mist,
    Parsec,
    Spots,
    Dartmouth,
    Amard,
    Bhac15,
}

impl Model {
    pub const ALL: [Model; 9] = [
        Model::BtSettl,
        Model::AmesCond,
        Model::AmesDusty,
        Model::Mist,
        Model::Parsec,
        Model::Spots,
        Model::Dartmouth,
        Model::Amard,
        Model::Bhac15,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Model::BtSettl => "bt_settl",
            Model::AmesCond => "ames_cond",
            Model::AmesDusty => "ames_dusty",
            Model::Mist => "mist",
            Model::Parsec => "parsec",
            Model::Spots => "spots",
            Model::Dartmouth => "dartmouth",
            Model::Amard => "amard",
            Model::Bhac15 => "bhac15",
        }
    }

    /// Gaia data release the model's synthetic photometry refers to.
    pub fn gaia_release(self) -> GaiaRelease {
        match self {
            Model::Mist | Model::Parsec => GaiaRelease::Edr3,
            _ => GaiaRelease::Dr2,
        }
    }
}

impl FromStr for Model {
    type Err = String;

    /// Case-insensitive; `-` is accepted in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        Model::ALL
            .into_iter()
            .find(|m| m.name() == key)
            .ok_or_else(|| format!("unknown model '{s}'"))
    }
}

/// Gaia data release of a photometric triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GaiaRelease {
    Dr2,
    Edr3,
}

impl GaiaRelease {
    /// `(G, Gbp, Grp)` for this release.
    pub fn triplet(self) -> [Filter; 3] {
        match self {
            GaiaRelease::Dr2 => [Filter::G2, Filter::Gbp2, Filter::Grp2],
            GaiaRelease::Edr3 => [Filter::G, Filter::Gbp, Filter::Grp],
        }
    }
}

/// Photometric surveys a grid can be built for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
pub enum Survey {
    #[serde(rename = "gaia")]
    Gaia,
    #[serde(rename = "2mass")]
    #[value(name = "2mass")]
    TwoMass,
    #[serde(rename = "wise")]
    Wise,
    #[serde(rename = "johnson")]
    Johnson,
    #[serde(rename = "panstarrs")]
    Panstarrs,
}

impl Survey {
    pub fn name(self) -> &'static str {
        match self {
            Survey::Gaia => "gaia",
            Survey::TwoMass => "2mass",
            Survey::Wise => "wise",
            Survey::Johnson => "johnson",
            Survey::Panstarrs => "panstarrs",
        }
    }

    /// File tag of the raw track for this survey (gaia depends on the release).
    pub fn track_tag(self, release: GaiaRelease) -> &'static str {
        match (self, release) {
            (Survey::Gaia, GaiaRelease::Dr2) => "gaia_dr2",
            (Survey::Gaia, GaiaRelease::Edr3) => "gaia_edr3",
            (other, _) => other.name(),
        }
    }

    /// Canonical filters of the survey, in grid column order.
    pub fn filters(self, release: GaiaRelease) -> Vec<Filter> {
        match self {
            Survey::Gaia => release.triplet().to_vec(),
            Survey::TwoMass => vec![Filter::J, Filter::H, Filter::K],
            Survey::Wise => vec![Filter::W1, Filter::W2, Filter::W3, Filter::W4],
            Survey::Johnson => vec![Filter::U, Filter::B, Filter::V, Filter::R, Filter::I],
            Survey::Panstarrs => vec![
                Filter::Gmag,
                Filter::Rmag,
                Filter::Imag,
                Filter::Zmag,
                Filter::Ymag,
            ],
        }
    }
}

/// Canonical photometric filter identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Filter {
    G,
    Gbp,
    Grp,
    G2,
    Gbp2,
    Grp2,
    J,
    H,
    K,
    W1,
    W2,
    W3,
    W4,
    U,
    B,
    V,
    R,
    I,
    Gmag,
    Rmag,
    Imag,
    Zmag,
    Ymag,
}

impl Filter {
    pub const ALL: [Filter; 23] = [
        Filter::G,
        Filter::Gbp,
        Filter::Grp,
        Filter::G2,
        Filter::Gbp2,
        Filter::Grp2,
        Filter::J,
        Filter::H,
        Filter::K,
        Filter::W1,
        Filter::W2,
        Filter::W3,
        Filter::W4,
        Filter::U,
        Filter::B,
        Filter::V,
        Filter::R,
        Filter::I,
        Filter::Gmag,
        Filter::Rmag,
        Filter::Imag,
        Filter::Zmag,
        Filter::Ymag,
    ];

    /// Column label used in catalogs, exports and reports.
    pub fn label(self) -> &'static str {
        match self {
            Filter::G => "G",
            Filter::Gbp => "Gbp",
            Filter::Grp => "Grp",
            Filter::G2 => "G2",
            Filter::Gbp2 => "Gbp2",
            Filter::Grp2 => "Grp2",
            Filter::J => "J",
            Filter::H => "H",
            Filter::K => "K",
            Filter::W1 => "W1",
            Filter::W2 => "W2",
            Filter::W3 => "W3",
            Filter::W4 => "W4",
            Filter::U => "U",
            Filter::B => "B",
            Filter::V => "V",
            Filter::R => "R",
            Filter::I => "I",
            Filter::Gmag => "gmag",
            Filter::Rmag => "rmag",
            Filter::Imag => "imag",
            Filter::Zmag => "zmag",
            Filter::Ymag => "ymag",
        }
    }

    pub fn from_label(label: &str) -> Option<Filter> {
        Filter::ALL.into_iter().find(|f| f.label() == label)
    }

    /// Absorption relative to A_V (R = 3.16 scale).
    pub fn absorption(self) -> f64 {
        match self {
            Filter::U => 1.531,
            Filter::B => 1.317,
            Filter::V => 1.0,
            Filter::R => 0.748,
            Filter::I => 0.482,
            Filter::J => 0.243,
            Filter::H => 0.131,
            Filter::K => 0.078,
            Filter::G | Filter::G2 => 0.789,
            Filter::Gbp | Filter::Gbp2 => 1.002,
            Filter::Grp | Filter::Grp2 => 0.589,
            Filter::W1 => 0.039,
            Filter::W2 => 0.026,
            Filter::W3 => 0.040,
            Filter::W4 => 0.020,
            Filter::Gmag => 1.155,
            Filter::Rmag => 0.843,
            Filter::Imag => 0.628,
            Filter::Zmag => 0.487,
            Filter::Ymag => 0.395,
        }
    }
}

/// The six filters the estimator works with, in slot order `J, H, K, G, Gbp, Grp`.
pub fn canonical_bands(release: GaiaRelease) -> [Filter; 6] {
    let [g, bp, rp] = release.triplet();
    [Filter::J, Filter::H, Filter::K, g, bp, rp]
}

/// The four fixed colour channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    GK,
    GJ,
    GH,
    BpRp,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::GK, Channel::GJ, Channel::GH, Channel::BpRp];

    pub fn label(self) -> &'static str {
        match self {
            Channel::GK => "G-K",
            Channel::GJ => "G-J",
            Channel::GH => "G-H",
            Channel::BpRp => "Gbp-Grp",
        }
    }

    /// Canonical slots `(magnitude, partner)`.
    ///
    /// The magnitude slot is the one the star is matched on along each
    /// isochrone; the partner is the other member of the colour.
    pub fn slots(self) -> (usize, usize) {
        match self {
            Channel::GK => (2, 3),
            Channel::GJ => (0, 3),
            Channel::GH => (1, 3),
            Channel::BpRp => (5, 4),
        }
    }
}

/// Per-channel diagnostic of a grid match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FateCode {
    /// Photometry missing, flagged, or with too large an error.
    Unfit,
    FitOk,
    /// Star lies beyond the isochrone colour span on the low side.
    BelowGridEdge,
    /// Star lies beyond the isochrone colour span on the high side.
    AboveGridEdge,
    /// No isochrone reaches the star's magnitude closely enough.
    OffGridDistance,
}

impl FateCode {
    /// Numeric code used in plain-text reports.
    pub fn code(self) -> u8 {
        match self {
            FateCode::Unfit => 1,
            FateCode::BelowGridEdge => 2,
            FateCode::AboveGridEdge => 3,
            FateCode::OffGridDistance => 4,
            FateCode::FitOk => 5,
        }
    }
}

/// Mass (M_sun), age (Myr) and fate of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelFit {
    pub mass: f64,
    pub age: f64,
    pub fate: FateCode,
}

impl ChannelFit {
    pub fn unfit() -> Self {
        Self {
            mass: f64::NAN,
            age: f64::NAN,
            fate: FateCode::Unfit,
        }
    }
}

/// Aggregated result for one star.
///
/// NaN mass/age means "undetermined", never zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarFit {
    pub channels: [ChannelFit; 4],
    pub mass: f64,
    pub age: f64,
    pub mass_std: Option<f64>,
    pub age_std: Option<f64>,
}

impl StarFit {
    pub fn undetermined() -> Self {
        Self {
            channels: [ChannelFit::unfit(); 4],
            mass: f64::NAN,
            age: f64::NAN,
            mass_std: None,
            age_std: None,
        }
    }

    pub fn channel(&self, channel: Channel) -> &ChannelFit {
        &self.channels[channel as usize]
    }

    pub fn n_fitted(&self) -> usize {
        self.channels
            .iter()
            .filter(|c| c.fate == FateCode::FitOk)
            .count()
    }
}

/// Identity of a built grid: resolved model parameters plus covered ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridParameters {
    pub model: Model,
    pub feh: f64,
    pub afe: f64,
    pub v_vcrit: f64,
    pub fspot: f64,
    pub magnetic: bool,
    /// `[min, max]` in M_sun.
    pub mass_range: [f64; 2],
    /// `[min, max]` in Myr.
    pub age_range: [f64; 2],
}

impl GridParameters {
    /// Discrete parameters equal (exact comparison).
    pub fn same_physics(&self, other: &GridParameters) -> bool {
        self.model == other.model
            && self.feh == other.feh
            && self.afe == other.afe
            && self.v_vcrit == other.v_vcrit
            && self.fspot == other.fspot
            && self.magnetic == other.magnetic
    }

    /// True if a grid built with `self` can serve `request`.
    pub fn covers(&self, request: &GridParameters) -> bool {
        self.same_physics(request)
            && self.mass_range[0] <= request.mass_range[0]
            && self.mass_range[1] >= request.mass_range[1]
            && self.age_range[0] <= request.age_range[0]
            && self.age_range[1] >= request.age_range[1]
    }
}

/// What the caller asks the grid layer for.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRequest {
    pub model: Model,
    pub surveys: Vec<Survey>,
    pub mass_range: [f64; 2],
    pub age_range: [f64; 2],
    pub mass_steps: usize,
    pub age_steps: usize,
    pub feh: Option<f64>,
    pub afe: Option<f64>,
    pub v_vcrit: Option<f64>,
    pub fspot: Option<f64>,
    pub magnetic: bool,
}

impl GridRequest {
    pub fn new(model: Model, surveys: Vec<Survey>) -> Self {
        Self {
            model,
            surveys,
            mass_range: [0.01, 1.4],
            age_range: [1.0, 1000.0],
            mass_steps: 1000,
            age_steps: 500,
            feh: None,
            afe: None,
            v_vcrit: None,
            fspot: None,
            magnetic: false,
        }
    }

    /// Surveys without duplicates, in request order.
    pub fn unique_surveys(&self) -> Vec<Survey> {
        let mut out: Vec<Survey> = Vec::with_capacity(self.surveys.len());
        for s in &self.surveys {
            if !out.contains(s) {
                out.push(*s);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mass: [f64; 2], age: [f64; 2]) -> GridParameters {
        GridParameters {
            model: Model::Mist,
            feh: 0.0,
            afe: 0.0,
            v_vcrit: 0.4,
            fspot: 0.0,
            magnetic: false,
            mass_range: mass,
            age_range: age,
        }
    }

    #[test]
    fn model_parse_is_case_and_dash_insensitive() {
        assert_eq!("BT-Settl".parse::<Model>().unwrap(), Model::BtSettl);
        assert_eq!("mist".parse::<Model>().unwrap(), Model::Mist);
        assert!("baraffe".parse::<Model>().is_err());
    }

    #[test]
    fn covers_requires_superset_ranges() {
        let stored = params([0.01, 1.4], [1.0, 1000.0]);
        assert!(stored.covers(&params([0.1, 1.0], [5.0, 500.0])));
        assert!(stored.covers(&params([0.01, 1.4], [1.0, 1000.0])));
        assert!(!stored.covers(&params([0.01, 1.4], [0.5, 1000.0])));
        assert!(!stored.covers(&params([0.005, 1.4], [1.0, 1000.0])));
    }

    #[test]
    fn covers_requires_identical_physics() {
        let stored = params([0.01, 1.4], [1.0, 1000.0]);
        let mut other = stored.clone();
        other.v_vcrit = 0.0;
        assert!(!stored.covers(&other));
    }

    #[test]
    fn channel_slots_point_at_gaia_partner() {
        let bands = canonical_bands(GaiaRelease::Edr3);
        let (mag, partner) = Channel::GK.slots();
        assert_eq!(bands[mag], Filter::K);
        assert_eq!(bands[partner], Filter::G);
        let (mag, partner) = Channel::BpRp.slots();
        assert_eq!(bands[mag], Filter::Grp);
        assert_eq!(bands[partner], Filter::Gbp);
    }

    #[test]
    fn filter_labels_round_trip() {
        for f in Filter::ALL {
            assert_eq!(Filter::from_label(f.label()), Some(f));
        }
    }
}
