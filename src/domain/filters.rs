//! Closed mapping from canonical filters to each model's native column names.
//!
//! The table is exhaustive: a `(model, filter)` pair without an entry is not
//! served by that model. `FilterTable::for_surveys` validates every filter a
//! request needs up front so a bad combination fails before any track is read.

use crate::domain::{Filter, Model, Survey};
use crate::error::IsoError;

/// Native column name of `filter` in `model`'s track files.
pub fn native_name(model: Model, filter: Filter) -> Option<&'static str> {
    use Filter::*;
    use Model::*;

    let name = match (model, filter) {
        (BtSettl, G2) => "G2018",
        (BtSettl, Gbp2) => "G2018_BP",
        (BtSettl, Grp2) => "G2018_RP",
        (AmesCond | AmesDusty | Bhac15, G2) => "G",
        (AmesCond | AmesDusty | Bhac15, Gbp2) => "G_BP",
        (AmesCond | AmesDusty | Bhac15, Grp2) => "G_RP",
        (BtSettl | AmesCond | AmesDusty, J) => "J",
        (BtSettl | AmesCond | AmesDusty, H) => "H",
        (BtSettl | AmesCond | AmesDusty, K) => "K",
        (BtSettl | AmesCond | AmesDusty, W1) => "W1_W10",
        (BtSettl | AmesCond | AmesDusty, W2) => "W2_W10",
        (BtSettl | AmesCond | AmesDusty, W3) => "W3_W10",
        (BtSettl | AmesCond | AmesDusty, W4) => "W4_W10",
        (BtSettl | AmesCond | AmesDusty | Dartmouth, U) => "U",
        (BtSettl | AmesCond | AmesDusty | Dartmouth, B) => "B",
        (BtSettl | AmesCond | AmesDusty | Dartmouth, V) => "V",
        (BtSettl | AmesCond | AmesDusty | Dartmouth, R) => "R",
        (BtSettl | AmesCond | AmesDusty, I) => "i",
        (BtSettl | AmesCond | AmesDusty | Bhac15, Gmag) => "g_p1",
        (BtSettl | AmesCond | AmesDusty | Bhac15, Rmag) => "r_p1",
        (BtSettl | AmesCond | AmesDusty | Bhac15, Imag) => "i_p1",
        (BtSettl | AmesCond | AmesDusty | Bhac15, Zmag) => "z_p1",
        (BtSettl | AmesCond | AmesDusty | Bhac15, Ymag) => "y_p1",

        (Mist, G) => "Gaia_G_EDR3",
        (Mist, Gbp) => "Gaia_BP_EDR3",
        (Mist, Grp) => "Gaia_RP_EDR3",
        (Mist, J) => "2MASS_J",
        (Mist, H) => "2MASS_H",
        (Mist, K) => "2MASS_Ks",
        (Mist, W1) => "WISE_W1",
        (Mist, W2) => "WISE_W2",
        (Mist, W3) => "WISE_W3",
        (Mist, W4) => "WISE_W4",
        (Mist, U) => "Bessell_U",
        (Mist, B) => "Bessell_B",
        (Mist, V) => "Bessell_V",
        (Mist, R) => "Bessell_R",
        (Mist, I) => "Bessell_I",

        (Parsec, G) => "Gmag",
        (Parsec, Gbp) => "G_BPmag",
        (Parsec, Grp) => "G_RPmag",
        (Parsec, J) => "Jmag",
        (Parsec, H) => "Hmag",
        (Parsec, K) => "Ksmag",
        (Parsec, W1) => "W1mag",
        (Parsec, W2) => "W2mag",
        (Parsec, W3) => "W3mag",
        (Parsec, W4) => "W4mag",

        (Spots, G2) => "G_mag",
        (Spots, Gbp2) => "BP_mag",
        (Spots, Grp2) => "RP_mag",
        (Spots, J) => "J_mag",
        (Spots, H) => "H_mag",
        (Spots, K) => "K_mag",
        (Spots, B) => "B_mag",
        (Spots, V) => "V_mag",
        (Spots, R) => "Rc_mag",
        (Spots, I) => "Ic_mag",
        (Spots, W1) => "W1_mag",

        (Dartmouth, G2) => "gaia_G",
        (Dartmouth, Gbp2) => "gaia_BP",
        (Dartmouth, Grp2) => "gaia_RP",
        (Dartmouth, J) => "2mass_J",
        (Dartmouth, H) => "2mass_H",
        (Dartmouth, K) => "2mass_K",
        (Dartmouth, I) => "I",

        (Amard, U) => "M_U",
        (Amard, B) => "M_B",
        (Amard, V) => "M_V",
        (Amard, R) => "M_R",
        (Amard, I) => "M_I",
        (Amard, J) => "M_J",
        (Amard, H) => "M_H",
        (Amard, K) => "M_K",
        (Amard, G2) => "M_G",
        (Amard, Gbp2) => "M_Gbp",
        (Amard, Grp2) => "M_Grp",

        (Bhac15, J) => "Mj",
        (Bhac15, H) => "Mh",
        (Bhac15, K) => "Mk",

        _ => return None,
    };
    Some(name)
}

/// Validated `(canonical filter, native column)` pairs for one model and
/// survey selection, in grid column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTable {
    model: Model,
    entries: Vec<(Survey, Filter, &'static str)>,
}

impl FilterTable {
    /// Build the table for `surveys`, failing on the first unmapped filter.
    pub fn for_surveys(model: Model, surveys: &[Survey]) -> Result<Self, IsoError> {
        let release = model.gaia_release();
        let mut entries = Vec::new();
        for &survey in surveys {
            for filter in survey.filters(release) {
                let native =
                    native_name(model, filter).ok_or(IsoError::UnmappedFilter { model, filter })?;
                entries.push((survey, filter, native));
            }
        }
        Ok(Self { model, entries })
    }

    pub fn model(&self) -> Model {
        self.model
    }

    /// Canonical filters in grid column order.
    pub fn filters(&self) -> Vec<Filter> {
        self.entries.iter().map(|(_, f, _)| *f).collect()
    }

    /// `(filter, native column)` pairs belonging to one survey.
    pub fn survey_entries(&self, survey: Survey) -> impl Iterator<Item = (Filter, &'static str)> + '_ {
        self.entries
            .iter()
            .filter(move |(s, _, _)| *s == survey)
            .map(|(_, f, n)| (*f, *n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mist_serves_gaia_edr3_and_2mass() {
        let table = FilterTable::for_surveys(Model::Mist, &[Survey::Gaia, Survey::TwoMass]).unwrap();
        assert_eq!(
            table.filters(),
            vec![Filter::G, Filter::Gbp, Filter::Grp, Filter::J, Filter::H, Filter::K]
        );
        let twomass: Vec<_> = table.survey_entries(Survey::TwoMass).collect();
        assert_eq!(twomass[2], (Filter::K, "2MASS_Ks"));
    }

    #[test]
    fn dr2_models_map_the_dr2_triplet() {
        let table = FilterTable::for_surveys(Model::BtSettl, &[Survey::Gaia]).unwrap();
        let gaia: Vec<_> = table.survey_entries(Survey::Gaia).collect();
        assert_eq!(
            gaia,
            vec![(Filter::G2, "G2018"), (Filter::Gbp2, "G2018_BP"), (Filter::Grp2, "G2018_RP")]
        );
    }

    #[test]
    fn unmapped_filter_is_fatal() {
        let err = FilterTable::for_surveys(Model::Mist, &[Survey::Panstarrs]).unwrap_err();
        assert!(matches!(
            err,
            IsoError::UnmappedFilter {
                model: Model::Mist,
                filter: Filter::Gmag
            }
        ));
    }

    #[test]
    fn every_model_serves_gaia_and_2mass() {
        for model in Model::ALL {
            assert!(
                FilterTable::for_surveys(model, &[Survey::Gaia, Survey::TwoMass]).is_ok(),
                "{} should serve gaia+2mass",
                model.name()
            );
        }
    }
}
