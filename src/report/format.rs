//! Plain-text formatting for terminal output and the verbose age report.
//!
//! Formatting lives here so the estimator and grid code never print anything.

use crate::domain::{Channel, FateCode, StarFit};
use crate::grid::{CacheStatus, CachedGrid};
use crate::photometry::CutCounts;

/// Column headers of the verbose age report, in column order.
pub const AGE_REPORT_HEADERS: [&str; 10] = [
    "G-K_MASS",
    "G-J_MASS",
    "G-H_MASS",
    "Gbp-Grp_MASS",
    "G-K_AGE",
    "G-J_AGE",
    "G-H_AGE",
    "Gbp-Grp_AGE",
    "MASS",
    "AGE",
];

/// Summary of a loaded or rebuilt grid.
pub fn format_grid_summary(model_code: &str, cached: &CachedGrid, status: &CacheStatus) -> String {
    let mut out = String::new();
    let grid = &cached.grid;
    let params = &cached.params;
    let (n_mass, n_age, n_filters) = grid.shape();

    out.push_str("=== isoage - isochrone grid ===\n");
    out.push_str(&format!("Model: {model_code}\n"));
    match status {
        CacheStatus::Hit => out.push_str("Cache: hit\n"),
        CacheStatus::Rebuilt(reason) => out.push_str(&format!("Cache: rebuilt ({reason})\n")),
    }
    out.push_str(&format!(
        "Mass: [{:.4}, {:.4}] M_sun, {n_mass} steps\n",
        params.mass_range[0], params.mass_range[1]
    ));
    out.push_str(&format!(
        "Age: [{:.4}, {:.4}] Myr, {n_age} steps\n",
        params.age_range[0], params.age_range[1]
    ));
    out.push_str(&format!("Filters: {n_filters}\n"));

    out.push('\n');
    out.push_str(&format!("{:<8} {:>9}\n", "filter", "coverage"));
    out.push_str(&format!("{:-<18}\n", ""));
    for (filter, fraction) in grid.coverage() {
        out.push_str(&format!("{:<8} {:>8.1}%\n", filter.label(), 100.0 * fraction));
    }

    out
}

/// Counts from normalisation and fitting.
pub fn format_estimate_summary(rows_skipped: usize, cuts: &CutCounts, fits: &[StarFit]) -> String {
    let mut out = String::new();
    // Border-age fits carry an age without a mass.
    let determined = fits.iter().filter(|f| f.age.is_finite()).count();

    out.push_str("=== isoage - age/mass estimate ===\n");
    out.push_str(&format!("Stars: {} ({determined} determined)\n", fits.len()));
    if rows_skipped > 0 {
        out.push_str(&format!("Skipped catalog rows: {rows_skipped}\n"));
    }
    out.push_str(&format!(
        "Nulled: parallax {}, negative error {}, gaia excess {}, 2mass quality {}, wise quality {}\n",
        cuts.bad_parallax, cuts.negative_error, cuts.gaia_excess, cuts.twomass_quality, cuts.wise_quality
    ));

    out.push('\n');
    out.push_str(&format!("{:<10} {:>8}\n", "channel", "fitted"));
    out.push_str(&format!("{:-<19}\n", ""));
    for channel in Channel::ALL {
        let n = fits.iter().filter(|f| f.channel(channel).fate == FateCode::FitOk).count();
        out.push_str(&format!("{:<10} {:>8}\n", channel.label(), n));
    }

    out
}

/// One line per star: aggregate mass and age, MC spreads and channel fates.
pub fn format_star_table(ids: &[String], fits: &[StarFit]) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{:<16} {:>9} {:>10} {:>9} {:>10} {:>5}  {}\n",
        "id", "mass", "age", "mass_std", "age_std", "n_fit", "fates"
    ));
    out.push_str(&format!("{:-<80}\n", ""));

    for (id, fit) in ids.iter().zip(fits) {
        let fates: Vec<String> = fit.channels.iter().map(|c| c.fate.code().to_string()).collect();
        out.push_str(
            format!(
                "{:<16} {:>9} {:>10} {:>9} {:>10} {:>5}  {}",
                truncate(id, 16),
                fmt_num(fit.mass, 4),
                fmt_num(fit.age, 2),
                fit.mass_std.map_or_else(|| "-".to_string(), |v| fmt_num(v, 4)),
                fit.age_std.map_or_else(|| "-".to_string(), |v| fmt_num(v, 2)),
                fit.n_fitted(),
                fates.join(" "),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// The verbose report: one row per star, channel masses then channel ages,
/// then the aggregate. Columns are right-aligned and separated by two spaces.
pub fn format_age_table(fits: &[StarFit]) -> String {
    let rows: Vec<[String; 10]> = fits
        .iter()
        .map(|fit| {
            let mut row: [String; 10] = Default::default();
            for (k, channel) in Channel::ALL.into_iter().enumerate() {
                let c = fit.channel(channel);
                row[k] = fmt_num(c.mass, 2);
                row[4 + k] = fmt_num(c.age, 2);
            }
            row[8] = fmt_num(fit.mass, 2);
            row[9] = fmt_num(fit.age, 2);
            row
        })
        .collect();

    let widths: Vec<usize> = (0..AGE_REPORT_HEADERS.len())
        .map(|k| {
            rows.iter()
                .map(|r| r[k].len())
                .chain(std::iter::once(AGE_REPORT_HEADERS[k].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_row(&mut out, AGE_REPORT_HEADERS.iter().copied(), &widths);
    for row in &rows {
        push_row(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, w)| format!("{cell:>w$}"))
        .collect();
    out.push_str(&line.join("  "));
    out.push('\n');
}

/// Fixed-precision number; NaN prints as `nan`.
fn fmt_num(v: f64, decimals: usize) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else {
        format!("{v:.decimals$}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
