// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.

use hifitime::{Epoch, SECONDS_PER_DAY};

/// Sort the non-NaN `values` and remove exact duplicates.
pub fn unique_sorted(values: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    out.sort_by(f64::total_cmp);
    out.dedup();
    out
}

/// Sort the non-NaN `values`, collapsing runs of values where each is within
/// `tol` of the first value of the run. The first value of each run is kept.
pub fn unique_with_tolerance(values: &[f64], tol: f64) -> Vec<f64> {
    let sorted = unique_sorted(values);
    let mut out: Vec<f64> = Vec::with_capacity(sorted.len());
    for v in sorted {
        match out.last() {
            Some(&last) if (v - last).abs() <= tol => {}
            _ => out.push(v),
        }
    }
    out
}

/// Find the index of the element of the sorted `axis` nearest to `value`, if
/// it lies within `tol`.
pub fn search_sorted_tol(axis: &[f64], value: f64, tol: f64) -> Option<usize> {
    if value.is_nan() {
        return None;
    }
    let i = axis.partition_point(|&a| a < value);
    let below = i.checked_sub(1).map(|j| (j, (value - axis[j]).abs()));
    let above = axis.get(i).map(|&a| (i, (a - value).abs()));
    let nearest = match (below, above) {
        (Some(b), Some(a)) => Some(if a.1 < b.1 { a } else { b }),
        (b, a) => b.or(a),
    };
    nearest.filter(|(_, dist)| *dist <= tol).map(|(j, _)| j)
}

/// Are the `values` strictly increasing? Empty and single-element slices are.
pub fn is_strictly_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[1] > w[0])
}

/// The epoch of casacore epoch seconds (MJD seconds, UTC).
pub fn mjd_seconds_to_epoch(mjd_seconds: f64) -> Epoch {
    Epoch::from_mjd_utc(mjd_seconds / SECONDS_PER_DAY)
}

/// Convert casacore epoch seconds (MJD seconds, UTC) into unix seconds. NaN
/// stays NaN.
pub fn mjd_seconds_to_unix(mjd_seconds: f64) -> f64 {
    if mjd_seconds.is_nan() {
        return f64::NAN;
    }
    mjd_seconds_to_epoch(mjd_seconds).as_unix_seconds()
}
