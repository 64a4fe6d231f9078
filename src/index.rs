// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mapping the irregular rows of a main table onto a dense (time, baseline)
//! grid.

use log::{debug, trace};
use thiserror::Error;

use crate::{
    constants::{DEFAULT_TIME_TOLERANCE_S, TIME_TOLERANCE_FRACTION},
    math::{mjd_seconds_to_unix, search_sorted_tol, unique_with_tolerance},
};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Index columns have different lengths: TIME {times}, INTERVAL {intervals}, ANTENNA1 {ant1}, ANTENNA2 {ant2}")]
    LengthMismatch {
        times: usize,
        intervals: usize,
        ant1: usize,
        ant2: usize,
    },
}

/// An antenna pair, as stored in a row. Baselines are ordered by `antenna1`,
/// then `antenna2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Baseline {
    pub antenna1: i32,
    pub antenna2: i32,
}

impl Baseline {
    /// A zero-padded label like `003_011`.
    pub fn label(&self) -> String {
        format!("{:03}_{:03}", self.antenna1, self.antenna2)
    }
}

/// The positions of every row on a dense (time, baseline) grid.
#[derive(Debug, Clone)]
pub struct TimeBaselineIndex {
    /// Sorted unique timestamps \[MJD seconds\].
    pub times: Vec<f64>,
    /// Two timestamps closer than this are the same \[seconds\].
    pub tolerance: f64,
    /// Sorted unique baselines.
    pub baselines: Vec<Baseline>,
    /// The (time, baseline) cell of each row, or `None` if the row was
    /// rejected.
    pub cells: Vec<Option<(usize, usize)>>,
}

impl TimeBaselineIndex {
    /// Build the grid from the `TIME`, `INTERVAL`, `ANTENNA1` and `ANTENNA2`
    /// columns of the selected rows.
    ///
    /// A row is rejected if its time matches no grid time, or if an earlier
    /// row already claimed its cell.
    pub fn build(
        times: &[f64],
        intervals: &[f64],
        antenna1: &[i32],
        antenna2: &[i32],
    ) -> Result<TimeBaselineIndex, IndexError> {
        let n_rows = times.len();
        if intervals.len() != n_rows || antenna1.len() != n_rows || antenna2.len() != n_rows {
            return Err(IndexError::LengthMismatch {
                times: n_rows,
                intervals: intervals.len(),
                ant1: antenna1.len(),
                ant2: antenna2.len(),
            });
        }

        let tolerance = time_tolerance(intervals);
        let time_axis = unique_with_tolerance(times, tolerance);

        let mut baselines: Vec<Baseline> = antenna1
            .iter()
            .zip(antenna2)
            .map(|(&antenna1, &antenna2)| Baseline { antenna1, antenna2 })
            .collect();
        baselines.sort_unstable();
        baselines.dedup();

        let n_baselines = baselines.len();
        let mut claimed = vec![false; time_axis.len() * n_baselines];
        let mut n_unmatched = 0;
        let mut n_duplicate = 0;
        let cells = times
            .iter()
            .zip(antenna1.iter().zip(antenna2))
            .map(|(&time, (&antenna1, &antenna2))| {
                let t = match search_sorted_tol(&time_axis, time, tolerance) {
                    Some(t) => t,
                    None => {
                        n_unmatched += 1;
                        return None;
                    }
                };
                let b = baselines
                    .binary_search(&Baseline { antenna1, antenna2 })
                    .ok()?;
                let claim = &mut claimed[t * n_baselines + b];
                if *claim {
                    n_duplicate += 1;
                    return None;
                }
                *claim = true;
                Some((t, b))
            })
            .collect();

        if n_unmatched > 0 || n_duplicate > 0 {
            debug!(
                "dropping {n_unmatched} rows with unmatched times and {n_duplicate} rows with duplicate cells"
            );
        }
        trace!(
            "grid of {} times x {} baselines from {n_rows} rows (time tolerance {tolerance}s)",
            time_axis.len(),
            n_baselines
        );

        Ok(TimeBaselineIndex {
            times: time_axis,
            tolerance,
            baselines,
            cells,
        })
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    pub fn n_baselines(&self) -> usize {
        self.baselines.len()
    }

    pub fn n_rows(&self) -> usize {
        self.cells.len()
    }

    /// The number of rows that landed on the grid.
    pub fn n_valid(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// The time axis in unix seconds.
    pub fn unix_times(&self) -> Vec<f64> {
        self.times.iter().map(|&t| mjd_seconds_to_unix(t)).collect()
    }

    pub fn antenna1_ids(&self) -> Vec<i32> {
        self.baselines.iter().map(|b| b.antenna1).collect()
    }

    pub fn antenna2_ids(&self) -> Vec<i32> {
        self.baselines.iter().map(|b| b.antenna2).collect()
    }
}

/// A quarter of the smallest positive integration interval.
fn time_tolerance(intervals: &[f64]) -> f64 {
    intervals
        .iter()
        .copied()
        .filter(|&i| i > 0.0)
        .min_by(f64::total_cmp)
        .map(|i| i * TIME_TOLERANCE_FRACTION)
        .unwrap_or(DEFAULT_TIME_TOLERANCE_S)
}
