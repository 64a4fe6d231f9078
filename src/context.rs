// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use hifitime::{Duration, Epoch, Unit};

use crate::{index::TimeBaselineIndex, math::mjd_seconds_to_epoch, selection::PartitionKey};

/// A lightweight summary of one partition's grid, used for logging and for
/// reporting conversion results.
///
/// This describes the axes of the dense arrays built for the partition.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionContext {
    /// The partition's name within the processing set.
    pub name: String,
    /// The number of timestamps (Axis 0) of the partition's arrays.
    pub num_times: usize,
    /// The number of baselines (Axis 1).
    pub num_baselines: usize,
    /// The number of channels (Axis 2).
    pub num_chans: usize,
    /// The number of correlation products (Axis 3).
    pub num_pols: usize,
    /// The first timestamp, if there are any.
    pub start_timestamp: Option<Epoch>,
    /// The last timestamp, if there are any.
    pub end_timestamp: Option<Epoch>,
    /// Integration time of each timestamp.
    pub int_time: Duration,
    /// Rows selected for the partition.
    pub num_rows: usize,
    /// Rows that landed on the grid.
    pub num_valid_rows: usize,
}

impl PartitionContext {
    pub fn new(
        key: &PartitionKey,
        index: &TimeBaselineIndex,
        num_chans: usize,
        num_pols: usize,
        interval_s: f64,
    ) -> PartitionContext {
        PartitionContext {
            name: key.name(),
            num_times: index.n_times(),
            num_baselines: index.n_baselines(),
            num_chans,
            num_pols,
            start_timestamp: index.times.first().map(|&t| mjd_seconds_to_epoch(t)),
            end_timestamp: index.times.last().map(|&t| mjd_seconds_to_epoch(t)),
            int_time: Duration::from_f64(interval_s, Unit::Second),
            num_rows: index.n_rows(),
            num_valid_rows: index.n_valid(),
        }
    }

    /// The dimensions of the visibility arrays.
    pub fn vis_dims(&self) -> (usize, usize, usize, usize) {
        (
            self.num_times,
            self.num_baselines,
            self.num_chans,
            self.num_pols,
        )
    }

    /// The fraction of grid cells that hold data.
    pub fn fill_fraction(&self) -> f64 {
        let cells = self.num_times * self.num_baselines;
        if cells == 0 {
            0.0
        } else {
            self.num_valid_rows as f64 / cells as f64
        }
    }

    /// A one-line summary.
    pub fn describe(&self) -> String {
        let range = match (self.start_timestamp, self.end_timestamp) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            _ => "no times".to_string(),
        };
        format!(
            "{}: {:?} (time, baseline, chan, pol), {range}, int time {}, {:.1}% filled",
            self.name,
            self.vis_dims(),
            self.int_time,
            self.fill_fraction() * 100.0
        )
    }
}
