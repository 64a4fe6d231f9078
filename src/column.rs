// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turning per-row main-table columns into dense (time, baseline, ...) arrays.

use std::collections::BTreeMap;

use log::{debug, trace, warn};
use ndarray::{ArrayD, Axis, IxDyn};

use crate::{
    array::{map_array, ArrayData, Missing},
    constants::{DIM_BASELINE, DIM_FREQUENCY, DIM_POLARIZATION, DIM_TIME, DIM_UVW},
    dataset::Variable,
    index::TimeBaselineIndex,
    io::MainQuery,
    math::mjd_seconds_to_unix,
    metadata::{ColumnAttrs, MetaType, VarAttrs},
};

const VIS_DIMS: [&str; 4] = [DIM_TIME, DIM_BASELINE, DIM_FREQUENCY, DIM_POLARIZATION];
const UVW_DIMS: [&str; 3] = [DIM_TIME, DIM_BASELINE, DIM_UVW];
const ROW_DIMS: [&str; 2] = [DIM_TIME, DIM_BASELINE];

/// How a main-table column becomes a data variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub column: &'static str,
    pub variable: &'static str,
    pub dims: &'static [&'static str],
}

/// Every main-table column that is converted. Anything else is ignored.
pub const COLUMN_SPECS: [ColumnSpec; 9] = [
    ColumnSpec {
        column: "FLOAT_DATA",
        variable: "SPECTRUM",
        dims: &VIS_DIMS,
    },
    ColumnSpec {
        column: "DATA",
        variable: "VISIBILITY",
        dims: &VIS_DIMS,
    },
    ColumnSpec {
        column: "CORRECTED_DATA",
        variable: "VISIBILITY_CORRECTED",
        dims: &VIS_DIMS,
    },
    ColumnSpec {
        column: "WEIGHT_SPECTRUM",
        variable: "WEIGHT",
        dims: &VIS_DIMS,
    },
    ColumnSpec {
        column: "WEIGHT",
        variable: "WEIGHT",
        dims: &VIS_DIMS,
    },
    ColumnSpec {
        column: "FLAG",
        variable: "FLAG",
        dims: &VIS_DIMS,
    },
    ColumnSpec {
        column: "UVW",
        variable: "UVW",
        dims: &UVW_DIMS,
    },
    ColumnSpec {
        column: "TIME_CENTROID",
        variable: "TIME_CENTROID",
        dims: &ROW_DIMS,
    },
    ColumnSpec {
        column: "EXPOSURE",
        variable: "EFFECTIVE_INTEGRATION_TIME",
        dims: &ROW_DIMS,
    },
];

pub fn column_spec(column: &str) -> Option<&'static ColumnSpec> {
    COLUMN_SPECS.iter().find(|s| s.column == column)
}

/// The attributes attached to a materialized variable.
pub fn variable_attrs(variable: &str) -> VarAttrs {
    let (kind, units, description) = match variable {
        "UVW" => (Some(MetaType::Uvw), Some("m"), "uvw coordinates."),
        "TIME_CENTROID" => (
            Some(MetaType::Time),
            Some("s"),
            "time centroid of each integration.",
        ),
        "EFFECTIVE_INTEGRATION_TIME" => (
            Some(MetaType::Quantity),
            Some("s"),
            "effective integration time of each sample.",
        ),
        "VISIBILITY" | "VISIBILITY_CORRECTED" => (None, None, "complex visibilities."),
        "SPECTRUM" => (None, None, "single-dish spectra."),
        _ => return VarAttrs::None,
    };
    VarAttrs::Column(ColumnAttrs {
        kind,
        units: units.iter().map(|u| u.to_string()).collect(),
        description: Some(description.to_string()),
        // Converted from MJD seconds, like the time coordinate.
        format: (variable == "TIME_CENTROID").then(|| "unix".to_string()),
    })
}

/// Why a column was not materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a column that is converted.
    Unrecognised,
    /// Asked to be ignored.
    Ignored,
    /// `WEIGHT` when `WEIGHT_SPECTRUM` is present.
    Superseded,
    ReadFailed(String),
    BadShape {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}

/// What happened to one main-table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnOutcome {
    Materialized { column: String, variable: String },
    Skipped { column: String, reason: SkipReason },
}

/// The channel and correlation layout of the data columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellShape {
    /// Channels in the spectral window, including undefined ones.
    pub n_chans: usize,
    /// The channels kept on the frequency axis.
    pub channels: Vec<usize>,
    pub n_pols: usize,
}

/// The variables built from one partition's main-table columns.
#[derive(Debug, Clone, Default)]
pub struct Materialized {
    pub variables: BTreeMap<String, Variable>,
    pub outcomes: Vec<ColumnOutcome>,
}

impl Materialized {
    pub fn skipped(&self) -> impl Iterator<Item = (&String, &SkipReason)> {
        self.outcomes.iter().filter_map(|o| match o {
            ColumnOutcome::Skipped { column, reason } => Some((column, reason)),
            ColumnOutcome::Materialized { .. } => None,
        })
    }
}

/// Scatter each recognised column of `query` onto the grid of `index`.
///
/// Columns that can't be read, or whose cells have an unexpected shape, are
/// skipped and reported; they never fail the partition.
pub fn materialize_columns(
    query: &mut dyn MainQuery,
    index: &TimeBaselineIndex,
    shape: &CellShape,
    ignore: &[String],
) -> Materialized {
    let column_names = query.column_names().to_vec();
    let has_weight_spectrum = column_names.iter().any(|c| c == "WEIGHT_SPECTRUM");
    let mut out = Materialized::default();

    for column in column_names {
        let spec = match column_spec(&column) {
            Some(spec) => spec,
            None => {
                debug!("ignoring unrecognised column {column}");
                out.outcomes.push(ColumnOutcome::Skipped {
                    column,
                    reason: SkipReason::Unrecognised,
                });
                continue;
            }
        };
        let reason = if ignore.contains(&column) {
            Some(SkipReason::Ignored)
        } else if column == "WEIGHT" && has_weight_spectrum {
            Some(SkipReason::Superseded)
        } else {
            None
        };
        if let Some(reason) = reason {
            debug!("skipping column {column}: {reason:?}");
            out.outcomes.push(ColumnOutcome::Skipped { column, reason });
            continue;
        }

        match materialize_column(query, spec, index, shape) {
            Ok(data) => {
                trace!("{} -> {} {:?}", column, spec.variable, data.shape());
                out.variables.insert(
                    spec.variable.to_string(),
                    Variable::new(spec.dims, data).with_attrs(variable_attrs(spec.variable)),
                );
                out.outcomes.push(ColumnOutcome::Materialized {
                    column,
                    variable: spec.variable.to_string(),
                });
            }
            Err(reason) => {
                warn!("could not materialize column {column}: {reason:?}");
                out.outcomes.push(ColumnOutcome::Skipped { column, reason });
            }
        }
    }
    out
}

fn materialize_column(
    query: &mut dyn MainQuery,
    spec: &ColumnSpec,
    index: &TimeBaselineIndex,
    shape: &CellShape,
) -> Result<ArrayData, SkipReason> {
    let rows = query
        .read_column(spec.column)
        .map_err(|e| SkipReason::ReadFailed(e.to_string()))?;
    let n_rows = index.n_rows();

    // The cell shape each column must have, and whether a polarization-only
    // cell is tiled across channels.
    let (expected, tile) = match spec.column {
        "WEIGHT" => (vec![n_rows, shape.n_pols], true),
        "UVW" => (vec![n_rows, 3], false),
        "TIME_CENTROID" | "EXPOSURE" => (vec![n_rows], false),
        _ => (vec![n_rows, shape.n_chans, shape.n_pols], false),
    };
    if rows.shape() != expected.as_slice() {
        return Err(SkipReason::BadShape {
            expected,
            found: rows.shape().to_vec(),
        });
    }

    let mut grid = map_array!(&rows, a => scatter(a, index));
    if spec.column == "TIME_CENTROID" {
        grid = match grid {
            ArrayData::Float64(a) => ArrayData::Float64(a.mapv(mjd_seconds_to_unix)),
            other => {
                return Err(SkipReason::ReadFailed(format!(
                    "expected double epochs, found {:?}",
                    other.dtype()
                )))
            }
        };
    }
    if tile {
        grid = map_array!(&grid, a => tile_over_channels(a, shape.channels.len()));
    } else if spec.dims.contains(&DIM_FREQUENCY) && shape.channels.len() != shape.n_chans {
        grid = map_array!(&grid, a => a.select(Axis(2), &shape.channels));
    }
    Ok(grid)
}

/// Place row `r` of `rows` at the grid cell of row `r`. Cells no row lands on
/// hold the missing value.
pub fn scatter<T: Missing>(rows: &ArrayD<T>, index: &TimeBaselineIndex) -> ArrayD<T> {
    let mut shape = vec![index.n_times(), index.n_baselines()];
    shape.extend_from_slice(&rows.shape()[1..]);
    let mut grid = ArrayD::from_elem(IxDyn(&shape), T::missing());
    for (row, cell) in rows.outer_iter().zip(&index.cells) {
        if let Some((t, b)) = *cell {
            grid.index_axis_mut(Axis(0), t)
                .index_axis_mut(Axis(0), b)
                .assign(&row);
        }
    }
    grid
}

/// Turn a (time, baseline, polarization) array into a (time, baseline,
/// frequency, polarization) one with the same value in every channel.
fn tile_over_channels<T: Clone>(grid: &ArrayD<T>, n_chans: usize) -> ArrayD<T> {
    let with_axis = grid.view().insert_axis(Axis(2));
    let mut shape = with_axis.shape().to_vec();
    shape[2] = n_chans;
    match with_axis.broadcast(IxDyn(&shape)) {
        Some(b) => b.to_owned(),
        None => with_axis.to_owned(),
    }
}
