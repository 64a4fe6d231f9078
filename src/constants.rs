// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Useful constants.

/// The fraction of the smallest integration interval within which two
/// timestamps are considered equal.
pub const TIME_TOLERANCE_FRACTION: f64 = 0.25;
/// Time tolerance used when no positive integration interval is available
/// \[seconds\].
pub const DEFAULT_TIME_TOLERANCE_S: f64 = 1e-3;

/// Name of the time dimension.
pub const DIM_TIME: &str = "time";
/// Name of the baseline dimension.
pub const DIM_BASELINE: &str = "baseline_id";
/// Name of the frequency dimension.
pub const DIM_FREQUENCY: &str = "frequency";
/// Name of the polarization dimension.
pub const DIM_POLARIZATION: &str = "polarization";
/// Name of the uvw component dimension.
pub const DIM_UVW: &str = "uvw_label";
/// Name of the antenna dimension of the antenna dataset.
pub const DIM_ANTENNA: &str = "antenna_id";
/// Name of the cartesian component dimension of the antenna dataset.
pub const DIM_XYZ: &str = "xyz_label";

/// Labels along [`DIM_UVW`].
pub const UVW_LABELS: [&str; 3] = ["u", "v", "w"];
/// Labels along [`DIM_XYZ`].
pub const XYZ_LABELS: [&str; 3] = ["x", "y", "z"];

/// Name of the main dataset entry within a partition.
pub const MAIN_ENTRY: &str = "MAIN";
/// Name of the antenna dataset entry within a partition.
pub const ANTENNA_ENTRY: &str = "ANTENNA";

/// casacore `Stokes::StokesTypes`, indexed by the values found in the
/// `CORR_TYPE` column of the `POLARIZATION` table.
pub const STOKES_TYPES: [&str; 33] = [
    "Undefined",
    "I",
    "Q",
    "U",
    "V",
    "RR",
    "RL",
    "LR",
    "LL",
    "XX",
    "XY",
    "YX",
    "YY",
    "RX",
    "RY",
    "LX",
    "LY",
    "XR",
    "XL",
    "YR",
    "YL",
    "PP",
    "PQ",
    "QP",
    "QQ",
    "RCircular",
    "LCircular",
    "Linear",
    "Ptotal",
    "Plinear",
    "PFtotal",
    "PFlinear",
    "Pangle",
];

/// casacore `MFrequency::Types`, indexed by the values found in the
/// `MEAS_FREQ_REF` column of the `SPECTRAL_WINDOW` table.
pub const FREQUENCY_FRAMES: [&str; 9] = [
    "REST", "LSRK", "LSRD", "BARY", "GEO", "TOPO", "GALACTO", "LGROUP", "CMB",
];
