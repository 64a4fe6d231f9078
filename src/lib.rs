// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Convert CASA measurement sets (v2) into processing sets: one chunked,
//! self-describing dataset per partition of the main table, which can later
//! be opened lazily or loaded whole.
//!
//! The entry points are [`convert_msv2_to_processing_set`] (any [`VisTable`])
//! and, with the "ms" feature, [`convert_ms`]. Written sets are read back with
//! [`open_processing_set`] and [`load_processing_set`].

#[allow(non_camel_case_types)]
pub type c32 = num_complex::Complex<f32>;
#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex<f64>;

pub mod array;
pub mod column;
pub mod constants;
pub mod context;
pub mod convert;
pub mod coords;
pub mod dataset;
pub mod index;
pub mod io;
pub mod math;
pub mod metadata;
pub mod processing_set;
pub mod selection;
pub mod writer;

#[cfg(test)]
mod tests;

// Re-exports.
pub use array::{ArrayData, DType};
pub use context::PartitionContext;
pub use convert::{
    convert_msv2_to_processing_set, ConversionReport, ConvertError, ConvertOptions,
    PartitionOutcome, StorageBackend,
};
pub use dataset::{AntennaDataset, Dataset, Variable, VisDataset};
pub use io::{
    zarr::Compressor, MainQuery, MemoryTable, StoreError, TableReadError, VisTable,
};
pub use processing_set::{
    load_processing_set, open_processing_set, DimSelection, LazyPartition, LoadedPartition,
    PartitionFilter, PartitionSelection, ProcessingSet,
};
pub use selection::{PartitionKey, PartitionScheme, RowSelection};
pub use writer::{Encoding, WriteError, WriteMode};

pub use hifitime;
pub use ndarray;
pub use num_complex;
pub use num_complex::Complex;
pub use rayon;

// If "ms" is enabled, re-export rubbl_casatables and the reader here.
cfg_if::cfg_if! {
    if #[cfg(feature = "ms")] {
        pub use convert::convert_ms;
        pub use io::MeasurementSet;
        pub use rubbl_casatables;
    }
}

#[cfg(test)]
#[test]
fn hifitime_works_as_expected() {
    use hifitime::Epoch;

    // MS times are MJD seconds (UTC).
    let mjd_s = 4.8e9;
    let epoch = Epoch::from_mjd_utc(mjd_s / 86400.0);
    approx::assert_abs_diff_eq!(epoch.as_mjd_utc_seconds(), mjd_s, epsilon = 1e-3);

    let unix = Epoch::from_unix_seconds(0.0);
    approx::assert_abs_diff_eq!(unix.as_mjd_utc_days(), 40587.0, epsilon = 1e-9);
}
