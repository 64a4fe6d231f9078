// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading visibility tables and storing chunked arrays.

pub mod error;
pub mod memory;
pub mod zarr;

use crate::{
    array::ArrayData,
    constants::{FREQUENCY_FRAMES, STOKES_TYPES},
    selection::RowSelection,
};

pub use error::{StoreError, TableReadError};
pub use memory::MemoryTable;

cfg_if::cfg_if! {
    if #[cfg(feature = "ms")] {
        pub mod ms;

        pub use ms::MeasurementSet;
    }
}

/// Units and measure reference of the main table's `TIME` column.
#[derive(Debug, Clone, PartialEq)]
pub struct MainTableMeta {
    pub time_units: String,
    pub time_scale: String,
}

impl Default for MainTableMeta {
    fn default() -> Self {
        MainTableMeta {
            time_units: "s".to_string(),
            time_scale: "UTC".to_string(),
        }
    }
}

/// A row of the `DATA_DESCRIPTION` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDescription {
    pub spectral_window_id: i32,
    pub polarization_id: i32,
}

/// A row of the `SPECTRAL_WINDOW` table.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralWindow {
    pub name: String,
    /// Channel centre frequencies. May contain NaN for undefined channels.
    pub chan_freq: Vec<f64>,
    pub chan_width: Vec<f64>,
    pub ref_frequency: f64,
    /// casacore `MFrequency::Types` code.
    pub meas_freq_ref: i32,
    pub freq_units: String,
}

impl Default for SpectralWindow {
    fn default() -> Self {
        SpectralWindow {
            name: String::new(),
            chan_freq: vec![],
            chan_width: vec![],
            ref_frequency: 0.0,
            meas_freq_ref: 5,
            freq_units: "Hz".to_string(),
        }
    }
}

impl SpectralWindow {
    /// The name of the frequency reference frame, e.g. `TOPO`.
    pub fn frame(&self) -> &'static str {
        usize::try_from(self.meas_freq_ref)
            .ok()
            .and_then(|i| FREQUENCY_FRAMES.get(i).copied())
            .unwrap_or("TOPO")
    }
}

/// A row of the `POLARIZATION` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolarizationSetup {
    pub num_corr: usize,
    /// casacore `Stokes::StokesTypes` codes.
    pub corr_type: Vec<i32>,
}

impl PolarizationSetup {
    /// Labels of the correlation products, e.g. `["XX", "YY"]`.
    pub fn labels(&self) -> Vec<String> {
        self.corr_type
            .iter()
            .take(self.num_corr)
            .map(|&c| {
                usize::try_from(c)
                    .ok()
                    .and_then(|i| STOKES_TYPES.get(i))
                    .unwrap_or(&STOKES_TYPES[0])
                    .to_string()
            })
            .collect()
    }
}

/// A row of the `FIELD` table. Directions are the zeroth-order polynomial
/// terms, `[longitude, latitude]` in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub code: String,
    pub delay_dir: [f64; 2],
    pub phase_dir: [f64; 2],
    pub reference_dir: [f64; 2],
    pub direction_frame: String,
}

impl Default for Field {
    fn default() -> Self {
        Field {
            name: String::new(),
            code: String::new(),
            delay_dir: [0.0; 2],
            phase_dir: [0.0; 2],
            reference_dir: [0.0; 2],
            direction_frame: "J2000".to_string(),
        }
    }
}

/// A row of the `STATE` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    pub obs_mode: String,
}

/// A row of the `ANTENNA` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Antenna {
    pub name: String,
    pub station: String,
    pub mount: String,
    pub dish_diameter: f64,
    /// Geocentric position \[metres\].
    pub position: [f64; 3],
    pub offset: [f64; 3],
    pub flag_row: bool,
}

/// A source of visibilities laid out like a measurement set: a main table
/// with one row per (time, baseline) measurement, plus description
/// subtables.
///
/// Implementors are shared between partition workers, so every method takes
/// `&self`. Each call to [`VisTable::query`] hands out an independent handle.
pub trait VisTable: Sync {
    /// Select rows of the main table.
    fn query(&self, selection: &RowSelection) -> Result<Box<dyn MainQuery + '_>, TableReadError>;

    fn main_meta(&self) -> Result<MainTableMeta, TableReadError>;

    fn data_descriptions(&self) -> Result<Vec<DataDescription>, TableReadError>;

    fn spectral_windows(&self) -> Result<Vec<SpectralWindow>, TableReadError>;

    fn polarizations(&self) -> Result<Vec<PolarizationSetup>, TableReadError>;

    fn fields(&self) -> Result<Vec<Field>, TableReadError>;

    /// The `STATE` table. A missing table yields no rows.
    fn states(&self) -> Result<Vec<State>, TableReadError>;

    fn antennas(&self) -> Result<Vec<Antenna>, TableReadError>;
}

/// The rows of the main table picked out by a [`RowSelection`].
pub trait MainQuery {
    fn n_rows(&self) -> usize;

    fn column_names(&self) -> &[String];

    /// Read a whole column for the selected rows. The first axis of the
    /// result is the row; any further axes are the cell shape.
    fn read_column(&mut self, name: &str) -> Result<ArrayData, TableReadError>;

    /// Read a scalar floating-point column.
    fn read_f64(&mut self, name: &str) -> Result<Vec<f64>, TableReadError> {
        let data = self.read_column(name)?;
        data.to_f64_vec()
            .ok_or_else(|| TableReadError::TypeMismatch {
                column: name.to_string(),
                expected: "scalar float",
                found: format!("{:?} with shape {:?}", data.dtype(), data.shape()),
            })
    }

    /// Read a scalar integer column.
    fn read_i32(&mut self, name: &str) -> Result<Vec<i32>, TableReadError> {
        let data = self.read_column(name)?;
        data.to_i32_vec()
            .ok_or_else(|| TableReadError::TypeMismatch {
                column: name.to_string(),
                expected: "scalar int",
                found: format!("{:?} with shape {:?}", data.dtype(), data.shape()),
            })
    }
}

/// Everything from the description subtables that partitions need, read once
/// per conversion.
#[derive(Debug, Clone, Default)]
pub struct Subtables {
    pub main_meta: MainTableMeta,
    pub data_descriptions: Vec<DataDescription>,
    pub spectral_windows: Vec<SpectralWindow>,
    pub polarizations: Vec<PolarizationSetup>,
    pub fields: Vec<Field>,
    pub states: Vec<State>,
    pub antennas: Vec<Antenna>,
}

impl Subtables {
    pub fn read<T: VisTable + ?Sized>(table: &T) -> Result<Subtables, TableReadError> {
        Ok(Subtables {
            main_meta: table.main_meta()?,
            data_descriptions: table.data_descriptions()?,
            spectral_windows: table.spectral_windows()?,
            polarizations: table.polarizations()?,
            fields: table.fields()?,
            states: table.states()?,
            antennas: table.antennas()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarization_labels() {
        let pol = PolarizationSetup {
            num_corr: 2,
            corr_type: vec![9, 12, 10],
        };
        assert_eq!(pol.labels(), vec!["XX", "YY"]);

        let pol = PolarizationSetup {
            num_corr: 2,
            corr_type: vec![5, 99],
        };
        assert_eq!(pol.labels(), vec!["RR", "Undefined"]);
    }

    #[test]
    fn test_frequency_frame() {
        let mut spw = SpectralWindow::default();
        assert_eq!(spw.frame(), "TOPO");
        spw.meas_freq_ref = 1;
        assert_eq!(spw.frame(), "LSRK");
        spw.meas_freq_ref = -3;
        assert_eq!(spw.frame(), "TOPO");
    }
}
