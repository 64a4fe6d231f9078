// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Coordinates of a partition, and the metadata attached to them, derived
//! from the description subtables.

use std::collections::BTreeMap;

use log::warn;
use ndarray::Array2;
use thiserror::Error;

use crate::{
    array::ArrayData,
    constants::{
        DIM_ANTENNA, DIM_BASELINE, DIM_FREQUENCY, DIM_POLARIZATION, DIM_TIME, DIM_UVW, DIM_XYZ,
        UVW_LABELS, XYZ_LABELS,
    },
    dataset::{AntennaDataset, Variable},
    index::TimeBaselineIndex,
    io::{Antenna, Field, MainTableMeta, PolarizationSetup, SpectralWindow, Subtables},
    math::unique_sorted,
    metadata::{
        AntennaAttrs, ColumnAttrs, FieldInfo, FrequencyCoordAttrs, FrequencyReference, MetaType,
        Quantity, SkyCoord, TimeCoordAttrs, VarAttrs,
    },
};

#[derive(Error, Debug)]
pub enum CoordError {
    #[error("There is no DATA_DESCRIPTION row {0}")]
    BadDdi(i32),

    #[error("DATA_DESCRIPTION row {ddi} refers to SPECTRAL_WINDOW row {spw}, which doesn't exist")]
    BadSpectralWindow { ddi: i32, spw: i32 },

    #[error("DATA_DESCRIPTION row {ddi} refers to POLARIZATION row {pol}, which doesn't exist")]
    BadPolarization { ddi: i32, pol: i32 },

    #[error("There is no FIELD row {0}")]
    BadField(i32),

    #[error("Spectral window {0} has no defined channel widths")]
    NoChannelWidths(i32),
}

/// Violations of the rules a single partition must obey.
#[derive(Error, Debug)]
pub enum InvariantError {
    #[error("A partition must contain exactly one FIELD_ID, but found {0:?}")]
    MultipleFields(Vec<i32>),

    #[error("A partition must have one INTERVAL, but found {0:?}")]
    InconsistentInterval(Vec<f64>),
}

/// The spectral window and polarization setup of a data description.
#[derive(Debug, Clone, Copy)]
pub struct SpectralSetup<'a> {
    pub spectral_window_id: i32,
    pub polarization_setup_id: i32,
    pub spw: &'a SpectralWindow,
    pub pol: &'a PolarizationSetup,
}

pub fn resolve_ddi(subtables: &Subtables, ddi: i32) -> Result<SpectralSetup<'_>, CoordError> {
    let dd = usize::try_from(ddi)
        .ok()
        .and_then(|i| subtables.data_descriptions.get(i))
        .ok_or(CoordError::BadDdi(ddi))?;
    let spw = usize::try_from(dd.spectral_window_id)
        .ok()
        .and_then(|i| subtables.spectral_windows.get(i))
        .ok_or(CoordError::BadSpectralWindow {
            ddi,
            spw: dd.spectral_window_id,
        })?;
    let pol = usize::try_from(dd.polarization_id)
        .ok()
        .and_then(|i| subtables.polarizations.get(i))
        .ok_or(CoordError::BadPolarization {
            ddi,
            pol: dd.polarization_id,
        })?;
    Ok(SpectralSetup {
        spectral_window_id: dd.spectral_window_id,
        polarization_setup_id: dd.polarization_id,
        spw,
        pol,
    })
}

/// The defined channels of a spectral window.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyAxis {
    pub values: Vec<f64>,
    /// Indices of `values` within the window's channels.
    pub channels: Vec<usize>,
}

pub fn frequency_axis(spw: &SpectralWindow) -> FrequencyAxis {
    let (channels, values) = spw
        .chan_freq
        .iter()
        .enumerate()
        .filter(|(_, f)| !f.is_nan())
        .unzip();
    FrequencyAxis { values, channels }
}

/// The channel width of a spectral window: the magnitude of the smallest
/// defined `CHAN_WIDTH`.
///
/// Windows with unequal channel widths are accepted, with a warning.
pub fn channel_width(spw: &SpectralWindow, spw_id: i32) -> Result<f64, CoordError> {
    let widths = unique_sorted(&spw.chan_width);
    let first = *widths.first().ok_or(CoordError::NoChannelWidths(spw_id))?;
    if widths.len() > 1 {
        warn!(
            "spectral window {spw_id} has {} distinct channel widths; using {first}",
            widths.len()
        );
    }
    Ok(first.abs())
}

/// The single `FIELD_ID` of a partition's rows.
pub fn check_single_field(field_ids: &[i32]) -> Result<i32, InvariantError> {
    let mut unique = field_ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    match unique.as_slice() {
        [id] => Ok(*id),
        _ => Err(InvariantError::MultipleFields(unique)),
    }
}

/// The single `INTERVAL` of a partition's rows.
pub fn check_single_interval(intervals: &[f64]) -> Result<f64, InvariantError> {
    let unique = unique_sorted(intervals);
    match unique.as_slice() {
        [interval] => Ok(*interval),
        _ => Err(InvariantError::InconsistentInterval(unique)),
    }
}

pub fn field_info(fields: &[Field], field_id: i32) -> Result<FieldInfo, CoordError> {
    let field = usize::try_from(field_id)
        .ok()
        .and_then(|i| fields.get(i))
        .ok_or(CoordError::BadField(field_id))?;
    let frame = &field.direction_frame;
    Ok(FieldInfo {
        name: field.name.clone(),
        code: field.code.clone(),
        field_id,
        delay_direction: SkyCoord::new(
            field.delay_dir,
            frame,
            "Direction of delay center in right ascension and declination.",
        ),
        phase_direction: SkyCoord::new(
            field.phase_dir,
            frame,
            "Direction of phase center in right ascension and declination.",
        ),
        reference_direction: SkyCoord::new(
            field.reference_dir,
            frame,
            "Direction of reference direction in right ascension and declination.",
        ),
    })
}

pub fn time_attrs(meta: &MainTableMeta, interval: f64) -> TimeCoordAttrs {
    TimeCoordAttrs {
        kind: MetaType::Time,
        units: vec![meta.time_units.clone()],
        scale: meta.time_scale.to_lowercase(),
        format: "unix".to_string(),
        integration_time: Quantity::new(interval, "s"),
        effective_integration_time: "EFFECTIVE_INTEGRATION_TIME".to_string(),
    }
}

pub fn frequency_attrs(
    spw: &SpectralWindow,
    spw_id: i32,
    channel_width: f64,
) -> FrequencyCoordAttrs {
    FrequencyCoordAttrs {
        kind: MetaType::SpectralCoord,
        units: vec![spw.freq_units.clone()],
        frame: spw.frame().to_string(),
        spectral_window_name: spw.name.clone(),
        spectral_window_id: spw_id,
        channel_width: Quantity::new(channel_width, "Hz"),
        effective_channel_width: "EFFECTIVE_CHANNEL_WIDTH".to_string(),
        reference_frequency: FrequencyReference::new(
            spw.ref_frequency,
            &spw.freq_units,
            spw.frame(),
        ),
    }
}

/// Build every coordinate of a partition's main dataset.
pub fn assemble_coords(
    index: &TimeBaselineIndex,
    setup: &SpectralSetup,
    frequency: &FrequencyAxis,
    meta: &MainTableMeta,
    interval: f64,
) -> Result<BTreeMap<String, Variable>, CoordError> {
    let width = channel_width(setup.spw, setup.spectral_window_id)?;
    let n_baselines = index.n_baselines() as i64;

    let mut coords = BTreeMap::new();
    coords.insert(
        DIM_TIME.to_string(),
        Variable::new(&[DIM_TIME], index.unix_times())
            .with_attrs(VarAttrs::Time(time_attrs(meta, interval))),
    );
    coords.insert(
        DIM_BASELINE.to_string(),
        Variable::new(&[DIM_BASELINE], (0..n_baselines).collect::<Vec<i64>>()),
    );
    coords.insert(
        "baseline_antenna1_id".to_string(),
        Variable::new(&[DIM_BASELINE], index.antenna1_ids()),
    );
    coords.insert(
        "baseline_antenna2_id".to_string(),
        Variable::new(&[DIM_BASELINE], index.antenna2_ids()),
    );
    coords.insert(
        DIM_FREQUENCY.to_string(),
        Variable::new(&[DIM_FREQUENCY], frequency.values.clone()).with_attrs(
            VarAttrs::Frequency(frequency_attrs(
                setup.spw,
                setup.spectral_window_id,
                width,
            )),
        ),
    );
    coords.insert(
        DIM_POLARIZATION.to_string(),
        Variable::new(
            &[DIM_POLARIZATION],
            ArrayData::from_strs(&setup.pol.labels()),
        ),
    );
    coords.insert(
        DIM_UVW.to_string(),
        Variable::new(&[DIM_UVW], ArrayData::from_strs(&UVW_LABELS)),
    );
    Ok(coords)
}

/// The antenna dataset shared by every partition: one entry per row of the
/// `ANTENNA` table.
pub fn antenna_dataset(antennas: &[Antenna]) -> AntennaDataset {
    let n = antennas.len();
    let metres = |description: &str| {
        VarAttrs::Column(ColumnAttrs {
            kind: Some(MetaType::Quantity),
            units: vec!["m".to_string()],
            description: Some(description.to_string()),
            format: None,
        })
    };

    let mut ds = AntennaDataset::new(AntennaAttrs::default());
    ds.coords.insert(
        DIM_ANTENNA.to_string(),
        Variable::new(&[DIM_ANTENNA], (0..n as i32).collect::<Vec<i32>>()),
    );
    ds.coords.insert(
        DIM_XYZ.to_string(),
        Variable::new(&[DIM_XYZ], ArrayData::from_strs(&XYZ_LABELS)),
    );

    let strings = |f: fn(&Antenna) -> &str| {
        ArrayData::from_strs(&antennas.iter().map(f).collect::<Vec<_>>())
    };
    ds.data_vars.insert(
        "name".to_string(),
        Variable::new(&[DIM_ANTENNA], strings(|a| a.name.as_str())),
    );
    ds.data_vars.insert(
        "station".to_string(),
        Variable::new(&[DIM_ANTENNA], strings(|a| a.station.as_str())),
    );
    ds.data_vars.insert(
        "mount".to_string(),
        Variable::new(&[DIM_ANTENNA], strings(|a| a.mount.as_str())),
    );
    ds.data_vars.insert(
        "position".to_string(),
        Variable::new(
            &[DIM_ANTENNA, DIM_XYZ],
            Array2::from_shape_fn((n, 3), |(i, j)| antennas[i].position[j]).into_dyn(),
        )
        .with_attrs(metres("Geocentric antenna position.")),
    );
    ds.data_vars.insert(
        "offset".to_string(),
        Variable::new(
            &[DIM_ANTENNA, DIM_XYZ],
            Array2::from_shape_fn((n, 3), |(i, j)| antennas[i].offset[j]).into_dyn(),
        )
        .with_attrs(metres("Offset of the feed reference point from the antenna position.")),
    );
    ds.data_vars.insert(
        "dish_diameter".to_string(),
        Variable::new(
            &[DIM_ANTENNA],
            antennas.iter().map(|a| a.dish_diameter).collect::<Vec<f64>>(),
        )
        .with_attrs(metres("Physical diameter of the dish.")),
    );
    ds.data_vars.insert(
        "flag_row".to_string(),
        Variable::new(
            &[DIM_ANTENNA],
            antennas.iter().map(|a| a.flag_row).collect::<Vec<bool>>(),
        ),
    );
    ds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::DataDescription;
    use approx::assert_abs_diff_eq;

    fn subtables() -> Subtables {
        Subtables {
            data_descriptions: vec![
                DataDescription {
                    spectral_window_id: 0,
                    polarization_id: 0,
                },
                DataDescription {
                    spectral_window_id: 4,
                    polarization_id: 0,
                },
            ],
            spectral_windows: vec![SpectralWindow {
                name: "spw0".into(),
                chan_freq: vec![1.0e8, f64::NAN, 1.2e8],
                chan_width: vec![-1.0e7, f64::NAN, -1.0e7],
                ref_frequency: 1.0e8,
                ..Default::default()
            }],
            polarizations: vec![PolarizationSetup {
                num_corr: 2,
                corr_type: vec![9, 12],
            }],
            fields: vec![Field {
                name: "3C286".into(),
                delay_dir: [1.0, 0.5],
                phase_dir: [1.1, 0.6],
                reference_dir: [1.2, 0.7],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_ddi() {
        let subtables = subtables();
        let setup = resolve_ddi(&subtables, 0).unwrap();
        assert_eq!(setup.spw.name, "spw0");
        assert_eq!(setup.pol.labels(), vec!["XX", "YY"]);
        assert!(matches!(
            resolve_ddi(&subtables, 1),
            Err(CoordError::BadSpectralWindow { ddi: 1, spw: 4 })
        ));
        assert!(matches!(
            resolve_ddi(&subtables, 2),
            Err(CoordError::BadDdi(2))
        ));
    }

    #[test]
    fn test_frequency_axis_drops_undefined_channels() {
        let subtables = subtables();
        let axis = frequency_axis(&subtables.spectral_windows[0]);
        assert_eq!(axis.values, vec![1.0e8, 1.2e8]);
        assert_eq!(axis.channels, vec![0, 2]);
    }

    #[test]
    fn test_channel_width() {
        let mut spw = subtables().spectral_windows.remove(0);
        assert_abs_diff_eq!(channel_width(&spw, 0).unwrap(), 1.0e7);

        // Several widths: the smallest wins.
        spw.chan_width = vec![2.0e6, 1.0e6];
        assert_abs_diff_eq!(channel_width(&spw, 0).unwrap(), 1.0e6);

        spw.chan_width = vec![f64::NAN];
        assert!(matches!(
            channel_width(&spw, 3),
            Err(CoordError::NoChannelWidths(3))
        ));
    }

    #[test]
    fn test_partition_invariants() {
        assert_eq!(check_single_field(&[2, 2, 2]).unwrap(), 2);
        assert!(matches!(
            check_single_field(&[2, 0, 2]),
            Err(InvariantError::MultipleFields(ids)) if ids == vec![0, 2]
        ));
        assert_abs_diff_eq!(check_single_interval(&[1.5, 1.5]).unwrap(), 1.5);
        assert!(check_single_interval(&[1.5, 2.0]).is_err());
    }

    #[test]
    fn test_field_info_uses_reference_dir() {
        let subtables = subtables();
        let info = field_info(&subtables.fields, 0).unwrap();
        assert_eq!(info.name, "3C286");
        assert_eq!(info.delay_direction.data, [1.0, 0.5]);
        assert_eq!(info.phase_direction.data, [1.1, 0.6]);
        assert_eq!(info.reference_direction.data, [1.2, 0.7]);
        assert_eq!(info.reference_direction.attrs.frame, "j2000");
        assert!(field_info(&subtables.fields, 1).is_err());
    }

    #[test]
    fn test_assemble_coords() {
        let subtables = subtables();
        let setup = resolve_ddi(&subtables, 0).unwrap();
        let index = TimeBaselineIndex::build(
            &[4.0e9, 4.0e9, 4.0e9 + 2.0],
            &[2.0; 3],
            &[0, 0, 1],
            &[1, 2, 2],
        )
        .unwrap();
        let freq = frequency_axis(setup.spw);
        let coords = assemble_coords(&index, &setup, &freq, &MainTableMeta::default(), 2.0)
            .unwrap();

        assert_eq!(coords[DIM_TIME].data.shape(), &[2]);
        assert_eq!(coords[DIM_BASELINE].data, ArrayData::from(vec![0i64, 1, 2]));
        assert_eq!(
            coords["baseline_antenna2_id"].data,
            ArrayData::from(vec![1i32, 2, 2])
        );
        assert_eq!(
            coords[DIM_POLARIZATION].data,
            ArrayData::from_strs(&["XX", "YY"])
        );
        match &coords[DIM_FREQUENCY].attrs {
            VarAttrs::Frequency(a) => {
                assert_abs_diff_eq!(a.channel_width.data, 1.0e7);
                assert_eq!(a.frame, "TOPO");
                assert_eq!(a.reference_frequency.attrs.observer, "topo");
            }
            other => panic!("unexpected {other:?}"),
        }
        match &coords[DIM_TIME].attrs {
            VarAttrs::Time(a) => {
                assert_eq!(a.scale, "utc");
                assert_abs_diff_eq!(a.integration_time.data, 2.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_antenna_dataset() {
        let antennas = vec![
            Antenna {
                name: "Tile011".into(),
                station: "MWA".into(),
                position: [1.0, 2.0, 3.0],
                dish_diameter: 4.0,
                ..Default::default()
            },
            Antenna {
                name: "Tile012".into(),
                flag_row: true,
                ..Default::default()
            },
        ];
        let ds = antenna_dataset(&antennas);
        let dims = ds.dims().unwrap();
        assert_eq!(dims[DIM_ANTENNA], 2);
        assert_eq!(dims[DIM_XYZ], 3);
        assert_eq!(
            ds.data_vars["name"].data,
            ArrayData::from_strs(&["Tile011", "Tile012"])
        );
        assert_eq!(
            ds.data_vars["flag_row"].data,
            ArrayData::from(vec![false, true])
        );
        match &ds.data_vars["position"].data {
            ArrayData::Float64(a) => assert_abs_diff_eq!(a[[0, 2]], 3.0),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ds.attrs.kind, MetaType::Antenna);
    }
}
