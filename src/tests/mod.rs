// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Synthetic measurement sets and other helpful functions for tests.

use std::collections::BTreeMap;

use ndarray::{Array2, Array3};

use crate::{
    c32,
    io::{
        Antenna, DataDescription, Field, MemoryTable, PolarizationSetup, SpectralWindow, State,
    },
    metadata::{DataGroup, FieldInfo, PartitionAttrs, SkyCoord},
};

pub(crate) const N_CHANS: usize = 4;
pub(crate) const N_POLS: usize = 2;
pub(crate) const N_TIMES: usize = 5;
pub(crate) const INTERVAL: f64 = 2.0;
pub(crate) const MJD0: f64 = 59000.0 * 86400.0;
/// (antenna1, antenna2) of each row within a timestep.
pub(crate) const BASELINES: [(i32, i32); 2] = [(0, 1), (1, 2)];

/// A table with two data descriptions (one spectral window each) and two
/// fields. Every (ddi, field) pair has `N_TIMES` timesteps of two baselines,
/// i.e. 10 rows. The second window's channels are in decreasing frequency.
///
/// Row `r` has visibilities `r + (10 * chan + pol)i` and weights `1 + pol`.
/// Field 0 is observed in scan 1 with state 0 ("CALIBRATE_PHASE#ON_SOURCE"),
/// field 1 in scan 2 with state 1 ("OBSERVE_TARGET#ON_SOURCE").
pub(crate) fn synthetic_table() -> MemoryTable {
    let mut ddi: Vec<i32> = vec![];
    let mut field: Vec<i32> = vec![];
    let mut time: Vec<f64> = vec![];
    let mut ant1: Vec<i32> = vec![];
    let mut ant2: Vec<i32> = vec![];
    for d in 0..2 {
        for f in 0..2 {
            for t in 0..N_TIMES {
                for &(a1, a2) in &BASELINES {
                    ddi.push(d);
                    field.push(f);
                    time.push(MJD0 + ((f as usize * N_TIMES + t) as f64) * INTERVAL);
                    ant1.push(a1);
                    ant2.push(a2);
                }
            }
        }
    }
    let n_rows = time.len();
    let scan: Vec<i32> = field.iter().map(|f| f + 1).collect();

    let data = Array3::from_shape_fn((n_rows, N_CHANS, N_POLS), |(r, c, p)| {
        c32::new(r as f32, (10 * c + p) as f32)
    });
    let flag = Array3::from_shape_fn((n_rows, N_CHANS, N_POLS), |(r, _, _)| r % 7 == 0);
    let weight = Array2::from_shape_fn((n_rows, N_POLS), |(_, p)| 1.0 + p as f32);
    let uvw = Array2::from_shape_fn((n_rows, 3), |(r, i)| (r * 3 + i) as f64);

    MemoryTable {
        data_descriptions: vec![
            DataDescription {
                spectral_window_id: 0,
                polarization_id: 0,
            },
            DataDescription {
                spectral_window_id: 1,
                polarization_id: 0,
            },
        ],
        spectral_windows: vec![
            SpectralWindow {
                name: "low".into(),
                chan_freq: vec![100.0e6, 101.0e6, 102.0e6, 103.0e6],
                chan_width: vec![1.0e6; N_CHANS],
                ref_frequency: 100.0e6,
                ..Default::default()
            },
            SpectralWindow {
                name: "high".into(),
                chan_freq: vec![203.0e6, 202.0e6, 201.0e6, 200.0e6],
                chan_width: vec![-1.0e6; N_CHANS],
                ref_frequency: 203.0e6,
                ..Default::default()
            },
        ],
        polarizations: vec![PolarizationSetup {
            num_corr: N_POLS,
            corr_type: vec![9, 12],
        }],
        fields: vec![
            Field {
                name: "3C286".into(),
                code: "C".into(),
                phase_dir: [3.5, 0.53],
                delay_dir: [3.5, 0.53],
                reference_dir: [3.5, 0.53],
                ..Default::default()
            },
            Field {
                name: "EoR0".into(),
                phase_dir: [0.0, -0.47],
                delay_dir: [0.0, -0.47],
                reference_dir: [0.0, -0.47],
                ..Default::default()
            },
        ],
        states: vec![
            State {
                obs_mode: "CALIBRATE_PHASE#ON_SOURCE".into(),
            },
            State {
                obs_mode: "OBSERVE_TARGET#ON_SOURCE".into(),
            },
        ],
        antennas: (0..3)
            .map(|i| Antenna {
                name: format!("Tile{i:03}"),
                station: "MWA".into(),
                mount: "X-Y".into(),
                dish_diameter: 4.0,
                position: [i as f64, 2.0 * i as f64, 0.0],
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
    .with_column("TIME", time.clone())
    .with_column("TIME_CENTROID", time)
    .with_column("INTERVAL", vec![INTERVAL; n_rows])
    .with_column("EXPOSURE", vec![INTERVAL; n_rows])
    .with_column("ANTENNA1", ant1)
    .with_column("ANTENNA2", ant2)
    .with_column("DATA_DESC_ID", ddi)
    .with_column("FIELD_ID", field.clone())
    .with_column("SCAN_NUMBER", scan)
    .with_column("STATE_ID", field)
    .with_column("PROCESSOR_ID", vec![0i32; n_rows])
    .with_column("DATA", data.into_dyn())
    .with_column("FLAG", flag.into_dyn())
    .with_column("WEIGHT", weight.into_dyn())
    .with_column("UVW", uvw.into_dyn())
}

pub(crate) fn partition_attrs() -> PartitionAttrs {
    let dir = SkyCoord::new([0.0, 0.0], "J2000", "test");
    PartitionAttrs {
        partition_name: "ddi_0_field_id_0".into(),
        ddi: 0,
        spectral_window_id: 0,
        polarization_setup_id: 0,
        intent: None,
        scan_number: None,
        field_info: FieldInfo {
            name: "test".into(),
            code: String::new(),
            field_id: 0,
            delay_direction: dir.clone(),
            phase_direction: dir.clone(),
            reference_direction: dir,
        },
        data_groups: BTreeMap::from([("base".to_string(), DataGroup::default())]),
        creator: Default::default(),
    }
}
