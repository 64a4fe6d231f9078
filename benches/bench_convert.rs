// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conversion Benchmarks

use criterion::*;
use procset::{
    c32, convert_msv2_to_processing_set,
    io::{Antenna, DataDescription, Field, PolarizationSetup, SpectralWindow},
    load_processing_set,
    ndarray::{Array2, Array3},
    open_processing_set, Compressor, ConvertOptions, MemoryTable, PartitionFilter,
};
use tempfile::tempdir;

const N_ANTS: i32 = 32;
const N_TIMES: usize = 20;
const N_CHANS: usize = 64;
const N_POLS: usize = 4;
const N_FIELDS: i32 = 4;

/// Every baseline (with autos) of `N_ANTS` antennas, for `N_TIMES` timesteps
/// of each of `N_FIELDS` fields. One spectral window.
fn table() -> MemoryTable {
    let mut time = vec![];
    let mut field = vec![];
    let mut ant1 = vec![];
    let mut ant2 = vec![];
    for f in 0..N_FIELDS {
        for t in 0..N_TIMES {
            for a1 in 0..N_ANTS {
                for a2 in a1..N_ANTS {
                    time.push(4.8e9 + (f as usize * N_TIMES + t) as f64 * 8.0);
                    field.push(f);
                    ant1.push(a1);
                    ant2.push(a2);
                }
            }
        }
    }
    let n_rows = time.len();

    MemoryTable {
        data_descriptions: vec![DataDescription::default()],
        spectral_windows: vec![SpectralWindow {
            name: "bench".into(),
            chan_freq: (0..N_CHANS).map(|c| 150.0e6 + c as f64 * 40.0e3).collect(),
            chan_width: vec![40.0e3; N_CHANS],
            ref_frequency: 150.0e6,
            ..Default::default()
        }],
        polarizations: vec![PolarizationSetup {
            num_corr: N_POLS,
            corr_type: vec![9, 10, 11, 12],
        }],
        fields: (0..N_FIELDS)
            .map(|f| Field {
                name: format!("field{f}"),
                ..Default::default()
            })
            .collect(),
        antennas: (0..N_ANTS)
            .map(|i| Antenna {
                name: format!("Tile{i:03}"),
                dish_diameter: 4.0,
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
    .with_column("TIME", time)
    .with_column("INTERVAL", vec![8.0f64; n_rows])
    .with_column("ANTENNA1", ant1)
    .with_column("ANTENNA2", ant2)
    .with_column("DATA_DESC_ID", vec![0i32; n_rows])
    .with_column("FIELD_ID", field)
    .with_column(
        "DATA",
        Array3::from_shape_fn((n_rows, N_CHANS, N_POLS), |(r, c, p)| {
            c32::new(r as f32, (c * N_POLS + p) as f32)
        })
        .into_dyn(),
    )
    .with_column(
        "FLAG",
        Array3::from_elem((n_rows, N_CHANS, N_POLS), false).into_dyn(),
    )
    .with_column(
        "WEIGHT",
        Array2::from_elem((n_rows, N_POLS), 1.0f32).into_dyn(),
    )
}

fn convert(c: &mut Criterion) {
    let table = table();

    let mut group = c.benchmark_group("convert");
    group.sample_size(10);
    for parallel in [false, true] {
        for compressor in [Compressor::None, Compressor::default()] {
            let opts = ConvertOptions {
                parallel,
                compressor,
                overwrite: true,
                ..Default::default()
            };
            let tmp = tempdir().unwrap();
            group.bench_function(
                format!("parallel={parallel} compressor={compressor:?}"),
                |b| {
                    b.iter(|| convert_msv2_to_processing_set(&table, tmp.path(), &opts).unwrap())
                },
            );
        }
    }
    group.finish();
}

fn read(c: &mut Criterion) {
    let table = table();
    let tmp = tempdir().unwrap();
    convert_msv2_to_processing_set(&table, tmp.path(), &ConvertOptions::default()).unwrap();
    let filter = PartitionFilter::default();

    c.bench_function("open_processing_set", |b| {
        b.iter(|| open_processing_set(tmp.path(), &filter).unwrap())
    });
    c.bench_function("iter_loaded", |b| {
        let lazy = open_processing_set(tmp.path(), &filter).unwrap();
        b.iter(|| {
            for p in lazy.iter_loaded(None) {
                p.unwrap();
            }
        })
    });
    c.bench_function("load_processing_set", |b| {
        b.iter(|| load_processing_set(tmp.path(), &filter, None).unwrap())
    });
}

criterion_group!(benches, convert, read);
criterion_main!(benches);
