// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Converting a measurement set into a processing set.
//!
//! The main table is split into partitions (see [`PartitionScheme`]). Each
//! partition is converted on its own: its rows are placed on a dense
//! (time, baseline) grid, its columns are scattered onto that grid, and the
//! result is written with the partition's coordinates and metadata.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use rayon::prelude::*;
use thiserror::Error;

use crate::{
    column::{materialize_columns, CellShape, SkipReason},
    context::PartitionContext,
    coords::{
        antenna_dataset, assemble_coords, check_single_field, check_single_interval,
        field_info, frequency_axis, resolve_ddi, CoordError, InvariantError,
    },
    dataset::{DatasetError, VisDataset},
    index::{IndexError, TimeBaselineIndex},
    io::{StoreError, Subtables, TableReadError, VisTable},
    metadata::{DataGroup, PartitionAttrs},
    selection::{
        count_rows_without_intent, enumerate_partitions, PartitionKey, PartitionScheme,
        RowSelection, SelectionError,
    },
    writer::{write_partition, Encoding, WriteError, WriteMode},
    Compressor,
};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Storage backend {0:?} is not supported")]
    UnsupportedBackend(StorageBackend),

    #[error(transparent)]
    TableRead(#[from] TableReadError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Coord(#[from] CoordError),

    #[error(transparent)]
    Invariant(#[from] InvariantError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The format partitions are written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Zarr,
    /// Not supported; asking for it fails before anything is read.
    NetCdf,
}

/// Everything that controls a conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Chunk lengths on disk, per dimension. Dimensions not listed are
    /// stored in one chunk.
    pub chunks: BTreeMap<String, usize>,
    pub compressor: Compressor,
    /// Convert partitions in parallel?
    pub parallel: bool,
    pub storage_backend: StorageBackend,
    /// Replace partitions that already exist? If not, they are errors.
    pub overwrite: bool,
    pub partition_scheme: PartitionScheme,
    /// Main-table columns not to convert.
    pub ignore_columns: Vec<String>,
}

impl ConvertOptions {
    pub fn encoding(&self) -> Encoding {
        Encoding {
            compressor: self.compressor,
            chunks: self.chunks.clone(),
        }
    }

    pub fn write_mode(&self) -> WriteMode {
        if self.overwrite {
            WriteMode::Overwrite
        } else {
            WriteMode::CreateNew
        }
    }
}

/// What converting one partition produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionOutcome {
    /// No rows matched the partition's key; nothing was written.
    Empty,
    Written {
        path: PathBuf,
        context: PartitionContext,
        /// Recognised columns that could not be converted.
        skipped: Vec<(String, SkipReason)>,
    },
}

#[derive(Debug)]
pub struct PartitionReport {
    pub key: PartitionKey,
    pub name: String,
    pub outcome: Result<PartitionOutcome, ConvertError>,
}

/// The result of every partition of a conversion, in enumeration order.
#[derive(Debug, Default)]
pub struct ConversionReport {
    pub partitions: Vec<PartitionReport>,
}

impl ConversionReport {
    /// Paths of the partitions that were written.
    pub fn written(&self) -> Vec<&Path> {
        self.partitions
            .iter()
            .filter_map(|p| match &p.outcome {
                Ok(PartitionOutcome::Written { path, .. }) => Some(path.as_path()),
                _ => None,
            })
            .collect()
    }

    pub fn n_empty(&self) -> usize {
        self.partitions
            .iter()
            .filter(|p| matches!(p.outcome, Ok(PartitionOutcome::Empty)))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ConvertError)> {
        self.partitions.iter().filter_map(|p| match &p.outcome {
            Err(e) => Some((p.name.as_str(), e)),
            Ok(_) => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Convert every partition of `table` into a processing set at `out`.
///
/// # Errors
///
/// Fails outright if the storage backend is unsupported, or if the
/// description subtables can't be read or partitioned. Failures of
/// individual partitions are reported in the returned [`ConversionReport`]
/// and don't stop the other partitions.
pub fn convert_msv2_to_processing_set<T: VisTable + ?Sized>(
    table: &T,
    out: &Path,
    opts: &ConvertOptions,
) -> Result<ConversionReport, ConvertError> {
    if opts.storage_backend != StorageBackend::Zarr {
        return Err(ConvertError::UnsupportedBackend(opts.storage_backend));
    }

    let subtables = Subtables::read(table)?;
    let scan_numbers = match opts.partition_scheme {
        PartitionScheme::DdiScan => {
            let mut scans = table.query(&RowSelection::all())?.read_i32("SCAN_NUMBER")?;
            scans.sort_unstable();
            scans.dedup();
            scans
        }
        _ => vec![],
    };
    if opts.partition_scheme == PartitionScheme::DdiIntentField && !subtables.states.is_empty() {
        let state_ids = table.query(&RowSelection::all())?.read_i32("STATE_ID")?;
        let n_dropped = count_rows_without_intent(&subtables.states, &state_ids);
        if n_dropped > 0 {
            debug!("{n_dropped} rows have a STATE_ID with no intent and belong to no partition");
        }
    }
    let keys = enumerate_partitions(
        opts.partition_scheme,
        &subtables.data_descriptions,
        &subtables.fields,
        &subtables.states,
        &scan_numbers,
    )?;
    debug!(
        "{} candidate partitions ({:?}), writing to {}",
        keys.len(),
        opts.partition_scheme,
        out.display()
    );

    let convert = |key: &PartitionKey| {
        let name = key.name();
        let outcome = convert_partition(table, &subtables, key, &name, out, opts);
        if let Err(e) = &outcome {
            warn!("partition {name} failed: {e}");
        }
        PartitionReport {
            key: key.clone(),
            name,
            outcome,
        }
    };
    let partitions: Vec<PartitionReport> = if opts.parallel {
        keys.par_iter().map(convert).collect()
    } else {
        keys.iter().map(convert).collect()
    };

    let report = ConversionReport { partitions };
    info!(
        "Converted {} partitions ({} empty, {} failed) into {}",
        report.written().len(),
        report.n_empty(),
        report.failures().count(),
        out.display()
    );
    Ok(report)
}

/// Open the measurement set at `path` and convert it.
#[cfg(feature = "ms")]
pub fn convert_ms<P: AsRef<Path>, Q: AsRef<Path>>(
    path: P,
    out: Q,
    opts: &ConvertOptions,
) -> Result<ConversionReport, ConvertError> {
    if opts.storage_backend != StorageBackend::Zarr {
        return Err(ConvertError::UnsupportedBackend(opts.storage_backend));
    }
    let ms = crate::io::MeasurementSet::open(path)?;
    convert_msv2_to_processing_set(&ms, out.as_ref(), opts)
}

fn convert_partition<T: VisTable + ?Sized>(
    table: &T,
    subtables: &Subtables,
    key: &PartitionKey,
    name: &str,
    out: &Path,
    opts: &ConvertOptions,
) -> Result<PartitionOutcome, ConvertError> {
    let mut query = table.query(&RowSelection::for_key(key))?;
    if query.n_rows() == 0 {
        debug!("{name}: no rows");
        return Ok(PartitionOutcome::Empty);
    }

    let times = query.read_f64("TIME")?;
    let intervals = query.read_f64("INTERVAL")?;
    let antenna1 = query.read_i32("ANTENNA1")?;
    let antenna2 = query.read_i32("ANTENNA2")?;
    let field_id = check_single_field(&query.read_i32("FIELD_ID")?)?;
    let interval = check_single_interval(&intervals)?;
    let index = TimeBaselineIndex::build(&times, &intervals, &antenna1, &antenna2)?;

    let setup = resolve_ddi(subtables, key.ddi)?;
    let frequency = frequency_axis(setup.spw);
    let n_pols = setup.pol.labels().len();
    let shape = CellShape {
        n_chans: setup.spw.chan_freq.len(),
        channels: frequency.channels.clone(),
        n_pols,
    };
    let materialized = materialize_columns(&mut *query, &index, &shape, &opts.ignore_columns);
    let skipped: Vec<(String, SkipReason)> = materialized
        .skipped()
        .filter(|(_, reason)| **reason != SkipReason::Unrecognised)
        .map(|(column, reason)| (column.clone(), reason.clone()))
        .collect();

    let coords = assemble_coords(&index, &setup, &frequency, &subtables.main_meta, interval)?;
    let attrs = PartitionAttrs {
        partition_name: name.to_string(),
        ddi: key.ddi,
        spectral_window_id: setup.spectral_window_id,
        polarization_setup_id: setup.polarization_setup_id,
        intent: key.intent.clone(),
        scan_number: key.scan_number,
        field_info: field_info(&subtables.fields, field_id)?,
        data_groups: BTreeMap::from([("base".to_string(), DataGroup::default())]),
        creator: Default::default(),
    };
    let mut main = VisDataset {
        data_vars: materialized.variables,
        coords,
        attrs,
    };
    let antenna = antenna_dataset(&subtables.antennas);

    let context = PartitionContext::new(key, &index, frequency.values.len(), n_pols, interval);
    debug!("{}", context.describe());
    let path = write_partition(
        out,
        name,
        &mut main,
        &antenna,
        &opts.encoding(),
        opts.write_mode(),
    )?;

    Ok(PartitionOutcome::Written {
        path,
        context,
        skipped,
    })
}
