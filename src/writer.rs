// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Persisting a partition's datasets.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    constants::{ANTENNA_ENTRY, DIM_FREQUENCY, DIM_TIME, MAIN_ENTRY},
    dataset::{AntennaDataset, Dataset, DatasetError, Variable, VisDataset},
    io::{
        error::StoreError,
        zarr::{Compressor, GroupWriter},
    },
};

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Destination {0} already exists and overwriting was not requested")]
    DestinationExists(PathBuf),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How variables are stored: one compressor for every variable, and chunk
/// sizes per dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoding {
    pub compressor: Compressor,
    /// Chunk length for each named dimension. Dimensions not listed are
    /// stored in one chunk.
    pub chunks: BTreeMap<String, usize>,
}

impl Encoding {
    /// The chunk shape of a variable with `dims` and `shape`.
    pub fn chunks_for(&self, dims: &[String], shape: &[usize]) -> Vec<usize> {
        dims.iter()
            .zip(shape)
            .map(|(dim, &len)| {
                let chunk = self.chunks.get(dim).copied().unwrap_or(len);
                chunk.min(len).max(1)
            })
            .collect()
    }
}

/// What to do when a partition's destination already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    #[default]
    CreateNew,
    Overwrite,
}

/// Names of the coordinates a data variable can be labelled with: the
/// non-dimension coordinates whose dims are all dims of the variable.
fn coordinates_attr<A>(ds: &Dataset<A>, var: &Variable) -> Option<String> {
    let names: Vec<&str> = ds
        .coords
        .iter()
        .filter(|(name, coord)| !(coord.dims.len() == 1 && &coord.dims[0] == *name))
        .filter(|(_, coord)| coord.dims.iter().all(|d| var.dims.contains(d)))
        .map(|(name, _)| name.as_str())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join(" "))
    }
}

/// Write `ds` as a group at `path`.
pub fn write_dataset<A: Serialize>(
    path: &Path,
    ds: &Dataset<A>,
    encoding: &Encoding,
) -> Result<(), WriteError> {
    ds.dims()?;
    let attrs = match serde_json::to_value(&ds.attrs).map_err(|e| StoreError::json(path, e))? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let group = GroupWriter::create(path, attrs)?;

    for (name, var) in ds.variables() {
        let mut attrs = var
            .attrs
            .to_json()
            .map_err(|e| StoreError::json(path.join(name), e))?;
        if ds.data_vars.contains_key(name) {
            if let Some(coordinates) = coordinates_attr(ds, var) {
                attrs.insert("coordinates".to_string(), Value::String(coordinates));
            }
        }
        let chunks = encoding.chunks_for(&var.dims, var.data.shape());
        group.write_array(
            name,
            &var.data,
            &var.dims,
            attrs,
            &chunks,
            &encoding.compressor,
        )?;
    }
    trace!("wrote {}", path.display());
    Ok(())
}

/// Write a partition's main and antenna datasets under `out/name`.
///
/// The frequency and time axes of `main` are made increasing first. With
/// [`WriteMode::CreateNew`], an existing destination is an error and nothing
/// is written; with [`WriteMode::Overwrite`] it is removed.
pub fn write_partition(
    out: &Path,
    name: &str,
    main: &mut VisDataset,
    antenna: &AntennaDataset,
    encoding: &Encoding,
    mode: WriteMode,
) -> Result<PathBuf, WriteError> {
    main.ensure_increasing(DIM_FREQUENCY)?;
    main.ensure_increasing(DIM_TIME)?;
    main.dims()?;
    antenna.dims()?;

    let dest = out.join(name);
    if dest.exists() {
        match mode {
            WriteMode::CreateNew => return Err(WriteError::DestinationExists(dest)),
            WriteMode::Overwrite => {
                debug!("removing existing {}", dest.display());
                fs::remove_dir_all(&dest).map_err(|e| StoreError::io(&dest, e))?;
            }
        }
    }

    write_dataset(&dest.join(MAIN_ENTRY), main, encoding)?;
    write_dataset(&dest.join(ANTENNA_ENTRY), antenna, encoding)?;
    Ok(dest)
}
