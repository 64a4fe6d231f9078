// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Processing-set groups stored with [`zarrs`].
//!
//! Every group (e.g. a partition's `MAIN`) is a directory backed by its own
//! filesystem store: group metadata at the root and one array per child
//! directory. This module only translates between [`ArrayData`] and the
//! storage engine; chunking, codecs and missing chunks are handled by
//! `zarrs`.

use std::{
    collections::BTreeMap,
    fs,
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::trace;
use ndarray::{ArrayD, IxDyn};
use serde_json::{json, Map, Value};
use zarrs::{
    array::{
        codec::{BytesToBytesCodecTraits, GzipCodec, ZstdCodec},
        Array, ArrayBuilder, DataType, ElementOwned, FillValue,
    },
    array_subset::ArraySubset,
    filesystem::FilesystemStore,
    group::{Group, GroupBuilder},
};

use super::error::StoreError;
use crate::{
    array::{ArrayData, DType, Missing},
    c32, c64,
};

/// The attribute naming the dimensions of an array, as xarray expects it.
pub const ARRAY_DIMENSIONS: &str = "_ARRAY_DIMENSIONS";
/// The metadata document of every group and array.
pub(crate) const ZARR_JSON: &str = "zarr.json";
/// Provenance the storage engine adds to every node's attributes.
const ENGINE_ATTRS: &str = "_zarrs";

/// How chunk bytes are compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compressor {
    None,
    Zstd { level: i32 },
    Gzip { level: u32 },
}

impl Default for Compressor {
    fn default() -> Self {
        Compressor::Zstd { level: 2 }
    }
}

impl Compressor {
    fn codecs(&self) -> Result<Vec<Arc<dyn BytesToBytesCodecTraits>>, StoreError> {
        Ok(match *self {
            Compressor::None => vec![],
            Compressor::Zstd { level } => vec![Arc::new(ZstdCodec::new(level.into(), false))],
            Compressor::Gzip { level } => vec![Arc::new(
                GzipCodec::new(level)
                    .map_err(|e| StoreError::UnsupportedCompressor(e.to_string()))?,
            )],
        })
    }
}

fn data_type(dtype: DType) -> DataType {
    match dtype {
        DType::Bool => DataType::Bool,
        DType::Int32 => DataType::Int32,
        DType::Int64 => DataType::Int64,
        DType::Float32 => DataType::Float32,
        DType::Float64 => DataType::Float64,
        DType::Complex64 => DataType::Complex64,
        DType::Complex128 => DataType::Complex128,
        DType::Str => DataType::String,
    }
}

fn dtype(data_type: &DataType) -> Result<DType, StoreError> {
    Ok(match data_type {
        DataType::Bool => DType::Bool,
        DataType::Int32 => DType::Int32,
        DataType::Int64 => DType::Int64,
        DataType::Float32 => DType::Float32,
        DataType::Float64 => DType::Float64,
        DataType::Complex64 => DType::Complex64,
        DataType::Complex128 => DType::Complex128,
        DataType::String => DType::Str,
        other => return Err(StoreError::UnsupportedDtype(format!("{other:?}"))),
    })
}

/// Unwritten chunks read back as the missing-data value of the element type.
fn fill_value(dtype: DType) -> FillValue {
    match dtype {
        DType::Bool => FillValue::from(bool::missing()),
        DType::Int32 => FillValue::from(i32::missing()),
        DType::Int64 => FillValue::from(i64::missing()),
        DType::Float32 => FillValue::from(f32::missing()),
        DType::Float64 => FillValue::from(f64::missing()),
        DType::Complex64 => FillValue::from(c32::missing()),
        DType::Complex128 => FillValue::from(c64::missing()),
        DType::Str => FillValue::new(String::missing().into_bytes()),
    }
}

fn open_store(path: &Path) -> Result<Arc<FilesystemStore>, StoreError> {
    Ok(Arc::new(FilesystemStore::new(path)?))
}

fn node_path(name: &str) -> String {
    format!("/{name}")
}

/// Writes arrays into a new group.
pub struct GroupWriter {
    path: PathBuf,
    store: Arc<FilesystemStore>,
}

impl GroupWriter {
    /// Create the group directory (and any parents) with the given group
    /// attributes.
    pub fn create(path: &Path, attrs: Map<String, Value>) -> Result<GroupWriter, StoreError> {
        fs::create_dir_all(path).map_err(|e| StoreError::io(path, e))?;
        let store = open_store(path)?;
        GroupBuilder::new()
            .attributes(attrs)
            .build(store.clone(), "/")?
            .store_metadata()?;
        Ok(GroupWriter {
            path: path.to_path_buf(),
            store,
        })
    }

    /// Write one array. `attrs` gets the dimension names added.
    pub fn write_array(
        &self,
        name: &str,
        data: &ArrayData,
        dims: &[String],
        mut attrs: Map<String, Value>,
        chunks: &[usize],
        compressor: &Compressor,
    ) -> Result<(), StoreError> {
        let mismatch = || StoreError::DimsMismatch {
            name: name.to_string(),
            dims: dims.to_vec(),
            ndim: data.ndim(),
        };
        if dims.len() != data.ndim() || chunks.len() != data.ndim() {
            return Err(mismatch());
        }
        attrs.insert(ARRAY_DIMENSIONS.to_string(), json!(dims));

        let shape: Vec<u64> = data.shape().iter().map(|&n| n as u64).collect();
        // Chunk extents must be non-zero, even along an empty axis.
        let chunk_shape: Vec<u64> = chunks.iter().map(|&c| c.max(1) as u64).collect();
        let array = ArrayBuilder::new(
            shape,
            data_type(data.dtype()),
            chunk_shape.try_into().map_err(|_| mismatch())?,
            fill_value(data.dtype()),
        )
        .bytes_to_bytes_codecs(compressor.codecs()?)
        .dimension_names(Some(dims.iter().map(String::as_str)))
        .attributes(attrs)
        .build(self.store.clone(), &node_path(name))?;
        array.store_metadata()?;

        trace!(
            "writing {}/{name} {:?} in chunks {chunks:?}",
            self.path.display(),
            data.shape()
        );
        if data.shape().contains(&0) {
            return Ok(());
        }
        let origin = vec![0; data.ndim()];
        match data {
            ArrayData::Bool(a) => array.store_array_subset_ndarray(&origin, a.clone())?,
            ArrayData::Int32(a) => array.store_array_subset_ndarray(&origin, a.clone())?,
            ArrayData::Int64(a) => array.store_array_subset_ndarray(&origin, a.clone())?,
            ArrayData::Float32(a) => array.store_array_subset_ndarray(&origin, a.clone())?,
            ArrayData::Float64(a) => array.store_array_subset_ndarray(&origin, a.clone())?,
            ArrayData::Complex64(a) => array.store_array_subset_ndarray(&origin, a.clone())?,
            ArrayData::Complex128(a) => array.store_array_subset_ndarray(&origin, a.clone())?,
            ArrayData::Str(a) => array.store_array_subset_ndarray(&origin, a.clone())?,
        }
        Ok(())
    }
}

/// The metadata of one array of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayMeta {
    pub shape: Vec<usize>,
    pub dtype: DType,
    pub dims: Vec<String>,
    /// The array's attributes, without the dimension names.
    pub attrs: Map<String, Value>,
}

impl ArrayMeta {
    fn from_array(name: &str, array: &Array<FilesystemStore>) -> Result<ArrayMeta, StoreError> {
        let shape: Vec<usize> = array.shape().iter().map(|&n| n as usize).collect();
        let mut attrs = array.attributes().clone();
        attrs.remove(ENGINE_ATTRS);
        let dims = match attrs.remove(ARRAY_DIMENSIONS) {
            Some(v) => serde_json::from_value(v).map_err(|e| StoreError::json(name, e))?,
            None => (0..shape.len()).map(|i| format!("dim_{i}")).collect(),
        };
        Ok(ArrayMeta {
            dtype: dtype(array.data_type())?,
            shape,
            dims,
            attrs,
        })
    }
}

/// Everything known about a group without reading any chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMeta {
    pub path: PathBuf,
    pub attrs: Map<String, Value>,
    pub arrays: BTreeMap<String, ArrayMeta>,
}

impl GroupMeta {
    /// Read the metadata of a group and of each of its arrays.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAGroup`] if `path` holds no group.
    pub fn read(path: &Path) -> Result<GroupMeta, StoreError> {
        if !is_group(path) {
            return Err(StoreError::NotAGroup(path.to_path_buf()));
        }
        let store = open_store(path)?;
        let mut attrs = Group::open(store.clone(), "/")?.attributes().clone();
        attrs.remove(ENGINE_ATTRS);

        let mut arrays = BTreeMap::new();
        let entries = fs::read_dir(path).map_err(|e| StoreError::io(path, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(path, e))?;
            if !entry.path().join(ZARR_JSON).is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let array = Array::open(store.clone(), &node_path(&name))?;
            arrays.insert(name.clone(), ArrayMeta::from_array(&name, &array)?);
        }
        Ok(GroupMeta {
            path: path.to_path_buf(),
            attrs,
            arrays,
        })
    }

    /// Read all chunks of the array `name`.
    pub fn read_array(&self, name: &str) -> Result<ArrayData, StoreError> {
        if !self.arrays.contains_key(name) {
            return Err(StoreError::MissingArray {
                group: self.path.clone(),
                name: name.to_string(),
            });
        }
        read_array(&self.path, name)
    }
}

fn retrieve<T: ElementOwned + Missing>(
    array: &Array<FilesystemStore>,
    ranges: &[Range<usize>],
) -> Result<ArrayD<T>, StoreError> {
    let shape: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
    if shape.contains(&0) {
        return Ok(ArrayD::from_elem(IxDyn(&shape), T::missing()));
    }
    let ranges: Vec<Range<u64>> = ranges
        .iter()
        .map(|r| r.start as u64..r.end as u64)
        .collect();
    let subset = ArraySubset::new_with_ranges(&ranges);
    Ok(array.retrieve_array_subset_ndarray::<T>(&subset)?)
}

/// Read every chunk of the array `name` of the group at `group`.
pub fn read_array(group: &Path, name: &str) -> Result<ArrayData, StoreError> {
    let array = Array::open(open_store(group)?, &node_path(name))?;
    let ranges: Vec<Range<usize>> = array.shape().iter().map(|&n| 0..n as usize).collect();
    read_ranges(&array, &ranges)
}

/// Read the part of the array `name` within `ranges`, one per axis. Only the
/// chunks intersecting the ranges are read. Ranges are clamped to the array.
pub fn read_array_subset(
    group: &Path,
    name: &str,
    ranges: &[Range<usize>],
) -> Result<ArrayData, StoreError> {
    let array = Array::open(open_store(group)?, &node_path(name))?;
    let shape = array.shape();
    if ranges.len() != shape.len() {
        return Err(StoreError::DimsMismatch {
            name: name.to_string(),
            dims: vec![],
            ndim: shape.len(),
        });
    }
    let clamped: Vec<Range<usize>> = ranges
        .iter()
        .zip(shape)
        .map(|(r, &n)| {
            let end = r.end.min(n as usize);
            r.start.min(end)..end
        })
        .collect();
    read_ranges(&array, &clamped)
}

fn read_ranges(
    array: &Array<FilesystemStore>,
    ranges: &[Range<usize>],
) -> Result<ArrayData, StoreError> {
    Ok(match dtype(array.data_type())? {
        DType::Bool => ArrayData::Bool(retrieve(array, ranges)?),
        DType::Int32 => ArrayData::Int32(retrieve(array, ranges)?),
        DType::Int64 => ArrayData::Int64(retrieve(array, ranges)?),
        DType::Float32 => ArrayData::Float32(retrieve(array, ranges)?),
        DType::Float64 => ArrayData::Float64(retrieve(array, ranges)?),
        DType::Complex64 => ArrayData::Complex64(retrieve(array, ranges)?),
        DType::Complex128 => ArrayData::Complex128(retrieve(array, ranges)?),
        DType::Str => ArrayData::Str(retrieve(array, ranges)?),
    })
}

/// Does `path` hold a group?
pub fn is_group(path: &Path) -> bool {
    path.join(ZARR_JSON).is_file()
        && open_store(path)
            .and_then(|store| Ok(Group::open(store, "/")?))
            .is_ok()
}
