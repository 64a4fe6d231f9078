// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading a processing set back.
//!
//! [`open_processing_set`] reads only metadata; arrays are read when asked
//! for. [`load_processing_set`] reads everything, or only the partitions and
//! index ranges named by a [`PartitionSelection`].
//! [`ProcessingSet::iter_loaded`] reads one partition at a time.

use std::{
    collections::{btree_map, BTreeMap, BTreeSet},
    fs,
    ops::Range,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    array::{ArrayData, DType},
    constants::{ANTENNA_ENTRY, DIM_BASELINE, DIM_FREQUENCY, DIM_POLARIZATION, DIM_TIME, MAIN_ENTRY},
    dataset::{AntennaDataset, Dataset, Variable, VisDataset},
    io::{
        error::StoreError,
        zarr::{is_group, read_array_subset, GroupMeta},
    },
    metadata::{AntennaAttrs, PartitionAttrs, VarAttrs},
};

/// Index ranges to read, by dimension name. Dimensions not named are read
/// whole. Ranges past the end of a dimension are clamped.
pub type DimSelection = BTreeMap<String, Range<usize>>;

/// Which partitions to load, by name, and the part of each to read.
pub type PartitionSelection = BTreeMap<String, DimSelection>;

/// Which partitions to read. `None` accepts every partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionFilter {
    /// Keep partitions whose intent is one of these.
    pub intents: Option<Vec<String>>,
    /// Keep partitions whose field name is one of these.
    pub fields: Option<Vec<String>>,
}

impl PartitionFilter {
    pub fn matches(&self, attrs: &PartitionAttrs) -> bool {
        let intent_ok = match (&self.intents, &attrs.intent) {
            (None, _) => true,
            (Some(intents), Some(intent)) => intents.contains(intent),
            (Some(_), None) => false,
        };
        let field_ok = self
            .fields
            .as_ref()
            .map_or(true, |fields| fields.contains(&attrs.field_info.name));
        intent_ok && field_ok
    }
}

/// An array whose metadata has been read, but not its data.
#[derive(Debug, Clone, PartialEq)]
pub struct LazyArray {
    pub dims: Vec<String>,
    pub attrs: VarAttrs,
    /// The group holding the array.
    group: PathBuf,
    name: String,
    shape: Vec<usize>,
    dtype: DType,
}

impl LazyArray {
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn load(&self) -> Result<ArrayData, StoreError> {
        self.load_slice(&DimSelection::new())
    }

    /// Read the part of the array within `selection`. Only the chunks that
    /// intersect it are read.
    pub fn load_slice(&self, selection: &DimSelection) -> Result<ArrayData, StoreError> {
        let ranges: Vec<Range<usize>> = self
            .dims
            .iter()
            .zip(&self.shape)
            .map(|(dim, &len)| selection.get(dim).cloned().unwrap_or(0..len))
            .collect();
        trace!("loading {}/{} {ranges:?}", self.group.display(), self.name);
        read_array_subset(&self.group, &self.name, &ranges)
    }

    pub fn load_variable(&self, selection: &DimSelection) -> Result<Variable, StoreError> {
        Ok(Variable {
            dims: self.dims.clone(),
            data: self.load_slice(selection)?,
            attrs: self.attrs.clone(),
        })
    }
}

/// A dataset whose metadata has been read, but none of its arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct LazyDataset<A> {
    pub path: PathBuf,
    pub attrs: A,
    pub coords: BTreeMap<String, LazyArray>,
    pub data_vars: BTreeMap<String, LazyArray>,
}

impl<A: DeserializeOwned> LazyDataset<A> {
    /// Read the metadata of the group at `path`.
    pub fn open(path: &Path) -> Result<LazyDataset<A>, StoreError> {
        let mut group = GroupMeta::read(path)?;
        let attrs = serde_json::from_value(Value::Object(group.attrs))
            .map_err(|e| StoreError::json(path, e))?;

        // Dimension coordinates, plus anything a variable names as one of
        // its coordinates.
        let mut coord_names: BTreeSet<String> = BTreeSet::new();
        for (name, entry) in &group.arrays {
            if entry.dims.len() == 1 && &entry.dims[0] == name {
                coord_names.insert(name.clone());
            }
            if let Some(Value::String(coordinates)) = entry.attrs.get("coordinates") {
                coord_names.extend(coordinates.split_whitespace().map(|s| s.to_string()));
            }
        }

        let mut coords = BTreeMap::new();
        let mut data_vars = BTreeMap::new();
        for (name, mut entry) in std::mem::take(&mut group.arrays) {
            entry.attrs.remove("coordinates");
            let attrs = VarAttrs::from_json(&name, entry.attrs)
                .map_err(|e| StoreError::json(path.join(&name), e))?;
            let array = LazyArray {
                dims: entry.dims,
                attrs,
                group: path.to_path_buf(),
                name: name.clone(),
                shape: entry.shape,
                dtype: entry.dtype,
            };
            if coord_names.contains(&name) {
                coords.insert(name, array);
            } else {
                data_vars.insert(name, array);
            }
        }
        Ok(LazyDataset {
            path: path.to_path_buf(),
            attrs,
            coords,
            data_vars,
        })
    }
}

impl<A> LazyDataset<A> {
    /// The length of each dimension, as recorded in the metadata.
    pub fn dims(&self) -> BTreeMap<String, usize> {
        self.coords
            .values()
            .chain(self.data_vars.values())
            .flat_map(|a| a.dims.iter().cloned().zip(a.shape().iter().copied()))
            .collect()
    }

    /// Read every array.
    pub fn load(&self) -> Result<Dataset<A>, StoreError>
    where
        A: Clone,
    {
        self.load_selected(&DimSelection::new())
    }

    /// Read the part of every array within `selection`.
    pub fn load_selected(&self, selection: &DimSelection) -> Result<Dataset<A>, StoreError>
    where
        A: Clone,
    {
        let load_all = |arrays: &BTreeMap<String, LazyArray>| {
            arrays
                .iter()
                .map(|(name, a)| Ok((name.clone(), a.load_variable(selection)?)))
                .collect::<Result<BTreeMap<_, _>, StoreError>>()
        };
        Ok(Dataset {
            data_vars: load_all(&self.data_vars)?,
            coords: load_all(&self.coords)?,
            attrs: self.attrs.clone(),
        })
    }
}

/// One partition of a processing set.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<M, N> {
    pub main: M,
    /// `None` if the partition has no antenna dataset.
    pub antenna: Option<N>,
}

pub type LazyPartition = Partition<LazyDataset<PartitionAttrs>, LazyDataset<AntennaAttrs>>;
pub type LoadedPartition = Partition<VisDataset, AntennaDataset>;

impl LazyPartition {
    /// Read the part of the partition within `selection`, applied to both
    /// its main and antenna datasets.
    pub fn load(&self, selection: &DimSelection) -> Result<LoadedPartition, StoreError> {
        Ok(Partition {
            main: self.main.load_selected(selection)?,
            antenna: self
                .antenna
                .as_ref()
                .map(|a| a.load_selected(selection))
                .transpose()?,
        })
    }
}

/// The partitions of a processing set, by name.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingSet<P> {
    pub path: PathBuf,
    pub partitions: BTreeMap<String, P>,
}

impl<P> ProcessingSet<P> {
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.partitions.keys().map(|k| k.as_str())
    }
}

/// A one-line description of a partition.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSummary {
    pub name: String,
    pub ddi: i32,
    pub intent: Option<String>,
    pub field_name: String,
    pub spectral_window_id: i32,
    /// (time, baseline, frequency, polarization)
    pub shape: [usize; 4],
}

impl ProcessingSet<LazyPartition> {
    pub fn summary(&self) -> Vec<PartitionSummary> {
        self.partitions
            .iter()
            .map(|(name, p)| {
                let dims = p.main.dims();
                let len = |d: &str| dims.get(d).copied().unwrap_or(0);
                PartitionSummary {
                    name: name.clone(),
                    ddi: p.main.attrs.ddi,
                    intent: p.main.attrs.intent.clone(),
                    field_name: p.main.attrs.field_info.name.clone(),
                    spectral_window_id: p.main.attrs.spectral_window_id,
                    shape: [
                        len(DIM_TIME),
                        len(DIM_BASELINE),
                        len(DIM_FREQUENCY),
                        len(DIM_POLARIZATION),
                    ],
                }
            })
            .collect()
    }

    /// The partitions to load, each with the part of it to read. With no
    /// selection every partition is read whole.
    fn selected<'a>(
        &'a self,
        selection: Option<&'a PartitionSelection>,
    ) -> Vec<(&'a String, &'a LazyPartition, Option<&'a DimSelection>)> {
        if let Some(selection) = selection {
            for name in selection.keys() {
                if !self.partitions.contains_key(name) {
                    debug!("selected partition {name} is not in {}", self.path.display());
                }
            }
        }
        self.partitions
            .iter()
            .filter_map(|(name, p)| match selection {
                None => Some((name, p, None)),
                Some(selection) => selection.get(name).map(|dims| (name, p, Some(dims))),
            })
            .collect()
    }

    /// Read every array of every partition.
    pub fn load(&self) -> Result<ProcessingSet<LoadedPartition>, StoreError> {
        self.load_selected(None)
    }

    /// Read the partitions named by `selection`, each limited to its index
    /// ranges, in parallel. `None` reads everything.
    pub fn load_selected(
        &self,
        selection: Option<&PartitionSelection>,
    ) -> Result<ProcessingSet<LoadedPartition>, StoreError> {
        let empty = DimSelection::new();
        let partitions = self
            .selected(selection)
            .into_par_iter()
            .map(|(name, p, dims)| Ok((name.clone(), p.load(dims.unwrap_or(&empty))?)))
            .collect::<Result<BTreeMap<_, _>, StoreError>>()?;
        Ok(ProcessingSet {
            path: self.path.clone(),
            partitions,
        })
    }

    /// Read partitions one at a time, in name order, so that only one is
    /// held in memory. `selection` works as in [`Self::load_selected`].
    pub fn iter_loaded<'a>(
        &'a self,
        selection: Option<&'a PartitionSelection>,
    ) -> PartitionLoader<'a> {
        PartitionLoader {
            partitions: self.partitions.iter(),
            selection,
        }
    }
}

/// Loads the partitions of a lazily opened processing set one by one. Made
/// by [`ProcessingSet::iter_loaded`].
pub struct PartitionLoader<'a> {
    partitions: btree_map::Iter<'a, String, LazyPartition>,
    selection: Option<&'a PartitionSelection>,
}

impl<'a> Iterator for PartitionLoader<'a> {
    type Item = Result<(String, LoadedPartition), StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let empty = DimSelection::new();
        loop {
            let (name, p) = self.partitions.next()?;
            let dims = match self.selection {
                None => &empty,
                Some(selection) => match selection.get(name) {
                    Some(dims) => dims,
                    None => continue,
                },
            };
            return Some(p.load(dims).map(|loaded| (name.clone(), loaded)));
        }
    }
}

/// Open the processing set at `path`, reading only metadata.
///
/// Any directory whose name contains `ddi` and which holds a `MAIN` group is
/// a partition. Partitions rejected by `filter` are left out.
pub fn open_processing_set(
    path: &Path,
    filter: &PartitionFilter,
) -> Result<ProcessingSet<LazyPartition>, StoreError> {
    let entries = fs::read_dir(path).map_err(|e| StoreError::io(path, e))?;
    let mut partitions = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(path, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        let dir = entry.path();
        if !name.contains("ddi") || !is_group(&dir.join(MAIN_ENTRY)) {
            continue;
        }

        let main: LazyDataset<PartitionAttrs> = LazyDataset::open(&dir.join(MAIN_ENTRY))?;
        if !filter.matches(&main.attrs) {
            trace!("{name} rejected by {filter:?}");
            continue;
        }
        let antenna_path = dir.join(ANTENNA_ENTRY);
        let antenna = if is_group(&antenna_path) {
            Some(LazyDataset::open(&antenna_path)?)
        } else {
            None
        };
        partitions.insert(name, Partition { main, antenna });
    }
    debug!(
        "opened {} partitions of {}",
        partitions.len(),
        path.display()
    );
    Ok(ProcessingSet {
        path: path.to_path_buf(),
        partitions,
    })
}

/// Open the processing set at `path` and read its arrays: all of them, or
/// with a `selection` only the named partitions within their index ranges.
/// Selected names that are not in the set (or are rejected by `filter`) are
/// skipped.
pub fn load_processing_set(
    path: &Path,
    filter: &PartitionFilter,
    selection: Option<&PartitionSelection>,
) -> Result<ProcessingSet<LoadedPartition>, StoreError> {
    open_processing_set(path, filter)?.load_selected(selection)
}
