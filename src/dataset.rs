// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Labelled collections of arrays sharing named dimensions.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::{
    array::ArrayData,
    math::is_strictly_increasing,
    metadata::{AntennaAttrs, PartitionAttrs, VarAttrs},
};

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dimension '{dim}' has length {expected}, but variable {variable} has length {found}")]
    DimensionMismatch {
        dim: String,
        variable: String,
        expected: usize,
        found: usize,
    },

    #[error("Variable {variable} names {n_dims} dims but has {ndim} axes")]
    RankMismatch {
        variable: String,
        n_dims: usize,
        ndim: usize,
    },

    #[error("Coordinate '{0}' is neither increasing nor decreasing")]
    NotMonotonic(String),

    #[error("Coordinate '{0}' is not numeric")]
    NonNumericCoordinate(String),
}

/// One named array and the dimensions of its axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub data: ArrayData,
    pub attrs: VarAttrs,
}

impl Variable {
    pub fn new<S: AsRef<str>>(dims: &[S], data: impl Into<ArrayData>) -> Variable {
        Variable {
            dims: dims.iter().map(|d| d.as_ref().to_string()).collect(),
            data: data.into(),
            attrs: VarAttrs::None,
        }
    }

    pub fn with_attrs(mut self, attrs: VarAttrs) -> Variable {
        self.attrs = attrs;
        self
    }

    /// The axis of dimension `dim`, if this variable has it.
    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }
}

/// Data variables and coordinates sharing named dimensions, plus
/// dataset-level attributes `A`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<A> {
    pub data_vars: BTreeMap<String, Variable>,
    pub coords: BTreeMap<String, Variable>,
    pub attrs: A,
}

/// The main dataset of a partition.
pub type VisDataset = Dataset<PartitionAttrs>;
/// The antenna dataset of a partition.
pub type AntennaDataset = Dataset<AntennaAttrs>;

impl<A> Dataset<A> {
    pub fn new(attrs: A) -> Dataset<A> {
        Dataset {
            data_vars: BTreeMap::new(),
            coords: BTreeMap::new(),
            attrs,
        }
    }

    /// Every variable, coordinates first.
    pub fn variables(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.coords.iter().chain(self.data_vars.iter())
    }

    fn variables_mut(&mut self) -> impl Iterator<Item = (&String, &mut Variable)> {
        self.coords.iter_mut().chain(self.data_vars.iter_mut())
    }

    /// The length of every dimension.
    ///
    /// # Errors
    ///
    /// Fails if two variables disagree on a dimension's length.
    pub fn dims(&self) -> Result<BTreeMap<String, usize>, DatasetError> {
        let mut dims: BTreeMap<String, usize> = BTreeMap::new();
        for (name, var) in self.variables() {
            let shape = var.data.shape();
            if shape.len() != var.dims.len() {
                return Err(DatasetError::RankMismatch {
                    variable: name.clone(),
                    n_dims: var.dims.len(),
                    ndim: shape.len(),
                });
            }
            for (dim, &len) in var.dims.iter().zip(shape) {
                match dims.get(dim) {
                    Some(&expected) if expected != len => {
                        return Err(DatasetError::DimensionMismatch {
                            dim: dim.clone(),
                            variable: name.clone(),
                            expected,
                            found: len,
                        })
                    }
                    Some(_) => (),
                    None => {
                        dims.insert(dim.clone(), len);
                    }
                }
            }
        }
        Ok(dims)
    }

    /// Make the coordinate `dim` strictly increasing, reversing it (and every
    /// variable along it) if it is strictly decreasing. A missing coordinate
    /// is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::NotMonotonic`] if the coordinate is neither
    /// strictly increasing nor strictly decreasing.
    pub fn ensure_increasing(&mut self, dim: &str) -> Result<(), DatasetError> {
        let values = match self.coords.get(dim) {
            None => return Ok(()),
            Some(coord) => coord
                .data
                .to_f64_vec()
                .ok_or_else(|| DatasetError::NonNumericCoordinate(dim.to_string()))?,
        };
        if is_strictly_increasing(&values) {
            return Ok(());
        }

        let reversed: Vec<f64> = values.iter().rev().copied().collect();
        if !is_strictly_increasing(&reversed) {
            return Err(DatasetError::NotMonotonic(dim.to_string()));
        }
        for (_, var) in self.variables_mut() {
            if let Some(axis) = var.axis_of(dim) {
                var.data = var.data.reversed(axis);
            }
        }
        Ok(())
    }
}
