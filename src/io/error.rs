// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading tables and with the chunked-array store.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableReadError {
    #[error("Supplied path {0} does not exist or is not a table")]
    BadFile(PathBuf),

    #[error("The {0} table is missing")]
    MissingTable(String),

    #[error("The main table has no {0} column")]
    MissingColumn(String),

    #[error("Column {column} holds {found} values, which cannot be read as {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error("Column {column} has a cell at row {row} with shape {found:?}, but the first cell had shape {expected:?}")]
    RaggedColumn {
        column: String,
        row: u64,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[cfg(feature = "ms")]
    #[error("Error when trying to interface with measurement set: {0}")]
    Table(#[from] rubbl_casatables::TableError),

    #[cfg(feature = "ms")]
    #[error("Error from casacore: {0}")]
    Casacore(#[from] rubbl_casatables::CasacoreError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Bad metadata in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unsupported array dtype '{0}'")]
    UnsupportedDtype(String),

    #[error("Unsupported compressor '{0}'")]
    UnsupportedCompressor(String),

    #[error("Group {group} has no array '{name}'")]
    MissingArray { group: PathBuf, name: String },

    #[error("Variable {name} has dims {dims:?} but its data has {ndim} axes")]
    DimsMismatch {
        name: String,
        dims: Vec<String>,
        ndim: usize,
    },

    #[error("{0} is not a group")]
    NotAGroup(PathBuf),

    #[error("Error when opening a store: {0}")]
    OpenStore(#[from] zarrs::filesystem::FilesystemStoreCreateError),

    #[error("Error when creating an array: {0}")]
    ArrayCreate(#[from] zarrs::array::ArrayCreateError),

    #[error("Error when reading or writing an array: {0}")]
    Array(#[from] zarrs::array::ArrayError),

    #[error("Error when opening a group: {0}")]
    GroupCreate(#[from] zarrs::group::GroupCreateError),

    #[error("Storage error: {0}")]
    Storage(#[from] zarrs::storage::StorageError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> StoreError {
        StoreError::Json {
            path: path.into(),
            source,
        }
    }
}
