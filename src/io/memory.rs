// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A [`VisTable`] held entirely in memory, for synthetic data and tests.

use std::collections::BTreeMap;

use log::trace;

use super::{
    Antenna, DataDescription, Field, MainQuery, MainTableMeta, PolarizationSetup, SpectralWindow,
    State, TableReadError, VisTable,
};
use crate::{array::ArrayData, selection::RowSelection};

/// An in-memory measurement set. Main-table columns are stored whole, with the
/// row as the first axis.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub columns: BTreeMap<String, ArrayData>,
    pub main_meta: MainTableMeta,
    pub data_descriptions: Vec<DataDescription>,
    pub spectral_windows: Vec<SpectralWindow>,
    pub polarizations: Vec<PolarizationSetup>,
    pub fields: Vec<Field>,
    pub states: Vec<State>,
    pub antennas: Vec<Antenna>,
}

impl MemoryTable {
    pub fn new() -> MemoryTable {
        MemoryTable::default()
    }

    /// Add (or replace) a main-table column.
    pub fn with_column(mut self, name: &str, data: impl Into<ArrayData>) -> MemoryTable {
        self.columns.insert(name.to_string(), data.into());
        self
    }

    /// The number of rows in the main table, taken from the first column.
    pub fn n_rows(&self) -> usize {
        self.columns
            .values()
            .next()
            .and_then(|c| c.len_of(0))
            .unwrap_or(0)
    }

    fn int_column(&self, name: &str) -> Result<Vec<i32>, TableReadError> {
        let data = self
            .columns
            .get(name)
            .ok_or_else(|| TableReadError::MissingColumn(name.to_string()))?;
        data.to_i32_vec().ok_or_else(|| TableReadError::TypeMismatch {
            column: name.to_string(),
            expected: "scalar int",
            found: format!("{:?}", data.dtype()),
        })
    }
}

impl VisTable for MemoryTable {
    fn query(&self, selection: &RowSelection) -> Result<Box<dyn MainQuery + '_>, TableReadError> {
        let rows = selection.matching_rows(self.n_rows(), |name| self.int_column(name))?;
        trace!(
            "memory table: {} of {} rows match {}",
            rows.len(),
            self.n_rows(),
            selection.describe()
        );
        Ok(Box::new(MemoryQuery {
            table: self,
            column_names: self.columns.keys().cloned().collect(),
            rows,
        }))
    }

    fn main_meta(&self) -> Result<MainTableMeta, TableReadError> {
        Ok(self.main_meta.clone())
    }

    fn data_descriptions(&self) -> Result<Vec<DataDescription>, TableReadError> {
        Ok(self.data_descriptions.clone())
    }

    fn spectral_windows(&self) -> Result<Vec<SpectralWindow>, TableReadError> {
        Ok(self.spectral_windows.clone())
    }

    fn polarizations(&self) -> Result<Vec<PolarizationSetup>, TableReadError> {
        Ok(self.polarizations.clone())
    }

    fn fields(&self) -> Result<Vec<Field>, TableReadError> {
        Ok(self.fields.clone())
    }

    fn states(&self) -> Result<Vec<State>, TableReadError> {
        Ok(self.states.clone())
    }

    fn antennas(&self) -> Result<Vec<Antenna>, TableReadError> {
        Ok(self.antennas.clone())
    }
}

struct MemoryQuery<'a> {
    table: &'a MemoryTable,
    column_names: Vec<String>,
    rows: Vec<usize>,
}

impl MainQuery for MemoryQuery<'_> {
    fn n_rows(&self) -> usize {
        self.rows.len()
    }

    fn column_names(&self) -> &[String] {
        &self.column_names
    }

    fn read_column(&mut self, name: &str) -> Result<ArrayData, TableReadError> {
        self.table
            .columns
            .get(name)
            .map(|data| data.select_rows(&self.rows))
            .ok_or_else(|| TableReadError::MissingColumn(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_selects_rows() {
        let table = MemoryTable::new()
            .with_column("DATA_DESC_ID", vec![0i32, 1, 0, 1])
            .with_column("FIELD_ID", vec![0i32, 0, 0, 1])
            .with_column("TIME", vec![1.0f64, 2.0, 3.0, 4.0]);
        let sel = RowSelection {
            ddi: Some(1),
            ..Default::default()
        };
        let mut query = table.query(&sel).unwrap();
        assert_eq!(query.n_rows(), 2);
        assert_eq!(query.read_f64("TIME").unwrap(), vec![2.0, 4.0]);
        assert_eq!(query.read_i32("FIELD_ID").unwrap(), vec![0, 1]);
        assert!(matches!(
            query.read_column("DATA"),
            Err(TableReadError::MissingColumn(_))
        ));
        assert!(matches!(
            query.read_i32("TIME"),
            Err(TableReadError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_filter_on_missing_column_is_an_error() {
        let table = MemoryTable::new().with_column("TIME", vec![1.0f64]);
        let sel = RowSelection {
            scan_number: Some(1),
            ..Default::default()
        };
        assert!(table.query(&sel).is_err());
    }
}
