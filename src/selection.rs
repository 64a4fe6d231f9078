// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Selecting the rows of the main table that belong to one partition.
//!
//! A measurement set is too large to convert in one piece, so it is split into
//! partitions. Each partition is identified by a [`PartitionKey`], which is
//! turned into a [`RowSelection`] over the `DATA_DESC_ID`, `FIELD_ID`,
//! `SCAN_NUMBER` and `STATE_ID` columns of the main table.
//!
//! # Examples
//!
//! ```rust
//! use procset::{PartitionKey, RowSelection};
//!
//! let key = PartitionKey {
//!     ddi: 1,
//!     spectral_window_id: 1,
//!     polarization_setup_id: 0,
//!     field_id: Some(3),
//!     ..Default::default()
//! };
//! assert_eq!(key.name(), "ddi_1_field_id_3");
//!
//! let sel = RowSelection::for_key(&key);
//! assert!(sel.matches(1, 3, 7, 0));
//! assert!(!sel.matches(1, 2, 7, 0));
//! ```

use std::collections::HashSet;

use itertools::iproduct;
use thiserror::Error;

use crate::io::{DataDescription, Field, State, TableReadError};

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("Two partitions would both be written to '{0}'")]
    DuplicatePartition(String),

    #[error("DATA_DESCRIPTION row {ddi} refers to a negative id")]
    BadDataDescription { ddi: i32 },
}

/// How the main table is split into partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartitionScheme {
    /// One partition per data description and field.
    #[default]
    DdiField,
    /// One partition per data description and scan.
    DdiScan,
    /// One partition per data description, intent and field.
    DdiIntentField,
}

/// Uniquely identifies one partition of a processing set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionKey {
    pub ddi: i32,
    pub spectral_window_id: i32,
    pub polarization_setup_id: i32,
    pub field_id: Option<i32>,
    pub scan_number: Option<i32>,
    pub intent: Option<String>,
    /// The `STATE` rows carrying `intent`.
    pub state_ids: Option<Vec<i32>>,
}

impl PartitionKey {
    /// The name of this partition's entry in the processing set.
    pub fn name(&self) -> String {
        let mut name = format!("ddi_{}", self.ddi);
        if let Some(scan) = self.scan_number {
            name.push_str(&format!("_scan_{scan}"));
        }
        if let Some(intent) = &self.intent {
            name.push_str("_intent_");
            name.push_str(&sanitise(intent));
        }
        if let Some(field_id) = self.field_id {
            name.push_str(&format!("_field_id_{field_id}"));
        }
        name
    }
}

/// Replace anything that doesn't belong in a path component.
fn sanitise(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// A filter over the rows of the main table. `None` selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSelection {
    pub ddi: Option<i32>,
    pub field_id: Option<i32>,
    pub scan_number: Option<i32>,
    pub state_ids: Option<Vec<i32>>,
}

impl RowSelection {
    /// Select every row.
    pub fn all() -> RowSelection {
        RowSelection::default()
    }

    pub fn for_key(key: &PartitionKey) -> RowSelection {
        RowSelection {
            ddi: Some(key.ddi),
            field_id: key.field_id,
            scan_number: key.scan_number,
            state_ids: key.state_ids.clone(),
        }
    }

    pub fn matches(&self, ddi: i32, field_id: i32, scan_number: i32, state_id: i32) -> bool {
        self.ddi.map_or(true, |d| d == ddi)
            && self.field_id.map_or(true, |f| f == field_id)
            && self.scan_number.map_or(true, |s| s == scan_number)
            && self
                .state_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&state_id))
    }

    /// The row numbers out of `n_rows` that this selection keeps. `column`
    /// is only asked for the columns that are filtered on.
    pub fn matching_rows<F>(&self, n_rows: usize, mut column: F) -> Result<Vec<usize>, TableReadError>
    where
        F: FnMut(&str) -> Result<Vec<i32>, TableReadError>,
    {
        let mut fetch = |wanted: bool, name: &str| -> Result<Option<Vec<i32>>, TableReadError> {
            if wanted {
                column(name).map(Some)
            } else {
                Ok(None)
            }
        };
        let ddis = fetch(self.ddi.is_some(), "DATA_DESC_ID")?;
        let fields = fetch(self.field_id.is_some(), "FIELD_ID")?;
        let scans = fetch(self.scan_number.is_some(), "SCAN_NUMBER")?;
        let states = fetch(self.state_ids.is_some(), "STATE_ID")?;
        let value = |col: &Option<Vec<i32>>, row: usize| {
            col.as_ref().and_then(|c| c.get(row).copied()).unwrap_or(-1)
        };

        Ok((0..n_rows)
            .filter(|&row| {
                self.matches(
                    value(&ddis, row),
                    value(&fields, row),
                    value(&scans, row),
                    value(&states, row),
                )
            })
            .collect())
    }

    /// A TaQL-like rendering, for logging.
    pub fn describe(&self) -> String {
        let mut terms = vec![];
        if let Some(ddi) = self.ddi {
            terms.push(format!("DATA_DESC_ID = {ddi}"));
        }
        if let Some(field_id) = self.field_id {
            terms.push(format!("FIELD_ID = {field_id}"));
        }
        if let Some(scan) = self.scan_number {
            terms.push(format!("SCAN_NUMBER = {scan}"));
        }
        if let Some(ids) = &self.state_ids {
            terms.push(format!("STATE_ID IN {ids:?}"));
        }
        if terms.is_empty() {
            "all rows".to_string()
        } else {
            terms.join(" AND ")
        }
    }
}

/// Enumerate the partition keys of a measurement set, in a deterministic
/// order.
///
/// `scan_numbers` are the values of the main table's `SCAN_NUMBER` column;
/// they are only consulted by [`PartitionScheme::DdiScan`].
///
/// # Errors
///
/// Returns [`SelectionError::DuplicatePartition`] if two keys share a name.
pub fn enumerate_partitions(
    scheme: PartitionScheme,
    data_descriptions: &[DataDescription],
    fields: &[Field],
    states: &[State],
    scan_numbers: &[i32],
) -> Result<Vec<PartitionKey>, SelectionError> {
    let mut ddis = Vec::with_capacity(data_descriptions.len());
    for (ddi, dd) in data_descriptions.iter().enumerate() {
        if dd.spectral_window_id < 0 || dd.polarization_id < 0 {
            return Err(SelectionError::BadDataDescription { ddi: ddi as i32 });
        }
        ddis.push(PartitionKey {
            ddi: ddi as i32,
            spectral_window_id: dd.spectral_window_id,
            polarization_setup_id: dd.polarization_id,
            ..Default::default()
        });
    }
    let field_ids = 0..fields.len() as i32;

    let keys: Vec<PartitionKey> = match scheme {
        PartitionScheme::DdiField => iproduct!(ddis.iter(), field_ids)
            .map(|(base, field_id)| PartitionKey {
                field_id: Some(field_id),
                ..base.clone()
            })
            .collect(),

        PartitionScheme::DdiScan => {
            let mut scans = scan_numbers.to_vec();
            scans.sort_unstable();
            scans.dedup();
            iproduct!(ddis.iter(), scans)
                .map(|(base, scan)| PartitionKey {
                    scan_number: Some(scan),
                    ..base.clone()
                })
                .collect()
        }

        PartitionScheme::DdiIntentField => {
            let intents = intents(states);
            if intents.is_empty() {
                iproduct!(ddis.iter(), field_ids)
                    .map(|(base, field_id)| PartitionKey {
                        field_id: Some(field_id),
                        ..base.clone()
                    })
                    .collect()
            } else {
                iproduct!(ddis.iter(), intents.iter(), field_ids)
                    .map(|(base, (intent, state_ids), field_id)| PartitionKey {
                        field_id: Some(field_id),
                        intent: Some(intent.clone()),
                        state_ids: Some(state_ids.clone()),
                        ..base.clone()
                    })
                    .collect()
            }
        }
    };

    let mut seen = HashSet::with_capacity(keys.len());
    for key in &keys {
        let name = key.name();
        if !seen.insert(name.clone()) {
            return Err(SelectionError::DuplicatePartition(name));
        }
    }
    Ok(keys)
}

/// The number of `state_ids` (values of the main table's `STATE_ID` column)
/// that name no row of the `STATE` table, e.g. -1. Under
/// [`PartitionScheme::DdiIntentField`] such rows carry no intent and belong
/// to no partition.
pub fn count_rows_without_intent(states: &[State], state_ids: &[i32]) -> usize {
    state_ids
        .iter()
        .filter(|&&id| usize::try_from(id).map_or(true, |i| i >= states.len()))
        .count()
}

/// The distinct `OBS_MODE` values of the `STATE` table, sorted, with the rows
/// carrying each.
fn intents(states: &[State]) -> Vec<(String, Vec<i32>)> {
    let mut out: Vec<(String, Vec<i32>)> = vec![];
    for (id, state) in states.iter().enumerate() {
        match out.iter_mut().find(|(mode, _)| *mode == state.obs_mode) {
            Some((_, ids)) => ids.push(id as i32),
            None => out.push((state.obs_mode.clone(), vec![id as i32])),
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dds() -> Vec<DataDescription> {
        vec![
            DataDescription {
                spectral_window_id: 0,
                polarization_id: 0,
            },
            DataDescription {
                spectral_window_id: 1,
                polarization_id: 0,
            },
        ]
    }

    fn fields(n: usize) -> Vec<Field> {
        (0..n)
            .map(|i| Field {
                name: format!("field{i}"),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_partition_names() {
        let mut key = PartitionKey {
            ddi: 2,
            scan_number: Some(5),
            ..Default::default()
        };
        assert_eq!(key.name(), "ddi_2_scan_5");
        key.scan_number = None;
        key.intent = Some("CALIBRATE_PHASE#ON_SOURCE".into());
        key.field_id = Some(0);
        assert_eq!(key.name(), "ddi_2_intent_CALIBRATE_PHASE_ON_SOURCE_field_id_0");
    }

    #[test]
    fn test_matching_rows_only_reads_filtered_columns() {
        let sel = RowSelection {
            ddi: Some(1),
            field_id: Some(0),
            ..Default::default()
        };
        let mut asked = vec![];
        let rows = sel
            .matching_rows(4, |name| {
                asked.push(name.to_string());
                Ok(match name {
                    "DATA_DESC_ID" => vec![1, 0, 1, 1],
                    "FIELD_ID" => vec![0, 0, 1, 0],
                    _ => unreachable!(),
                })
            })
            .unwrap();
        assert_eq!(rows, vec![0, 3]);
        assert_eq!(asked, vec!["DATA_DESC_ID", "FIELD_ID"]);
        assert_eq!(sel.describe(), "DATA_DESC_ID = 1 AND FIELD_ID = 0");
        assert_eq!(RowSelection::all().describe(), "all rows");
    }

    #[test]
    fn test_enumerate_ddi_field_is_deterministic() {
        let keys =
            enumerate_partitions(PartitionScheme::DdiField, &dds(), &fields(2), &[], &[]).unwrap();
        let names: Vec<String> = keys.iter().map(|k| k.name()).collect();
        assert_eq!(
            names,
            vec![
                "ddi_0_field_id_0",
                "ddi_0_field_id_1",
                "ddi_1_field_id_0",
                "ddi_1_field_id_1"
            ]
        );
        assert_eq!(keys[2].spectral_window_id, 1);
    }

    #[test]
    fn test_enumerate_ddi_scan() {
        let keys =
            enumerate_partitions(PartitionScheme::DdiScan, &dds()[..1], &[], &[], &[3, 1, 3, 2])
                .unwrap();
        let scans: Vec<Option<i32>> = keys.iter().map(|k| k.scan_number).collect();
        assert_eq!(scans, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_enumerate_intents() {
        let states = vec![
            State {
                obs_mode: "TARGET".into(),
            },
            State {
                obs_mode: "CAL".into(),
            },
            State {
                obs_mode: "TARGET".into(),
            },
        ];
        let keys = enumerate_partitions(
            PartitionScheme::DdiIntentField,
            &dds()[..1],
            &fields(1),
            &states,
            &[],
        )
        .unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].intent.as_deref(), Some("CAL"));
        assert_eq!(keys[1].state_ids, Some(vec![0, 2]));

        // Without a STATE table, intents aren't used.
        let keys = enumerate_partitions(
            PartitionScheme::DdiIntentField,
            &dds()[..1],
            &fields(1),
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(keys[0].name(), "ddi_0_field_id_0");
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let states = vec![
            State {
                obs_mode: "A B".into(),
            },
            State {
                obs_mode: "A_B".into(),
            },
        ];
        let result = enumerate_partitions(
            PartitionScheme::DdiIntentField,
            &dds()[..1],
            &fields(1),
            &states,
            &[],
        );
        assert!(matches!(result, Err(SelectionError::DuplicatePartition(_))));
    }

    #[test]
    fn test_count_rows_without_intent() {
        let states = vec![
            State {
                obs_mode: "A".into(),
            },
            State {
                obs_mode: "B".into(),
            },
        ];
        assert_eq!(count_rows_without_intent(&states, &[0, 1, 1, 0]), 0);
        assert_eq!(count_rows_without_intent(&states, &[-1, 0, 2, 1]), 2);
        assert_eq!(count_rows_without_intent(&[], &[0]), 1);
    }
}
