// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading CASA measurement sets (version 2) from disk.

use std::path::{Path, PathBuf};

use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayD, IxDyn};
use rubbl_casatables::{
    CasaDataType, CasaScalarData, GlueDataType, Table, TableOpenMode, TableRecord,
};

use super::{
    Antenna, DataDescription, Field, MainQuery, MainTableMeta, PolarizationSetup, SpectralWindow,
    State, TableReadError, VisTable,
};
use crate::{array::ArrayData, c32, c64, selection::RowSelection};

/// A measurement set directory. Tables are opened afresh for every read, so a
/// single `MeasurementSet` can be shared by partition workers.
#[derive(Debug, Clone)]
pub struct MeasurementSet {
    path: PathBuf,
}

impl MeasurementSet {
    /// Check that `path` holds a readable main table.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<MeasurementSet, TableReadError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(TableReadError::BadFile(path));
        }
        let mut main = Table::open(&path, TableOpenMode::Read)?;
        debug!(
            "Opened measurement set {} with {} rows",
            path.display(),
            main.n_rows()
        );
        trace!("main table columns: {:?}", main.column_names()?);
        Ok(MeasurementSet { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_main(&self) -> Result<Table, TableReadError> {
        Ok(Table::open(&self.path, TableOpenMode::Read)?)
    }

    fn open_subtable(&self, name: &str) -> Result<Option<Table>, TableReadError> {
        let path = self.path.join(name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Table::open(path, TableOpenMode::Read)?))
    }

    fn require_subtable(&self, name: &str) -> Result<Table, TableReadError> {
        self.open_subtable(name)?
            .ok_or_else(|| TableReadError::MissingTable(name.to_string()))
    }
}

/// The `[longitude, latitude]` of the zeroth-order term of a direction cell.
fn direction(table: &mut Table, column: &str, row: u64) -> Result<[f64; 2], TableReadError> {
    let values: Vec<f64> = table.get_cell_as_vec(column, row)?;
    match values.as_slice() {
        [lon, lat, ..] => Ok([*lon, *lat]),
        _ => Err(TableReadError::TypeMismatch {
            column: column.to_string(),
            expected: "direction",
            found: format!("{} values", values.len()),
        }),
    }
}

/// The measure keywords of a column: the first of its `QuantumUnits` and
/// the `Ref` of its `MEASINFO` record. Either is `None` when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ColumnMeasure {
    units: Option<String>,
    reference: Option<String>,
}

fn has_keyword(record: &mut TableRecord, name: &str) -> Result<bool, TableReadError> {
    Ok(record.keyword_names()?.iter().any(|k| k == name))
}

fn column_measure(table: &mut Table, column: &str) -> Result<ColumnMeasure, TableReadError> {
    let mut keywords = table.get_column_keyword_record(column)?;
    let mut measure = ColumnMeasure::default();
    if has_keyword(&mut keywords, "QuantumUnits")? {
        let units: Vec<String> = keywords.get_field("QuantumUnits")?;
        measure.units = units.into_iter().next();
    }
    if has_keyword(&mut keywords, "MEASINFO")? {
        let mut info: TableRecord = keywords.get_field("MEASINFO")?;
        if has_keyword(&mut info, "Ref")? {
            measure.reference = Some(info.get_field("Ref")?);
        }
    }
    trace!("{column} measure: {measure:?}");
    Ok(measure)
}

fn xyz(table: &mut Table, column: &str, row: u64) -> Result<[f64; 3], TableReadError> {
    let values: Vec<f64> = table.get_cell_as_vec(column, row)?;
    match values.as_slice() {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(TableReadError::TypeMismatch {
            column: column.to_string(),
            expected: "3-vector",
            found: format!("{} values", values.len()),
        }),
    }
}

impl VisTable for MeasurementSet {
    fn query(&self, selection: &RowSelection) -> Result<Box<dyn MainQuery + '_>, TableReadError> {
        let mut table = self.open_main()?;
        let n_rows = table.n_rows() as usize;
        let rows = selection.matching_rows(n_rows, |name| {
            if !table.column_names()?.iter().any(|c| c == name) {
                return Err(TableReadError::MissingColumn(name.to_string()));
            }
            Ok(table.get_col_as_vec::<i32>(name)?)
        })?;
        let column_names = table.column_names()?;
        trace!("{:?} selects {} of {} rows", selection, rows.len(), n_rows);
        Ok(Box::new(MsQuery {
            table,
            column_names,
            rows,
        }))
    }

    fn main_meta(&self) -> Result<MainTableMeta, TableReadError> {
        let measure = column_measure(&mut self.open_main()?, "TIME")?;
        let default = MainTableMeta::default();
        Ok(MainTableMeta {
            time_units: measure.units.unwrap_or(default.time_units),
            time_scale: measure.reference.unwrap_or(default.time_scale),
        })
    }

    fn data_descriptions(&self) -> Result<Vec<DataDescription>, TableReadError> {
        let mut table = self.require_subtable("DATA_DESCRIPTION")?;
        let spws: Vec<i32> = table.get_col_as_vec("SPECTRAL_WINDOW_ID")?;
        let pols: Vec<i32> = table.get_col_as_vec("POLARIZATION_ID")?;
        Ok(spws
            .into_iter()
            .zip(pols)
            .map(|(spectral_window_id, polarization_id)| DataDescription {
                spectral_window_id,
                polarization_id,
            })
            .collect())
    }

    fn spectral_windows(&self) -> Result<Vec<SpectralWindow>, TableReadError> {
        let mut table = self.require_subtable("SPECTRAL_WINDOW")?;
        let names: Vec<String> = table.get_col_as_vec("NAME")?;
        let ref_freqs: Vec<f64> = table.get_col_as_vec("REF_FREQUENCY")?;
        let frames: Vec<i32> = table.get_col_as_vec("MEAS_FREQ_REF")?;
        let freq_units = column_measure(&mut table, "CHAN_FREQ")?
            .units
            .unwrap_or_else(|| SpectralWindow::default().freq_units);
        let mut spws = Vec::with_capacity(names.len());
        for (row, ((name, ref_frequency), meas_freq_ref)) in
            names.into_iter().zip(ref_freqs).zip(frames).enumerate()
        {
            let row = row as u64;
            spws.push(SpectralWindow {
                name,
                chan_freq: table.get_cell_as_vec("CHAN_FREQ", row)?,
                chan_width: table.get_cell_as_vec("CHAN_WIDTH", row)?,
                ref_frequency,
                meas_freq_ref,
                freq_units: freq_units.clone(),
            });
        }
        Ok(spws)
    }

    fn polarizations(&self) -> Result<Vec<PolarizationSetup>, TableReadError> {
        let mut table = self.require_subtable("POLARIZATION")?;
        let num_corrs: Vec<i32> = table.get_col_as_vec("NUM_CORR")?;
        let mut pols = Vec::with_capacity(num_corrs.len());
        for (row, num_corr) in num_corrs.into_iter().enumerate() {
            pols.push(PolarizationSetup {
                num_corr: usize::try_from(num_corr).unwrap_or(0),
                corr_type: table.get_cell_as_vec("CORR_TYPE", row as u64)?,
            });
        }
        Ok(pols)
    }

    fn fields(&self) -> Result<Vec<Field>, TableReadError> {
        let mut table = self.require_subtable("FIELD")?;
        let names: Vec<String> = table.get_col_as_vec("NAME")?;
        let codes: Vec<String> = table.get_col_as_vec("CODE")?;
        let direction_frame = column_measure(&mut table, "PHASE_DIR")?
            .reference
            .unwrap_or_else(|| Field::default().direction_frame);
        let mut fields = Vec::with_capacity(names.len());
        for (row, (name, code)) in names.into_iter().zip(codes).enumerate() {
            let row = row as u64;
            fields.push(Field {
                name,
                code,
                delay_dir: direction(&mut table, "DELAY_DIR", row)?,
                phase_dir: direction(&mut table, "PHASE_DIR", row)?,
                reference_dir: direction(&mut table, "REFERENCE_DIR", row)?,
                direction_frame: direction_frame.clone(),
            });
        }
        Ok(fields)
    }

    fn states(&self) -> Result<Vec<State>, TableReadError> {
        let mut table = match self.open_subtable("STATE")? {
            Some(t) => t,
            None => {
                debug!("{} has no STATE table", self.path.display());
                return Ok(vec![]);
            }
        };
        let modes: Vec<String> = table.get_col_as_vec("OBS_MODE")?;
        Ok(modes
            .into_iter()
            .map(|obs_mode| State { obs_mode })
            .collect())
    }

    fn antennas(&self) -> Result<Vec<Antenna>, TableReadError> {
        let mut table = self.require_subtable("ANTENNA")?;
        let names: Vec<String> = table.get_col_as_vec("NAME")?;
        let stations: Vec<String> = table.get_col_as_vec("STATION")?;
        let mounts: Vec<String> = table.get_col_as_vec("MOUNT")?;
        let diameters: Vec<f64> = table.get_col_as_vec("DISH_DIAMETER")?;
        let flags: Vec<bool> = table.get_col_as_vec("FLAG_ROW")?;
        let mut antennas = Vec::with_capacity(names.len());
        for (row, ((((name, station), mount), dish_diameter), flag_row)) in names
            .into_iter()
            .zip(stations)
            .zip(mounts)
            .zip(diameters)
            .zip(flags)
            .enumerate()
        {
            let row = row as u64;
            antennas.push(Antenna {
                name,
                station,
                mount,
                dish_diameter,
                position: xyz(&mut table, "POSITION", row)?,
                offset: xyz(&mut table, "OFFSET", row)?,
                flag_row,
            });
        }
        Ok(antennas)
    }
}

/// Selected rows of a measurement set's main table.
struct MsQuery {
    table: Table,
    column_names: Vec<String>,
    rows: Vec<usize>,
}

impl MsQuery {
    fn scalar_column<T: CasaScalarData + Clone>(
        &mut self,
        name: &str,
    ) -> Result<ArrayD<T>, TableReadError> {
        let all: Vec<T> = self.table.get_col_as_vec(name)?;
        let selected: Vec<T> = self.rows.iter().map(|&r| all[r].clone()).collect();
        Ok(Array1::from(selected).into_dyn())
    }

    /// Stack the cells of an array column. `rank` is the cell rank if the
    /// column declares a fixed shape.
    fn array_column<T>(
        &mut self,
        name: &str,
        rank: Option<usize>,
    ) -> Result<ArrayD<T>, TableReadError>
    where
        T: CasaScalarData + Copy,
        Array2<T>: CasaDataType,
    {
        let mut cell_shape: Option<Vec<usize>> = None;
        let mut values = Vec::new();
        for &row in &self.rows {
            let row = row as u64;
            let two_d = match rank {
                Some(1) => None,
                _ => self.table.get_cell::<Array2<T>>(name, row).ok(),
            };
            let (shape, cell) = match two_d {
                Some(a) => (a.shape().to_vec(), a.iter().copied().collect::<Vec<T>>()),
                None => {
                    let v: Vec<T> = self.table.get_cell_as_vec(name, row)?;
                    (vec![v.len()], v)
                }
            };
            let expected = cell_shape.get_or_insert_with(|| shape.clone());
            if *expected != shape {
                return Err(TableReadError::RaggedColumn {
                    column: name.to_string(),
                    row,
                    expected: expected.clone(),
                    found: shape,
                });
            }
            values.extend(cell);
        }

        let mut shape = vec![self.rows.len()];
        shape.extend(cell_shape.unwrap_or_else(|| vec![0; rank.unwrap_or(1)]));
        let found = shape.clone();
        ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|_| TableReadError::RaggedColumn {
            column: name.to_string(),
            row: 0,
            expected: vec![],
            found,
        })
    }
}

impl MainQuery for MsQuery {
    fn n_rows(&self) -> usize {
        self.rows.len()
    }

    fn column_names(&self) -> &[String] {
        &self.column_names
    }

    fn read_column(&mut self, name: &str) -> Result<ArrayData, TableReadError> {
        if !self.column_names.iter().any(|c| c == name) {
            return Err(TableReadError::MissingColumn(name.to_string()));
        }
        let desc = self.table.get_col_desc(name)?;
        let data_type = desc.data_type();
        trace!("reading {name} ({data_type:?}) for {} rows", self.rows.len());

        if desc.is_scalar() {
            return Ok(match data_type {
                GlueDataType::TpBool => self.scalar_column::<bool>(name)?.into(),
                GlueDataType::TpInt => self.scalar_column::<i32>(name)?.into(),
                GlueDataType::TpInt64 => self.scalar_column::<i64>(name)?.into(),
                GlueDataType::TpFloat => self.scalar_column::<f32>(name)?.into(),
                GlueDataType::TpDouble => self.scalar_column::<f64>(name)?.into(),
                GlueDataType::TpComplex => self.scalar_column::<c32>(name)?.into(),
                GlueDataType::TpDComplex => self.scalar_column::<c64>(name)?.into(),
                GlueDataType::TpString => self.scalar_column::<String>(name)?.into(),
                other => {
                    return Err(TableReadError::TypeMismatch {
                        column: name.to_string(),
                        expected: "a supported scalar type",
                        found: format!("{other:?}"),
                    })
                }
            });
        }

        let rank = desc.shape().map(|s| s.len());
        if matches!(rank, Some(r) if r > 2) {
            return Err(TableReadError::TypeMismatch {
                column: name.to_string(),
                expected: "cells of rank 1 or 2",
                found: format!("cells of shape {:?}", desc.shape()),
            });
        }
        Ok(match data_type {
            GlueDataType::TpBool => self.array_column::<bool>(name, rank)?.into(),
            GlueDataType::TpInt => self.array_column::<i32>(name, rank)?.into(),
            GlueDataType::TpInt64 => self.array_column::<i64>(name, rank)?.into(),
            GlueDataType::TpFloat => self.array_column::<f32>(name, rank)?.into(),
            GlueDataType::TpDouble => self.array_column::<f64>(name, rank)?.into(),
            GlueDataType::TpComplex => self.array_column::<c32>(name, rank)?.into(),
            GlueDataType::TpDComplex => self.array_column::<c64>(name, rank)?.into(),
            other => {
                return Err(TableReadError::TypeMismatch {
                    column: name.to_string(),
                    expected: "a supported array type",
                    found: format!("{other:?}"),
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use rubbl_casatables::{TableCreateMode, TableDesc, TableDescCreateMode};
    use tempfile::tempdir;

    const N_ROWS: u64 = 6;

    fn new_table(path: &Path, desc: TableDesc, n_rows: u64) -> Table {
        Table::new(path, desc, n_rows as usize, TableCreateMode::New).unwrap()
    }

    fn scalar(desc: &mut TableDesc, ty: GlueDataType, name: &str) {
        desc.add_scalar_column(ty, name, None, false, false).unwrap();
    }

    fn array(desc: &mut TableDesc, ty: GlueDataType, name: &str, shape: Option<&[u64]>) {
        desc.add_array_column(ty, name, None, shape, false, false)
            .unwrap();
    }

    /// Attach `QuantumUnits` and, with a reference, a `MEASINFO` record to a
    /// column.
    fn measure(
        desc: &mut TableDesc,
        column: &str,
        kind: &str,
        units: &[&str],
        reference: Option<&str>,
    ) {
        let units: Vec<String> = units.iter().map(|u| u.to_string()).collect();
        desc.put_column_keyword(column, "QuantumUnits", &units)
            .unwrap();
        if let Some(reference) = reference {
            let mut meas_info = TableRecord::new().unwrap();
            meas_info.put_field("type", &kind.to_string()).unwrap();
            meas_info.put_field("Ref", &reference.to_string()).unwrap();
            desc.put_column_keyword(column, "MEASINFO", &meas_info)
                .unwrap();
        }
    }

    /// Two timesteps of three baselines, alternating between two data
    /// descriptions. There is no STATE table.
    fn write_ms(path: &Path, with_measures: bool) {
        let mut desc = TableDesc::new("", TableDescCreateMode::TDM_SCRATCH).unwrap();
        scalar(&mut desc, GlueDataType::TpDouble, "TIME");
        if with_measures {
            measure(&mut desc, "TIME", "epoch", &["s"], Some("TAI"));
        }
        scalar(&mut desc, GlueDataType::TpDouble, "INTERVAL");
        scalar(&mut desc, GlueDataType::TpInt, "ANTENNA1");
        scalar(&mut desc, GlueDataType::TpInt, "ANTENNA2");
        scalar(&mut desc, GlueDataType::TpInt, "DATA_DESC_ID");
        scalar(&mut desc, GlueDataType::TpInt, "FIELD_ID");
        array(&mut desc, GlueDataType::TpComplex, "DATA", Some(&[3, 2]));
        array(&mut desc, GlueDataType::TpBool, "FLAG", Some(&[3, 2]));
        array(&mut desc, GlueDataType::TpFloat, "WEIGHT", Some(&[2]));
        let mut main = new_table(path, desc, N_ROWS);
        for row in 0..N_ROWS {
            main.put_cell("TIME", row, &(100.0 + (row / 3) as f64))
                .unwrap();
            main.put_cell("INTERVAL", row, &1.0f64).unwrap();
            main.put_cell("ANTENNA1", row, &0i32).unwrap();
            main.put_cell("ANTENNA2", row, &((row % 3) as i32 + 1))
                .unwrap();
            main.put_cell("DATA_DESC_ID", row, &((row % 2) as i32))
                .unwrap();
            main.put_cell("FIELD_ID", row, &0i32).unwrap();
            let data = Array2::from_shape_fn((3, 2), |(c, p)| {
                c32::new(row as f32, (2 * c + p) as f32)
            });
            main.put_cell("DATA", row, &data).unwrap();
            main.put_cell("FLAG", row, &Array2::from_elem((3, 2), row == 4))
                .unwrap();
            main.put_cell("WEIGHT", row, &vec![1.0f32, 2.0]).unwrap();
        }

        let mut desc = TableDesc::new("", TableDescCreateMode::TDM_SCRATCH).unwrap();
        scalar(&mut desc, GlueDataType::TpInt, "SPECTRAL_WINDOW_ID");
        scalar(&mut desc, GlueDataType::TpInt, "POLARIZATION_ID");
        let mut ddi = new_table(&path.join("DATA_DESCRIPTION"), desc, 2);
        for row in 0..2 {
            ddi.put_cell("SPECTRAL_WINDOW_ID", row, &(row as i32))
                .unwrap();
            ddi.put_cell("POLARIZATION_ID", row, &0i32).unwrap();
        }

        let mut desc = TableDesc::new("", TableDescCreateMode::TDM_SCRATCH).unwrap();
        scalar(&mut desc, GlueDataType::TpString, "NAME");
        scalar(&mut desc, GlueDataType::TpDouble, "REF_FREQUENCY");
        scalar(&mut desc, GlueDataType::TpInt, "MEAS_FREQ_REF");
        array(&mut desc, GlueDataType::TpDouble, "CHAN_FREQ", None);
        array(&mut desc, GlueDataType::TpDouble, "CHAN_WIDTH", None);
        if with_measures {
            measure(&mut desc, "CHAN_FREQ", "frequency", &["MHz"], None);
        }
        let mut spw = new_table(&path.join("SPECTRAL_WINDOW"), desc, 2);
        for row in 0..2u64 {
            let start = 1.0e8 * (row + 1) as f64;
            spw.put_cell("NAME", row, &format!("spw{row}")).unwrap();
            spw.put_cell("REF_FREQUENCY", row, &start).unwrap();
            spw.put_cell("MEAS_FREQ_REF", row, &1i32).unwrap();
            spw.put_cell(
                "CHAN_FREQ",
                row,
                &vec![start, start + 1.0e6, start + 2.0e6],
            )
            .unwrap();
            spw.put_cell("CHAN_WIDTH", row, &vec![1.0e6; 3]).unwrap();
        }

        let mut desc = TableDesc::new("", TableDescCreateMode::TDM_SCRATCH).unwrap();
        scalar(&mut desc, GlueDataType::TpInt, "NUM_CORR");
        array(&mut desc, GlueDataType::TpInt, "CORR_TYPE", None);
        let mut pol = new_table(&path.join("POLARIZATION"), desc, 1);
        pol.put_cell("NUM_CORR", 0, &2i32).unwrap();
        pol.put_cell("CORR_TYPE", 0, &vec![9i32, 12]).unwrap();

        let mut desc = TableDesc::new("", TableDescCreateMode::TDM_SCRATCH).unwrap();
        scalar(&mut desc, GlueDataType::TpString, "NAME");
        scalar(&mut desc, GlueDataType::TpString, "CODE");
        for col in ["DELAY_DIR", "PHASE_DIR", "REFERENCE_DIR"] {
            array(&mut desc, GlueDataType::TpDouble, col, None);
        }
        if with_measures {
            measure(&mut desc, "PHASE_DIR", "direction", &["rad", "rad"], Some("ICRS"));
        }
        let mut field = new_table(&path.join("FIELD"), desc, 1);
        field.put_cell("NAME", 0, &"Hydra A".to_string()).unwrap();
        field.put_cell("CODE", 0, &"T".to_string()).unwrap();
        for col in ["DELAY_DIR", "PHASE_DIR", "REFERENCE_DIR"] {
            field.put_cell(col, 0, &array![[2.4, -0.21]]).unwrap();
        }

        let mut desc = TableDesc::new("", TableDescCreateMode::TDM_SCRATCH).unwrap();
        for col in ["NAME", "STATION", "MOUNT"] {
            scalar(&mut desc, GlueDataType::TpString, col);
        }
        scalar(&mut desc, GlueDataType::TpDouble, "DISH_DIAMETER");
        scalar(&mut desc, GlueDataType::TpBool, "FLAG_ROW");
        array(&mut desc, GlueDataType::TpDouble, "POSITION", Some(&[3]));
        array(&mut desc, GlueDataType::TpDouble, "OFFSET", Some(&[3]));
        let mut ant = new_table(&path.join("ANTENNA"), desc, 4);
        for row in 0..4u64 {
            ant.put_cell("NAME", row, &format!("Tile{row:03}")).unwrap();
            ant.put_cell("STATION", row, &"MWA".to_string()).unwrap();
            ant.put_cell("MOUNT", row, &"X-Y".to_string()).unwrap();
            ant.put_cell("DISH_DIAMETER", row, &4.0f64).unwrap();
            ant.put_cell("FLAG_ROW", row, &false).unwrap();
            ant.put_cell("POSITION", row, &vec![row as f64, 0.0, -1.0])
                .unwrap();
            ant.put_cell("OFFSET", row, &vec![0.0f64; 3]).unwrap();
        }
    }

    #[test]
    fn test_open_missing() {
        let tmp = tempdir().unwrap();
        let result = MeasurementSet::open(tmp.path().join("nothing.ms"));
        assert!(matches!(result, Err(TableReadError::BadFile(_))));
    }

    #[test]
    fn test_read_subtables() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("test.ms");
        write_ms(&path, false);
        let ms = MeasurementSet::open(&path).unwrap();

        let ddis = ms.data_descriptions().unwrap();
        assert_eq!(ddis.len(), 2);
        assert_eq!(ddis[1].spectral_window_id, 1);

        let spws = ms.spectral_windows().unwrap();
        assert_eq!(spws[1].name, "spw1");
        assert_eq!(spws[1].chan_freq, vec![2.0e8, 2.01e8, 2.02e8]);
        assert_eq!(spws[0].frame(), "LSRK");

        let pols = ms.polarizations().unwrap();
        assert_eq!(pols[0].labels(), vec!["XX", "YY"]);

        let fields = ms.fields().unwrap();
        assert_eq!(fields[0].name, "Hydra A");
        assert_eq!(fields[0].reference_dir, [2.4, -0.21]);

        assert!(ms.states().unwrap().is_empty());

        let antennas = ms.antennas().unwrap();
        assert_eq!(antennas.len(), 4);
        assert_eq!(antennas[3].name, "Tile003");
        assert_eq!(antennas[3].position, [3.0, 0.0, -1.0]);
    }

    #[test]
    fn test_measures_default_without_keywords() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("test.ms");
        write_ms(&path, false);
        let ms = MeasurementSet::open(&path).unwrap();
        assert_eq!(ms.main_meta().unwrap(), MainTableMeta::default());
        assert_eq!(ms.spectral_windows().unwrap()[0].freq_units, "Hz");
        assert_eq!(ms.fields().unwrap()[0].direction_frame, "J2000");
    }

    #[test]
    fn test_measures_from_keywords() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("test.ms");
        write_ms(&path, true);
        let ms = MeasurementSet::open(&path).unwrap();

        let meta = ms.main_meta().unwrap();
        assert_eq!(meta.time_units, "s");
        assert_eq!(meta.time_scale, "TAI");
        let spws = ms.spectral_windows().unwrap();
        assert!(spws.iter().all(|spw| spw.freq_units == "MHz"));
        assert_eq!(ms.fields().unwrap()[0].direction_frame, "ICRS");
    }

    #[test]
    fn test_query_main_table() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("test.ms");
        write_ms(&path, false);
        let ms = MeasurementSet::open(&path).unwrap();

        let selection = RowSelection {
            ddi: Some(1),
            ..Default::default()
        };
        let mut query = ms.query(&selection).unwrap();
        assert_eq!(query.n_rows(), 3);
        assert!(query.column_names().iter().any(|c| c == "WEIGHT"));

        assert_eq!(query.read_f64("TIME").unwrap(), vec![100.0, 101.0, 101.0]);
        assert_eq!(query.read_i32("ANTENNA2").unwrap(), vec![2, 1, 3]);

        let data = query.read_column("DATA").unwrap();
        assert_eq!(data.shape(), vec![3, 3, 2]);
        match data {
            ArrayData::Complex64(a) => {
                assert_eq!(a[[0, 0, 0]], c32::new(1.0, 0.0));
                assert_eq!(a[[1, 2, 1]], c32::new(3.0, 5.0));
            }
            other => panic!("unexpected {:?}", other.dtype()),
        }
        match query.read_column("FLAG").unwrap() {
            ArrayData::Bool(a) => {
                assert!(!a[[0, 0, 0]]);
                assert!(!a[[1, 0, 0]]);
            }
            other => panic!("unexpected {:?}", other.dtype()),
        }
        assert_eq!(query.read_column("WEIGHT").unwrap().shape(), vec![3, 2]);
        assert!(matches!(
            query.read_column("CORRECTED_DATA"),
            Err(TableReadError::MissingColumn(_))
        ));
    }
}
