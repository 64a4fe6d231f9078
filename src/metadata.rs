// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Typed metadata records attached to datasets, coordinates and variables.
//!
//! Each kind of entity has a closed set of fields. Records are serialised to
//! JSON attributes when a dataset is written and decoded again when it is
//! read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{DIM_FREQUENCY, DIM_TIME};

const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// The `type` tag of a metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaType {
    Quantity,
    Time,
    SkyCoord,
    Frequency,
    SpectralCoord,
    Uvw,
    Antenna,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityAttrs {
    pub units: Vec<String>,
    #[serde(rename = "type")]
    pub kind: MetaType,
}

/// A scalar value with units, e.g. an integration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub data: f64,
    pub dims: Vec<String>,
    pub attrs: QuantityAttrs,
}

impl Quantity {
    pub fn new(value: f64, units: &str) -> Quantity {
        Quantity {
            data: value,
            dims: vec![],
            attrs: QuantityAttrs {
                units: vec![units.to_string()],
                kind: MetaType::Quantity,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyReferenceAttrs {
    pub units: Vec<String>,
    pub observer: String,
    #[serde(rename = "type")]
    pub kind: MetaType,
}

/// A frequency measure with its reference frame (observer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyReference {
    pub data: f64,
    pub dims: Vec<String>,
    pub attrs: FrequencyReferenceAttrs,
}

impl FrequencyReference {
    pub fn new(value: f64, units: &str, observer: &str) -> FrequencyReference {
        FrequencyReference {
            data: value,
            dims: vec![],
            attrs: FrequencyReferenceAttrs {
                units: vec![units.to_string()],
                observer: observer.to_lowercase(),
                kind: MetaType::Frequency,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyCoordAttrs {
    pub units: Vec<String>,
    #[serde(rename = "type")]
    pub kind: MetaType,
    pub frame: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A direction on the sky, two angles in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyCoord {
    pub data: [f64; 2],
    pub dims: Vec<String>,
    pub attrs: SkyCoordAttrs,
}

impl SkyCoord {
    pub fn new(data: [f64; 2], frame: &str, description: &str) -> SkyCoord {
        SkyCoord {
            data,
            dims: vec![],
            attrs: SkyCoordAttrs {
                units: vec!["rad".to_string(), "rad".to_string()],
                kind: MetaType::SkyCoord,
                frame: frame.to_lowercase(),
                description: Some(description.to_string()),
            },
        }
    }
}

/// Attributes of the time coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeCoordAttrs {
    #[serde(rename = "type")]
    pub kind: MetaType,
    pub units: Vec<String>,
    pub scale: String,
    pub format: String,
    pub integration_time: Quantity,
    /// The name of the variable holding per-cell integration times.
    pub effective_integration_time: String,
}

/// Attributes of the frequency coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyCoordAttrs {
    #[serde(rename = "type")]
    pub kind: MetaType,
    pub units: Vec<String>,
    pub frame: String,
    pub spectral_window_name: String,
    pub spectral_window_id: i32,
    pub channel_width: Quantity,
    /// The name of the variable holding per-cell channel widths.
    pub effective_channel_width: String,
    pub reference_frequency: FrequencyReference,
}

/// Attributes of a data variable materialized from a main-table column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnAttrs {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MetaType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// How a time-valued variable is expressed, e.g. `unix`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// The attributes of one variable or coordinate of a dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum VarAttrs {
    #[default]
    None,
    Column(ColumnAttrs),
    Time(TimeCoordAttrs),
    Frequency(FrequencyCoordAttrs),
}

impl VarAttrs {
    /// Serialise into a JSON object.
    pub fn to_json(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let value = match self {
            VarAttrs::None => return Ok(Map::new()),
            VarAttrs::Column(a) => serde_json::to_value(a)?,
            VarAttrs::Time(a) => serde_json::to_value(a)?,
            VarAttrs::Frequency(a) => serde_json::to_value(a)?,
        };
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    /// Decode the attributes of the variable called `name`.
    pub fn from_json(name: &str, map: Map<String, Value>) -> Result<VarAttrs, serde_json::Error> {
        if map.is_empty() {
            return Ok(VarAttrs::None);
        }
        let value = Value::Object(map);
        Ok(match name {
            DIM_TIME => VarAttrs::Time(serde_json::from_value(value)?),
            DIM_FREQUENCY => VarAttrs::Frequency(serde_json::from_value(value)?),
            _ => VarAttrs::Column(serde_json::from_value(value)?),
        })
    }
}

/// The field observed by a partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub code: String,
    pub field_id: i32,
    pub delay_direction: SkyCoord,
    pub phase_direction: SkyCoord,
    pub reference_direction: SkyCoord,
}

/// Names of the variables making up one coherent set of data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataGroup {
    pub visibility: String,
    pub flag: String,
    pub weight: String,
    pub uvw: String,
}

impl Default for DataGroup {
    fn default() -> Self {
        DataGroup {
            visibility: "VISIBILITY".to_string(),
            flag: "FLAG".to_string(),
            weight: "WEIGHT".to_string(),
            uvw: "UVW".to_string(),
        }
    }
}

/// The software that wrote a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub software: String,
    pub version: String,
}

impl Default for Creator {
    fn default() -> Self {
        Creator {
            software: PKG_NAME.to_string(),
            version: PKG_VERSION.to_string(),
        }
    }
}

/// Dataset-level attributes of a partition's main dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionAttrs {
    pub partition_name: String,
    pub ddi: i32,
    pub spectral_window_id: i32,
    pub polarization_setup_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_number: Option<i32>,
    pub field_info: FieldInfo,
    pub data_groups: BTreeMap<String, DataGroup>,
    pub creator: Creator,
}

/// Dataset-level attributes of a partition's antenna dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntennaAttrs {
    #[serde(rename = "type")]
    pub kind: MetaType,
    pub creator: Creator,
}

impl Default for AntennaAttrs {
    fn default() -> Self {
        AntennaAttrs {
            kind: MetaType::Antenna,
            creator: Creator::default(),
        }
    }
}
