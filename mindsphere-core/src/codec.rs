//! Conversion between wire rows and the columnar representation
//!
//! The time-series API exchanges data as rows:
//!
//! ```json
//! [{ "_time": "2021-01-31T13:00:00.000Z", "temperature": 21.5, "temperature_qc": 1 }]
//! ```
//!
//! while callers work with [`TimeSeriesData`], keyed by variable and then by
//! Unix millisecond timestamp. Decoding never fails: rows without a usable
//! `_time` are skipped individually. A `<variable>_qc` field only attaches
//! to a value field of the same row and is dropped otherwise.

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::trace;

use crate::datapoint::{DataPoint, DataPointValue, TimeSeriesData};
use crate::error::{MindSphereError, MindSphereResult};
use crate::time::{format_millis, Timestamp};

/// Suffix marking a quality-code field
pub const QUALITY_CODE_SUFFIX: &str = "_qc";

/// Name of the timestamp field on a wire row
pub const TIME_FIELD: &str = "_time";

/// One row of the wire format, fields in document order
pub type WireRow = Map<String, Value>;

/// True iff `name` ends with the quality-code suffix
pub fn is_quality_code(name: &str) -> bool {
    name.ends_with(QUALITY_CODE_SUFFIX)
}

/// Strip the quality-code suffix if present, otherwise return `name` unchanged
pub fn base_name(name: &str) -> &str {
    name.strip_suffix(QUALITY_CODE_SUFFIX).unwrap_or(name)
}

/// Quality-code field name for a variable
pub fn quality_code_name(base: &str) -> String {
    format!("{}{}", base, QUALITY_CODE_SUFFIX)
}

/// Decode a single row object or an array of row objects.
///
/// Any other JSON shape decodes to an empty data set.
pub fn decode(input: &Value) -> TimeSeriesData {
    let mut data = TimeSeriesData::new();

    match input {
        Value::Array(rows) => {
            for (idx, row) in rows.iter().enumerate() {
                match row {
                    Value::Object(row) => decode_row_into(row, &mut data),
                    other => trace!(row = idx, kind = json_kind(other), "Skipping non-object row"),
                }
            }
        }
        Value::Object(row) => decode_row_into(row, &mut data),
        other => trace!(kind = json_kind(other), "Nothing to decode"),
    }

    data
}

fn decode_row_into(row: &WireRow, data: &mut TimeSeriesData) {
    let Some(timestamp) = row.get(TIME_FIELD).and_then(Timestamp::from_wire) else {
        trace!(time = ?row.get(TIME_FIELD), "Skipping row without a valid _time");
        return;
    };
    let timestamp_ms = timestamp.timestamp_millis();

    for (key, raw) in row {
        if key == TIME_FIELD || is_quality_code(key) {
            continue;
        }

        let Some(value) = DataPointValue::from_json(raw) else {
            trace!(variable = %key, kind = json_kind(raw), "Skipping non-scalar value");
            continue;
        };

        let qc = row.get(&quality_code_name(key)).cloned();
        data.insert(key.as_str(), timestamp_ms, DataPoint { value, qc });
    }
}

/// Encode columnar data into wire rows.
///
/// One row per distinct timestamp, emitted in first-seen order while walking
/// variables and then their timestamps in insertion order.
pub fn encode(data: &TimeSeriesData) -> MindSphereResult<Vec<WireRow>> {
    let mut rows: IndexMap<i64, WireRow> = IndexMap::new();

    for (variable, series) in data.iter() {
        if variable == TIME_FIELD {
            return Err(MindSphereError::validation(format!(
                "Variable name {} is reserved",
                TIME_FIELD
            )));
        }

        for (&timestamp_ms, point) in series {
            let row = match rows.entry(timestamp_ms) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let mut row = WireRow::new();
                    row.insert(
                        TIME_FIELD.to_string(),
                        Value::String(format_millis(timestamp_ms)?),
                    );
                    entry.insert(row)
                }
            };

            row.insert(variable.clone(), point.value.to_json());
            if let Some(qc) = &point.qc {
                row.insert(quality_code_name(variable), qc.clone());
            }
        }
    }

    Ok(rows.into_values().collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
