//! Wire Format Compatibility Tests
//!
//! These tests pin the row format exchanged with the time-series API and the
//! columnar shape handed to callers.
//!
//! Run with: cargo test --test wire_format_tests

use mindsphere_core::{
    codec::{decode, encode, TIME_FIELD},
    datapoint::{DataPoint, DataPointValue, TimeSeriesData},
};
use serde_json::{json, Value};

fn rows_to_json(rows: Vec<mindsphere_core::WireRow>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}

#[test]
fn test_decode_example_row() {
    let decoded = decode(&json!([{"_time": "2021-01-31T13:00:00Z", "v": 10, "v_qc": 1}]));

    assert_eq!(
        serde_json::to_value(&decoded).unwrap(),
        json!({"v": {"1612098000000": {"value": 10, "qc": 1}}})
    );
}

#[test]
fn test_encode_example_data() {
    let data = TimeSeriesData::new().with_point(
        "v",
        1_612_098_000_000,
        DataPoint::new(10i64).with_qc(1),
    );

    let rows = encode(&data).unwrap();
    let text = serde_json::to_string(&rows_to_json(rows)).unwrap();

    // field order on the wire: _time first, then value, then its quality code
    assert_eq!(
        text,
        r#"[{"_time":"2021-01-31T13:00:00.000Z","v":10,"v_qc":1}]"#
    );
}

#[test]
fn test_round_trip_is_idempotent() {
    let rows = json!([
        {
            "_time": "2021-01-31T13:00:00Z",
            "temperature": 21.5,
            "temperature_qc": 0,
            "pressure": 1013
        },
        {"_time": "2021-01-31T13:00:01.250Z", "temperature": 21.7, "state": "running"},
        {"_time": "2021-01-31T13:00:02Z", "pressure": null, "pressure_qc": 2, "door": false},
        {"temperature": 99.9},
        {"_time": "2021-01-31T13:00:03Z", "orphan_qc": 5}
    ]);

    let once = decode(&rows);
    let encoded = encode(&once).unwrap();
    let twice = decode(&rows_to_json(encoded));

    assert_eq!(once, twice);
    assert_eq!(
        once.variable_names(),
        vec!["temperature", "pressure", "state", "door"]
    );
    assert_eq!(once.point_count(), 6);
}

#[test]
fn test_mixed_presence_variables() {
    let rows = json!([
        {"_time": "2021-01-31T13:00:00Z", "a": 1},
        {"_time": "2021-01-31T13:00:01Z", "b": 2, "b_qc": 1},
        {"_time": "2021-01-31T13:00:02Z", "a": 3, "b": 4}
    ]);

    let data = decode(&rows);
    let a: Vec<i64> = data.series("a").unwrap().keys().copied().collect();
    let b: Vec<i64> = data.series("b").unwrap().keys().copied().collect();
    assert_eq!(a, vec![1_612_098_000_000, 1_612_098_002_000]);
    assert_eq!(b, vec![1_612_098_001_000, 1_612_098_002_000]);
    assert_eq!(data.get("b", 1_612_098_002_000).unwrap().qc, None);

    let encoded = encode(&data).unwrap();
    assert_eq!(encoded.len(), 3);
    assert_eq!(encoded[0][TIME_FIELD], json!("2021-01-31T13:00:00.000Z"));
    assert_eq!(encoded[1][TIME_FIELD], json!("2021-01-31T13:00:02.000Z"));
    assert_eq!(encoded[2][TIME_FIELD], json!("2021-01-31T13:00:01.000Z"));
    assert_eq!(encoded[1]["b"], json!(4));
    assert!(!encoded[1].contains_key("b_qc"));
    assert_eq!(encoded[2]["b_qc"], json!(1));
}

#[test]
fn test_missing_time_does_not_affect_other_rows() {
    let with_bad_row = decode(&json!([
        {"_time": "2021-01-31T13:00:00Z", "v": 1},
        {"v": 2, "w": 3},
        {"_time": "2021-01-31T13:00:01Z", "v": 4}
    ]));
    let without_bad_row = decode(&json!([
        {"_time": "2021-01-31T13:00:00Z", "v": 1},
        {"_time": "2021-01-31T13:00:01Z", "v": 4}
    ]));

    assert_eq!(with_bad_row, without_bad_row);
    assert!(with_bad_row.series("w").is_none());
}

#[test]
fn test_value_types_survive_encoding() {
    let data = TimeSeriesData::new()
        .with_point("flag", 0, DataPoint::new(true))
        .with_point("label", 0, DataPoint::new("idle"))
        .with_point("ratio", 0, DataPoint::new(0.25))
        .with_point("count", 0, DataPoint::new(7i64))
        .with_point("missing", 0, DataPoint::null());

    let rows = encode(&data).unwrap();
    assert_eq!(
        rows_to_json(rows.clone()),
        json!([{
            "_time": "1970-01-01T00:00:00.000Z",
            "flag": true,
            "label": "idle",
            "ratio": 0.25,
            "count": 7,
            "missing": null
        }])
    );

    let back = decode(&rows_to_json(rows));
    assert_eq!(back.get("count", 0).unwrap().value, DataPointValue::Long(7));
    assert_eq!(back.get("missing", 0).unwrap().value, DataPointValue::Null);
}
