//! Per-line result records.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::MetricKind;

/// One processed frame as streamed by the backend.
///
/// Only the metric field of the active mode is read; the others stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    /// Base64 JPEG of the annotated frame
    pub frame: String,
    /// Crossing count per drawn line, in line order
    pub counts: Option<Vec<u64>>,
    pub wrong_way_count: Option<u64>,
    /// Keyed by tracker id
    pub vehicle_data: Option<BTreeMap<String, VehicleStats>>,
}

impl FrameRecord {
    /// Build a record from a parsed line, reading only `kind`'s field.
    pub fn from_value(value: &Value, kind: MetricKind) -> Result<Self, String> {
        let Some(Value::String(frame)) = value.get("frame") else {
            return Err("missing `frame` string".to_string());
        };
        let mut record = FrameRecord {
            frame: frame.clone(),
            counts: None,
            wrong_way_count: None,
            vehicle_data: None,
        };
        match kind {
            MetricKind::Counts => record.counts = metric_field(value, "counts")?,
            MetricKind::WrongWay => {
                record.wrong_way_count = metric_field(value, "wrong_way_count")?
            }
            MetricKind::Speed => record.vehicle_data = metric_field(value, "vehicle_data")?,
            MetricKind::FrameOnly => {}
        }
        Ok(record)
    }
}

fn metric_field<T: DeserializeOwned>(value: &Value, key: &str) -> Result<Option<T>, String> {
    match value.get(key) {
        Some(field) => Option::<T>::deserialize(field).map_err(|e| format!("`{key}`: {e}")),
        None => Ok(None),
    }
}

/// Speed data for one tracked vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleStats {
    /// Average speed in km/h
    #[serde(default)]
    pub avg_speed: Option<f64>,
    /// Any other per-vehicle fields the backend sends
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// What a single stream line turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Whitespace only
    Blank,
    /// A result record to display
    Record(Box<FrameRecord>),
    /// Valid JSON carrying an `error` field; ends the stream
    Failure(String),
    /// Not JSON, or JSON that is not a frame record; skipped
    Malformed(String),
}

/// Classify one line (terminator already stripped) for a mode's metric kind.
pub fn classify_line(line: &[u8], kind: MetricKind) -> LineOutcome {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => return LineOutcome::Malformed(format!("invalid UTF-8: {e}")),
    };
    if text.is_empty() {
        return LineOutcome::Blank;
    }

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return LineOutcome::Malformed(e.to_string()),
    };

    if let Some(error) = value.get("error").filter(|e| is_truthy(e)) {
        let message = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return LineOutcome::Failure(message);
    }

    match FrameRecord::from_value(&value, kind) {
        Ok(record) => LineOutcome::Record(Box::new(record)),
        Err(reason) => LineOutcome::Malformed(reason),
    }
}

/// Whether an `error` value counts as set. `null`, `false`, `0` and the
/// empty string do not.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counts_record() {
        let outcome = classify_line(br#"{"frame":"AA","counts":[1,2]}"#, MetricKind::Counts);
        let LineOutcome::Record(record) = outcome else {
            panic!("Expected record, got {outcome:?}");
        };
        assert_eq!(record.frame, "AA");
        assert_eq!(record.counts, Some(vec![1, 2]));
        assert_eq!(record.wrong_way_count, None);
    }

    #[test]
    fn test_vehicle_data_keeps_extra_fields() {
        let line = br#"{"frame":"AA","vehicle_data":{"7":{"avg_speed":42.5,"lane":2},"9":{}}}"#;
        let LineOutcome::Record(record) = classify_line(line, MetricKind::Speed) else {
            panic!("Expected record");
        };
        let vehicles = record.vehicle_data.unwrap();
        assert_eq!(vehicles["7"].avg_speed, Some(42.5));
        assert_eq!(vehicles["7"].extra.get("lane"), Some(&json!(2)));
        assert_eq!(vehicles["9"].avg_speed, None);
    }

    #[test]
    fn test_error_record() {
        assert_eq!(
            classify_line(br#"{"error":"boom"}"#, MetricKind::Counts),
            LineOutcome::Failure("boom".to_string())
        );
        assert_eq!(
            classify_line(br#"{"error":{"code":3}}"#, MetricKind::Counts),
            LineOutcome::Failure(r#"{"code":3}"#.to_string())
        );
    }

    #[test]
    fn test_falsy_error_is_ignored() {
        let outcome = classify_line(
            br#"{"frame":"AA","error":null,"wrong_way_count":4}"#,
            MetricKind::WrongWay,
        );
        let LineOutcome::Record(record) = outcome else {
            panic!("Expected record, got {outcome:?}");
        };
        assert_eq!(record.wrong_way_count, Some(4));
        let outcome = classify_line(br#"{"frame":"AA","error":""}"#, MetricKind::Counts);
        assert!(matches!(outcome, LineOutcome::Record(_)));
    }

    #[test]
    fn test_malformed_lines() {
        assert!(matches!(classify_line(b"not json", MetricKind::Counts), LineOutcome::Malformed(_)));
        assert!(matches!(classify_line(b"{\"frame\":", MetricKind::Counts), LineOutcome::Malformed(_)));
        // Valid JSON without a frame is not a record
        assert!(matches!(
            classify_line(br#"{"counts":[1]}"#, MetricKind::Counts),
            LineOutcome::Malformed(_)
        ));
        assert!(matches!(classify_line(&[0xff, 0xfe], MetricKind::Counts), LineOutcome::Malformed(_)));
    }

    #[test]
    fn test_only_active_metric_is_read() {
        let line = br#"{"frame":"AA","counts":[2],"wrong_way_count":-1,"vehicle_data":1.5}"#;
        let LineOutcome::Record(record) = classify_line(line, MetricKind::Counts) else {
            panic!("Expected record");
        };
        assert_eq!(record.counts, Some(vec![2]));
        assert_eq!(record.wrong_way_count, None);
        assert_eq!(record.vehicle_data, None);

        let line = br#"{"frame":"AA","counts":"n/a"}"#;
        assert!(matches!(classify_line(line, MetricKind::Speed), LineOutcome::Record(_)));
        assert!(matches!(classify_line(line, MetricKind::FrameOnly), LineOutcome::Record(_)));

        // A bad value in the mode's own field still makes the line unusable
        assert!(matches!(
            classify_line(line, MetricKind::Counts),
            LineOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_blank_and_crlf_lines() {
        assert_eq!(classify_line(b"   \r", MetricKind::Counts), LineOutcome::Blank);
        assert!(matches!(
            classify_line(b"{\"frame\":\"AA\"}\r", MetricKind::Counts),
            LineOutcome::Record(_)
        ));
    }
}
