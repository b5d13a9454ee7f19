//! Collector request body encoding.

use chrono::Utc;
use serde_json::Value;

use crate::Event;

/// Seconds since the Unix epoch, with millisecond precision.
pub fn send_timestamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Encode the positional request body `[send_timestamp_seconds, events]`.
pub fn encode_payload(timestamp: f64, events: &[Event]) -> serde_json::Result<String> {
    let events = serde_json::to_value(events)?;
    serde_json::to_string(&Value::Array(vec![Value::from(timestamp), events]))
}
