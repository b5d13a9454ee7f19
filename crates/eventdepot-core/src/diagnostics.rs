//! Collector response inspection.
//!
//! Purely observational: a received response always counts as delivered,
//! whatever it says. These helpers only classify and log it.

use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::ErrorCode;

/// Context object inside `data` carrying the per-batch result.
pub const BATCH_CONTEXT: &str = "datacollector_batch";

/// Classification of a collector response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseVerdict {
    /// Top-level and batch-context codes are both `Success`
    Accepted,
    /// Top-level `error` was not `Success`
    TopLevelError(ErrorCode),
    /// `data.datacollector_batch.error` was not `Success`
    BatchError(ErrorCode),
    /// A field required to reach a verdict is absent
    MissingField(&'static str),
    /// The body is not a JSON object or a code is not an integer
    Unparsable,
}

/// Classify a response body without side effects.
pub fn inspect_response(body: &str) -> ResponseVerdict {
    let Ok(Value::Object(response)) = serde_json::from_str::<Value>(body) else {
        return ResponseVerdict::Unparsable;
    };

    let top = match read_code(&response) {
        Some(Ok(code)) => code,
        Some(Err(())) => return ResponseVerdict::Unparsable,
        None => return ResponseVerdict::MissingField("error"),
    };
    if !top.is_success() {
        return ResponseVerdict::TopLevelError(top);
    }

    let Some(data) = response.get("data") else {
        return ResponseVerdict::MissingField("data");
    };
    let Some(Value::Object(context)) = data.get(BATCH_CONTEXT) else {
        return ResponseVerdict::MissingField(BATCH_CONTEXT);
    };

    match read_code(context) {
        Some(Ok(code)) if code.is_success() => ResponseVerdict::Accepted,
        Some(Ok(code)) => ResponseVerdict::BatchError(code),
        Some(Err(())) => ResponseVerdict::Unparsable,
        None => ResponseVerdict::MissingField("datacollector_batch.error"),
    }
}

/// Inspect a response body and log anything other than a clean acceptance.
pub fn log_response(body: &str) -> ResponseVerdict {
    let verdict = inspect_response(body);
    match &verdict {
        ResponseVerdict::Accepted => debug!("Data collector accepted batch"),
        ResponseVerdict::TopLevelError(code) => {
            error!(code = %code, "Top-level error returned from data collector")
        }
        ResponseVerdict::BatchError(code) => {
            error!(code = %code, "datacollector_batch error returned from data collector")
        }
        ResponseVerdict::MissingField(field) => {
            error!(field, "Unexpected response returned from data collector")
        }
        ResponseVerdict::Unparsable => {
            error!(response = body, "Failed to parse data collector response")
        }
    }
    verdict
}

fn read_code(object: &Map<String, Value>) -> Option<Result<ErrorCode, ()>> {
    object
        .get("error")
        .map(|value| value.as_i64().map(ErrorCode::from_i64).ok_or(()))
}
