// eventdepot-transport - Deadline-bounded delivery of bin payloads
//
// One request at a time, blocking the calling thread until a response
// arrives, the request fails, or the deadline passes.

mod error;
mod http;

pub use error::TransportError;
pub use http::{HttpTransport, CONTENT_TYPE, POSITIONAL_PARAMS_HEADER, RAW_CONTENTS_HEADER};

use std::time::Duration;

/// Delivers an encoded payload to a collector destination.
///
/// `Ok` carries the response body and means the collector received the
/// payload; whatever the body says does not change that. Every `Err` is a
/// transport-level failure and the payload must be kept for retry.
pub trait Transport: Send + Sync {
    fn send(&self, destination: &str, timeout: Duration, body: &str)
        -> Result<String, TransportError>;
}
