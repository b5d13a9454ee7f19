//! HTTP POST transport for the data collector.

use std::thread;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use reqwest::blocking::Client;
use reqwest::Url;
use tracing::{debug, warn};

use crate::{Transport, TransportError};

pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
/// The body is a positional JSON array, not named form parameters
pub const POSITIONAL_PARAMS_HEADER: &str = "ssf-use-positional-post-params";
/// The body is raw JSON, not URL-encoded
pub const RAW_CONTENTS_HEADER: &str = "ssf-contents-not-url-encoded";

/// Posts payloads with a blocking reqwest client.
///
/// Each request runs on its own short-lived thread and the caller waits on a
/// channel with the deadline. A request that misses the deadline is left to
/// finish in the background and its outcome is dropped.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Generic(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        destination: &str,
        timeout: Duration,
        body: &str,
    ) -> Result<String, TransportError> {
        let url = Url::parse(destination)
            .map_err(|e| TransportError::InvalidArgs(format!("{destination}: {e}")))?;
        if timeout.is_zero() {
            return Err(TransportError::InvalidArgs("timeout must be non-zero".into()));
        }
        let timeout_ms = timeout.as_millis() as u64;

        let (tx, rx) = crossbeam_channel::bounded(1);
        let request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .header(POSITIONAL_PARAMS_HEADER, "true")
            .header(RAW_CONTENTS_HEADER, "true")
            // Bounds the background thread once the caller has stopped waiting
            .timeout(timeout)
            .body(body.to_string());

        thread::Builder::new()
            .name("eventdepot-http".to_string())
            .spawn(move || {
                let outcome = execute(request, timeout_ms);
                // The receiver is gone when the caller already timed out
                let _ = tx.send(outcome);
            })
            .map_err(|e| TransportError::Generic(format!("failed to spawn request thread: {e}")))?;

        match rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                warn!(destination, timeout_ms, "Collector request timed out");
                Err(TransportError::TimedOut(timeout_ms))
            }
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Generic(
                "request thread exited without a result".into(),
            )),
        }
    }
}

fn execute(
    request: reqwest::blocking::RequestBuilder,
    timeout_ms: u64,
) -> Result<String, TransportError> {
    let response = request.send().map_err(|e| classify(e, timeout_ms))?;
    let status = response.status();
    if !status.is_success() {
        warn!(status = %status, "Collector returned non-success status");
        return Err(TransportError::Status(status.as_u16()));
    }

    let body = response.text().map_err(|e| classify(e, timeout_ms))?;
    debug!(status = %status, bytes = body.len(), "Collector response received");
    Ok(body)
}

fn classify(error: reqwest::Error, timeout_ms: u64) -> TransportError {
    if error.is_timeout() {
        TransportError::TimedOut(timeout_ms)
    } else if error.is_builder() {
        TransportError::InvalidArgs(error.to_string())
    } else {
        TransportError::Generic(error.to_string())
    }
}
