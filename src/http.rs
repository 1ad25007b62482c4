//! The `http` module provides `HttpTransport`, which fetches repository files
//! over HTTP(S) using `reqwest`'s blocking client.

use crate::{Transport, TransportError, TransportErrorKind};
use log::trace;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::io::Read;
use std::time::Duration;
use url::Url;

/// Settings for the HTTP client.
#[derive(Clone, Copy, Debug)]
pub struct ClientSettings {
    /// Timeout for the complete fetch operation.
    pub timeout: Duration,
    /// Timeout for only the connect phase.
    pub connect_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// A [`Transport`] over HTTP(S). Every request carries explicit connect and
/// read timeouts, so a stalled server surfaces as a fetch error rather than
/// hanging. Requests are not retried; retry policy belongs to the caller.
///
/// This transport returns `FileNotFound` for the following HTTP response
/// codes:
/// - 403: Forbidden. (Some services return this code when a file does not
///   exist.)
/// - 404: Not Found.
/// - 410: Gone.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpTransport {
    settings: ClientSettings,
}

impl HttpTransport {
    /// Creates a new `HttpTransport` with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `HttpTransport` with the given `ClientSettings`.
    pub fn from_settings(settings: ClientSettings) -> Self {
        Self { settings }
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: Url) -> Result<Box<dyn Read + Send>, TransportError> {
        let client = Client::builder()
            .timeout(self.settings.timeout)
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|e| TransportError::new(TransportErrorKind::Other, &url, e))?;

        trace!("GET {}", url);
        let response = client
            .get(url.as_str())
            .send()
            .map_err(|e| TransportError::new(TransportErrorKind::Other, &url, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(Box::new(response))
        } else {
            let kind = match status {
                StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::GONE => {
                    TransportErrorKind::FileNotFound
                }
                _ => TransportErrorKind::Other,
            };
            Err(TransportError::new(
                kind,
                &url,
                format!("HTTP status {}", status),
            ))
        }
    }
}
