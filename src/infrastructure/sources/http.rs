//! # HTTP Source
//!
//! Reading source backed by a JSON HTTP endpoint.
//!
//! The endpoint is queried with `GET <base_url>?location=<location>` and must
//! answer with a body of the form `{"temperature": 21}`. A `null` or missing
//! temperature is an absent reading.
//!
//! # Examples
//!
//! ```ignore
//! use weather_aggregator::infrastructure::sources::http::HttpSource;
//!
//! let source = HttpSource::new("met-office", "https://api.example.com/reading", 2000)?;
//! let reading = source.fetch(&"London".into()).await?;
//! ```

use crate::domain::value_objects::{Location, Reading, SourceName};
use crate::infrastructure::sources::error::{SourceError, SourceResult};
use crate::infrastructure::sources::traits::WeatherSource;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Payload returned by a reading endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
struct ReadingPayload {
    #[serde(default)]
    temperature: Option<i32>,
}

/// Source that fetches its reading over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    name: SourceName,
    base_url: String,
    client: Client,
    timeout_ms: u64,
}

impl HttpSource {
    /// Creates a new HTTP source with the specified request timeout.
    ///
    /// # Arguments
    ///
    /// * `name` - Source name used in reports and logs
    /// * `base_url` - Base URL of the weather endpoint
    /// * `timeout_ms` - Per-request timeout in milliseconds
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Internal` if the client cannot be created.
    pub fn new(
        name: impl Into<SourceName>,
        base_url: impl Into<String>,
        timeout_ms: u64,
    ) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| SourceError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into(),
            client,
            timeout_ms,
        })
    }

    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the configured timeout in milliseconds.
    #[inline]
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    async fn handle_response(&self, response: Response) -> SourceResult<Option<Reading>> {
        let status = response.status();

        if status.is_success() {
            let payload = response.json::<ReadingPayload>().await.map_err(|e| {
                SourceError::protocol(format!("Failed to parse response: {}", e))
            })?;
            Ok(payload.temperature.map(Reading::new))
        } else {
            let error_body = response.text().await.unwrap_or_default();
            Err(self.map_status_error(status, &error_body))
        }
    }

    fn map_reqwest_error(&self, error: reqwest::Error) -> SourceError {
        if error.is_timeout() {
            SourceError::timeout_with_duration(
                format!("{} timed out", self.name),
                self.timeout_ms,
            )
        } else if error.is_connect() {
            SourceError::connection(format!("Connection failed: {}", error))
        } else {
            SourceError::connection(format!("HTTP request failed: {}", error))
        }
    }

    fn map_status_error(&self, status: StatusCode, body: &str) -> SourceError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => SourceError::rate_limited("Rate limit exceeded"),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                SourceError::timeout(format!("Server timeout ({}): {}", status, body))
            }
            StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE => {
                SourceError::unavailable(format!("Server error ({}): {}", status, body))
            }
            _ => SourceError::protocol(format!("HTTP error ({}): {}", status, body)),
        }
    }
}

#[async_trait]
impl WeatherSource for HttpSource {
    fn name(&self) -> &SourceName {
        &self.name
    }

    async fn fetch_reading(&self, location: &Location) -> SourceResult<Option<Reading>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("location", location.as_str())])
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        self.handle_response(response).await
    }
}
