//! Core types for the Xpoz SDK

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::config;

/// A decoded response: an ordered mapping from key to scalar, nested mapping or list
pub type Payload = Map<String, Value>;

/// Options for configuring an Xpoz client
#[derive(Clone)]
pub struct ClientOptions {
    /// API key sent as a bearer token
    pub api_key: String,

    /// MCP endpoint URL
    pub server_url: String,

    /// How long pending operations are polled before giving up
    pub timeout: Duration,

    /// Wait between two status checks
    pub poll_interval: Duration,
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("api_key", &"***")
            .field("server_url", &self.server_url)
            .field("timeout", &self.timeout)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl ClientOptions {
    /// Create a new builder for ClientOptions
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }

    /// Options resolved purely from the environment
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Authentication`] when `XPOZ_API_KEY` is not set.
    pub fn from_env() -> crate::Result<Self> {
        Self::builder().build()
    }
}

/// Builder for ClientOptions
#[derive(Default)]
pub struct ClientOptionsBuilder {
    api_key: Option<String>,
    server_url: Option<String>,
    timeout: Option<Duration>,
    poll_interval: Option<Duration>,
}

impl std::fmt::Debug for ClientOptionsBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptionsBuilder")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("server_url", &self.server_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientOptionsBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the wait between status checks. The service expects the default.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Resolve every option, falling back to the environment and then to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Authentication`] when no API key is given and
    /// `XPOZ_API_KEY` is unset. No network activity happens here.
    pub fn build(self) -> crate::Result<ClientOptions> {
        let api_key = config::resolve_api_key(self.api_key.as_deref())?;
        let server_url = config::resolve_server_url(self.server_url.as_deref());

        Ok(ClientOptions {
            api_key,
            server_url,
            timeout: self.timeout.unwrap_or(config::DEFAULT_TIMEOUT),
            poll_interval: self.poll_interval.unwrap_or(config::POLL_INTERVAL),
        })
    }
}

/// Pagination metadata attached to a paged response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationInfo {
    /// Server-side correlation token tying repeated page fetches together
    pub table_name: Option<String>,
    pub total_rows: i64,
    pub total_pages: i64,
    /// 1-based
    pub page_number: i64,
    pub page_size: i64,
    pub results_count: i64,
}

impl Default for PaginationInfo {
    fn default() -> Self {
        Self {
            table_name: None,
            total_rows: 0,
            total_pages: 0,
            page_number: 1,
            page_size: 100,
            results_count: 0,
        }
    }
}

impl PaginationInfo {
    /// Read the `pagination` block of a decoded response, defaulting missing keys
    pub fn from_payload(raw: &Payload) -> Self {
        let defaults = Self::default();
        let Some(pag) = raw.get("pagination").and_then(Value::as_object) else {
            return defaults;
        };

        let int = |key: &str, fallback: i64| pag.get(key).and_then(as_i64).unwrap_or(fallback);

        Self {
            table_name: pag.get("tableName").and_then(token),
            total_rows: int("totalRows", defaults.total_rows),
            total_pages: int("totalPages", defaults.total_pages),
            page_number: int("pageNumber", defaults.page_number),
            page_size: int("pageSize", defaults.page_size),
            results_count: int("resultsCount", defaults.results_count),
        }
    }
}

/// A server-issued identifier (operation id, table token) as a string.
///
/// The decoder turns all-digit values into numbers, so both forms count.
/// Empty strings and every other JSON type yield `None`.
pub(crate) fn token(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Numbers above 2^53 arrive as strings from the text format
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
