//! Configuration helpers for the Xpoz SDK

use std::env;
use std::time::Duration;

use crate::{Error, Result};

/// Hosted MCP endpoint used when nothing else is configured
pub const DEFAULT_SERVER_URL: &str = "https://mcp.xpoz.ai/mcp";

/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "XPOZ_API_KEY";

/// Environment variable overriding the server URL
pub const ENV_SERVER_URL: &str = "XPOZ_SERVER_URL";

/// How long a pending operation is polled before giving up
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Fixed wait between two status checks of a pending operation
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Remote tool used to check the status of a pending operation
pub const CHECK_OPERATION_STATUS: &str = "checkOperationStatus";

/// Where to obtain a token, shown when no key can be resolved
const GET_TOKEN_URL: &str = "http://xpoz.ai/get-token?utm_source=rust_sdk&utm_medium=sdk";

/// Resolve the API key
///
/// Priority:
/// 1. explicit value (if non-empty)
/// 2. XPOZ_API_KEY environment variable (if non-empty)
///
/// # Errors
///
/// Returns [`Error::Authentication`] when neither source yields a key.
///
/// # Examples
///
/// ```rust,no_run
/// use xpoz::config::resolve_api_key;
///
/// let key = resolve_api_key(Some("my-key"))?;
/// assert_eq!(key, "my-key");
/// # Ok::<(), xpoz::Error>(())
/// ```
pub fn resolve_api_key(explicit: Option<&str>) -> Result<String> {
    if let Some(key) = explicit.filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }

    match env::var(ENV_API_KEY) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(Error::authentication(format!(
            "API key required. Get your token at {} (login → copy token), then pass it to \
             ClientOptions::builder().api_key(..) or set the {} environment variable.",
            GET_TOKEN_URL, ENV_API_KEY
        ))),
    }
}

/// Resolve the MCP server URL
///
/// Priority:
/// 1. explicit value
/// 2. XPOZ_SERVER_URL environment variable
/// 3. [`DEFAULT_SERVER_URL`]
pub fn resolve_server_url(explicit: Option<&str>) -> String {
    if let Some(url) = explicit.filter(|u| !u.is_empty()) {
        return url.to_string();
    }

    match env::var(ENV_SERVER_URL) {
        Ok(url) if !url.is_empty() => url,
        _ => DEFAULT_SERVER_URL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_api_key_wins() {
        let key = resolve_api_key(Some("explicit")).unwrap();
        assert_eq!(key, "explicit");
    }

    #[test]
    fn test_explicit_server_url_wins() {
        let url = resolve_server_url(Some("http://localhost:9000/mcp"));
        assert_eq!(url, "http://localhost:9000/mcp");
    }

    #[test]
    fn test_poll_constants() {
        assert_eq!(POLL_INTERVAL, Duration::from_secs(5));
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(300));
        assert_eq!(CHECK_OPERATION_STATUS, "checkOperationStatus");
    }
}
