//! Operation polling
//!
//! Long-running tool calls answer with an `operationId` instead of data. The
//! result is obtained by calling `checkOperationStatus` until the operation
//! reaches a terminal state:
//!
//! ```text
//! PENDING ──status "completed" / has results / has downloadUrl──> COMPLETED
//!    │ ├──status "failed"─────────────────────────────────────────> FAILED
//!    │ └──status "cancelled"──────────────────────────────────────> CANCELLED
//!    └──elapsed >= timeout────────────────────────────────────────> TIMED_OUT
//! ```
//!
//! The wait between checks is a fixed interval, without backoff or jitter.
//! The same [`Poller::step`] decision drives both the async driver
//! ([`Poller::wait_with`], which yields to the runtime while waiting) and the
//! blocking driver ([`Poller::wait_blocking`], which parks the calling thread).
//!
//! # Examples
//!
//! ```rust,no_run
//! use xpoz::polling::Poller;
//! use xpoz::transport::ToolTransport;
//! use std::time::Duration;
//!
//! # async fn example(transport: &dyn ToolTransport) -> Result<(), xpoz::Error> {
//! let poller = Poller::new(Duration::from_secs(600));
//! let result = poller.wait(transport, "op_8d1c").await?;
//! println!("{:?}", result.get("results"));
//! # Ok(())
//! # }
//! ```

use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use crate::config::{CHECK_OPERATION_STATUS, DEFAULT_TIMEOUT, POLL_INTERVAL};
use crate::transport::ToolTransport;
use crate::types::{Payload, token};
use crate::{Error, Result};

/// What to do after inspecting one status response
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    /// Terminal success; the payload is the operation's result
    Complete(Payload),
    /// Still pending and within the timeout; wait one interval and check again
    Wait,
}

/// Fixed-interval poller for pending operations
#[derive(Debug, Clone)]
pub struct Poller {
    /// Give up once this much time has elapsed since polling began
    pub timeout: Duration,

    /// Wait between two status checks
    pub interval: Duration,
}

impl Default for Poller {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: POLL_INTERVAL,
        }
    }
}

impl Poller {
    /// Create a poller with the given timeout and the service's fixed interval
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Set the wait between status checks
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Decide the next move from one status response.
    ///
    /// A payload counts as completed when its `status` is `"completed"` or when
    /// it already carries `results` or `downloadUrl` (the service does not
    /// always send a status on completion).
    ///
    /// # Errors
    ///
    /// - [`Error::OperationFailed`] for status `"failed"`, with the server's
    ///   `error` text (or `"Unknown error"`)
    /// - [`Error::OperationCancelled`] for status `"cancelled"`
    /// - [`Error::OperationTimeout`] when still pending and `elapsed >= timeout`
    pub fn step(&self, operation_id: &str, payload: Payload, elapsed: Duration) -> Result<PollStep> {
        let status = payload.get("status").and_then(Value::as_str);

        if status == Some("completed")
            || payload.contains_key("results")
            || payload.contains_key("downloadUrl")
        {
            return Ok(PollStep::Complete(payload));
        }

        match status {
            Some("failed") => {
                let error = match payload.get("error") {
                    None | Some(Value::Null) => "Unknown error".to_string(),
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                };
                Err(Error::OperationFailed {
                    operation_id: operation_id.to_string(),
                    error,
                })
            }
            Some("cancelled") => Err(Error::OperationCancelled {
                operation_id: operation_id.to_string(),
            }),
            _ if elapsed >= self.timeout => Err(Error::OperationTimeout {
                operation_id: operation_id.to_string(),
                elapsed_seconds: elapsed.as_secs_f64(),
            }),
            _ => Ok(PollStep::Wait),
        }
    }

    /// Poll through a transport until the operation is terminal.
    ///
    /// # Errors
    ///
    /// Any terminal failure from [`Poller::step`], or a transport error from a
    /// status call (propagated unchanged, no retry).
    pub async fn wait(&self, transport: &dyn ToolTransport, operation_id: &str) -> Result<Payload> {
        self.wait_with(
            |name, args| transport.call_tool(name, args),
            operation_id,
        )
        .await
    }

    /// Invoke `tool` and, if the server answered with an operation id instead
    /// of data, poll that operation to completion.
    ///
    /// # Errors
    ///
    /// The tool call's own error, or any error from [`Poller::wait`].
    pub async fn call_and_wait(
        &self,
        transport: &dyn ToolTransport,
        tool: &str,
        arguments: Payload,
    ) -> Result<Payload> {
        log::debug!("calling tool {}", tool);
        let payload = transport.call_tool(tool, arguments).await?;

        match pending_operation_id(&payload) {
            Some(operation_id) => {
                log::debug!("tool {} started operation {}", tool, operation_id);
                self.wait(transport, &operation_id).await
            }
            None => Ok(payload),
        }
    }

    /// Poll with an arbitrary async status-call capability.
    ///
    /// `call_status` receives the status tool name and its arguments
    /// (`{"operationId": ..}`). Waiting uses `tokio::time::sleep`, so a paused
    /// test clock observes the exact number of intervals.
    ///
    /// # Errors
    ///
    /// Same as [`Poller::wait`].
    pub async fn wait_with<F, Fut>(&self, mut call_status: F, operation_id: &str) -> Result<Payload>
    where
        F: FnMut(&'static str, Payload) -> Fut,
        Fut: Future<Output = Result<Payload>>,
    {
        let start = tokio::time::Instant::now();
        let mut checks: u32 = 0;

        loop {
            let payload = call_status(CHECK_OPERATION_STATUS, status_arguments(operation_id)).await?;
            checks += 1;

            match self.step(operation_id, payload, start.elapsed())? {
                PollStep::Complete(result) => {
                    log::debug!("operation {} completed after {} checks", operation_id, checks);
                    return Ok(result);
                }
                PollStep::Wait => {
                    log::debug!(
                        "operation {} pending, checking again in {:?}",
                        operation_id,
                        self.interval
                    );
                    tokio::time::sleep(self.interval).await;
                }
            }
        }
    }

    /// Blocking counterpart of [`Poller::wait_with`]; the calling thread sleeps
    /// between checks.
    ///
    /// # Errors
    ///
    /// Same as [`Poller::wait`].
    pub fn wait_blocking<F>(&self, mut call_status: F, operation_id: &str) -> Result<Payload>
    where
        F: FnMut(&'static str, Payload) -> Result<Payload>,
    {
        let start = std::time::Instant::now();

        loop {
            let payload = call_status(CHECK_OPERATION_STATUS, status_arguments(operation_id))?;

            match self.step(operation_id, payload, start.elapsed())? {
                PollStep::Complete(result) => return Ok(result),
                PollStep::Wait => {
                    log::debug!(
                        "operation {} pending, blocking for {:?}",
                        operation_id,
                        self.interval
                    );
                    std::thread::sleep(self.interval);
                }
            }
        }
    }
}

/// Poll `operation_id` through `transport` with the default interval
///
/// # Errors
///
/// See [`Poller::wait`].
pub async fn wait_for_result(
    transport: &dyn ToolTransport,
    operation_id: &str,
    timeout: Duration,
) -> Result<Payload> {
    Poller::new(timeout).wait(transport, operation_id).await
}

/// The operation id of a freshly started call, if it went asynchronous
///
/// Numeric ids are returned in their decimal string form.
pub fn pending_operation_id(payload: &Payload) -> Option<String> {
    payload.get("operationId").and_then(token)
}

fn status_arguments(operation_id: &str) -> Payload {
    let mut args = Payload::new();
    args.insert(
        "operationId".to_string(),
        Value::String(operation_id.to_string()),
    );
    args
}
