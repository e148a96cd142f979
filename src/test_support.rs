//! In-process transport double shared by the unit tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::transport::ToolTransport;
use crate::types::Payload;
use crate::{Error, Result};

/// Replies with queued payloads in order and records every call
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Result<Payload>>>>,
    calls: Arc<Mutex<Vec<(String, Payload)>>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, value: Value) -> Self {
        let payload = value.as_object().cloned().unwrap_or_default();
        self.replies.lock().unwrap().push_back(Ok(payload));
        self
    }

    pub(crate) fn fail(self, error: Error) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, Payload)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolTransport for ScriptedTransport {
    async fn call_tool(&self, name: &str, arguments: Payload) -> Result<Payload> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::protocol(format!("no scripted reply for {}", name))))
    }
}
