//! Mock responder directory for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::gateway::{GatewayError, ResponderDirectory};
use crate::model::Responders;

/// Mock implementation of the ResponderDirectory trait.
///
/// Returns a configurable snapshot and counts calls, so tests can check that
/// every assignment attempt fetched responders fresh.
pub struct MockResponderDirectory {
    responders: Arc<RwLock<Responders>>,
    calls: Arc<RwLock<usize>>,
    fail: Arc<RwLock<bool>>,
}

impl std::fmt::Debug for MockResponderDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockResponderDirectory")
            .field("responders", &"<responders>")
            .field("calls", &"<calls>")
            .finish()
    }
}

impl Default for MockResponderDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockResponderDirectory {
    /// Create a directory returning the fixture responders.
    pub fn new() -> Self {
        Self {
            responders: Arc::new(RwLock::new(super::fixtures::responders())),
            calls: Arc::new(RwLock::new(0)),
            fail: Arc::new(RwLock::new(false)),
        }
    }

    /// Replace the snapshot returned by subsequent calls.
    pub async fn set_responders(&self, responders: Responders) {
        *self.responders.write().await = responders;
    }

    /// Make every subsequent call fail with a connection error.
    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// Number of `fetch_responders` calls so far.
    pub async fn call_count(&self) -> usize {
        *self.calls.read().await
    }
}

#[async_trait]
impl ResponderDirectory for MockResponderDirectory {
    fn name(&self) -> &str {
        "mock-responders"
    }

    async fn fetch_responders(&self) -> Result<Responders, GatewayError> {
        *self.calls.write().await += 1;

        if *self.fail.read().await {
            return Err(GatewayError::ConnectionFailed {
                service: "mock-responders",
                message: "simulated failure".to_string(),
            });
        }

        Ok(self.responders.read().await.clone())
    }
}
