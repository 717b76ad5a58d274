//! Admission control: a bounded number of in-flight requests with a bounded wait.
//!
//! Each controller owns `capacity` slots. A caller that finds no free slot
//! waits up to `wait`; if none frees up in time the request is rejected and
//! the protected handler is never invoked. Slots are released by dropping the
//! [`AdmissionPermit`], which also happens when the handler errors or panics.
//!
//! There is no fairness guarantee beyond what the underlying semaphore
//! offers. Under sustained overload some callers may be rejected repeatedly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

/// Capacity and wait bound of an [`AdmissionController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Maximum number of requests admitted at once.
    pub capacity: usize,
    /// How long a request may wait for a free slot.
    pub wait: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            wait: Duration::from_secs(1),
        }
    }
}

/// The request found no free slot within the wait bound.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Server is busy: no free slot within {waited:?}")]
pub struct AdmissionRejected {
    /// How long the request waited before being rejected.
    pub waited: Duration,
}

/// Gate in front of a handler.
///
/// Cloning is cheap and clones share the same slots.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    slots: Arc<Semaphore>,
    config: AdmissionConfig,
}

/// Proof of admission. The slot is released when this is dropped.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionController {
    /// Creates a controller with `config.capacity` free slots.
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(config.capacity)),
            config,
        }
    }

    /// Returns the controller's configuration.
    pub fn config(&self) -> AdmissionConfig {
        self.config
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Waits up to the configured bound for a free slot.
    pub async fn admit(&self) -> Result<AdmissionPermit, AdmissionRejected> {
        let rejected = AdmissionRejected {
            waited: self.config.wait,
        };
        match tokio::time::timeout(self.config.wait, self.slots.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(AdmissionPermit { _permit: permit }),
            // The semaphore is never closed; treat closure like exhaustion.
            Ok(Err(_)) | Err(_) => {
                warn!(capacity = self.config.capacity, "No free slots");
                Err(rejected)
            }
        }
    }

    /// Runs `work` inside a slot, or rejects it without polling it.
    pub async fn run<F, T>(&self, work: F) -> Result<T, AdmissionRejected>
    where
        F: Future<Output = T>,
    {
        let _permit = self.admit().await?;
        Ok(work.await)
    }
}
