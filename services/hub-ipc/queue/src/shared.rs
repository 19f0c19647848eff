//! Mutex-guarded queue handle for multi-threaded link drivers.
//!
//! Every method takes the lock exactly once, so each queue operation is atomic and no
//! operation spans two lock acquisitions.

use crate::config::QueueConfig;
use crate::queue::{DeliveryQueue, QueueEntry, QueueFull, QueueStats, RequeueOutcome};
use ipc_message::Envelope;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Cloneable handle to one [`DeliveryQueue`]
#[derive(Debug, Clone)]
pub struct SharedDeliveryQueue {
    inner: Arc<Mutex<DeliveryQueue>>,
}

impl SharedDeliveryQueue {
    pub fn new(queue: DeliveryQueue) -> Self {
        Self {
            inner: Arc::new(Mutex::new(queue)),
        }
    }

    pub fn with_config(config: QueueConfig) -> Self {
        Self::new(DeliveryQueue::with_config(config))
    }

    fn lock(&self) -> MutexGuard<'_, DeliveryQueue> {
        self.inner.lock()
    }

    pub fn enqueue(&self, envelope: Envelope) -> Result<(), QueueFull> {
        self.lock().enqueue(envelope)
    }

    pub fn dequeue(&self) -> Option<Envelope> {
        self.lock().dequeue()
    }

    /// Clone of the oldest entry
    pub fn peek(&self) -> Option<QueueEntry> {
        self.lock().peek().cloned()
    }

    pub fn requeue(&self, correlation_id: &str) -> RequeueOutcome {
        self.lock().requeue(correlation_id)
    }

    pub fn acknowledge(&self, correlation_id: &str) -> Option<Envelope> {
        self.lock().acknowledge(correlation_id)
    }

    pub fn size(&self) -> usize {
        self.lock().size()
    }

    pub fn clear(&self) {
        self.lock().clear()
    }

    pub fn stats(&self) -> QueueStats {
        self.lock().stats()
    }
}
