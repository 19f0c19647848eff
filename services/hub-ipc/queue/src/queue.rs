//! Bounded outbound delivery queue with retry accounting.
//!
//! The queue never blocks: a full queue rejects the envelope and hands it back, and an
//! empty queue dequeues `None`. In-flight tracking and retry timers belong to the link
//! driver, which reports missing acknowledgments through [`DeliveryQueue::requeue`].

use crate::config::{QueueConfig, RequeuePolicy, DEFAULT_CAPACITY};
use ipc_message::Envelope;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, warn};

/// Pending envelope with its retry count
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    envelope: Envelope,
    retries: u32,
}

impl QueueEntry {
    /// The queued envelope
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Requeue attempts made so far
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Take the envelope out of the entry
    pub fn into_envelope(self) -> Envelope {
        self.envelope
    }
}

/// Enqueue rejected because the queue is at capacity; returns the envelope to the caller
#[derive(Error, Debug)]
#[error("delivery queue full ({capacity} entries), rejected {}", .envelope.correlation_id())]
pub struct QueueFull {
    /// The rejected envelope
    pub envelope: Envelope,
    /// Capacity of the queue that rejected it
    pub capacity: usize,
}

impl QueueFull {
    /// Recover the rejected envelope
    pub fn into_envelope(self) -> Envelope {
        self.envelope
    }
}

/// Result of a requeue request
#[derive(Debug, Clone, PartialEq)]
pub enum RequeueOutcome {
    /// Entry stays queued for another attempt
    Retained {
        /// Retry count after this requeue
        retries: u32,
    },
    /// Retry ceiling reached; entry removed and returned. Reported once per entry.
    Dropped(QueueEntry),
    /// No entry with that correlation id
    NotFound,
}

impl RequeueOutcome {
    /// Whether the entry is still queued
    pub fn is_retained(&self) -> bool {
        matches!(self, RequeueOutcome::Retained { .. })
    }
}

/// Cumulative queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Entries currently queued
    pub pending: usize,
    /// Envelopes accepted by `enqueue`
    pub enqueued: u64,
    /// Envelopes rejected because the queue was full
    pub rejected: u64,
    /// Successful requeues
    pub retried: u64,
    /// Entries dropped at the retry ceiling
    pub dropped: u64,
    /// Entries removed by acknowledgment
    pub acknowledged: u64,
}

/// Bounded FIFO of outbound envelopes
#[derive(Debug)]
pub struct DeliveryQueue {
    config: QueueConfig,
    entries: VecDeque<QueueEntry>,
    stats: QueueStats,
}

impl DeliveryQueue {
    /// Create a queue with default capacity and retry ceiling
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    /// Create a queue from explicit configuration
    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            // Grows on demand; `enqueue` enforces the configured bound.
            entries: VecDeque::with_capacity(config.capacity.min(DEFAULT_CAPACITY)),
            config,
            stats: QueueStats::default(),
        }
    }

    /// Configuration the queue was built with
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Maximum number of pending entries
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Add an envelope at the tail.
    ///
    /// At capacity the queue is left untouched and the envelope comes back in the error;
    /// the caller decides whether to shed or defer it.
    pub fn enqueue(&mut self, envelope: Envelope) -> Result<(), QueueFull> {
        if self.entries.len() >= self.config.capacity {
            self.stats.rejected += 1;
            warn!(
                "Delivery queue full ({} entries), rejecting {} {}",
                self.config.capacity,
                envelope.kind(),
                envelope.correlation_id()
            );
            return Err(QueueFull {
                envelope,
                capacity: self.config.capacity,
            });
        }

        debug!("Queued {} {}", envelope.kind(), envelope.correlation_id());
        self.entries.push_back(QueueEntry {
            envelope,
            retries: 0,
        });
        self.stats.enqueued += 1;
        Ok(())
    }

    /// Remove and return the oldest envelope
    pub fn dequeue(&mut self) -> Option<Envelope> {
        self.entries.pop_front().map(QueueEntry::into_envelope)
    }

    /// Oldest entry without removing it
    pub fn peek(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    /// Record a missed acknowledgment for the entry with `correlation_id`.
    ///
    /// Once the retry count reaches the ceiling the entry is removed and returned in
    /// [`RequeueOutcome::Dropped`]; it cannot be requeued again.
    pub fn requeue(&mut self, correlation_id: &str) -> RequeueOutcome {
        let Some(index) = self.position(correlation_id) else {
            return RequeueOutcome::NotFound;
        };

        let entry = &mut self.entries[index];
        entry.retries += 1;
        let retries = entry.retries;

        if retries >= self.config.max_retries {
            self.stats.dropped += 1;
            warn!(
                "Dropping {} after {} retries (ceiling {})",
                correlation_id, retries, self.config.max_retries
            );
            return match self.entries.remove(index) {
                Some(entry) => RequeueOutcome::Dropped(entry),
                None => RequeueOutcome::NotFound,
            };
        }

        if self.config.requeue_policy == RequeuePolicy::MoveToFront && index > 0 {
            if let Some(entry) = self.entries.remove(index) {
                self.entries.push_front(entry);
            }
        }

        self.stats.retried += 1;
        debug!(
            "Requeued {} (attempt {}/{})",
            correlation_id, retries, self.config.max_retries
        );
        RequeueOutcome::Retained { retries }
    }

    /// Remove the entry with `correlation_id` after a successful delivery
    pub fn acknowledge(&mut self, correlation_id: &str) -> Option<Envelope> {
        let index = self.position(correlation_id)?;
        let entry = self.entries.remove(index)?;
        self.stats.acknowledged += 1;
        debug!("Acknowledged {}", correlation_id);
        Some(entry.into_envelope())
    }

    /// Retry count of a queued entry
    pub fn retries(&self, correlation_id: &str) -> Option<u32> {
        self.position(correlation_id)
            .map(|index| self.entries[index].retries)
    }

    /// Number of pending entries
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discard every queued entry (e.g. on link reconnect)
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            debug!("Clearing {} queued envelopes", self.entries.len());
        }
        self.entries.clear();
    }

    /// Snapshot of the counters, with `pending` set to the current size
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.entries.len(),
            ..self.stats
        }
    }

    fn position(&self, correlation_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.envelope.correlation_id() == correlation_id)
    }
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipc_message::{ConnectionStatusPayload, Payload};

    fn heartbeat(id: &str) -> Envelope {
        Envelope::with_correlation_id(Payload::Heartbeat, id)
    }

    fn ids(queue: &DeliveryQueue) -> Vec<String> {
        queue
            .entries
            .iter()
            .map(|e| e.envelope.correlation_id().to_string())
            .collect()
    }

    #[test]
    fn test_heartbeat_scenario() {
        let mut queue = DeliveryQueue::new();
        queue.enqueue(heartbeat("hb-1")).unwrap();
        assert_eq!(queue.size(), 1);

        let out = queue.dequeue().unwrap();
        assert_eq!(out.correlation_id(), "hb-1");
        assert_eq!(queue.size(), 0);
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = DeliveryQueue::new();
        queue.enqueue(heartbeat("a")).unwrap();
        queue.enqueue(heartbeat("b")).unwrap();
        assert_eq!(queue.dequeue().unwrap().correlation_id(), "a");
        assert_eq!(queue.dequeue().unwrap().correlation_id(), "b");
    }

    #[test]
    fn test_capacity_backpressure() {
        let mut queue = DeliveryQueue::with_config(QueueConfig {
            capacity: 2,
            ..QueueConfig::default()
        });
        queue.enqueue(heartbeat("1")).unwrap();
        queue.enqueue(heartbeat("2")).unwrap();

        let rejected = queue.enqueue(heartbeat("3")).unwrap_err();
        assert_eq!(rejected.capacity, 2);
        assert_eq!(rejected.into_envelope().correlation_id(), "3");
        assert_eq!(queue.size(), 2);
        assert_eq!(ids(&queue), ["1", "2"]);
        assert_eq!(queue.stats().rejected, 1);
    }

    #[test]
    fn test_default_capacity_is_100() {
        let mut queue = DeliveryQueue::new();
        for i in 0..100 {
            queue.enqueue(heartbeat(&format!("hb-{}", i))).unwrap();
        }
        assert!(queue.enqueue(heartbeat("hb-100")).is_err());
        assert_eq!(queue.size(), 100);
    }

    #[test]
    fn test_huge_capacity_is_not_preallocated() {
        let mut queue = DeliveryQueue::with_config(QueueConfig {
            capacity: usize::MAX,
            ..QueueConfig::default()
        });
        assert_eq!(queue.capacity(), usize::MAX);
        for i in 0..150 {
            queue.enqueue(heartbeat(&format!("hb-{}", i))).unwrap();
        }
        assert_eq!(queue.size(), 150);
    }

    #[test]
    fn test_retry_ceiling_drops_once() {
        let mut queue = DeliveryQueue::new();
        queue.enqueue(heartbeat("x")).unwrap();

        assert_eq!(queue.requeue("x"), RequeueOutcome::Retained { retries: 1 });
        assert_eq!(queue.requeue("x"), RequeueOutcome::Retained { retries: 2 });
        assert_eq!(queue.retries("x"), Some(2));

        match queue.requeue("x") {
            RequeueOutcome::Dropped(entry) => {
                assert_eq!(entry.retries(), 3);
                assert_eq!(entry.envelope().correlation_id(), "x");
            }
            other => panic!("expected drop, got {:?}", other),
        }
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.requeue("x"), RequeueOutcome::NotFound);
        assert_eq!(queue.stats().dropped, 1);
    }

    #[test]
    fn test_requeue_unknown_id_is_noop() {
        let mut queue = DeliveryQueue::new();
        queue.enqueue(heartbeat("present")).unwrap();
        let outcome = queue.requeue("absent");
        assert_eq!(outcome, RequeueOutcome::NotFound);
        assert!(!outcome.is_retained());
        assert_eq!(queue.retries("present"), Some(0));
    }

    #[test]
    fn test_requeue_keeps_position_by_default() {
        let mut queue = DeliveryQueue::new();
        for id in ["a", "b", "c"] {
            queue.enqueue(heartbeat(id)).unwrap();
        }
        assert!(queue.requeue("c").is_retained());
        assert_eq!(ids(&queue), ["a", "b", "c"]);
    }

    #[test]
    fn test_requeue_move_to_front_policy() {
        let mut queue = DeliveryQueue::with_config(QueueConfig {
            requeue_policy: RequeuePolicy::MoveToFront,
            ..QueueConfig::default()
        });
        for id in ["a", "b", "c"] {
            queue.enqueue(heartbeat(id)).unwrap();
        }
        assert!(queue.requeue("c").is_retained());
        assert_eq!(ids(&queue), ["c", "a", "b"]);
        assert_eq!(queue.peek().unwrap().retries(), 1);
    }

    #[test]
    fn test_peek_then_acknowledge() {
        let mut queue = DeliveryQueue::new();
        let status = Envelope::with_correlation_id(
            ConnectionStatusPayload {
                connected: true,
                reason: None,
                last_sync: None,
                queued_messages: Some(0),
            },
            "cs-1",
        );
        queue.enqueue(status.clone()).unwrap();
        queue.enqueue(heartbeat("hb-2")).unwrap();

        assert_eq!(queue.peek().unwrap().envelope(), &status);
        assert_eq!(queue.size(), 2);
        assert_eq!(queue.acknowledge("cs-1"), Some(status));
        assert_eq!(queue.acknowledge("cs-1"), None);
        assert_eq!(queue.size(), 1);
        assert_eq!(queue.stats().acknowledged, 1);
    }

    #[test]
    fn test_clear() {
        let mut queue = DeliveryQueue::new();
        queue.enqueue(heartbeat("a")).unwrap();
        queue.enqueue(heartbeat("b")).unwrap();
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.dequeue().is_none());
        assert_eq!(queue.stats().enqueued, 2);
    }
}
