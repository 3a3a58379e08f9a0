//! In-process audit event channel.
//!
//! A topic broker with consumer groups and hash partitioning, keyed by
//! event id: both lifecycle events of one logical operation land in the
//! same partition and keep their relative order, while events with
//! different ids carry no ordering guarantee. Queues are bounded; a full
//! or closed queue fails the publish and the event is dropped rather than
//! blocking the business path. Delivery is at-least-once from the
//! consumer's point of view and lossy at the publishing edge.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::task::Poll;

use stockpile_core::AuditEvent;
use tokio::sync::mpsc;

/// Topic carrying every ATTEMPTED/SUCCEEDED event.
pub const AUDIT_TOPIC: &str = "product.audit.events";
/// Failure-emphasis topic carrying FAILED events only.
pub const FAILED_TOPIC: &str = "product.audit.failed";

pub const DEFAULT_PARTITIONS: usize = 4;
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("subscriber group {group:?} on topic {topic:?} is gone")]
    Closed { topic: String, group: String },
    #[error("subscriber group {group:?} on topic {topic:?} is lagging, event dropped")]
    Lagged { topic: String, group: String },
}

#[derive(Clone)]
pub struct AuditBus {
    inner: Arc<Inner>,
}

struct Inner {
    partitions: usize,
    capacity: usize,
    topics: Mutex<HashMap<String, Topic>>,
}

#[derive(Default)]
struct Topic {
    groups: HashMap<String, Vec<mpsc::Sender<AuditEvent>>>,
}

impl AuditBus {
    pub fn new(partitions: usize, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                partitions: partitions.max(1),
                capacity: capacity.max(1),
                topics: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register `group` on `topic` and hand back its partition queues.
    /// Every group receives every event published afterwards; subscribing
    /// again under the same name replaces the group's queues.
    pub fn subscribe(&self, topic: &str, group: &str) -> Subscription {
        let mut senders = Vec::with_capacity(self.inner.partitions);
        let mut receivers = Vec::with_capacity(self.inner.partitions);
        for _ in 0..self.inner.partitions {
            let (tx, rx) = mpsc::channel(self.inner.capacity);
            senders.push(tx);
            receivers.push(rx);
        }

        let mut topics = self.inner.topics.lock().unwrap_or_else(|e| e.into_inner());
        topics
            .entry(topic.to_string())
            .or_default()
            .groups
            .insert(group.to_string(), senders);

        Subscription { receivers, next: 0 }
    }

    /// Enqueue `event` for every group subscribed to `topic`. The partition
    /// is chosen from `key`, so one key always maps to one queue per group.
    ///
    /// Publishing to a topic nobody subscribes to succeeds and drops the
    /// event; events that predate their consumer are an accepted loss. If
    /// any group's queue is full or gone the first such failure is
    /// returned, after the remaining groups were still attempted.
    pub fn publish(&self, topic: &str, key: &str, event: &AuditEvent) -> Result<(), PublishError> {
        let partition = partition_for(key, self.inner.partitions);

        let targets: Vec<(String, mpsc::Sender<AuditEvent>)> = {
            let topics = self.inner.topics.lock().unwrap_or_else(|e| e.into_inner());
            match topics.get(topic) {
                Some(t) => t
                    .groups
                    .iter()
                    .map(|(group, partitions)| (group.clone(), partitions[partition].clone()))
                    .collect(),
                None => Vec::new(),
            }
        };

        if targets.is_empty() {
            tracing::debug!(topic, key, "no subscribers, audit event dropped");
            return Ok(());
        }

        let mut result = Ok(());
        for (group, sender) in targets {
            let failure = match sender.try_send(event.clone()) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => PublishError::Lagged {
                    topic: topic.to_string(),
                    group,
                },
                Err(mpsc::error::TrySendError::Closed(_)) => PublishError::Closed {
                    topic: topic.to_string(),
                    group,
                },
            };
            if result.is_ok() {
                result = Err(failure);
            }
        }
        result
    }
}

fn partition_for(key: &str, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}

/// One consumer group's view of a topic: its partition queues, drained
/// fairly. Order is preserved within each partition, not across them.
pub struct Subscription {
    receivers: Vec<mpsc::Receiver<AuditEvent>>,
    next: usize,
}

impl Subscription {
    /// Receive the next event, round-robining across partitions. Returns
    /// `None` once the bus is gone and every queue is drained.
    pub async fn recv(&mut self) -> Option<AuditEvent> {
        std::future::poll_fn(|cx| {
            let n = self.receivers.len();
            let mut pending = false;
            for i in 0..n {
                let idx = (self.next + i) % n;
                match self.receivers[idx].poll_recv(cx) {
                    Poll::Ready(Some(event)) => {
                        self.next = (idx + 1) % n;
                        return Poll::Ready(Some(event));
                    }
                    Poll::Ready(None) => {}
                    Poll::Pending => pending = true,
                }
            }
            if pending { Poll::Pending } else { Poll::Ready(None) }
        })
        .await
    }
}
