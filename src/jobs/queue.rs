//! Work Queue
//!
//! At-least-once hand-off of admitted jobs to the out-of-process worker. A
//! claimed message stays pending until acknowledged; unacknowledged messages
//! can be put back for redelivery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::job::{Job, JobKind};
use crate::error::StoreError;

/// Message published for each admitted job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub job_id: Uuid,
    pub owner_identity: String,
    pub kind: JobKind,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueMessage {
    /// Build the message for a persisted job
    pub fn for_job(job: &Job) -> Self {
        Self {
            job_id: job.job_id,
            owner_identity: job.owner_identity.clone(),
            kind: job.kind,
            enqueued_at: Utc::now(),
        }
    }
}

/// Publishing seam used by the admission path
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Publish a message; returns the broker-assigned message id
    async fn publish(&self, message: &QueueMessage) -> Result<String, StoreError>;
}

/// A message handed to a consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: String,
    pub message: QueueMessage,
    /// How many times this message has been claimed
    pub attempts: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Delivery>,
    pending: HashMap<String, Delivery>,
    next_id: u64,
}

/// In-process queue with consumer-side claim/ack
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkQueue {
    state: Arc<Mutex<QueueState>>,
}

impl InMemoryWorkQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Take up to `max` ready messages; they stay pending until acked
    pub async fn claim(&self, max: usize) -> Vec<Delivery> {
        let mut state = self.state.lock().await;
        let take = max.min(state.ready.len());
        let mut claimed = Vec::with_capacity(take);

        for _ in 0..take {
            if let Some(mut delivery) = state.ready.pop_front() {
                delivery.attempts += 1;
                state
                    .pending
                    .insert(delivery.message_id.clone(), delivery.clone());
                claimed.push(delivery);
            }
        }
        claimed
    }

    /// Acknowledge a processed message
    pub async fn ack(&self, message_id: &str) -> bool {
        let mut state = self.state.lock().await;
        state.pending.remove(message_id).is_some()
    }

    /// Return every unacknowledged message to the ready queue
    pub async fn requeue_unacked(&self) -> usize {
        let mut state = self.state.lock().await;
        let mut pending: Vec<Delivery> = state.pending.drain().map(|(_, d)| d).collect();
        pending.sort_by(|a, b| a.message.enqueued_at.cmp(&b.message.enqueued_at));

        let count = pending.len();
        for delivery in pending.into_iter().rev() {
            state.ready.push_front(delivery);
        }
        count
    }

    /// Messages waiting to be claimed
    pub async fn ready_len(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    /// Messages claimed but not yet acknowledged
    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn publish(&self, message: &QueueMessage) -> Result<String, StoreError> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let message_id = format!("msg-{}", state.next_id);

        state.ready.push_back(Delivery {
            message_id: message_id.clone(),
            message: message.clone(),
            attempts: 0,
        });
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::job::ReviewInput;

    fn message() -> QueueMessage {
        let input = ReviewInput::new("let x = 1;".into(), None, None);
        QueueMessage::for_job(&Job::new_review("user-1", &input, 2_502))
    }

    #[tokio::test]
    async fn test_publish_and_claim_in_order() {
        let queue = InMemoryWorkQueue::new();
        let first = message();
        let second = message();

        let id1 = queue.publish(&first).await.unwrap();
        let id2 = queue.publish(&second).await.unwrap();
        assert_ne!(id1, id2);

        let claimed = queue.claim(10).await;
        assert_eq!(claimed.len(), 2);
        assert_eq!(claimed[0].message.job_id, first.job_id);
        assert_eq!(claimed[0].attempts, 1);
        assert_eq!(queue.ready_len().await, 0);
        assert_eq!(queue.pending_len().await, 2);
    }

    #[tokio::test]
    async fn test_ack_removes_pending() {
        let queue = InMemoryWorkQueue::new();
        let id = queue.publish(&message()).await.unwrap();
        queue.claim(1).await;

        assert!(queue.ack(&id).await);
        assert!(!queue.ack(&id).await);
        assert_eq!(queue.pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_unacked_messages_are_redelivered() {
        let queue = InMemoryWorkQueue::new();
        let msg = message();
        queue.publish(&msg).await.unwrap();

        let first = queue.claim(1).await;
        assert_eq!(queue.requeue_unacked().await, 1);

        let second = queue.claim(1).await;
        assert_eq!(second[0].message_id, first[0].message_id);
        assert_eq!(second[0].message.job_id, msg.job_id);
        assert_eq!(second[0].attempts, 2);
    }

    #[tokio::test]
    async fn test_message_serialization() {
        let msg = message();
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: QueueMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
        assert!(json.contains("\"kind\":\"review\""));
    }
}
