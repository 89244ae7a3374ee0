// Delayed-task queue for scheduled webhook deliveries
//
// The broker holds self-contained delivery tasks (url + body + eta); workers
// claim whatever is due and post it. There is no cancellation once a task is
// enqueued.

pub mod consumer;
pub mod redis;

pub use consumer::{DeliveryConsumer, TaskConsumer, TaskDisposition};
pub use redis::RedisTaskQueue;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::QueueError;
use crate::models::DispatchBody;

/// One pending webhook delivery
///
/// Self-contained: a worker needs nothing beyond this message to perform
/// the delivery, so tasks can execute on any worker in any order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryTask {
    /// Unique task ID
    pub id: Uuid,
    /// Human-readable tag for logs ("<talk title> (warning)")
    pub label: String,
    pub webhook_url: String,
    pub body: DispatchBody,
    /// Target execution time; the task runs at or after this instant
    pub deliver_at: DateTime<Utc>,
    /// Number of failed deliveries so far
    pub attempt: u32,
    /// Timestamp when the task was first enqueued
    pub enqueued_at: DateTime<Utc>,
}

impl DeliveryTask {
    pub fn new(
        label: impl Into<String>,
        webhook_url: impl Into<String>,
        body: DispatchBody,
        deliver_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            webhook_url: webhook_url.into(),
            body,
            deliver_at,
            attempt: 0,
            enqueued_at: Utc::now(),
        }
    }

    /// The same task rescheduled after a failed delivery.
    pub fn retried(mut self, eta: DateTime<Utc>) -> Self {
        self.attempt += 1;
        self.deliver_at = eta;
        self
    }
}

/// Task queue operations shared by the dispatcher (enqueue) and the worker
/// (claim)
#[async_trait::async_trait]
pub trait TaskQueue: Send + Sync {
    /// Add a task to the queue for execution at its `deliver_at`.
    async fn enqueue(&self, task: &DeliveryTask) -> Result<(), QueueError>;

    /// Atomically remove and return up to `limit` tasks whose eta has
    /// passed. A task claimed here is gone from the queue; two workers
    /// never receive the same task.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DeliveryTask>, QueueError>;

    /// Verify the broker connection is alive.
    async fn health_check(&self) -> Result<(), QueueError>;
}
