// Redis-backed delayed-task queue
//
// Tasks live in a sorted set scored by their eta (epoch seconds). Claiming
// is ZRANGEBYSCORE followed by a ZREM per member; a removal count of zero
// means another worker already took that task, so scaled workers never
// double-deliver.

use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{error, info, instrument};

use crate::errors::QueueError;
use crate::queue::{DeliveryTask, TaskQueue};

#[derive(Clone)]
pub struct RedisTaskQueue {
    manager: ConnectionManager,
    key: String,
}

impl RedisTaskQueue {
    /// Connect to the broker and bind to the given sorted-set key.
    pub async fn connect(url: &str, key: impl AsRef<str>) -> Result<Self, QueueError> {
        info!(key = key.as_ref(), "Connecting to task broker");

        let client = Client::open(url).map_err(|e| {
            QueueError::ConnectionFailed(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            QueueError::ConnectionFailed(format!("Failed to create connection manager: {}", e))
        })?;

        info!("Task broker connection established");

        Ok(Self {
            manager,
            key: key.as_ref().to_string(),
        })
    }

    fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[async_trait::async_trait]
impl TaskQueue for RedisTaskQueue {
    #[instrument(skip(self, task), fields(task_id = %task.id, label = %task.label, eta = %task.deliver_at))]
    async fn enqueue(&self, task: &DeliveryTask) -> Result<(), QueueError> {
        let payload = serde_json::to_string(task)
            .map_err(|e| QueueError::SerializationFailed(e.to_string()))?;

        let mut conn = self.connection();
        let _added: i64 = redis::cmd("ZADD")
            .arg(&self.key)
            .arg(task.deliver_at.timestamp())
            .arg(&payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::PublishFailed(e.to_string()))?;

        info!("Delivery task enqueued");
        Ok(())
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DeliveryTask>, QueueError> {
        let mut conn = self.connection();

        let candidates: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(&self.key)
            .arg("-inf")
            .arg(now.timestamp())
            .arg("LIMIT")
            .arg(0)
            .arg(limit as i64)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::ClaimFailed(e.to_string()))?;

        let mut claimed = Vec::new();
        for payload in candidates {
            let removed: i64 = redis::cmd("ZREM")
                .arg(&self.key)
                .arg(&payload)
                .query_async(&mut conn)
                .await
                .map_err(|e| QueueError::ClaimFailed(e.to_string()))?;

            // Zero removals: another worker claimed this one first
            if removed == 0 {
                continue;
            }

            match serde_json::from_str::<DeliveryTask>(&payload) {
                Ok(task) => claimed.push(task),
                Err(e) => {
                    // Poison message; it is already removed from the set
                    error!(error = %e, "Dropping undecodable task payload");
                }
            }
        }

        Ok(claimed)
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.connection();

        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::ConnectionFailed(format!("Health check failed: {}", e)))?;

        if response != "PONG" {
            return Err(QueueError::ConnectionFailed(format!(
                "Unexpected PING response: {}",
                response
            )));
        }

        Ok(())
    }
}
