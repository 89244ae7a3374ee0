// Delivery consumer: claims due tasks and posts them
//
// Failed deliveries are re-enqueued with exponential backoff until the
// retry ceiling, then reported dead. Re-enqueueing (rather than sleeping
// in-process) keeps the retry durable across worker restarts.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, instrument, warn};

use crate::errors::QueueError;
use crate::queue::{DeliveryTask, TaskQueue};
use crate::retry::RetryStrategy;
use crate::sender::WebhookSender;

/// Consumer lifecycle operations
#[async_trait::async_trait]
pub trait TaskConsumer: Send + Sync {
    /// Start the poll loop; returns when shutdown is requested.
    async fn start(&self) -> Result<(), QueueError>;

    /// Request graceful shutdown.
    fn shutdown(&self);
}

/// What happened to a claimed task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDisposition {
    Delivered,
    Requeued { eta: DateTime<Utc> },
    /// Retry ceiling reached (or the task could not be requeued)
    Dead,
}

/// Poll-loop consumer executing delivery tasks from the queue
pub struct DeliveryConsumer {
    queue: Arc<dyn TaskQueue>,
    sender: Arc<WebhookSender>,
    strategy: Arc<dyn RetryStrategy>,
    poll_interval: Duration,
    batch_size: usize,
    shutdown_flag: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl DeliveryConsumer {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        sender: Arc<WebhookSender>,
        strategy: Arc<dyn RetryStrategy>,
    ) -> Self {
        Self {
            queue,
            sender,
            strategy,
            poll_interval: Duration::from_secs(5),
            batch_size: 10,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Execute one claimed task to completion.
    #[instrument(skip(self, task), fields(task_id = %task.id, label = %task.label, attempt = task.attempt))]
    pub async fn process_task(&self, task: DeliveryTask) -> TaskDisposition {
        match self.sender.send(&task.webhook_url, &task.body).await {
            Ok(()) => {
                info!("Delivery task completed");
                TaskDisposition::Delivered
            }
            Err(e) => match self.strategy.next_delay(task.attempt) {
                Some(delay) => {
                    let eta = Utc::now()
                        + chrono::Duration::from_std(delay)
                            .unwrap_or_else(|_| chrono::Duration::seconds(delay.as_secs() as i64));
                    warn!(
                        error = %e,
                        retry_eta = %eta,
                        "Delivery failed; re-enqueueing with backoff"
                    );
                    match self.queue.enqueue(&task.retried(eta)).await {
                        Ok(()) => TaskDisposition::Requeued { eta },
                        Err(requeue_err) => {
                            error!(error = %requeue_err, "Failed to re-enqueue task; dropping it");
                            TaskDisposition::Dead
                        }
                    }
                }
                None => {
                    error!(
                        error = %e,
                        max_retries = self.strategy.max_retries(),
                        "Delivery failed and retry ceiling reached; giving up"
                    );
                    TaskDisposition::Dead
                }
            },
        }
    }

    /// Claim and execute everything currently due. Returns the number of
    /// tasks claimed.
    pub async fn drain_due(&self) -> Result<usize, QueueError> {
        let tasks = self.queue.claim_due(Utc::now(), self.batch_size).await?;
        let claimed = tasks.len();

        for task in tasks {
            self.process_task(task).await;
        }

        Ok(claimed)
    }
}

#[async_trait::async_trait]
impl TaskConsumer for DeliveryConsumer {
    async fn start(&self) -> Result<(), QueueError> {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            batch_size = self.batch_size,
            "Delivery consumer started"
        );

        loop {
            if self.shutdown_flag.load(Ordering::SeqCst) {
                break;
            }

            match self.drain_due().await {
                Ok(0) => {}
                Ok(n) => info!(claimed = n, "Processed due delivery tasks"),
                Err(e) => warn!(error = %e, "Failed to claim due tasks; will retry next poll"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = self.shutdown_notify.notified() => break,
            }
        }

        info!("Delivery consumer stopped");
        Ok(())
    }

    fn shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        self.shutdown_notify.notify_waiters();
    }
}
