// Delivery worker entry point
//
// Claims due webhook deliveries from the broker and posts them, retrying
// transient failures with bounded exponential backoff.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use common::config::Settings;
use common::queue::{DeliveryConsumer, RedisTaskQueue, TaskConsumer, TaskQueue};
use common::retry::ExponentialBackoff;
use common::sender::WebhookSender;
use common::telemetry::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::load().map_err(|e| {
        anyhow::anyhow!("Configuration error: {}", e)
    })?;
    settings
        .validate()
        .map_err(|reason| anyhow::anyhow!("Invalid configuration: {}", reason))?;

    init_logging(&settings.observability.log_level, true)?;

    info!("Starting delivery worker");

    // The worker is pointless without a broker to consume from
    let broker_url = settings.broker.url.as_deref().ok_or_else(|| {
        anyhow::anyhow!("No broker configured; set ANNOUNCER__BROKER__URL to run the worker")
    })?;

    let queue = RedisTaskQueue::connect(broker_url, &settings.broker.queue_key)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to connect to the broker");
            anyhow::anyhow!("Broker initialization error: {}", e)
        })?;
    queue.health_check().await?;
    info!("Broker connection healthy");

    let sender = Arc::new(WebhookSender::new(settings.webhook.timeout_seconds)?);
    let strategy = Arc::new(ExponentialBackoff::new().with_max_retries(settings.webhook.max_retries));

    let consumer = Arc::new(
        DeliveryConsumer::new(Arc::new(queue), sender, strategy)
            .with_poll_interval(Duration::from_secs(settings.broker.poll_interval_seconds)),
    );

    // Graceful shutdown on Ctrl+C
    let consumer_for_shutdown = Arc::clone(&consumer);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C signal, initiating graceful shutdown");
            consumer_for_shutdown.shutdown();
        }
    });

    consumer.start().await?;

    info!("Delivery worker stopped");
    Ok(())
}
