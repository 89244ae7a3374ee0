// Delivery dispatch
//
// Walks the catalog in order and decides, per talk, whether to schedule two
// delayed deliveries, post immediately, or surface the composed message as
// a dry run. Every talk resolves to an explicit outcome; one bad record
// never aborts the batch.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::compose::NotificationComposer;
use crate::models::{BatchReport, DispatchBody, SkipReason, TalkOutcome};
use crate::queue::{DeliveryTask, TaskQueue};
use crate::sender::WebhookSender;
use crate::timing::TimeGate;

/// Dispatch behavior knobs, fixed for a whole run
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Absent means dry-run mode
    pub webhook_url: Option<String>,
    /// Categories excluded from announcement entirely
    pub ignored_categories: Vec<String>,
    /// Inter-talk pause in synchronous and post-now modes
    pub pause: Duration,
    /// Pretend every talk starts five minutes from now
    pub post_now: bool,
}

pub struct DeliveryDispatcher {
    config: DispatcherConfig,
    composer: NotificationComposer,
    gate: TimeGate,
    sender: Arc<WebhookSender>,
    /// Present when a broker is configured
    queue: Option<Arc<dyn TaskQueue>>,
}

impl DeliveryDispatcher {
    pub fn new(
        config: DispatcherConfig,
        composer: NotificationComposer,
        gate: TimeGate,
        sender: Arc<WebhookSender>,
        queue: Option<Arc<dyn TaskQueue>>,
    ) -> Self {
        Self {
            config,
            composer,
            gate,
            sender,
            queue,
        }
    }

    /// Process the whole catalog in order, including its parse failures,
    /// and return one outcome per input file.
    pub async fn announce_all(&self, catalog: &Catalog) -> BatchReport {
        let mut report = BatchReport::default();

        for failure in &catalog.failures {
            report.record_parse_failure(failure.path.clone(), &failure.error);
        }

        for entry in &catalog.talks {
            let outcome = self.process_talk(entry).await;
            match &outcome {
                TalkOutcome::Failed(reason) => {
                    warn!(path = %entry.path.display(), reason = %reason, "Talk processing failed")
                }
                outcome => {
                    info!(path = %entry.path.display(), title = %entry.talk.title, ?outcome, "Talk processed")
                }
            }
            report.record(entry.path.clone(), Some(entry.talk.title.clone()), outcome);
        }

        report
    }

    async fn process_talk(&self, entry: &CatalogEntry) -> TalkOutcome {
        let talk = &entry.talk;

        if self.is_ignored(&talk.category) {
            return TalkOutcome::Skipped(SkipReason::IgnoredCategory);
        }

        let Some(speaker) = talk.primary_speaker() else {
            // Skipping is a warning, never a batch abort
            warn!(title = %talk.title, path = %entry.path.display(), "No speaker for talk");
            return TalkOutcome::Skipped(SkipReason::NoSpeaker);
        };

        let post_time =
            self.gate
                .effective_post_time(talk.start_time, chrono::Utc::now(), self.config.post_now);
        let warning_time = self.gate.warning_time(post_time);

        let immediate = DispatchBody::with_content(self.composer.compose_immediate(talk, speaker));
        let warning =
            DispatchBody::with_content(self.composer.compose_warning(talk, speaker, post_time));

        let Some(webhook_url) = self.config.webhook_url.as_deref() else {
            self.print_dry_run(&immediate);
            return TalkOutcome::DryRun;
        };

        if let Some(queue) = &self.queue {
            // Warning first, then immediate: enqueue order mirrors
            // execution order for a single talk.
            let warning_task = DeliveryTask::new(
                format!("{} (warning)", talk.title),
                webhook_url,
                warning,
                warning_time.with_timezone(&chrono::Utc),
            );
            let immediate_task = DeliveryTask::new(
                format!("{} (immediate)", talk.title),
                webhook_url,
                immediate,
                post_time.with_timezone(&chrono::Utc),
            );

            if let Err(e) = queue.enqueue(&warning_task).await {
                return TalkOutcome::Failed(e.to_string());
            }
            if let Err(e) = queue.enqueue(&immediate_task).await {
                return TalkOutcome::Failed(e.to_string());
            }

            if self.config.post_now {
                info!(
                    title = %talk.title,
                    pause_secs = self.config.pause.as_secs(),
                    "Messages queued; pausing before the next talk"
                );
                sleep(self.config.pause).await;
            }

            TalkOutcome::Scheduled
        } else {
            // No broker: post the immediate body right away, single
            // attempt, and pace ourselves between talks.
            if let Err(e) = self.sender.send(webhook_url, &immediate).await {
                return TalkOutcome::Failed(e.to_string());
            }
            sleep(self.config.pause).await;
            TalkOutcome::DeliveredSync
        }
    }

    fn is_ignored(&self, category: &str) -> bool {
        is_ignored_category(category, &self.config.ignored_categories)
    }

    fn print_dry_run(&self, body: &DispatchBody) {
        println!("{}", body.content);
        match serde_json::to_string_pretty(body) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!(error = %e, "Failed to serialize dry-run body"),
        }
        println!("\x1b[33m{}\x1b[0m", "----".repeat(10));
    }
}

/// Category comparison is case- and whitespace-insensitive.
pub fn is_ignored_category(category: &str, ignored: &[String]) -> bool {
    let normalized = category.trim().to_lowercase();
    ignored.iter().any(|c| c == &normalized)
}
