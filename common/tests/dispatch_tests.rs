// Dispatcher outcome tests
//
// An in-memory queue stands in for the broker so the scheduled path can be
// asserted without Redis; the synchronous path talks to a wiremock server.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::America::Chicago;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use common::catalog::{Catalog, CatalogEntry};
use common::compose::NotificationComposer;
use common::dispatch::{DeliveryDispatcher, DispatcherConfig};
use common::errors::QueueError;
use common::models::{SkipReason, Speaker, TalkOutcome, TalkRecord};
use common::queue::{DeliveryTask, TaskQueue};
use common::sender::WebhookSender;
use common::timing::{warning_offset, TimeGate};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingQueue {
    tasks: Mutex<Vec<DeliveryTask>>,
}

impl RecordingQueue {
    fn snapshot(&self) -> Vec<DeliveryTask> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn enqueue(&self, task: &DeliveryTask) -> Result<(), QueueError> {
        self.tasks.lock().unwrap().push(task.clone());
        Ok(())
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DeliveryTask>, QueueError> {
        let mut tasks = self.tasks.lock().unwrap();
        let mut due = Vec::new();
        let mut rest = Vec::new();
        for task in tasks.drain(..) {
            if task.deliver_at <= now && due.len() < limit {
                due.push(task);
            } else {
                rest.push(task);
            }
        }
        *tasks = rest;
        Ok(due)
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

fn gate() -> TimeGate {
    TimeGate::new(Chicago)
}

fn talk(title: &str, category: &str, speakers: &[&str]) -> TalkRecord {
    TalkRecord {
        title: title.to_string(),
        category: category.to_string(),
        start_time: gate().parse_timestamp("2021-10-22 09:00:00").unwrap(),
        speakers: speakers
            .iter()
            .map(|name| Speaker {
                name: name.to_string(),
            })
            .collect(),
        video_url: Some("https://example.com/v/1".to_string()),
        permalink: Some("/talks/one/".to_string()),
        image_url: None,
    }
}

fn catalog_of(talks: Vec<TalkRecord>) -> Catalog {
    let mut catalog = Catalog::default();
    for (i, talk) in talks.into_iter().enumerate() {
        catalog.talks.push(CatalogEntry {
            path: PathBuf::from(format!("talks/{i:02}.md")),
            talk,
        });
    }
    catalog
}

fn dispatcher(
    webhook_url: Option<String>,
    queue: Option<Arc<dyn TaskQueue>>,
    post_now: bool,
) -> DeliveryDispatcher {
    DeliveryDispatcher::new(
        DispatcherConfig {
            webhook_url,
            ignored_categories: vec![
                "break".to_string(),
                "lunch".to_string(),
                "social-hour".to_string(),
            ],
            pause: std::time::Duration::ZERO,
            post_now,
        },
        NotificationComposer::new("https://conf.example.org", "42"),
        gate(),
        Arc::new(WebhookSender::new(5).unwrap()),
        queue,
    )
}

#[tokio::test]
async fn test_scheduled_mode_enqueues_warning_then_immediate() {
    let queue = Arc::new(RecordingQueue::default());
    let d = dispatcher(
        Some("http://example.invalid/hook".to_string()),
        Some(queue.clone()),
        false,
    );

    let report = d
        .announce_all(&catalog_of(vec![talk("One", "talk", &["A"])]))
        .await;

    assert_eq!(report.scheduled(), 1);
    let tasks = queue.snapshot();
    assert_eq!(tasks.len(), 2);
    assert!(tasks[0].label.ends_with("(warning)"));
    assert!(tasks[1].label.ends_with("(immediate)"));
    assert_eq!(tasks[1].deliver_at - tasks[0].deliver_at, warning_offset());
    assert!(tasks[0].body.content.contains("in 5 minutes"));
    assert!(tasks[1].body.content.contains("right now"));
}

#[tokio::test]
async fn test_ignored_category_is_never_composed_or_scheduled() {
    let queue = Arc::new(RecordingQueue::default());
    let d = dispatcher(
        Some("http://example.invalid/hook".to_string()),
        Some(queue.clone()),
        false,
    );

    let report = d
        .announce_all(&catalog_of(vec![
            talk("Lunch Break", "lunch", &["A"]),
            talk("Coffee", " Break ", &["A"]),
        ]))
        .await;

    assert_eq!(report.skipped(), 2);
    assert_eq!(report.scheduled(), 0);
    assert!(queue.snapshot().is_empty());
    assert!(report
        .entries
        .iter()
        .all(|e| e.outcome == TalkOutcome::Skipped(SkipReason::IgnoredCategory)));
}

#[tokio::test]
async fn test_missing_speaker_skips_and_batch_continues() {
    let queue = Arc::new(RecordingQueue::default());
    let d = dispatcher(
        Some("http://example.invalid/hook".to_string()),
        Some(queue.clone()),
        false,
    );

    let report = d
        .announce_all(&catalog_of(vec![
            talk("No Speaker", "talk", &[]),
            talk("Has Speaker", "talk", &["B"]),
        ]))
        .await;

    assert_eq!(
        report.entries[0].outcome,
        TalkOutcome::Skipped(SkipReason::NoSpeaker)
    );
    // The following talk is still processed
    assert_eq!(report.entries[1].outcome, TalkOutcome::Scheduled);
    assert_eq!(queue.snapshot().len(), 2);
}

#[tokio::test]
async fn test_dry_run_without_webhook() {
    let d = dispatcher(None, None, false);

    let report = d
        .announce_all(&catalog_of(vec![talk("One", "talk", &["A"])]))
        .await;

    assert_eq!(report.dry_run(), 1);
    assert_eq!(report.scheduled(), 0);
    assert_eq!(report.delivered(), 0);
}

#[tokio::test]
async fn test_sync_mode_posts_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let d = dispatcher(Some(server.uri()), None, false);
    let report = d
        .announce_all(&catalog_of(vec![talk("One", "talk", &["A"])]))
        .await;

    assert_eq!(report.delivered(), 1);
}

#[tokio::test]
async fn test_sync_failure_is_isolated_per_talk() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let d = dispatcher(Some(server.uri()), None, false);
    let report = d
        .announce_all(&catalog_of(vec![
            talk("One", "talk", &["A"]),
            talk("Two", "talk", &["B"]),
        ]))
        .await;

    // Both talks were attempted; neither aborted the batch
    assert_eq!(report.failed(), 2);
    assert!(matches!(report.entries[0].outcome, TalkOutcome::Failed(_)));
    assert!(matches!(report.entries[1].outcome, TalkOutcome::Failed(_)));
}

#[tokio::test]
async fn test_post_now_etas_land_in_test_window() {
    let queue = Arc::new(RecordingQueue::default());
    let d = dispatcher(
        Some("http://example.invalid/hook".to_string()),
        Some(queue.clone()),
        true,
    );

    let before = Utc::now();
    let report = d
        .announce_all(&catalog_of(vec![talk("One", "talk", &["A"])]))
        .await;
    assert_eq!(report.scheduled(), 1);

    let tasks = queue.snapshot();
    let immediate = &tasks[1];
    let delta = immediate.deliver_at - (before + Duration::minutes(5));
    assert!(delta >= Duration::zero());
    // 5s offset plus however long the test took to get here
    assert!(delta <= Duration::seconds(30));
}

#[tokio::test]
async fn test_parse_failures_surface_in_report() {
    use common::catalog::CatalogFailure;
    use common::errors::CatalogError;

    let mut catalog = catalog_of(vec![talk("One", "talk", &["A"])]);
    catalog.failures.push(CatalogFailure {
        path: PathBuf::from("talks/broken.md"),
        error: CatalogError::MissingFrontMatter(PathBuf::from("talks/broken.md")),
    });

    let d = dispatcher(None, None, false);
    let report = d.announce_all(&catalog).await;

    assert_eq!(report.failed(), 1);
    assert_eq!(report.dry_run(), 1);
}
