use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::CatalogError;

// ============================================================================
// Talk Models
// ============================================================================

/// A single conference talk, loaded once per run and validated at load time
#[derive(Debug, Clone)]
pub struct TalkRecord {
    pub title: String,
    pub category: String,
    /// Start time, already normalized to the conference timezone
    pub start_time: DateTime<Tz>,
    /// Ordered; the first entry is the primary speaker
    pub speakers: Vec<Speaker>,
    pub video_url: Option<String>,
    pub permalink: Option<String>,
    pub image_url: Option<String>,
}

impl TalkRecord {
    /// Category normalized for comparison against the ignored set
    pub fn normalized_category(&self) -> String {
        self.category.trim().to_lowercase()
    }

    pub fn primary_speaker(&self) -> Option<&Speaker> {
        self.speakers.first()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Speaker {
    pub name: String,
}

// ============================================================================
// Webhook Payload
// ============================================================================

/// Outbound webhook payload, built fresh per delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchBody {
    pub content: String,
    pub allowed_mentions: AllowedMentions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
    pub users: Vec<String>,
}

impl DispatchBody {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            allowed_mentions: AllowedMentions {
                parse: vec!["everyone".to_string()],
                users: Vec::new(),
            },
        }
    }
}

// ============================================================================
// Folder Pipeline Artifact
// ============================================================================

/// A persisted notification waiting in the folder pipeline
///
/// Identity is the filename, which stays stable as the file moves between
/// the drafts, inbox, and outbox folders.
#[derive(Debug, Clone)]
pub struct NotificationArtifact {
    pub category: String,
    /// Trigger timestamp in the conference timezone
    pub date: DateTime<Tz>,
    pub title: String,
    /// Rendered message body, sent verbatim
    pub content: String,
}

// ============================================================================
// Batch Outcomes
// ============================================================================

/// Why a talk was excluded without being an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    IgnoredCategory,
    NoSpeaker,
}

/// Final disposition of one talk in an announcement run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TalkOutcome {
    Skipped(SkipReason),
    /// Composed body surfaced to the operator; no network call
    DryRun,
    /// Warning and immediate deliveries handed to the task queue
    Scheduled,
    /// Immediate body posted synchronously
    DeliveredSync,
    Failed(String),
}

/// Per-talk result collected over a whole announcement run
#[derive(Debug)]
pub struct TalkReport {
    pub path: PathBuf,
    /// None when the file never parsed far enough to know
    pub title: Option<String>,
    pub outcome: TalkOutcome,
}

/// One announcement run over the catalog; one entry per input file
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<TalkReport>,
}

impl BatchReport {
    pub fn record(&mut self, path: PathBuf, title: Option<String>, outcome: TalkOutcome) {
        self.entries.push(TalkReport {
            path,
            title,
            outcome,
        });
    }

    pub fn record_parse_failure(&mut self, path: PathBuf, error: &CatalogError) {
        self.entries.push(TalkReport {
            path,
            title: None,
            outcome: TalkOutcome::Failed(error.to_string()),
        });
    }

    pub fn count(&self, matches: impl Fn(&TalkOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| matches(&e.outcome)).count()
    }

    pub fn scheduled(&self) -> usize {
        self.count(|o| *o == TalkOutcome::Scheduled)
    }

    pub fn delivered(&self) -> usize {
        self.count(|o| *o == TalkOutcome::DeliveredSync)
    }

    pub fn dry_run(&self) -> usize {
        self.count(|o| *o == TalkOutcome::DryRun)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TalkOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TalkOutcome::Failed(_)))
    }
}
