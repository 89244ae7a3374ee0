// Folder-based notification pipeline
//
// A notification artifact's directory encodes its lifecycle: drafts (not
// yet reviewed) → inbox (ready to send) → outbox (sent, terminal). The
// inbox→outbox rename happens only after a successful webhook response, so
// a failed delivery stays in the inbox and is retried on the next scan.
//
// Assumes a single operator process; concurrent scans of the same inbox
// are not coordinated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::FolderConfig;
use crate::errors::FolderError;
use crate::frontmatter;
use crate::models::{DispatchBody, NotificationArtifact};
use crate::sender::WebhookSender;
use crate::timing::TimeGate;

/// Artifact front-matter shape on disk
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactHeader {
    category: String,
    /// Stored as `%Y-%m-%d %H:%M:%S %z` so the offset survives re-parsing
    date: String,
    title: String,
}

/// Result of one inbox scan
#[derive(Debug, Default)]
pub struct ScanReport {
    pub delivered: Vec<PathBuf>,
    /// Dry-run mode: artifacts that were due but not sent
    pub would_deliver: Vec<PathBuf>,
    /// Outbox destination already existed; send suppressed
    pub skipped_duplicate: Vec<PathBuf>,
    pub not_due: usize,
    pub failed: Vec<(PathBuf, String)>,
}

pub struct FolderPipeline {
    drafts: PathBuf,
    inbox: PathBuf,
    outbox: PathBuf,
    gate: TimeGate,
}

impl FolderPipeline {
    pub fn new(folders: &FolderConfig, gate: TimeGate) -> Self {
        Self {
            drafts: folders.drafts.clone(),
            inbox: folders.inbox.clone(),
            outbox: folders.outbox.clone(),
            gate,
        }
    }

    /// All three folders must exist before any scan work begins; a missing
    /// one is an operator configuration error, not something to create
    /// silently.
    pub fn ensure_folders(&self) -> Result<(), FolderError> {
        for dir in [&self.drafts, &self.inbox, &self.outbox] {
            if !dir.is_dir() {
                return Err(FolderError::MissingFolder(dir.clone()));
            }
        }
        Ok(())
    }

    pub fn drafts_dir(&self) -> &Path {
        &self.drafts
    }

    /// Scan the inbox and deliver every artifact whose trigger time has
    /// passed (`post_now` forces all of them). `webhook_url` of `None`
    /// reports what would be sent without posting or moving anything.
    pub async fn scan_and_deliver(
        &self,
        sender: &WebhookSender,
        webhook_url: Option<&str>,
        now: DateTime<Utc>,
        post_now: bool,
    ) -> Result<ScanReport, FolderError> {
        self.ensure_folders()?;

        let mut filenames: Vec<PathBuf> = fs::read_dir(&self.inbox)
            .map_err(|source| FolderError::Io {
                path: self.inbox.clone(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        filenames.sort();

        let mut report = ScanReport::default();

        for path in filenames {
            match self.process_artifact(&path, sender, webhook_url, now, post_now).await {
                Ok(disposition) => match disposition {
                    ArtifactDisposition::Delivered => report.delivered.push(path),
                    ArtifactDisposition::WouldDeliver => report.would_deliver.push(path),
                    ArtifactDisposition::DuplicateSkipped => report.skipped_duplicate.push(path),
                    ArtifactDisposition::NotDue => report.not_due += 1,
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Artifact processing failed; leaving it in the inbox");
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    async fn process_artifact(
        &self,
        path: &Path,
        sender: &WebhookSender,
        webhook_url: Option<&str>,
        now: DateTime<Utc>,
        post_now: bool,
    ) -> Result<ArtifactDisposition, FolderError> {
        let artifact = self.load_artifact(path)?;

        if !post_now && !self.gate.is_due(artifact.date, now) {
            return Ok(ArtifactDisposition::NotDue);
        }

        // Duplicate check happens BEFORE the send: a file already in the
        // outbox means this notification went out in a previous run.
        let file_name = path
            .file_name()
            .ok_or_else(|| FolderError::InvalidArtifact {
                path: path.to_path_buf(),
                reason: "no filename".to_string(),
            })?;
        let destination = self.outbox.join(file_name);
        if destination.exists() {
            warn!(
                path = %path.display(),
                destination = %destination.display(),
                "Outbox already contains this artifact; suppressing duplicate delivery"
            );
            return Ok(ArtifactDisposition::DuplicateSkipped);
        }

        let Some(url) = webhook_url else {
            info!(path = %path.display(), title = %artifact.title, "Would deliver artifact (dry run)");
            return Ok(ArtifactDisposition::WouldDeliver);
        };

        let body = DispatchBody::with_content(artifact.content.clone());
        sender
            .send(url, &body)
            .await
            .map_err(|source| FolderError::Delivery {
                path: path.to_path_buf(),
                source,
            })?;

        // Send succeeded; the move is what marks the artifact sent.
        fs::rename(path, &destination).map_err(|source| FolderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            path = %path.display(),
            title = %artifact.title,
            "Artifact delivered and moved to the outbox"
        );
        Ok(ArtifactDisposition::Delivered)
    }

    /// Parse a persisted artifact file.
    pub fn load_artifact(&self, path: &Path) -> Result<NotificationArtifact, FolderError> {
        let text = fs::read_to_string(path).map_err(|source| FolderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (header, content): (ArtifactHeader, String) =
            frontmatter::parse(&text).map_err(|e| FolderError::InvalidArtifact {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let date =
            self.gate
                .parse_timestamp(&header.date)
                .map_err(|e| FolderError::InvalidArtifact {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;

        Ok(NotificationArtifact {
            category: header.category,
            date,
            title: header.title,
            content,
        })
    }
}

/// Serialize an artifact to its on-disk form.
pub fn artifact_to_string(artifact: &NotificationArtifact) -> Result<String, FolderError> {
    let header = ArtifactHeader {
        category: artifact.category.clone(),
        date: artifact.date.format("%Y-%m-%d %H:%M:%S %z").to_string(),
        title: artifact.title.clone(),
    };
    frontmatter::compose(&header, &artifact.content).map_err(|e| FolderError::InvalidArtifact {
        path: PathBuf::new(),
        reason: e.to_string(),
    })
}

enum ArtifactDisposition {
    Delivered,
    WouldDeliver,
    DuplicateSkipped,
    NotDue,
}
