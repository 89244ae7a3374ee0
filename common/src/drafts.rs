// Draft artifact generation
//
// Renders per-category templates into notification artifacts under the
// drafts folder. Each talk yields up to two artifacts: the main message
// (trigger = talk start, template `{category}.html`) and the five-minute
// preview (trigger = start - 5 min, template `{category}-preview.html`,
// filename re-derived from the trigger time and the slugified title).
// A category without a matching template simply produces no artifact.
//
// Template context keys: title, category, speaker (optional), video_url,
// permalink, image, local_time.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tera::Tera;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::errors::DraftsError;
use crate::folder::artifact_to_string;
use crate::models::{NotificationArtifact, TalkRecord};
use crate::timing::warning_offset;

#[derive(Serialize)]
struct TemplateContext<'a> {
    title: &'a str,
    category: &'a str,
    speaker: Option<&'a str>,
    video_url: Option<&'a str>,
    permalink: Option<&'a str>,
    image: Option<&'a str>,
    local_time: String,
}

/// Result of one generation run
#[derive(Debug, Default)]
pub struct DraftsReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

pub struct DraftsGenerator {
    drafts_dir: PathBuf,
    tera: Tera,
}

impl DraftsGenerator {
    pub fn new(drafts_dir: impl Into<PathBuf>, templates_glob: &str) -> Result<Self, DraftsError> {
        let tera =
            Tera::new(templates_glob).map_err(|e| DraftsError::TemplateLoad(e.to_string()))?;
        Ok(Self {
            drafts_dir: drafts_dir.into(),
            tera,
        })
    }

    /// Generate draft artifacts for every talk in the catalog.
    /// Per-talk failures are recorded and the run continues.
    pub fn generate(&self, catalog: &Catalog) -> DraftsReport {
        let mut report = DraftsReport::default();

        for entry in &catalog.talks {
            if let Err(e) = self.generate_for_talk(&entry.path, &entry.talk, &mut report) {
                warn!(path = %entry.path.display(), error = %e, "Draft generation failed");
                report.failed.push((entry.path.clone(), e.to_string()));
            }
        }

        report
    }

    fn generate_for_talk(
        &self,
        source: &Path,
        talk: &TalkRecord,
        report: &mut DraftsReport,
    ) -> Result<(), DraftsError> {
        let speaker = talk.primary_speaker();
        if speaker.is_none() {
            // Not fatal here: the template decides whether it needs one
            warn!(title = %talk.title, path = %source.display(), "No speaker for talk");
        }

        let category = talk.normalized_category();

        // Main message, triggered at the talk start
        let main_template = format!("{category}.html");
        if let Some(content) = self.render(&main_template, talk)? {
            let file_name = source
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("untitled.md"));
            let destination = self.drafts_dir.join(file_name);

            let artifact = NotificationArtifact {
                category: category.clone(),
                date: talk.start_time,
                title: talk.title.clone(),
                content,
            };
            self.write_artifact(&destination, &artifact)?;
            info!(
                source = %source.display(),
                destination = %destination.display(),
                "Draft written"
            );
            report.written.push(destination);
        }

        // Five-minute preview, triggered five minutes earlier
        let preview_template = format!("{category}-preview.html");
        if let Some(content) = self.render(&preview_template, talk)? {
            let trigger = talk.start_time - warning_offset();
            let destination = self.drafts_dir.join(preview_file_name(&talk.title, &trigger));

            let artifact = NotificationArtifact {
                category,
                date: trigger,
                title: talk.title.clone(),
                content,
            };
            self.write_artifact(&destination, &artifact)?;
            info!(
                source = %source.display(),
                destination = %destination.display(),
                "Preview draft written"
            );
            report.written.push(destination);
        }

        Ok(())
    }

    /// Render one template variant; `None` when the template does not exist.
    fn render(&self, template: &str, talk: &TalkRecord) -> Result<Option<String>, DraftsError> {
        if !self.tera.get_template_names().any(|n| n == template) {
            return Ok(None);
        }

        let ctx = TemplateContext {
            title: &talk.title,
            category: &talk.category,
            speaker: talk.primary_speaker().map(|s| s.name.as_str()),
            video_url: talk.video_url.as_deref(),
            permalink: talk.permalink.as_deref(),
            image: talk.image_url.as_deref(),
            local_time: talk.start_time.format("%H:%M %Z").to_string(),
        };
        let context = tera::Context::from_serialize(&ctx)
            .map_err(|e| DraftsError::Render {
                template: template.to_string(),
                reason: e.to_string(),
            })?;

        self.tera
            .render(template, &context)
            .map(Some)
            .map_err(|e| DraftsError::Render {
                template: template.to_string(),
                reason: e.to_string(),
            })
    }

    fn write_artifact(
        &self,
        destination: &Path,
        artifact: &NotificationArtifact,
    ) -> Result<(), DraftsError> {
        let text = artifact_to_string(artifact).map_err(|e| DraftsError::Render {
            template: String::new(),
            reason: e.to_string(),
        })?;
        fs::write(destination, text).map_err(|source| DraftsError::Io {
            path: destination.to_path_buf(),
            source,
        })
    }
}

/// `2021-10-22-08-55-scaling-snails-preview.md`
fn preview_file_name(
    title: &str,
    trigger: &chrono::DateTime<chrono_tz::Tz>,
) -> String {
    format!(
        "{}-{}-preview.md",
        trigger.format("%Y-%m-%d-%H-%M"),
        slugify(title)
    )
}

/// Lowercased, non-alphanumeric runs collapsed to single dashes
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}
