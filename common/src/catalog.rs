// Talk catalog loading
//
// A catalog is either a directory of talk files (collected recursively,
// sorted by path so the date-prefixed filenames come out chronological) or
// a single file. Files that fail to parse are recorded and skipped; one bad
// record never aborts the load.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::errors::CatalogError;
use crate::frontmatter::{self, FrontMatterError};
use crate::models::{Speaker, TalkRecord};
use crate::timing::TimeGate;

/// Result of one catalog load
#[derive(Debug, Default)]
pub struct Catalog {
    pub talks: Vec<CatalogEntry>,
    pub failures: Vec<CatalogFailure>,
}

#[derive(Debug)]
pub struct CatalogEntry {
    pub path: PathBuf,
    pub talk: TalkRecord,
}

#[derive(Debug)]
pub struct CatalogFailure {
    pub path: PathBuf,
    pub error: CatalogError,
}

/// Raw front-matter shape before validation
#[derive(Debug, Deserialize)]
struct RawTalk {
    title: Option<String>,
    category: Option<String>,
    /// Either a TOML datetime literal or a string needing parse
    date: Option<toml::Value>,
    #[serde(default)]
    presenters: Vec<RawSpeaker>,
    video_url: Option<String>,
    permalink: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSpeaker {
    name: String,
}

pub struct TalkCatalog {
    gate: TimeGate,
}

impl TalkCatalog {
    pub fn new(gate: TimeGate) -> Self {
        Self { gate }
    }

    /// Load every talk under `path` (or just `path` itself, if a file).
    ///
    /// Returns an error only when the path itself cannot be read;
    /// per-file parse failures land in `Catalog::failures`.
    pub fn load(&self, path: &Path) -> Result<Catalog, CatalogError> {
        let files = if path.is_dir() {
            let mut files = Vec::new();
            collect_talk_files(path, &mut files).map_err(|source| CatalogError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            files.sort();
            files
        } else {
            vec![path.to_path_buf()]
        };

        let mut catalog = Catalog::default();
        for file in files {
            match self.load_talk(&file) {
                Ok(talk) => catalog.talks.push(CatalogEntry { path: file, talk }),
                Err(error) => {
                    warn!(path = %file.display(), error = %error, "Skipping unparseable talk file");
                    catalog.failures.push(CatalogFailure { path: file, error });
                }
            }
        }

        Ok(catalog)
    }

    /// Load and validate a single talk file.
    pub fn load_talk(&self, path: &Path) -> Result<TalkRecord, CatalogError> {
        let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (raw, _body): (RawTalk, String) =
            frontmatter::parse(&text).map_err(|e| match e {
                FrontMatterError::Missing => CatalogError::MissingFrontMatter(path.to_path_buf()),
                FrontMatterError::Invalid(reason) => CatalogError::InvalidFrontMatter {
                    path: path.to_path_buf(),
                    reason,
                },
            })?;

        self.validate(raw, path)
    }

    /// Fail fast on missing or malformed fields instead of surfacing a
    /// late field-access fault downstream.
    fn validate(&self, raw: RawTalk, path: &Path) -> Result<TalkRecord, CatalogError> {
        let title = raw.title.ok_or(CatalogError::MissingField {
            field: "title",
            path: path.to_path_buf(),
        })?;
        let category = raw.category.ok_or(CatalogError::MissingField {
            field: "category",
            path: path.to_path_buf(),
        })?;
        let date = raw.date.ok_or(CatalogError::MissingField {
            field: "date",
            path: path.to_path_buf(),
        })?;

        // TOML datetime literals stringify to RFC 3339-ish text, so both
        // branches funnel through the same parser.
        let date_str = match &date {
            toml::Value::String(s) => s.clone(),
            toml::Value::Datetime(dt) => dt.to_string(),
            other => other.to_string(),
        };
        let start_time =
            self.gate
                .parse_timestamp(&date_str)
                .map_err(|source| CatalogError::InvalidTimestamp {
                    path: path.to_path_buf(),
                    source,
                })?;

        Ok(TalkRecord {
            title,
            category,
            start_time,
            speakers: raw
                .presenters
                .into_iter()
                .map(|s| Speaker { name: s.name })
                .collect(),
            video_url: raw.video_url,
            permalink: raw.permalink,
            image_url: raw.image,
        })
    }
}

fn collect_talk_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_talk_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Chicago;
    use std::fs;

    fn catalog() -> TalkCatalog {
        TalkCatalog::new(TimeGate::new(Chicago))
    }

    fn write_talk(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    const GOOD_TALK: &str = r#"+++
title = "Building Things"
category = "talk"
date = 2021-10-22T09:00:00-05:00
video_url = "https://example.com/v/1"
permalink = "/talks/building-things/"

[[presenters]]
name = "Dana Doe"
+++
Abstract goes here.
"#;

    #[test]
    fn test_load_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_talk(dir.path(), "2021-10-22-09-00-building.md", GOOD_TALK);

        let talk = catalog().load_talk(&path).unwrap();
        assert_eq!(talk.title, "Building Things");
        assert_eq!(talk.normalized_category(), "talk");
        assert_eq!(talk.primary_speaker().unwrap().name, "Dana Doe");
        assert_eq!(talk.start_time.format("%H:%M").to_string(), "09:00");
    }

    #[test]
    fn test_directory_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("day-2");
        fs::create_dir(&nested).unwrap();

        write_talk(dir.path(), "2021-10-22-09-00-b.md", GOOD_TALK);
        write_talk(dir.path(), "2021-10-22-08-00-a.md", GOOD_TALK);
        write_talk(&nested, "2021-10-23-09-00-c.md", GOOD_TALK);
        // non-markdown files are not talks
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let loaded = catalog().load(dir.path()).unwrap();
        assert_eq!(loaded.talks.len(), 3);
        assert!(loaded.failures.is_empty());

        let names: Vec<_> = loaded
            .talks
            .iter()
            .map(|e| e.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "2021-10-22-08-00-a.md",
                "2021-10-22-09-00-b.md",
                "2021-10-23-09-00-c.md"
            ]
        );
    }

    #[test]
    fn test_bad_file_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        write_talk(dir.path(), "2021-10-22-08-00-a.md", GOOD_TALK);
        write_talk(dir.path(), "2021-10-22-09-00-bad.md", "no front matter here");

        let loaded = catalog().load(dir.path()).unwrap();
        assert_eq!(loaded.talks.len(), 1);
        assert_eq!(loaded.failures.len(), 1);
        assert!(matches!(
            loaded.failures[0].error,
            CatalogError::MissingFrontMatter(_)
        ));
    }

    #[test]
    fn test_missing_date_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_talk(
            dir.path(),
            "talk.md",
            "+++\ntitle = \"T\"\ncategory = \"talk\"\n+++\n",
        );
        assert!(matches!(
            catalog().load_talk(&path).unwrap_err(),
            CatalogError::MissingField { field: "date", .. }
        ));
    }

    #[test]
    fn test_string_date_form() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_talk(
            dir.path(),
            "talk.md",
            "+++\ntitle = \"T\"\ncategory = \"talk\"\ndate = \"2021-10-22 09:00:00\"\n+++\n",
        );
        let talk = catalog().load_talk(&path).unwrap();
        assert_eq!(talk.start_time.format("%z").to_string(), "-0500");
    }

    #[test]
    fn test_empty_presenters_allowed_at_load() {
        // The skip decision belongs to the dispatcher, not the loader
        let dir = tempfile::tempdir().unwrap();
        let path = write_talk(
            dir.path(),
            "talk.md",
            "+++\ntitle = \"T\"\ncategory = \"talk\"\ndate = \"2021-10-22 09:00:00\"\n+++\n",
        );
        let talk = catalog().load_talk(&path).unwrap();
        assert!(talk.primary_speaker().is_none());
    }
}
