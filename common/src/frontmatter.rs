// Front matter parsing for talk files and notification artifacts
//
// Files carry a TOML metadata header between `+++` fences followed by a
// free-text body:
//
//   +++
//   title = "..."
//   category = "talk"
//   date = 2021-10-22T09:00:00-05:00
//   +++
//   body text

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

const FENCE: &str = "+++";

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("missing '+++' front matter fences")]
    Missing,

    #[error("{0}")]
    Invalid(String),
}

/// Split a document into its raw header and body.
///
/// The opening fence must be the first non-empty line; the body is
/// everything after the closing fence, with one leading newline stripped.
pub fn split(text: &str) -> Result<(&str, &str), FrontMatterError> {
    let trimmed = text.trim_start_matches(['\u{feff}']).trim_start();
    let rest = trimmed
        .strip_prefix(FENCE)
        .ok_or(FrontMatterError::Missing)?;
    let rest = rest.strip_prefix('\n').unwrap_or(rest);

    let close = rest
        .find(&format!("\n{FENCE}"))
        .ok_or(FrontMatterError::Missing)?;
    let header = &rest[..close];
    let body = &rest[close + 1 + FENCE.len()..];
    let body = body.strip_prefix('\n').unwrap_or(body);

    Ok((header, body))
}

/// Parse a document into typed metadata and its body text.
pub fn parse<T: DeserializeOwned>(text: &str) -> Result<(T, String), FrontMatterError> {
    let (header, body) = split(text)?;
    let meta: T = toml::from_str(header).map_err(|e| FrontMatterError::Invalid(e.to_string()))?;
    Ok((meta, body.to_string()))
}

/// Serialize metadata and a body back into a fenced document.
pub fn compose<T: Serialize>(meta: &T, body: &str) -> Result<String, FrontMatterError> {
    let header = toml::to_string(meta).map_err(|e| FrontMatterError::Invalid(e.to_string()))?;
    Ok(format!("{FENCE}\n{header}{FENCE}\n{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Meta {
        title: String,
        category: String,
    }

    #[test]
    fn test_split_and_parse() {
        let doc = "+++\ntitle = \"Intro\"\ncategory = \"talk\"\n+++\nbody line\n";
        let (meta, body) = parse::<Meta>(doc).unwrap();
        assert_eq!(meta.title, "Intro");
        assert_eq!(meta.category, "talk");
        assert_eq!(body, "body line\n");
    }

    #[test]
    fn test_missing_fences() {
        assert!(matches!(
            parse::<Meta>("title = \"x\"").unwrap_err(),
            FrontMatterError::Missing
        ));
        assert!(matches!(
            parse::<Meta>("+++\ntitle = \"x\"").unwrap_err(),
            FrontMatterError::Missing
        ));
    }

    #[test]
    fn test_invalid_header() {
        let doc = "+++\nnot toml at all ===\n+++\n";
        assert!(matches!(
            parse::<Meta>(doc).unwrap_err(),
            FrontMatterError::Invalid(_)
        ));
    }

    #[test]
    fn test_compose_round_trip() {
        let meta = Meta {
            title: "Round".to_string(),
            category: "talk".to_string(),
        };
        let doc = compose(&meta, "the content\n").unwrap();
        let (parsed, body) = parse::<Meta>(&doc).unwrap();
        assert_eq!(parsed, meta);
        assert_eq!(body, "the content\n");
    }

    #[test]
    fn test_empty_body() {
        let doc = "+++\ntitle = \"t\"\ncategory = \"c\"\n+++";
        let (_, body) = parse::<Meta>(doc).unwrap();
        assert!(body.is_empty());
    }
}
