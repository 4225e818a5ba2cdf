//! Per-icon metadata (`tags.json`).
//!
//! The file is an object keyed by icon name; each record carries at least a
//! `category`. The `unicode` field is a copy of the code point map and is
//! rewritten on every font build.

use crate::unicode::{format_codepoint, CodepointMap};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Tags = Map<String, Value>;

#[derive(Debug, Error)]
pub enum TagsError {
    #[error("IO error when reading `{0}`")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("IO error when writing `{0}`")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("`{0}` is not a valid metadata file")]
    Malformed(PathBuf, #[source] serde_json::Error),

    #[error("`{path}`: metadata of `{name}` is not an object")]
    NotObject { path: PathBuf, name: String },

    #[error("`{path}`: metadata of `{name}` has no `category`")]
    MissingCategory { path: PathBuf, name: String },
}

pub fn load_tags(path: &Path) -> Result<Tags, TagsError> {
    let text =
        std::fs::read_to_string(path).map_err(|e| TagsError::Read(path.to_owned(), e))?;
    parse_tags(&text, path)
}

fn parse_tags(text: &str, path: &Path) -> Result<Tags, TagsError> {
    let tags: Tags =
        serde_json::from_str(text).map_err(|e| TagsError::Malformed(path.to_owned(), e))?;

    for (name, record) in &tags {
        let Some(record) = record.as_object() else {
            return Err(TagsError::NotObject {
                path: path.to_owned(),
                name: name.clone(),
            });
        };
        if !record.get("category").is_some_and(Value::is_string) {
            return Err(TagsError::MissingCategory {
                path: path.to_owned(),
                name: name.clone(),
            });
        }
    }

    Ok(tags)
}

/// Names of the icons whose `category` equals `category`, in file order.
pub fn icons_in_category<'a>(tags: &'a Tags, category: &'a str) -> impl Iterator<Item = &'a str> {
    tags.iter()
        .filter(move |(_, record)| record.get("category").and_then(Value::as_str) == Some(category))
        .map(|(name, _)| name.as_str())
}

/// Project the code point map onto the metadata records.
///
/// Icons without an assignment lose any stale `unicode` field.
pub fn merge_unicode(tags: &mut Tags, codepoints: &CodepointMap) {
    for (name, record) in tags.iter_mut() {
        let Some(record) = record.as_object_mut() else {
            continue;
        };
        match codepoints.get(name) {
            Some(codepoint) => {
                record.insert("unicode".into(), Value::String(format_codepoint(*codepoint)));
            }
            None => {
                record.remove("unicode");
            }
        }
    }
}

pub fn save_tags(path: &Path, tags: &Tags) -> Result<(), TagsError> {
    // A map of JSON values always serializes.
    let json = serde_json::to_string_pretty(tags).unwrap_or_default();
    std::fs::write(path, json).map_err(|e| TagsError::Write(path.to_owned(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAGS: &str = r#"{
        "home": { "category": "Buildings", "tags": ["house"] },
        "bell": { "category": "System", "unicode": "ffff" },
        "building": { "category": "Buildings" }
    }"#;

    #[test]
    fn test_icons_in_category() {
        let tags = parse_tags(TAGS, Path::new("tags.json")).unwrap();
        let names: Vec<_> = icons_in_category(&tags, "Buildings").collect();
        assert_eq!(names, ["home", "building"]);
        assert_eq!(icons_in_category(&tags, "buildings").count(), 0);
    }

    #[test]
    fn test_merge_unicode() {
        let mut tags = parse_tags(TAGS, Path::new("tags.json")).unwrap();
        let codepoints: CodepointMap = [("home".to_string(), 0xea02)].into_iter().collect();

        merge_unicode(&mut tags, &codepoints);

        assert_eq!(tags["home"]["unicode"], "ea02");
        assert_eq!(tags["home"]["category"], "Buildings");
        assert!(tags["bell"].get("unicode").is_none());
        assert!(tags["building"].get("unicode").is_none());

        // Field order of the existing records is kept.
        let keys: Vec<_> = tags["home"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["category", "tags", "unicode"]);
    }

    #[test]
    fn test_record_must_be_object() {
        let err = parse_tags(r#"{"home": "Buildings"}"#, Path::new("tags.json")).unwrap_err();
        assert!(matches!(err, TagsError::NotObject { .. }));
    }

    #[test]
    fn test_record_needs_category() {
        let err = parse_tags(r#"{"home": {"tags": ["house"]}}"#, Path::new("tags.json"))
            .unwrap_err();
        assert!(matches!(err, TagsError::MissingCategory { ref name, .. } if name == "home"));

        let err = parse_tags(r#"{"home": {"category": 3}}"#, Path::new("tags.json")).unwrap_err();
        assert!(matches!(err, TagsError::MissingCategory { .. }));
    }
}
