//! Stable code point assignment for icon glyphs.
//!
//! Every icon that ever shipped in a font keeps its code point forever. New
//! icons are numbered above the highest code point seen so far, in name
//! order, so rebuilding from the same state always yields the same map.
//!
//! The map is persisted between builds as a JSON object of icon name to
//! lowercase hex string, e.g. `{"home": "ea02"}`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Code points at or below this value are never handed out automatically.
pub const DEFAULT_FLOOR: u32 = 59905;

/// Icon name to code point, ordered by name.
pub type CodepointMap = BTreeMap<String, u32>;

#[derive(Debug, Error)]
pub enum UnicodeError {
    #[error("IO error when reading `{0}`")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("IO error when writing `{0}`")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("`{0}` is not a valid code point map")]
    Malformed(PathBuf, #[source] serde_json::Error),

    #[error("`{path}`: code point `{value}` of `{name}` is not a hexadecimal number")]
    InvalidCodepoint {
        path: PathBuf,
        name: String,
        value: String,
    },

    #[error("`{path}`: `{first}` and `{second}` share code point U+{codepoint:04X}")]
    DuplicateCodepoint {
        path: PathBuf,
        first: String,
        second: String,
        codepoint: u32,
    },

    #[error("no code points left above U+{0:04X}")]
    Exhausted(u32),
}

/// Extend `existing` so that every name in `requested` has a code point.
///
/// Entries already present are returned untouched, including those whose
/// icon is no longer requested.
pub fn assign<S: AsRef<str>>(
    existing: &CodepointMap,
    requested: &[S],
    floor: u32,
) -> Result<CodepointMap, UnicodeError> {
    let mut fresh: Vec<&str> = requested
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !existing.contains_key(*name))
        .collect();
    fresh.sort_unstable();
    fresh.dedup();

    let mut assigned = existing.clone();
    let mut current = existing.values().copied().fold(floor, u32::max);

    for name in fresh {
        current = next_codepoint(current)?;
        assigned.insert(name.to_owned(), current);
    }

    Ok(assigned)
}

/// Smallest scalar value above `after` (surrogates are skipped).
fn next_codepoint(after: u32) -> Result<u32, UnicodeError> {
    let mut next = after.checked_add(1).ok_or(UnicodeError::Exhausted(after))?;
    while char::from_u32(next).is_none() {
        if next >= char::MAX as u32 {
            return Err(UnicodeError::Exhausted(after));
        }
        next += 1;
    }
    Ok(next)
}

/// Lowercase hex form used in the state file and icon metadata.
pub fn format_codepoint(codepoint: u32) -> String {
    format!("{codepoint:x}")
}

/// Load the persisted map. A missing file is an empty map; anything else
/// that cannot be read back exactly is an error.
pub fn load_state(path: &Path) -> Result<CodepointMap, UnicodeError> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_state(&text, path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CodepointMap::new()),
        Err(e) => Err(UnicodeError::Read(path.to_owned(), e)),
    }
}

fn parse_state(text: &str, path: &Path) -> Result<CodepointMap, UnicodeError> {
    let raw: BTreeMap<String, String> =
        serde_json::from_str(text).map_err(|e| UnicodeError::Malformed(path.to_owned(), e))?;

    let mut map = CodepointMap::new();
    let mut owners: BTreeMap<u32, String> = BTreeMap::new();

    for (name, value) in raw {
        let codepoint = u32::from_str_radix(&value, 16)
            .ok()
            .filter(|c| char::from_u32(*c).is_some())
            .ok_or_else(|| UnicodeError::InvalidCodepoint {
                path: path.to_owned(),
                name: name.clone(),
                value: value.clone(),
            })?;

        if let Some(first) = owners.insert(codepoint, name.clone()) {
            return Err(UnicodeError::DuplicateCodepoint {
                path: path.to_owned(),
                first,
                second: name,
                codepoint,
            });
        }
        map.insert(name, codepoint);
    }

    Ok(map)
}

/// Write the map back, creating the parent directory if needed.
pub fn save_state(path: &Path, map: &CodepointMap) -> Result<(), UnicodeError> {
    let raw: BTreeMap<&str, String> = map
        .iter()
        .map(|(name, codepoint)| (name.as_str(), format_codepoint(*codepoint)))
        .collect();

    // Serializing a string map cannot fail.
    let json = serde_json::to_string_pretty(&raw).unwrap_or_default();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| UnicodeError::Write(path.to_owned(), e))?;
    }
    std::fs::write(path, json + "\n").map_err(|e| UnicodeError::Write(path.to_owned(), e))
}
