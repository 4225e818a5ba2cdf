//! Compile options (`compile-options.json`).
//!
//! The file is optional. When present it is validated in full before any
//! icon is processed and folded into an immutable [`CompileOptions`].
//!
//! ```json
//! {
//!   "includeIcons": ["home", "star"],
//!   "includeCategories": "arrows devices",
//!   "excludeIcons": ["star"],
//!   "excludeOffIcons": true,
//!   "strokeWidth": 1.5,
//!   "fontForge": "/usr/local/bin/fontforge"
//! }
//! ```

use crate::tags::{icons_in_category, load_tags, Tags, TagsError};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("error reading `{0}`")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("`{path}`: {message}")]
    Validation { path: PathBuf, message: String },

    #[error("`includeCategories` needs icon metadata")]
    Tags(#[from] TagsError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawOptions {
    include_icons: Option<Vec<String>>,
    include_categories: Option<Categories>,
    exclude_icons: Option<Vec<String>>,
    exclude_off_icons: Option<bool>,
    stroke_width: Option<StrokeWidth>,
    font_forge: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Categories {
    List(Vec<String>),
    Words(String),
}

impl Categories {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(list) => list,
            Self::Words(words) => words
                .split(' ')
                .filter(|w| !w.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StrokeWidth {
    Number(serde_json::Number),
    Text(String),
}

/// Validated build options.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
    exclude_off: bool,
    /// Replaces `stroke-width="2"` in icon sources before outlining.
    pub stroke_width: Option<String>,
    /// Outline-correction binary.
    pub font_forge: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            include: BTreeSet::new(),
            exclude: BTreeSet::new(),
            exclude_off: false,
            stroke_width: None,
            font_forge: "fontforge".into(),
        }
    }
}

impl CompileOptions {
    /// Load options from `path`, or the defaults when it does not exist.
    ///
    /// `tags_path` is only read when the file selects icons by category.
    pub fn load(path: &Path, tags_path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_owned(), e))?;
        Self::from_json(&text, path, || load_tags(tags_path))
    }

    fn from_json(
        text: &str,
        path: &Path,
        tags: impl FnOnce() -> Result<Tags, TagsError>,
    ) -> Result<Self, ConfigError> {
        let raw: RawOptions =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(path.to_owned(), e))?;
        let invalid = |message: String| ConfigError::Validation {
            path: path.to_owned(),
            message,
        };

        let mut options = Self::default();
        options.include.extend(raw.include_icons.unwrap_or_default());

        if let Some(categories) = raw.include_categories {
            let categories = categories.into_vec();
            if !categories.is_empty() {
                let tags = tags()?;
                for category in categories.iter().map(|c| capitalize(c)) {
                    options
                        .include
                        .extend(icons_in_category(&tags, &category).map(String::from));
                }
            }
        }

        options.exclude.extend(raw.exclude_icons.unwrap_or_default());
        options.exclude_off = raw.exclude_off_icons.unwrap_or(false);

        if let Some(width) = raw.stroke_width {
            let width = match width {
                StrokeWidth::Number(n) => n.to_string(),
                StrokeWidth::Text(s) => s.trim().to_string(),
            };
            match width.parse::<f64>() {
                Ok(w) if w > 0.0 && w.is_finite() => options.stroke_width = Some(width),
                _ => {
                    return Err(invalid(format!(
                        "`strokeWidth` must be a positive number, got `{width}`"
                    )))
                }
            }
        }

        if let Some(font_forge) = raw.font_forge {
            if font_forge.trim().is_empty() {
                return Err(invalid("`fontForge` must not be empty".into()));
            }
            options.font_forge = font_forge;
        }

        Ok(options)
    }

    /// Whether the icon takes part in the font build.
    pub fn is_selected(&self, name: &str) -> bool {
        (self.include.is_empty() || self.include.contains(name))
            && !self.exclude.contains(name)
            && !(self.exclude_off && name.ends_with("-off"))
    }

    pub fn select<'a>(&self, names: &'a [String]) -> Vec<&'a str> {
        names
            .iter()
            .map(String::as_str)
            .filter(|name| self.is_selected(name))
            .collect()
    }
}

/// Categories in the metadata are capitalised (`"arrows"` → `"Arrows"`).
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_tags() -> Result<Tags, TagsError> {
        panic!("metadata should not be read");
    }

    fn parse(text: &str) -> Result<CompileOptions, ConfigError> {
        CompileOptions::from_json(text, Path::new("compile-options.json"), no_tags)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults_select_everything() {
        let options = parse("{}").unwrap();
        let icons = names(&["home", "star", "bell-off"]);
        assert_eq!(options.select(&icons), ["home", "star", "bell-off"]);
        assert_eq!(options.font_forge, "fontforge");
        assert!(options.stroke_width.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let options = CompileOptions::load(
            &dir.path().join("compile-options.json"),
            &dir.path().join("tags.json"),
        )
        .unwrap();
        assert!(options.is_selected("anything"));
    }

    #[test]
    fn test_include_and_exclude() {
        let options = parse(
            r#"{"includeIcons": ["home", "star", "bell-off"], "excludeIcons": ["star"], "excludeOffIcons": true}"#,
        )
        .unwrap();
        let icons = names(&["home", "star", "bell-off", "moon"]);
        assert_eq!(options.select(&icons), ["home"]);
    }

    #[test]
    fn test_exclude_without_include_list() {
        let options = parse(r#"{"excludeIcons": ["star"], "excludeOffIcons": true}"#).unwrap();
        let icons = names(&["home", "star", "bell-off"]);
        assert_eq!(options.select(&icons), ["home"]);
    }

    #[test]
    fn test_include_categories() {
        let tags = || {
            Ok(serde_json::from_str::<Tags>(
                r#"{"home": {"category": "Buildings"}, "bell": {"category": "System"}, "star": {"category": "Shapes"}}"#,
            )
            .unwrap())
        };

        let words = CompileOptions::from_json(
            r#"{"includeCategories": "buildings system"}"#,
            Path::new("compile-options.json"),
            tags,
        )
        .unwrap();
        assert_eq!(words.select(&names(&["home", "bell", "star"])), ["home", "bell"]);

        let list = CompileOptions::from_json(
            r#"{"includeCategories": ["shapes"], "includeIcons": ["home"]}"#,
            Path::new("compile-options.json"),
            tags,
        )
        .unwrap();
        assert_eq!(list.select(&names(&["home", "bell", "star"])), ["home", "star"]);
    }

    #[test]
    fn test_stroke_width_and_font_forge() {
        let options = parse(r#"{"strokeWidth": 1.5, "fontForge": "/opt/ff"}"#).unwrap();
        assert_eq!(options.stroke_width.as_deref(), Some("1.5"));
        assert_eq!(options.font_forge, "/opt/ff");

        let options = parse(r#"{"strokeWidth": "1.25"}"#).unwrap();
        assert_eq!(options.stroke_width.as_deref(), Some("1.25"));
    }

    #[test]
    fn test_type_mismatches_are_rejected() {
        assert!(matches!(parse(r#"{"includeIcons": "home"}"#), Err(ConfigError::Parse(..))));
        assert!(matches!(parse(r#"{"includeCategories": 3}"#), Err(ConfigError::Parse(..))));
        assert!(matches!(parse(r#"{"excludeIcons": {}}"#), Err(ConfigError::Parse(..))));
        assert!(matches!(parse(r#"{"strokeWidth": true}"#), Err(ConfigError::Parse(..))));
        assert!(matches!(parse(r#"{"fontForge": 1}"#), Err(ConfigError::Parse(..))));
        assert!(matches!(parse("[]"), Err(ConfigError::Parse(..))));
        assert!(matches!(
            parse(r#"{"strokeWidth": "thin"}"#),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(matches!(parse(r#"{"includeIcon": ["home"]}"#), Err(ConfigError::Parse(..))));
    }
}
