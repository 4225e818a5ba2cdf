//! Release notes from version control.
//!
//! Icon sources live in `src/_icons/`; their status lines in `git diff
//! --name-status` and `git status` tell which icons were added, fixed or
//! renamed.

use crate::exec::Cmd;
use anyhow::{Context, Result};
use regex::Regex;
use std::fmt::Write;
use std::path::Path;
use std::sync::LazyLock;

static DIFF_ADDED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^A\s+src/_icons/([a-z0-9-]+)\.svg").expect("valid regex"));
static DIFF_MODIFIED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^M\s+src/_icons/([a-z0-9-]+)\.svg").expect("valid regex"));
static DIFF_RENAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^R[0-9]+\s+src/_icons/([a-z0-9-]+)\.svg\s+src/_icons/([a-z0-9-]+)\.svg")
        .expect("valid regex")
});

static STATUS_ADDED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"new file:\s+src/_icons/([a-z0-9-]+)\.svg").expect("valid regex"));
static STATUS_MODIFIED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"modified:\s+src/_icons/([a-z0-9-]+)\.svg").expect("valid regex"));
static STATUS_RENAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"renamed:\s+src/_icons/([a-z0-9-]+)\.svg -> src/_icons/([a-z0-9-]+)\.svg")
        .expect("valid regex")
});

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IconChanges {
    pub added: Vec<String>,
    /// Never contains a name from `added`
    pub modified: Vec<String>,
    pub renamed: Vec<(String, String)>,
}

impl IconChanges {
    fn collect(text: &str, added: &Regex, modified: &Regex, renamed: &Regex) -> Self {
        let names = |re: &Regex| -> Vec<String> {
            re.captures_iter(text).map(|c| c[1].to_string()).collect()
        };

        let added = names(added);
        let modified = names(modified)
            .into_iter()
            .filter(|name| !added.contains(name))
            .collect();
        let renamed = renamed
            .captures_iter(text)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect();

        Self {
            added,
            modified,
            renamed,
        }
    }

    /// Parse `git diff --name-status` output.
    pub fn from_name_status(text: &str) -> Self {
        Self::collect(text, &DIFF_ADDED, &DIFF_MODIFIED, &DIFF_RENAMED)
    }

    /// Parse `git status` output.
    pub fn from_status(text: &str) -> Self {
        Self::collect(text, &STATUS_ADDED, &STATUS_MODIFIED, &STATUS_RENAMED)
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.renamed.is_empty()
    }

    /// Changes between `tag` and `HEAD`.
    pub fn since(root: &Path, tag: &str) -> Result<Self> {
        let output = Cmd::new("git")
            .args(["diff", tag, "HEAD", "--name-status"])
            .cwd(root)
            .run()
            .with_context(|| format!("Failed to diff against {tag}"))?;
        Ok(Self::from_name_status(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Changes staged in the working tree.
    pub fn uncommitted(root: &Path) -> Result<Self> {
        let output = Cmd::new("git").arg("status").cwd(root).run()?;
        Ok(Self::from_status(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("`{n}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Changelog text; `pretty` lists new icons as a Markdown section.
pub fn format_changelog(changes: &IconChanges, pretty: bool) -> String {
    let mut out = String::new();

    if !changes.added.is_empty() {
        if pretty {
            let _ = writeln!(out, "### {} new icons:", changes.added.len());
            for icon in &changes.added {
                let _ = writeln!(out, "- `{icon}`");
            }
        } else {
            let _ = writeln!(
                out,
                "{} new icons: {}",
                changes.added.len(),
                quoted_list(&changes.added)
            );
        }
        out.push('\n');
    }

    if !changes.modified.is_empty() {
        let _ = writeln!(out, "Fixed icons: {}\n", quoted_list(&changes.modified));
    }

    if !changes.renamed.is_empty() {
        out.push_str("Renamed icons: \n");
        for (from, to) in &changes.renamed {
            let _ = writeln!(out, "- `{from}` renamed to `{to}`");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME_STATUS: &str = "\
A\tsrc/_icons/brand-rust.svg
M\tsrc/_icons/home.svg
M\tsrc/_icons/brand-rust.svg
M\tsrc/_icons/README.md
R087\tsrc/_icons/trash-2.svg\tsrc/_icons/trash-x.svg
A\ticons/brand-rust.svg
A\tsrc/_icons/zoom-in-area.svg
";

    const STATUS: &str = "\
On branch main
Changes to be committed:
  (use \"git restore --staged <file>...\" to unstage)
\tnew file:   src/_icons/brand-rust.svg
\tmodified:   src/_icons/home.svg
\trenamed:    src/_icons/trash-2.svg -> src/_icons/trash-x.svg
";

    #[test]
    fn test_name_status() {
        let changes = IconChanges::from_name_status(NAME_STATUS);
        assert_eq!(changes.added, ["brand-rust", "zoom-in-area"]);
        assert_eq!(changes.modified, ["home"]);
        assert_eq!(changes.renamed, [("trash-2".to_string(), "trash-x".to_string())]);
    }

    #[test]
    fn test_status() {
        let changes = IconChanges::from_status(STATUS);
        assert_eq!(changes.added, ["brand-rust"]);
        assert_eq!(changes.modified, ["home"]);
        assert_eq!(changes.renamed, [("trash-2".to_string(), "trash-x".to_string())]);
    }

    #[test]
    fn test_compact_format() {
        let text = format_changelog(&IconChanges::from_name_status(NAME_STATUS), false);
        assert_eq!(
            text,
            "2 new icons: `brand-rust`, `zoom-in-area`\n\n\
             Fixed icons: `home`\n\n\
             Renamed icons: \n- `trash-2` renamed to `trash-x`\n"
        );
    }

    #[test]
    fn test_pretty_format() {
        let text = format_changelog(&IconChanges::from_name_status(NAME_STATUS), true);
        assert!(text.starts_with("### 2 new icons:\n- `brand-rust`\n- `zoom-in-area`\n\n"));
    }

    #[test]
    fn test_no_changes() {
        let changes = IconChanges::from_name_status("M\tREADME.md\n");
        assert!(changes.is_empty());
        assert_eq!(format_changelog(&changes, true), "");
    }
}
