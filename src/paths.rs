//! Project directory layout.

use std::path::{Path, PathBuf};

/// Every file and directory the pipeline reads or writes, relative to the
/// project root.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    /// Source icons (`icons/*.svg`)
    pub icons: PathBuf,
    /// Scratch directory for outlined glyph sources
    pub outlined: PathBuf,
    /// Font, stylesheet and HTML preview output
    pub iconfont: PathBuf,
    pub fonts: PathBuf,
    /// Persisted code point assignments
    pub unicode_state: PathBuf,
    pub fix_outline_script: PathBuf,
    pub tags: PathBuf,
    pub compile_options: PathBuf,
    pub png: PathBuf,
    pub github: PathBuf,
    pub site: PathBuf,
    pub packages: PathBuf,
}

impl Layout {
    pub fn new(root: &Path) -> Self {
        let build = root.join(".build");
        let iconfont = root.join("iconfont");
        Self {
            root: root.to_owned(),
            icons: root.join("icons"),
            outlined: root.join("icons-outlined"),
            fonts: iconfont.join("fonts"),
            iconfont,
            unicode_state: build.join("iconfont-unicode.json"),
            fix_outline_script: build.join("fix-outline.py"),
            tags: root.join("tags.json"),
            compile_options: root.join("compile-options.json"),
            png: root.join("icons-png"),
            github: root.join(".github"),
            site: root.join("_site"),
            packages: root.join("packages-zip"),
        }
    }

    /// `{font}-sprite.svg` and its no-stroke sibling.
    pub fn sprites(&self, font_name: &str) -> (PathBuf, PathBuf) {
        (
            self.root.join(format!("{font_name}-sprite.svg")),
            self.root.join(format!("{font_name}-sprite-nostroke.svg")),
        )
    }
}
