//! SVG sprites: every icon as a `<symbol>` in one file.

use regex::Regex;
use std::sync::LazyLock;

static SVG_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<svg[^>]+>").expect("valid regex"));
static NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").expect("valid regex"));
static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").expect("valid regex"));
static DEFAULT_STROKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"stroke-width="2"\s"#).expect("valid regex"));

/// Inner markup of an icon document, on one line.
fn inner_markup(svg: &str) -> String {
    let inner = SVG_OPEN.replace_all(svg, "");
    let inner = inner.replace("</svg>", "");
    let inner = NEWLINES.replace_all(&inner, "");
    BETWEEN_TAGS.replace_all(&inner, "><").trim().to_string()
}

/// Build the sprite from `(name, svg source)` pairs.
pub fn build_sprite(icons: &[(String, String)], prefix: &str) -> String {
    let mut symbols = String::new();

    for (name, svg) in icons {
        symbols.push_str(&format!(
            r#"<symbol id="{prefix}-{name}" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round">{}</symbol>"#,
            inner_markup(svg)
        ));
    }

    format!(r#"<svg xmlns="http://www.w3.org/2000/svg"><defs>{symbols}</defs></svg>"#)
}

/// The sprite without the default stroke width, so it can be set from CSS.
pub fn without_stroke_width(sprite: &str) -> String {
    DEFAULT_STROKE.replace_all(sprite, "").into_owned()
}
