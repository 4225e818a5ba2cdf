//! Outlined glyph sources.
//!
//! Icons are drawn with strokes; fonts only know filled shapes. Every
//! selected icon is expanded into a filled outline on a 1000 unit canvas and
//! written as `u{CODE}-{name}.svg`, then `fontforge` removes overlaps and
//! fixes contour directions in place.

use crate::exec::Cmd;
use crate::svg_parser::{glyph_filename, outline_svg, IconSource};
use crate::{debug, log};
use anyhow::{Context, Result};
use kurbo::Affine;
use std::path::Path;

/// Size of the outlined canvas, matching the font's units per em.
pub const CANVAS: f64 = 1000.0;

const FIX_OUTLINE_SCRIPT: &str = include_str!("fix-outline.py");

/// Apply the stroke width override to an icon source.
pub fn apply_stroke_width(svg: &str, stroke_width: Option<&str>) -> String {
    match stroke_width {
        Some(width) => svg.replace(r#"stroke-width="2""#, &format!(r#"stroke-width="{width}""#)),
        None => svg.to_string(),
    }
}

/// Expand one icon source into an outlined SVG document.
pub fn outline_icon(svg: &str, stroke_width: Option<&str>) -> Result<String> {
    let svg = apply_stroke_width(svg, stroke_width);

    // Parse once to learn the canvas so the stroker can work at output scale.
    let (_, width, height) = outline_svg(&svg, 1.0)?;
    let scale = CANVAS / width.max(height);
    let (path, _, _) = outline_svg(&svg, scale as f32)?;

    let scaled = Affine::scale(scale) * path;

    Ok(format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}"><path d="{d}" fill="black"/></svg>"#,
        size = CANVAS,
        d = scaled.to_svg()
    ))
}

/// Write the outlined sources of `icons` into `dir`, which is emptied first.
pub fn write_outlined(
    icons: &[(&IconSource, u32)],
    dir: &Path,
    stroke_width: Option<&str>,
) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)
            .with_context(|| format!("Failed to clear {}", dir.display()))?;
    }
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    for (icon, codepoint) in icons {
        debug!("outline"; "{} (U+{:04X})", icon.name, codepoint);

        let svg = std::fs::read_to_string(&icon.path)
            .with_context(|| format!("Failed to read {}", icon.path.display()))?;
        let outlined = outline_icon(&svg, stroke_width)
            .with_context(|| format!("Failed to outline {}", icon.path.display()))?;

        let target = dir.join(glyph_filename(*codepoint, &icon.name));
        std::fs::write(&target, outlined)
            .with_context(|| format!("Failed to write {}", target.display()))?;
    }

    log!("outline"; "{} icons outlined", icons.len());
    Ok(())
}

/// Run the fontforge correction pass over `dir`.
///
/// The bundled script is written to `script` unless a customised copy
/// already exists there.
pub fn fix_outline(font_forge: &str, script: &Path, dir: &Path) -> Result<()> {
    if !script.exists() {
        if let Some(parent) = script.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(script, FIX_OUTLINE_SCRIPT)
            .with_context(|| format!("Failed to write {}", script.display()))?;
    }

    let cmd = Cmd::new(font_forge)
        .arg("-lang=py")
        .arg("-script")
        .arg(script)
        .arg(dir)
        .inherit(true);
    cmd.ensure_available()?;

    cmd.run().context("Correcting outline directions failed")?;
    log!("outline"; "correcting outline directions exited with code 0");
    Ok(())
}
