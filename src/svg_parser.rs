use anyhow::{Context, Result};
use kurbo::BezPath;
use std::path::{Path, PathBuf};
use usvg::{Options, Tree};
use walkdir::WalkDir;

/// An icon source file (`icons/{name}.svg`)
#[derive(Debug, Clone)]
pub struct IconSource {
    /// File stem, e.g. "arrow-left"
    pub name: String,
    pub path: PathBuf,
}

/// Represents a parsed glyph with its name and outline
#[derive(Debug, Clone)]
pub struct Icon {
    pub name: String,
    /// Filled outline of every visible path
    pub path: BezPath,
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Unicode codepoint assigned to this icon
    pub codepoint: u32,
}

/// List the SVG files directly inside `dir`, sorted by name
pub fn list_icons(dir: &Path) -> Result<Vec<IconSource>> {
    if !dir.is_dir() {
        anyhow::bail!("Icon directory {} does not exist", dir.display());
    }

    let mut icons: Vec<IconSource> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "svg"))
        .filter_map(|e| {
            let name = e.path().file_stem()?.to_str()?.to_string();
            Some(IconSource {
                name,
                path: e.into_path(),
            })
        })
        .collect();

    icons.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(icons)
}

/// File name of an outlined glyph source, e.g. "uEA02-home.svg"
pub fn glyph_filename(codepoint: u32, name: &str) -> String {
    format!("u{codepoint:04X}-{name}.svg")
}

/// Split "uEA02-home" into its codepoint and icon name
pub fn parse_glyph_filename(stem: &str) -> Option<(u32, &str)> {
    let (hex, name) = stem.strip_prefix('u')?.split_once('-')?;
    if hex.is_empty() || name.is_empty() {
        return None;
    }
    let codepoint = u32::from_str_radix(hex, 16).ok()?;
    char::from_u32(codepoint)?;
    Some((codepoint, name))
}

/// Parse every outlined glyph source in a directory
pub fn parse_glyph_directory(dir: &Path) -> Result<Vec<Icon>> {
    let mut icons = Vec::new();

    for source in list_icons(dir)? {
        let (codepoint, name) = parse_glyph_filename(&source.name).with_context(|| {
            format!("{} is not named u<CODEPOINT>-<name>.svg", source.path.display())
        })?;

        let svg = std::fs::read_to_string(&source.path)
            .with_context(|| format!("Failed to read {}", source.path.display()))?;
        let (path, width, height) = outline_svg(&svg, 1.0)
            .with_context(|| format!("Failed to parse SVG: {}", source.path.display()))?;

        icons.push(Icon {
            name: name.to_string(),
            path,
            width,
            height,
            codepoint,
        });
    }

    icons.sort_by_key(|icon| icon.codepoint);
    Ok(icons)
}

/// Parse an SVG document into one filled outline
///
/// Fills are taken as-is; strokes are expanded into their outlines.
/// `resolution_scale` is the factor the result will later be scaled by,
/// so curves are flattened finely enough. Returns the path and canvas size.
pub fn outline_svg(svg: &str, resolution_scale: f32) -> Result<(BezPath, f64, f64)> {
    let tree = Tree::from_str(svg, &Options::default())?;
    let size = tree.size();

    let mut combined = BezPath::new();
    collect_outlines_recursive(tree.root(), resolution_scale, &mut combined);

    Ok((combined, size.width() as f64, size.height() as f64))
}

/// Recursively collect outlines from a group and its children
fn collect_outlines_recursive(group: &usvg::Group, resolution_scale: f32, combined: &mut BezPath) {
    for node in group.children() {
        match node {
            usvg::Node::Path(ref path) => {
                let transform = path.abs_transform();

                if path.fill().is_some() {
                    if let Some(data) = path.data().clone().transform(transform) {
                        append_path(&data, combined);
                    }
                }

                if let Some(stroke) = path.stroke() {
                    let outline = path
                        .data()
                        .stroke(&stroke.to_tiny_skia(), resolution_scale)
                        .and_then(|p| p.transform(transform));
                    if let Some(outline) = outline {
                        append_path(&outline, combined);
                    }
                }
            }
            usvg::Node::Group(ref g) => {
                collect_outlines_recursive(g, resolution_scale, combined);
            }
            _ => {}
        }
    }
}

/// Append a tiny-skia path to a kurbo BezPath
fn append_path(data: &usvg::tiny_skia_path::Path, bez: &mut BezPath) {
    for segment in data.segments() {
        match segment {
            usvg::tiny_skia_path::PathSegment::MoveTo(pt) => {
                bez.move_to((pt.x as f64, pt.y as f64));
            }
            usvg::tiny_skia_path::PathSegment::LineTo(pt) => {
                bez.line_to((pt.x as f64, pt.y as f64));
            }
            usvg::tiny_skia_path::PathSegment::QuadTo(pt1, pt2) => {
                bez.quad_to((pt1.x as f64, pt1.y as f64), (pt2.x as f64, pt2.y as f64));
            }
            usvg::tiny_skia_path::PathSegment::CubicTo(pt1, pt2, pt3) => {
                bez.curve_to(
                    (pt1.x as f64, pt1.y as f64),
                    (pt2.x as f64, pt2.y as f64),
                    (pt3.x as f64, pt3.y as f64),
                );
            }
            usvg::tiny_skia_path::PathSegment::Close => {
                bez.close_path();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape;
    use tempfile::TempDir;

    const STROKED: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2"><path d="M4 12h16"/></svg>"#;

    #[test]
    fn test_glyph_filename_roundtrip() {
        assert_eq!(glyph_filename(0xea02, "arrow-left"), "uEA02-arrow-left.svg");
        assert_eq!(parse_glyph_filename("uEA02-arrow-left"), Some((0xea02, "arrow-left")));
        assert_eq!(parse_glyph_filename("arrow-left"), None);
        assert_eq!(parse_glyph_filename("uXYZ-home"), None);
        assert_eq!(parse_glyph_filename("uEA02-"), None);
    }

    #[test]
    fn test_stroke_becomes_outline() {
        let (path, width, height) = outline_svg(STROKED, 1.0).unwrap();
        assert_eq!((width, height), (24.0, 24.0));

        // A 16 unit line with width 2 and butt caps
        let bbox = path.bounding_box();
        assert!((bbox.width() - 16.0).abs() < 0.01);
        assert!((bbox.height() - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_unstroked_unfilled_path_is_empty() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" fill="none"><path d="M4 12h16"/></svg>"#;
        let (path, _, _) = outline_svg(svg, 1.0).unwrap();
        assert!(path.elements().is_empty());
    }

    #[test]
    fn test_list_icons_is_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["star.svg", "home.svg", "notes.txt"] {
            std::fs::write(dir.path().join(name), STROKED).unwrap();
        }

        let names: Vec<_> = list_icons(dir.path())
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["home", "star"]);
    }

    #[test]
    fn test_glyph_directory_requires_codepoint_names() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("home.svg"), STROKED).unwrap();
        assert!(parse_glyph_directory(dir.path()).is_err());
    }
}
