use crate::debug;
use crate::svg_parser::Icon;
use anyhow::{Context, Result};
use kurbo::{Affine, BezPath, CubicBez, PathEl, Point};
use write_fonts::{
    tables::{
        cmap::Cmap,
        glyf::{GlyfLocaBuilder, SimpleGlyph},
        head::{Head, MacStyle},
        hhea::Hhea,
        hmtx::Hmtx,
        maxp::Maxp,
        name::{Name, NameRecord},
        os2::Os2,
        post::Post,
        vmtx::LongMetric,
    },
    types::{FWord, Fixed, GlyphId, NameId, UfWord},
    FontBuilder,
};

/// Units per em for the generated font
pub const UNITS_PER_EM: u16 = 1000;

/// Distance of the glyph canvas bottom below the baseline
pub const DESCENT: i16 = 100;

/// Accuracy of the cubic to quadratic conversion, in font units
const QUAD_ACCURACY: f64 = 0.5;

/// Compile a TTF from outlined icons, each mapped at its assigned code point.
///
/// Glyph ids follow the order of `icons`, after `.notdef` at id 0.
pub fn build_font(icons: &[Icon], font_name: &str, version: Option<&str>) -> Result<Vec<u8>> {
    let mut glyf_builder = GlyfLocaBuilder::new();
    glyf_builder.add_glyph(&SimpleGlyph::default())?;

    let mut x_max_extent = 0i16;
    for icon in icons {
        debug!("font"; "glyph {} (U+{:04X})", icon.name, icon.codepoint);
        let glyph = svg_path_to_glyph(&icon.path, icon.width, icon.height)
            .with_context(|| format!("Glyph `{}` could not be built", icon.name))?;
        x_max_extent = x_max_extent.max(glyph.bbox.x_max);
        glyf_builder.add_glyph(&glyph)?;
    }
    let (glyf, loca, loca_format) = glyf_builder.build();

    let num_glyphs = icons.len() as u16 + 1;
    // Every icon sits on the same square advance
    let metrics = vec![
        LongMetric {
            advance: UNITS_PER_EM,
            side_bearing: 0,
        };
        num_glyphs as usize
    ];

    let mut head = build_head(version);
    head.index_to_loc_format = loca_format as i16;

    let font_data = FontBuilder::new()
        .add_table(&head)?
        .add_table(&build_hhea(num_glyphs, x_max_extent))?
        .add_table(&Maxp {
            num_glyphs,
            ..Default::default()
        })?
        .add_table(&build_os2(icons))?
        .add_table(&Hmtx::new(metrics, vec![]))?
        .add_table(&build_cmap(icons)?)?
        .add_table(&build_name(font_name, version))?
        .add_table(&build_post(icons))?
        .add_table(&loca)?
        .add_table(&glyf)?
        .build();

    Ok(font_data)
}

/// `(major, minor)` of a release version; `1.0` without one.
pub fn version_parts(version: Option<&str>) -> (u16, u16) {
    let mut parts = version
        .unwrap_or("1.0")
        .split('.')
        .map(|p| p.parse::<u16>().unwrap_or(0));
    let major = parts.next().unwrap_or(1);
    let minor = parts.next().unwrap_or(0).min(999);
    (major, minor)
}

/// `major.minor` of a release version as a font revision, `1.2.0` -> 1.002.
fn font_revision(version: Option<&str>) -> f64 {
    let (major, minor) = version_parts(version);
    major as f64 + minor as f64 / 1000.0
}

/// Convert an SVG BezPath to a font SimpleGlyph
fn svg_path_to_glyph(path: &BezPath, svg_width: f64, svg_height: f64) -> Result<SimpleGlyph> {
    // Calculate scale to fit in UNITS_PER_EM
    let scale = UNITS_PER_EM as f64 / svg_width.max(svg_height);

    // Transform: scale and flip Y axis (SVG is Y-down, fonts are Y-up),
    // then drop the canvas bottom DESCENT units below the baseline
    let transform = Affine::new([
        scale,
        0.0,
        0.0,
        -scale,
        0.0,
        svg_height * scale - DESCENT as f64,
    ]);

    let transformed = transform * path.clone();

    // Convert cubic beziers to quadratic (TTF only supports quadratic)
    let quadratic_path = cubic_to_quadratic(&transformed);

    if quadratic_path.elements().is_empty() {
        return Ok(SimpleGlyph::default());
    }

    SimpleGlyph::from_bezpath(&quadratic_path)
        .map_err(|e| anyhow::anyhow!("Failed to create glyph: {:?}", e))
}

/// Convert cubic bezier curves to quadratic approximations, since `glyf`
/// outlines are quadratic only.
fn cubic_to_quadratic(path: &BezPath) -> BezPath {
    let mut result = BezPath::new();
    let mut current_point = Point::ZERO;
    let mut subpath_start = Point::ZERO;

    for el in path.elements() {
        match el {
            PathEl::MoveTo(p) => {
                result.move_to(*p);
                current_point = *p;
                subpath_start = *p;
            }
            PathEl::LineTo(p) => {
                result.line_to(*p);
                current_point = *p;
            }
            PathEl::QuadTo(p1, p2) => {
                result.quad_to(*p1, *p2);
                current_point = *p2;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                let cubic = CubicBez::new(current_point, *p1, *p2, *p3);
                for (_, _, quad) in cubic.to_quads(QUAD_ACCURACY) {
                    result.quad_to(quad.p1, quad.p2);
                }
                current_point = *p3;
            }
            PathEl::ClosePath => {
                result.close_path();
                current_point = subpath_start;
            }
        }
    }

    result
}

/// Code point to glyph id; ids are offset by one for `.notdef`.
fn build_cmap(icons: &[Icon]) -> Result<Cmap> {
    let mappings = icons
        .iter()
        .zip(1u32..)
        .map(|(icon, gid)| {
            char::from_u32(icon.codepoint)
                .map(|c| (c, GlyphId::new(gid)))
                .with_context(|| format!("U+{:X} is not a character", icon.codepoint))
        })
        .collect::<Result<Vec<_>>>()?;

    Cmap::from_mappings(mappings).map_err(|e| anyhow::anyhow!("Failed to create cmap: {e:?}"))
}

fn build_head(version: Option<&str>) -> Head {
    Head {
        font_revision: Fixed::from_f64(font_revision(version)),
        units_per_em: UNITS_PER_EM,
        mac_style: MacStyle::empty(),
        lowest_rec_ppem: 8,
        ..Default::default()
    }
}

fn build_hhea(num_glyphs: u16, x_max_extent: i16) -> Hhea {
    Hhea {
        ascender: FWord::new(UNITS_PER_EM as i16 - DESCENT),
        descender: FWord::new(-DESCENT),
        line_gap: FWord::new(0),
        advance_width_max: UfWord::new(UNITS_PER_EM),
        min_left_side_bearing: FWord::new(0),
        min_right_side_bearing: FWord::new(0),
        x_max_extent: FWord::new(x_max_extent),
        caret_slope_rise: 1,
        caret_slope_run: 0,
        caret_offset: 0,
        number_of_h_metrics: num_glyphs,
        ..Default::default()
    }
}

fn build_name(font_name: &str, version: Option<&str>) -> Name {
    let records = [
        (NameId::COPYRIGHT_NOTICE, "Generated by iconkit".to_string()),
        (NameId::FAMILY_NAME, font_name.to_string()),
        (NameId::SUBFAMILY_NAME, "Regular".to_string()),
        (NameId::UNIQUE_ID, format!("iconkit: {font_name}")),
        (NameId::FULL_NAME, font_name.to_string()),
        (
            NameId::VERSION_STRING,
            format!("Version {}", version.unwrap_or("1.0")),
        ),
        (NameId::POSTSCRIPT_NAME, font_name.replace(' ', "")),
    ];

    let mut name = Name::default();
    name.name_record = records
        .iter()
        .map(|(id, value)| create_name_record(*id, value))
        .collect();
    name
}

fn create_name_record(name_id: NameId, value: &str) -> NameRecord {
    NameRecord {
        platform_id: 3,  // Windows
        encoding_id: 1,  // Unicode BMP
        language_id: 0x409, // English US
        name_id,
        string: value.to_string().into(),
    }
}

fn build_os2(icons: &[Icon]) -> Os2 {
    // Indices are 16-bit; anything beyond the BMP saturates
    let char_index = |c: u32| c.min(0xFFFF) as u16;
    let first_char = icons.iter().map(|i| i.codepoint).min().map_or(0, char_index);
    let last_char = icons.iter().map(|i| i.codepoint).max().map_or(0, char_index);

    Os2 {
        x_avg_char_width: UNITS_PER_EM as i16,
        us_weight_class: 400, // Normal
        us_width_class: 5,    // Medium
        fs_type: 0,           // Installable
        y_subscript_x_size: 650,
        y_subscript_y_size: 600,
        y_subscript_x_offset: 0,
        y_subscript_y_offset: 75,
        y_superscript_x_size: 650,
        y_superscript_y_size: 600,
        y_superscript_x_offset: 0,
        y_superscript_y_offset: 350,
        y_strikeout_size: 50,
        y_strikeout_position: 300,
        s_typo_ascender: UNITS_PER_EM as i16 - DESCENT,
        s_typo_descender: -DESCENT,
        s_typo_line_gap: 0,
        us_win_ascent: UNITS_PER_EM - DESCENT as u16,
        us_win_descent: DESCENT as u16,
        ul_unicode_range_1: 0,
        ul_unicode_range_2: 1 << 28, // Bit 60: Private Use Area
        ul_unicode_range_3: 0,
        ul_unicode_range_4: 0,
        us_first_char_index: first_char,
        us_last_char_index: last_char,
        ul_code_page_range_1: Some(1), // Latin 1
        ul_code_page_range_2: Some(0),
        sx_height: Some(500),
        s_cap_height: Some(700),
        us_default_char: Some(0),
        us_break_char: Some(32),
        us_max_context: Some(0),
        us_lower_optical_point_size: None,
        us_upper_optical_point_size: None,
        ..Default::default()
    }
}

/// Build the post table, naming each glyph after its icon
fn build_post(icons: &[Icon]) -> Post {
    Post::new_v2(std::iter::once(".notdef").chain(icons.iter().map(|i| i.name.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape;
    use write_fonts::read::{FontRef, TableProvider};

    fn square_icon(name: &str, codepoint: u32) -> Icon {
        Icon {
            name: name.into(),
            path: kurbo::Rect::new(100.0, 100.0, 900.0, 900.0).to_path(0.1),
            width: 1000.0,
            height: 1000.0,
            codepoint,
        }
    }

    #[test]
    fn test_cmap_uses_assigned_codepoints() {
        let icons = vec![square_icon("home", 0xea02), square_icon("star", 0xea05)];

        let data = build_font(&icons, "icons", Some("1.2.0")).unwrap();
        let font = FontRef::new(&data).unwrap();
        assert_eq!(font.maxp().unwrap().num_glyphs(), 3);

        let cmap = font.cmap().unwrap();
        assert_eq!(cmap.map_codepoint(0xea02u32), Some(GlyphId::new(1)));
        assert_eq!(cmap.map_codepoint(0xea05u32), Some(GlyphId::new(2)));
        assert_eq!(cmap.map_codepoint(0xea03u32), None);

        let head = font.head().unwrap();
        assert!((head.font_revision().to_f64() - 1.002).abs() < 1e-3);
    }

    #[test]
    fn test_font_revision() {
        assert_eq!(font_revision(None), 1.0);
        assert!((font_revision(Some("3.14.0")) - 3.014).abs() < 1e-9);
        assert_eq!(font_revision(Some("2")), 2.0);
        assert_eq!(version_parts(Some("4.17.2")), (4, 17));
        assert_eq!(version_parts(None), (1, 0));
    }

    #[test]
    fn test_glyph_sits_on_descent() {
        let glyph = svg_path_to_glyph(&square_icon("box", 0xea02).path, 1000.0, 1000.0).unwrap();
        let bbox = glyph.bbox;
        assert_eq!(bbox.x_min, 100);
        assert_eq!(bbox.x_max, 900);
        assert_eq!(bbox.y_min, 100 - DESCENT);
        assert_eq!(bbox.y_max, 900 - DESCENT);
    }

    #[test]
    fn test_curves_become_quadratic() {
        let circle = kurbo::Circle::new((500.0, 500.0), 400.0).to_path(0.1);
        assert!(circle.elements().iter().any(|el| matches!(el, PathEl::CurveTo(..))));

        let quads = cubic_to_quadratic(&circle);
        assert!(!quads.elements().iter().any(|el| matches!(el, PathEl::CurveTo(..))));
        assert!((quads.bounding_box().width() - 800.0).abs() < 1.0);
    }
}
