//! Icon font stylesheets.
//!
//! Everything here is a pure function of a [`GlyphSheet`]; writing the
//! results to disk is the caller's business.

use crate::unicode::{format_codepoint, CodepointMap};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use std::fmt::Write;

/// Font files in `@font-face` order, with their CSS format names.
const FONT_FORMATS: [(&str, &str); 3] =
    [("woff2", "woff2"), ("woff", "woff"), ("ttf", "truetype")];

/// A single font character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub name: String,
    pub codepoint: u32,
}

/// Everything the stylesheet and preview templates need.
#[derive(Debug, Clone)]
pub struct GlyphSheet {
    pub font_name: String,
    /// Class prefix, e.g. `ti` for `.ti-home`
    pub prefix: String,
    /// Release version appended to font URLs for cache busting
    pub version: Option<String>,
    /// Sorted by name
    pub glyphs: Vec<Glyph>,
}

impl GlyphSheet {
    /// Collect the glyphs of `names` from the code point map.
    ///
    /// Names without a code point are skipped.
    pub fn new<S: AsRef<str>>(
        font_name: &str,
        prefix: &str,
        version: Option<&str>,
        names: &[S],
        codepoints: &CodepointMap,
    ) -> Self {
        let mut glyphs: Vec<Glyph> = names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                codepoints.get(name).map(|codepoint| Glyph {
                    name: name.to_string(),
                    codepoint: *codepoint,
                })
            })
            .collect();
        glyphs.sort_by(|a, b| a.name.cmp(&b.name));
        glyphs.dedup();

        Self {
            font_name: font_name.to_string(),
            prefix: prefix.to_string(),
            version: version.map(String::from),
            glyphs,
        }
    }

    /// `@font-face` sources for the fonts in `dir`, best compression first.
    fn font_sources(&self, dir: &str) -> String {
        let query = self.version.as_ref().map(|v| format!("?v{v}")).unwrap_or_default();
        FONT_FORMATS
            .iter()
            .map(|(ext, format)| {
                format!(r#"url("{dir}/{}.{ext}{query}") format("{format}")"#, self.font_name)
            })
            .collect::<Vec<_>>()
            .join(",\n    ")
    }
}

/// SCSS source with a variable per glyph, for projects that build their own
/// stylesheet.
pub fn render_scss(sheet: &GlyphSheet) -> String {
    let mut out = String::new();
    let prefix = &sheet.prefix;

    if let Some(version) = &sheet.version {
        let _ = writeln!(out, "/*!\n * {} {version}\n */", sheet.font_name);
    }
    let _ = writeln!(out, "${prefix}-font-family: \"{}\" !default;", sheet.font_name);
    let _ = writeln!(out, "${prefix}-font-path: \"fonts\" !default;");
    let _ = writeln!(out, "${prefix}-prefix: \"{prefix}\" !default;\n");

    for glyph in &sheet.glyphs {
        let _ = writeln!(
            out,
            "${prefix}-icon-{}: unicode('{}');",
            glyph.name,
            format_codepoint(glyph.codepoint)
        );
    }

    let src = sheet.font_sources(&format!("#{{${prefix}-font-path}}"));
    let _ = write!(
        out,
        r##"
@function unicode($str) {{
  @return unquote("\"") + unquote(str-insert($str, "\\", 1)) + unquote("\"");
}}

@font-face {{
  font-family: ${prefix}-font-family;
  font-style: normal;
  font-weight: 400;
  src: {src};
}}

.#{{${prefix}-prefix}} {{
  font-family: ${prefix}-font-family !important;
  speak: none;
  font-style: normal;
  font-weight: normal;
  font-variant: normal;
  text-transform: none;
  line-height: 1;
  -webkit-font-smoothing: antialiased;
  -moz-osx-font-smoothing: grayscale;
}}

@each $name, $code in (
"##
    );

    for glyph in &sheet.glyphs {
        let _ = writeln!(out, "  \"{0}\": ${prefix}-icon-{0},", glyph.name);
    }

    let _ = write!(
        out,
        r##") {{
  .#{{${prefix}-prefix}}-#{{$name}}:before {{
    content: $code;
  }}
}}
"##
    );

    out
}

/// Plain CSS equivalent of [`render_scss`].
pub fn render_css(sheet: &GlyphSheet) -> String {
    let mut out = String::new();
    let prefix = &sheet.prefix;

    if let Some(version) = &sheet.version {
        let _ = writeln!(out, "/*!\n * {} {version}\n */", sheet.font_name);
    }

    let _ = write!(
        out,
        r#"@font-face {{
  font-family: "{font}";
  font-style: normal;
  font-weight: 400;
  src: {src};
}}

.{prefix} {{
  font-family: "{font}" !important;
  speak: none;
  font-style: normal;
  font-weight: normal;
  font-variant: normal;
  text-transform: none;
  line-height: 1;
  -webkit-font-smoothing: antialiased;
  -moz-osx-font-smoothing: grayscale;
}}
"#,
        font = sheet.font_name,
        src = sheet.font_sources("fonts"),
    );

    for glyph in &sheet.glyphs {
        let _ = write!(
            out,
            "\n.{prefix}-{}:before {{\n  content: \"\\{}\";\n}}\n",
            glyph.name,
            format_codepoint(glyph.codepoint)
        );
    }

    out
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Option<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> GlyphSheet {
        let codepoints: CodepointMap = [
            ("star".to_string(), 0xea03),
            ("home".to_string(), 0xea02),
            ("stale".to_string(), 0xea01),
        ]
        .into_iter()
        .collect();
        GlyphSheet::new("icons", "ti", Some("1.2.0"), &["star", "home", "missing"], &codepoints)
    }

    #[test]
    fn test_sheet_is_sorted_and_filtered() {
        let names: Vec<_> = sheet().glyphs.into_iter().map(|g| g.name).collect();
        assert_eq!(names, ["home", "star"]);
    }

    #[test]
    fn test_css_has_a_rule_per_glyph() {
        let css = render_css(&sheet());
        assert!(css.contains(r#"src: url("fonts/icons.woff2?v1.2.0") format("woff2"),"#));
        assert!(css.contains(r#"url("fonts/icons.woff?v1.2.0") format("woff"),"#));
        assert!(css.contains(r#"url("fonts/icons.ttf?v1.2.0") format("truetype");"#));
        assert!(css.contains(".ti-home:before {\n  content: \"\\ea02\";\n}"));
        assert!(css.contains(".ti-star:before"));
        assert!(!css.contains("stale"));
        assert!(css.find(".ti-home").unwrap() < css.find(".ti-star").unwrap());
    }

    #[test]
    fn test_scss_variables() {
        let scss = render_scss(&sheet());
        assert!(scss.contains("$ti-icon-home: unicode('ea02');"));
        assert!(scss.contains("\"star\": $ti-icon-star,"));
        assert!(scss.contains("$ti-font-family: \"icons\" !default;"));
        assert!(scss.contains(
            r##"src: url("#{$ti-font-path}/icons.woff2?v1.2.0") format("woff2"),"##
        ));
        assert!(scss.contains(r##"url("#{$ti-font-path}/icons.ttf?v1.2.0") format("truetype");"##));
    }

    #[test]
    fn test_minified_css_keeps_rules() {
        let min = minify_css(&render_css(&sheet())).unwrap();
        assert!(min.len() < render_css(&sheet()).len());
        assert!(min.contains(".ti-home:before"));
    }
}
