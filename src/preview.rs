use crate::exec::Cmd;
use crate::stylesheet::GlyphSheet;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Stroke widths shown by the stroke preview
pub const PREVIEW_STROKES: [&str; 5] = [".5", "1", "1.5", "2", "2.75"];

static INDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s+").expect("valid regex"));

/// Generate an HTML preview page for the icon font
///
/// The page loads the font from `fonts/` next to it, like the stylesheet.
pub fn render_html(sheet: &GlyphSheet) -> String {
    let mut icons_html = String::new();

    for glyph in &sheet.glyphs {
        icons_html.push_str(&format!(
            r#"
        <div class="icon-card" data-name="{name}" data-codepoint="{codepoint:04x}">
            <div class="icon-glyph {prefix} {prefix}-{name}"></div>
            <div class="icon-name">{name}</div>
            <div class="icon-code">\{codepoint:04x}</div>
        </div>"#,
            name = glyph.name,
            prefix = sheet.prefix,
            codepoint = glyph.codepoint
        ));
    }

    let title = match &sheet.version {
        Some(v) => format!("{} {v}", sheet.font_name),
        None => sheet.font_name.clone(),
    };

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Icon Font Preview</title>
    <link rel="stylesheet" href="{font_name}.css">
    <style>
        * {{
            box-sizing: border-box;
            margin: 0;
            padding: 0;
        }}

        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #fff;
            color: #354052;
        }}

        .header {{
            border-bottom: 1px solid #e6e8eb;
            padding: 1.5rem 2rem;
            display: flex;
            justify-content: space-between;
            align-items: center;
        }}

        .stats {{
            color: #888;
            font-size: 0.875rem;
        }}

        .search-box {{
            border: 1px solid #d9dbde;
            border-radius: 4px;
            padding: 0.5rem 1rem;
            width: 200px;
        }}

        .grid {{
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(140px, 1fr));
            gap: 1rem;
            padding: 2rem;
        }}

        .icon-card {{
            border: 1px solid #e6e8eb;
            border-radius: 4px;
            padding: 1.25rem;
            text-align: center;
        }}

        .icon-card.hidden {{
            display: none;
        }}

        .icon-glyph {{
            font-size: 32px;
            margin-bottom: 0.75rem;
        }}

        .icon-name {{
            font-size: 0.75rem;
            word-break: break-word;
        }}

        .icon-code {{
            font-size: 0.625rem;
            color: #888;
            font-family: monospace;
        }}
    </style>
</head>
<body>
    <header class="header">
        <div>
            <h1>{title}</h1>
            <p class="stats">{icon_count} icons</p>
        </div>
        <input type="text" class="search-box" placeholder="Search icons..." id="search">
    </header>

    <main class="grid" id="grid">
        {icons_html}
    </main>

    <script>
        document.getElementById('search').addEventListener('input', (e) => {{
            const query = e.target.value.toLowerCase();
            document.querySelectorAll('.icon-card').forEach(card => {{
                const matches = card.dataset.name.includes(query) || card.dataset.codepoint.includes(query);
                card.classList.toggle('hidden', !matches);
            }});
        }});
    </script>
</body>
</html>
"##,
        title = title,
        font_name = sheet.font_name,
        icon_count = sheet.glyphs.len(),
        icons_html = icons_html
    )
}

/// Turn a 24x24 icon document into a `<symbol>` with the given id
fn to_symbol(svg: &str, id: &str) -> String {
    let symbol = svg
        .replace(
            r#"<svg xmlns="http://www.w3.org/2000/svg""#,
            &format!(r#"<symbol id="{id}""#),
        )
        .replace(r#" width="24" height="24""#, "")
        .replace("</svg>", "</symbol>");
    INDENT.replace_all(&symbol, "").into_owned()
}

fn sheet_document(width: usize, height: usize, symbols: &str, uses: &str) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 {width} {height}" width="{width}" height="{height}" style="color: #354052"><rect x="0" y="0" width="{width}" height="{height}" fill="#fff"></rect>
{symbols}
{uses}
</svg>"##
    )
}

/// Lay out icons in a grid, one `<use>` per icon
///
/// `icons` are `(name, svg source)` pairs.
pub fn icons_sheet(icons: &[(String, String)], columns: usize, padding_outer: usize) -> String {
    const PADDING: usize = 20;
    const ICON_SIZE: usize = 24;

    let columns = columns.max(1);
    let rows = icons.len().div_ceil(columns);
    let width = (columns * (ICON_SIZE + PADDING) + 2 * padding_outer).saturating_sub(PADDING);
    let height = (rows * (ICON_SIZE + PADDING) + 2 * padding_outer).saturating_sub(PADDING);

    let mut symbols = String::new();
    let mut uses = String::new();
    let (mut x, mut y) = (padding_outer, padding_outer);

    for (i, (name, svg)) in icons.iter().enumerate() {
        symbols.push_str(&format!("\t{}\n", to_symbol(svg, name)));
        uses.push_str(&format!(
            "\t<use xlink:href=\"#{name}\" x=\"{x}\" y=\"{y}\" width=\"{ICON_SIZE}\" height=\"{ICON_SIZE}\" />\n"
        ));

        x += PADDING + ICON_SIZE;
        if i % columns == columns - 1 {
            x = padding_outer;
            y += PADDING + ICON_SIZE;
        }
    }

    sheet_document(width, height, &symbols, &uses)
}

/// One icon drawn with each of `strokes` side by side
pub fn stroke_sheet(svg: &str, strokes: &[&str]) -> String {
    const PADDING: usize = 16;
    const PADDING_OUTER: usize = 3;
    const ICON_SIZE: usize = 32;
    const WIDTH: usize = 914;

    let mut symbols = String::new();
    let mut uses = String::new();
    let mut x = PADDING_OUTER;

    for stroke in strokes {
        let id = format!("icon-{stroke}");
        let stroked = svg.replacen(
            r#" stroke-width="2""#,
            &format!(r#" stroke-width="{stroke}""#),
            1,
        );
        symbols.push_str(&format!("\t{}\n", to_symbol(&stroked, &id)));
        uses.push_str(&format!(
            "\t<use xlink:href=\"#{id}\" x=\"{x}\" y=\"{PADDING_OUTER}\" width=\"{ICON_SIZE}\" height=\"{ICON_SIZE}\" />\n"
        ));
        x += PADDING + ICON_SIZE;
    }

    sheet_document(WIDTH, ICON_SIZE + PADDING_OUTER * 2, &symbols, &uses)
}

/// Write a preview sheet and render `.png` and `@2x.png` screenshots of it
pub fn write_sheet(path: &Path, svg: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, svg).with_context(|| format!("Failed to write {}", path.display()))?;

    let png = path.with_extension("png");
    let png_2x = path.with_file_name(format!(
        "{}@2x.png",
        path.file_stem().and_then(|s| s.to_str()).unwrap_or("preview")
    ));

    for (zoom, target) in [("2", &png), ("4", &png_2x)] {
        Cmd::new("rsvg-convert")
            .args(["-x", zoom, "-y", zoom, "-o"])
            .arg(target)
            .arg(path)
            .run()
            .with_context(|| format!("Failed to render {}", target.display()))?;
    }

    Ok(())
}
