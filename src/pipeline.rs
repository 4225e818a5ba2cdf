//! Build tasks and their sequencing.
//!
//! Tasks run one after another; the first failure stops the series. Compile
//! options are read and validated once, before the first task starts.

use crate::changelog::{format_changelog, IconChanges};
use crate::config::CompileOptions;
use crate::exec::Cmd;
use crate::paths::Layout;
use crate::stylesheet::{minify_css, render_css, render_scss, GlyphSheet};
use crate::svg_parser::{list_icons, parse_glyph_directory, Icon, IconSource};
use crate::tags::{load_tags, merge_unicode, save_tags};
use crate::unicode::{assign, load_state, save_state, CodepointMap};
use crate::{debug, font_builder, log, outline, preview, sprite, web_font};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;

/// Settings shared by every task of one invocation.
#[derive(Debug, Clone)]
pub struct Project {
    pub layout: Layout,
    pub font_name: String,
    /// CSS class and sprite symbol prefix
    pub prefix: String,
    /// Release version, used for cache busting, archive and image names
    pub version: Option<String>,
    /// Highest code point reserved for manual assignment
    pub floor: u32,
    /// Run the fontforge outline correction pass
    pub fix_outline: bool,
    /// Keep `icons-outlined/` after the font is built
    pub keep_outlined: bool,
    /// Tag the changelog compares against (default `v{version}`)
    pub previous_tag: Option<String>,
}

impl Project {
    fn release_version(&self) -> Result<&str> {
        self.version
            .as_deref()
            .context("This task needs a release version (--release)")
    }

    fn previous_tag(&self) -> Result<String> {
        match (&self.previous_tag, &self.version) {
            (Some(tag), _) => Ok(tag.clone()),
            (None, Some(version)) => Ok(format!("v{version}")),
            (None, None) => anyhow::bail!("No tag to compare against (--since or --release)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Build the documentation site and copy its icons back
    Site,
    Sprite,
    Preview,
    StrokePreview { icon: String },
    Png,
    Iconfont,
    ChangelogImage,
    Zip,
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::Site => "site",
            Task::Sprite => "sprite",
            Task::Preview => "preview",
            Task::StrokePreview { .. } => "stroke-preview",
            Task::Png => "png",
            Task::Iconfont => "iconfont",
            Task::ChangelogImage => "changelog-image",
            Task::Zip => "zip",
        }
    }

    /// Tasks whose output is named after the release version.
    fn needs_release(&self) -> bool {
        matches!(self, Task::ChangelogImage | Task::Zip)
    }

    fn run(&self, project: &Project, options: &CompileOptions) -> Result<()> {
        match self {
            Task::Site => site(project),
            Task::Sprite => build_sprites(project),
            Task::Preview => icons_preview(project),
            Task::StrokePreview { icon } => stroke_preview(project, icon),
            Task::Png => export_png(project),
            Task::Iconfont => iconfont(project, options).map(|_| ()),
            Task::ChangelogImage => changelog_image(project),
            Task::Zip => package(project),
        }
    }
}

/// The full release build.
pub const RELEASE: [Task; 7] = [
    Task::Site,
    Task::Sprite,
    Task::Preview,
    Task::Png,
    Task::Iconfont,
    Task::ChangelogImage,
    Task::Zip,
];

/// Run `tasks` in order, stopping at the first failure.
pub fn series(project: &Project, tasks: &[Task]) -> Result<()> {
    let options = CompileOptions::load(&project.layout.compile_options, &project.layout.tags)?;
    series_with(project, &options, tasks)
}

pub fn series_with(project: &Project, options: &CompileOptions, tasks: &[Task]) -> Result<()> {
    if let Some(task) = tasks.iter().find(|t| t.needs_release()) {
        project
            .release_version()
            .with_context(|| format!("Task `{}` cannot run", task.name()))?;
    }

    for task in tasks {
        let started = Instant::now();
        log!(task.name(); "starting");
        task.run(project, options)
            .with_context(|| format!("Task `{}` failed", task.name()))?;
        log!(task.name(); "finished in {:.2?}", started.elapsed());
    }
    Ok(())
}

/// The icons selected by `options` and the code point map extended to
/// cover them. Nothing is written.
pub fn plan_assignment(
    project: &Project,
    options: &CompileOptions,
) -> Result<(Vec<IconSource>, CodepointMap)> {
    let selected: Vec<IconSource> = list_icons(&project.layout.icons)?
        .into_iter()
        .filter(|icon| options.is_selected(&icon.name))
        .collect();

    let existing = load_state(&project.layout.unicode_state)?;
    let names: Vec<&str> = selected.iter().map(|i| i.name.as_str()).collect();
    let codepoints = assign(&existing, &names, project.floor)?;

    let fresh = codepoints.len() - existing.len();
    debug!("unicode"; "{} icons selected, {} new code points", selected.len(), fresh);

    Ok((selected, codepoints))
}

/// Outline the selected icons, compile the font and its stylesheets, and
/// persist the extended code point map.
pub fn iconfont(project: &Project, options: &CompileOptions) -> Result<CodepointMap> {
    let layout = &project.layout;
    let (selected, codepoints) = plan_assignment(project, options)?;

    if selected.is_empty() {
        anyhow::bail!("No icons selected in {}", layout.icons.display());
    }

    let with_codepoints: Vec<(&IconSource, u32)> = selected
        .iter()
        .filter_map(|icon| codepoints.get(&icon.name).map(|c| (icon, *c)))
        .collect();

    outline::write_outlined(&with_codepoints, &layout.outlined, options.stroke_width.as_deref())?;

    if project.fix_outline {
        outline::fix_outline(&options.font_forge, &layout.fix_outline_script, &layout.outlined)?;
    }

    let glyphs = parse_glyph_directory(&layout.outlined)?;
    write_fonts(project, &glyphs)?;

    save_state(&layout.unicode_state, &codepoints)?;

    let names: Vec<&str> = selected.iter().map(|i| i.name.as_str()).collect();
    let sheet = GlyphSheet::new(
        &project.font_name,
        &project.prefix,
        project.version.as_deref(),
        &names,
        &codepoints,
    );
    write_stylesheets(&layout.iconfont, &sheet)?;

    if !project.keep_outlined {
        std::fs::remove_dir_all(&layout.outlined)
            .with_context(|| format!("Failed to remove {}", layout.outlined.display()))?;
    }

    update_tags(layout, &codepoints)?;
    Ok(codepoints)
}

/// `{font}.ttf`, `.woff` and `.woff2` in `iconfont/fonts/`.
fn write_fonts(project: &Project, glyphs: &[Icon]) -> Result<()> {
    let dir = &project.layout.fonts;
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let version = project.version.as_deref();
    let ttf = font_builder::build_font(glyphs, &project.font_name, version)?;
    let version = font_builder::version_parts(version);
    let woff = web_font::encode_woff(&ttf, version)?;
    let woff2 = web_font::encode_woff2(&ttf, version)?;

    for (ext, data) in [("ttf", &ttf), ("woff", &woff), ("woff2", &woff2)] {
        let path = dir.join(format!("{}.{ext}", project.font_name));
        std::fs::write(&path, data).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("iconfont"; "{} ({} bytes)", path.display(), data.len());
    }

    log!("iconfont"; "{} glyphs written to {}", glyphs.len(), dir.display());
    Ok(())
}

fn write_stylesheets(dir: &Path, sheet: &GlyphSheet) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let base = dir.join(&sheet.font_name);
    let css = render_css(sheet);

    let min = minify_css(&css).context("Generated stylesheet could not be minified")?;

    for (ext, content) in [
        ("scss", render_scss(sheet)),
        ("css", css),
        ("min.css", min),
        ("html", preview::render_html(sheet)),
    ] {
        let path = base.with_extension(ext);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Copy the code points into the icon metadata, if there is any.
pub fn update_tags(layout: &Layout, codepoints: &CodepointMap) -> Result<()> {
    if !layout.tags.exists() {
        log!("tags"; "{} not found, skipping", layout.tags.display());
        return Ok(());
    }

    let mut tags = load_tags(&layout.tags)?;
    merge_unicode(&mut tags, codepoints);
    save_tags(&layout.tags, &tags)?;
    debug!("tags"; "updated {} records", tags.len());
    Ok(())
}

/// `(name, svg source)` of every icon, sorted by name.
fn read_icons(dir: &Path) -> Result<Vec<(String, String)>> {
    list_icons(dir)?
        .into_iter()
        .map(|icon| -> Result<(String, String)> {
            let svg = std::fs::read_to_string(&icon.path)
                .with_context(|| format!("Failed to read {}", icon.path.display()))?;
            Ok((icon.name, svg))
        })
        .collect()
}

fn build_sprites(project: &Project) -> Result<()> {
    let icons = read_icons(&project.layout.icons)?;
    let sprite = sprite::build_sprite(&icons, &project.prefix);
    let (path, nostroke_path) = project.layout.sprites(&project.font_name);

    std::fs::write(&path, &sprite).with_context(|| format!("Failed to write {}", path.display()))?;
    std::fs::write(&nostroke_path, sprite::without_stroke_width(&sprite))
        .with_context(|| format!("Failed to write {}", nostroke_path.display()))?;

    log!("sprite"; "{} symbols", icons.len());
    Ok(())
}

fn icons_preview(project: &Project) -> Result<()> {
    let icons = read_icons(&project.layout.icons)?;
    let svg = preview::icons_sheet(&icons, 19, 7);
    preview::write_sheet(&project.layout.github.join("icons.svg"), &svg)
}

fn stroke_preview(project: &Project, icon: &str) -> Result<()> {
    let path = project.layout.icons.join(format!("{icon}.svg"));
    let svg = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let sheet = preview::stroke_sheet(&svg, &preview::PREVIEW_STROKES);
    preview::write_sheet(&project.layout.github.join("icons-stroke.svg"), &sheet)
}

fn export_png(project: &Project) -> Result<()> {
    let layout = &project.layout;
    Cmd::new("rsvg-convert").ensure_available()?;

    if layout.png.exists() {
        std::fs::remove_dir_all(&layout.png)?;
    }
    std::fs::create_dir_all(&layout.png)?;

    let icons = list_icons(&layout.icons)?;
    for icon in &icons {
        debug!("png"; "{}", icon.name);
        Cmd::new("rsvg-convert")
            .args(["-h", "240", "-o"])
            .arg(layout.png.join(format!("{}.png", icon.name)))
            .arg(&icon.path)
            .run()?;
    }

    log!("png"; "{} icons rendered", icons.len());
    Ok(())
}

/// Changelog text since the previous release.
pub fn changelog(project: &Project, pretty: bool) -> Result<String> {
    let tag = project.previous_tag()?;
    let changes = IconChanges::since(&project.layout.root, &tag)?;
    if changes.is_empty() {
        log!("changelog"; "no icon changes since {}", tag);
    }
    Ok(format_changelog(&changes, pretty))
}

/// Changelog text for the uncommitted changes.
pub fn changelog_commit(project: &Project) -> Result<String> {
    let changes = IconChanges::uncommitted(&project.layout.root)?;
    Ok(format_changelog(&changes, false))
}

fn changelog_image(project: &Project) -> Result<()> {
    let version = project.release_version()?;
    let changes = IconChanges::since(&project.layout.root, &project.previous_tag()?)?;

    if changes.added.is_empty() {
        log!("changelog"; "no new icons");
        return Ok(());
    }

    let icons = changes
        .added
        .iter()
        .map(|name| -> Result<(String, String)> {
            let path = project.layout.icons.join(format!("{name}.svg"));
            let svg = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok((name.clone(), svg))
        })
        .collect::<Result<Vec<_>>>()?;

    let svg = preview::icons_sheet(&icons, 6, 24);
    let target = project
        .layout
        .github
        .join(format!("{}-{version}.svg", project.font_name));
    preview::write_sheet(&target, &svg)
}

fn site(project: &Project) -> Result<()> {
    Cmd::new("bundle")
        .args(["exec", "jekyll", "build"])
        .cwd(&project.layout.root)
        .inherit(true)
        .run()
        .context("Jekyll build failed")?;

    copy_site_icons(&project.layout)
}

/// Replace `icons/` and `tags.json` with the copies the site build produced.
///
/// `icons/` is only touched once the built icons are known to exist.
fn copy_site_icons(layout: &Layout) -> Result<()> {
    let icons = list_icons(&layout.site.join("icons"))
        .context("The site build produced no icons; icons/ was left as is")?;

    if layout.icons.exists() {
        std::fs::remove_dir_all(&layout.icons)?;
    }
    std::fs::create_dir_all(&layout.icons)?;

    for icon in &icons {
        std::fs::copy(&icon.path, layout.icons.join(format!("{}.svg", icon.name)))
            .with_context(|| format!("Failed to copy {}", icon.path.display()))?;
    }

    let built_tags = layout.site.join("tags.json");
    if built_tags.exists() {
        std::fs::copy(&built_tags, &layout.tags)
            .with_context(|| format!("Failed to copy {}", built_tags.display()))?;
    }

    log!("site"; "{} icons copied", icons.len());
    Ok(())
}

fn package(project: &Project) -> Result<()> {
    let layout = &project.layout;
    let version = project.release_version()?;
    std::fs::create_dir_all(&layout.packages)?;

    let archive = layout
        .packages
        .join(format!("{}-{version}.zip", project.font_name));
    let (sprite, nostroke) = layout.sprites(&project.font_name);

    let contents: Vec<_> = [&layout.icons, &layout.png, &layout.iconfont, &sprite, &nostroke]
        .into_iter()
        .filter(|p| p.exists())
        .filter_map(|p| p.strip_prefix(&layout.root).ok())
        .collect();

    Cmd::new("zip")
        .arg("-rq")
        .arg(&archive)
        .args(contents)
        .cwd(&layout.root)
        .run()?;

    log!("zip"; "{}", archive.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unicode::DEFAULT_FLOOR;
    use tempfile::TempDir;

    const ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M5 12l-2 0l9 -9l9 9l-2 0"/></svg>"#;

    fn project(root: &Path, floor: u32) -> Project {
        Project {
            layout: Layout::new(root),
            font_name: "icons".into(),
            prefix: "ti".into(),
            version: Some("1.0.0".into()),
            floor,
            fix_outline: false,
            keep_outlined: false,
            previous_tag: None,
        }
    }

    fn add_icons(root: &Path, names: &[&str]) {
        let dir = root.join("icons");
        std::fs::create_dir_all(&dir).unwrap();
        for name in names {
            std::fs::write(dir.join(format!("{name}.svg")), ICON).unwrap();
        }
    }

    #[test]
    fn test_iconfont_end_to_end() {
        let dir = TempDir::new().unwrap();
        add_icons(dir.path(), &["home", "star"]);
        let project = project(dir.path(), 100);

        let first = iconfont(&project, &CompileOptions::default()).unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.values().all(|c| *c > 100));
        assert_ne!(first["home"], first["star"]);

        let state = load_state(&project.layout.unicode_state).unwrap();
        assert_eq!(state, first);

        let second = iconfont(&project, &CompileOptions::default()).unwrap();
        assert_eq!(first, second);

        let layout = &project.layout;
        for ext in ["ttf", "woff", "woff2"] {
            assert!(layout.fonts.join(format!("icons.{ext}")).exists(), "{ext}");
        }
        for ext in ["scss", "css", "min.css", "html"] {
            assert!(layout.iconfont.join(format!("icons.{ext}")).exists(), "{ext}");
        }
        assert!(!layout.outlined.exists());
    }

    #[test]
    fn test_previous_assignments_survive_new_icons() {
        let dir = TempDir::new().unwrap();
        add_icons(dir.path(), &["home", "star"]);
        let project = project(dir.path(), DEFAULT_FLOOR);

        let first = iconfont(&project, &CompileOptions::default()).unwrap();

        add_icons(dir.path(), &["alarm"]);
        let second = iconfont(&project, &CompileOptions::default()).unwrap();

        assert_eq!(second["home"], first["home"]);
        assert_eq!(second["star"], first["star"]);
        assert!(second["alarm"] > first["star"]);
    }

    #[test]
    fn test_excluded_icons_keep_their_entry() {
        let dir = TempDir::new().unwrap();
        add_icons(dir.path(), &["home", "star"]);
        let project = project(dir.path(), DEFAULT_FLOOR);
        let first = iconfont(&project, &CompileOptions::default()).unwrap();

        std::fs::write(&project.layout.compile_options, r#"{"excludeIcons": ["star"]}"#).unwrap();
        let options =
            CompileOptions::load(&project.layout.compile_options, &project.layout.tags).unwrap();
        let second = iconfont(&project, &options).unwrap();

        assert_eq!(second, first);
        let css = std::fs::read_to_string(project.layout.iconfont.join("icons.css")).unwrap();
        assert!(css.contains(".ti-home:before"));
        assert!(!css.contains(".ti-star:before"));
    }

    #[test]
    fn test_corrupt_state_aborts_without_output() {
        let dir = TempDir::new().unwrap();
        add_icons(dir.path(), &["home"]);
        let project = project(dir.path(), DEFAULT_FLOOR);

        std::fs::create_dir_all(project.layout.unicode_state.parent().unwrap()).unwrap();
        std::fs::write(&project.layout.unicode_state, r#"{"home": "ea0"#).unwrap();

        assert!(iconfont(&project, &CompileOptions::default()).is_err());
        assert!(!project.layout.fonts.exists());
        assert_eq!(
            std::fs::read_to_string(&project.layout.unicode_state).unwrap(),
            r#"{"home": "ea0"#
        );
    }

    #[test]
    fn test_malformed_options_abort_before_any_task() {
        let dir = TempDir::new().unwrap();
        add_icons(dir.path(), &["home"]);
        let project = project(dir.path(), DEFAULT_FLOOR);
        std::fs::write(&project.layout.compile_options, r#"{"includeIcons": "home"}"#).unwrap();

        assert!(series(&project, &[Task::Sprite, Task::Iconfont]).is_err());

        let (sprite, _) = project.layout.sprites("icons");
        assert!(!sprite.exists());
        assert!(!project.layout.outlined.exists());
        assert!(!project.layout.unicode_state.exists());
    }

    #[test]
    fn test_tags_receive_unicode() {
        let dir = TempDir::new().unwrap();
        add_icons(dir.path(), &["home"]);
        let project = project(dir.path(), DEFAULT_FLOOR);
        std::fs::write(
            &project.layout.tags,
            r#"{"home": {"category": "Buildings"}, "old": {"category": "System"}}"#,
        )
        .unwrap();

        let codepoints = iconfont(&project, &CompileOptions::default()).unwrap();

        let tags = load_tags(&project.layout.tags).unwrap();
        assert_eq!(tags["home"]["unicode"], format!("{:x}", codepoints["home"]));
        assert!(tags["old"].get("unicode").is_none());
    }

    #[test]
    fn test_sprite_task() {
        let dir = TempDir::new().unwrap();
        add_icons(dir.path(), &["home", "star"]);
        let project = project(dir.path(), DEFAULT_FLOOR);

        series_with(&project, &CompileOptions::default(), &[Task::Sprite]).unwrap();

        let (sprite, nostroke) = project.layout.sprites("icons");
        let sprite = std::fs::read_to_string(sprite).unwrap();
        assert!(sprite.contains(r#"<symbol id="ti-home""#));
        assert!(sprite.contains(r#"<symbol id="ti-star""#));
        assert!(!std::fs::read_to_string(nostroke).unwrap().contains("stroke-width"));
    }

    #[test]
    fn test_missing_site_output_keeps_icons() {
        let dir = TempDir::new().unwrap();
        add_icons(dir.path(), &["home"]);
        let layout = Layout::new(dir.path());

        assert!(copy_site_icons(&layout).is_err());
        assert!(layout.icons.join("home.svg").exists());
    }

    #[test]
    fn test_site_icons_replace_sources() {
        let dir = TempDir::new().unwrap();
        add_icons(dir.path(), &["home", "stale"]);
        let layout = Layout::new(dir.path());

        let built = layout.site.join("icons");
        std::fs::create_dir_all(&built).unwrap();
        std::fs::write(built.join("home.svg"), ICON).unwrap();
        std::fs::write(built.join("star.svg"), ICON).unwrap();
        std::fs::write(layout.site.join("tags.json"), r#"{"home": {"category": "Buildings"}}"#)
            .unwrap();

        copy_site_icons(&layout).unwrap();

        let names: Vec<_> = list_icons(&layout.icons)
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["home", "star"]);
        assert!(load_tags(&layout.tags).unwrap().contains_key("home"));
    }

    #[test]
    fn test_release_tasks_fail_before_any_task_runs() {
        let dir = TempDir::new().unwrap();
        add_icons(dir.path(), &["home"]);
        let mut project = project(dir.path(), DEFAULT_FLOOR);
        project.version = None;

        let err = series_with(&project, &CompileOptions::default(), &[Task::Sprite, Task::Zip])
            .unwrap_err();
        assert!(format!("{err:#}").contains("--release"));

        let (sprite, _) = project.layout.sprites("icons");
        assert!(!sprite.exists());
    }

    #[test]
    fn test_previous_tag_defaults_to_release() {
        let dir = TempDir::new().unwrap();
        let mut project = project(dir.path(), DEFAULT_FLOOR);
        assert_eq!(project.previous_tag().unwrap(), "v1.0.0");

        project.previous_tag = Some("v0.9.0".into());
        assert_eq!(project.previous_tag().unwrap(), "v0.9.0");

        project.previous_tag = None;
        project.version = None;
        assert!(project.previous_tag().is_err());
    }
}
