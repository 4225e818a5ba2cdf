mod changelog;
mod config;
mod exec;
mod font_builder;
mod logger;
mod outline;
mod paths;
mod pipeline;
mod preview;
mod sprite;
mod stylesheet;
mod svg_parser;
mod tags;
mod unicode;
mod web_font;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::CompileOptions;
use paths::Layout;
use pipeline::{Project, Task};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iconkit")]
#[command(version, about = "Build icon fonts, sprites and rasters from SVG icons")]
struct Cli {
    /// Project root containing icons/, tags.json and compile-options.json
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Font family name, also used for output file names
    #[arg(short, long, global = true, default_value = "icons")]
    name: String,

    /// CSS class and sprite symbol prefix
    #[arg(short, long, global = true, default_value = "ti")]
    prefix: String,

    /// Release version (e.g. 1.2.0)
    #[arg(long, global = true)]
    release: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct FontArgs {
    /// Highest code point reserved for manual assignment
    #[arg(long, default_value_t = unicode::DEFAULT_FLOOR)]
    floor: u32,

    /// Skip the fontforge outline correction pass
    #[arg(long)]
    no_fix_outline: bool,

    /// Keep the outlined glyph sources after the build
    #[arg(long)]
    keep_outlined: bool,
}

#[derive(clap::Args)]
struct SinceArgs {
    /// Tag to compare against (default: v<release>)
    #[arg(long)]
    since: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full release build
    Build {
        #[command(flatten)]
        font: FontArgs,
        #[command(flatten)]
        since: SinceArgs,
    },

    /// Outline the icons and build the icon font, stylesheets and preview
    Iconfont {
        #[command(flatten)]
        font: FontArgs,
    },

    /// Print the code point of every selected icon without writing anything
    Assign {
        #[arg(long, default_value_t = unicode::DEFAULT_FLOOR)]
        floor: u32,
    },

    /// Build the SVG sprites
    Sprite,

    /// Render the icon overview sheet
    Preview,

    /// Render one icon at several stroke widths
    StrokePreview {
        #[arg(long, default_value = "disabled")]
        icon: String,
    },

    /// Render every icon to PNG
    Png,

    /// Print the changelog since the previous release
    Changelog {
        #[command(flatten)]
        since: SinceArgs,
    },

    /// Print the changelog of the uncommitted changes
    ChangelogCommit,

    /// Render the new icons of this release
    ChangelogImage {
        #[command(flatten)]
        since: SinceArgs,
    },

    /// Build the documentation site and copy its icons back
    Site,

    /// Package the release artifacts into a zip archive
    Zip,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::set_verbose(cli.verbose);

    let mut project = Project {
        layout: Layout::new(&cli.root),
        font_name: cli.name,
        prefix: cli.prefix,
        version: cli.release,
        floor: unicode::DEFAULT_FLOOR,
        fix_outline: true,
        keep_outlined: false,
        previous_tag: None,
    };

    let apply_font = |project: &mut Project, font: FontArgs| {
        project.floor = font.floor;
        project.fix_outline = !font.no_fix_outline;
        project.keep_outlined = font.keep_outlined;
    };

    match cli.command {
        Commands::Build { font, since } => {
            apply_font(&mut project, font);
            project.previous_tag = since.since;
            pipeline::series(&project, &pipeline::RELEASE)?;
        }
        Commands::Iconfont { font } => {
            apply_font(&mut project, font);
            pipeline::series(&project, &[Task::Iconfont])?;
        }
        Commands::Assign { floor } => {
            project.floor = floor;
            let options =
                CompileOptions::load(&project.layout.compile_options, &project.layout.tags)?;
            let (selected, codepoints) = pipeline::plan_assignment(&project, &options)?;
            for icon in &selected {
                if let Some(codepoint) = codepoints.get(&icon.name) {
                    println!("{}\t{}", icon.name, unicode::format_codepoint(*codepoint));
                }
            }
        }
        Commands::Sprite => pipeline::series(&project, &[Task::Sprite])?,
        Commands::Preview => pipeline::series(&project, &[Task::Preview])?,
        Commands::StrokePreview { icon } => {
            pipeline::series(&project, &[Task::StrokePreview { icon }])?
        }
        Commands::Png => pipeline::series(&project, &[Task::Png])?,
        Commands::Changelog { since } => {
            project.previous_tag = since.since;
            print!("{}", pipeline::changelog(&project, true)?);
        }
        Commands::ChangelogCommit => print!("{}", pipeline::changelog_commit(&project)?),
        Commands::ChangelogImage { since } => {
            project.previous_tag = since.since;
            pipeline::series(&project, &[Task::ChangelogImage])?;
        }
        Commands::Site => pipeline::series(&project, &[Task::Site])?,
        Commands::Zip => pipeline::series(&project, &[Task::Zip])?,
    }

    log!("done"; "{}", project.font_name);
    Ok(())
}
