use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};

use crate::app_state::Engine;
use crate::canvas::{CANVAS_COUNT, CanvasIndex, Viewport};
use crate::events::Command;
use crate::file_format::{export_strokes_file, parse_strokes_file};
use crate::persistence::{CanvasStorage, FileStore};
use crate::render::{encode_png, export_content, export_view};
use crate::settings::{EngineConfig, Settings, Theme};
use crate::text_renderer::FontBook;

#[derive(Parser, Debug)]
#[command(name = "inkboard", about = "Render, import and export whiteboard canvases")]
struct Cli {
    /// JSON engine config; every field is optional.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Canvas storage directory. Overrides `storage_dir` from the config.
    #[arg(long)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Render a stored canvas to PNG.
    Render {
        #[arg(long, value_parser = parse_canvas, default_value = "1")]
        canvas: CanvasIndex,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 1280)]
        width: u32,
        #[arg(long, default_value_t = 800)]
        height: u32,
        /// Crop to content on a transparent background.
        #[arg(long)]
        transparent: bool,
        #[arg(long)]
        dark: bool,
    },
    /// Replace a canvas with the strokes of an exported file.
    Import {
        #[arg(long, value_parser = parse_canvas, default_value = "1")]
        canvas: CanvasIndex,
        file: PathBuf,
    },
    /// Write a canvas to a strokes file.
    Export {
        #[arg(long, value_parser = parse_canvas, default_value = "1")]
        canvas: CanvasIndex,
        #[arg(long)]
        out: PathBuf,
    },
}

fn parse_canvas(raw: &str) -> Result<CanvasIndex, String> {
    raw.parse::<u8>()
        .ok()
        .and_then(CanvasIndex::new)
        .ok_or_else(|| format!("canvas must be 1-{CANVAS_COUNT}"))
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &cli.storage {
        config.storage_dir = Some(dir.clone());
    }
    if config.storage_dir.is_none() {
        bail!("no storage directory: pass --storage or set storage_dir in the config");
    }
    Ok(config)
}

fn open_storage(config: &EngineConfig) -> anyhow::Result<CanvasStorage> {
    let dir = config
        .storage_dir
        .as_deref()
        .context("storage directory not configured")?;
    Ok(CanvasStorage::new(Box::new(FileStore::open(dir)?), config.max_persist_bytes))
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

pub fn run() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        CliCommand::Render {
            canvas,
            out,
            width,
            height,
            transparent,
            dark,
        } => {
            let storage = open_storage(&config)?;
            let fonts = FontBook::load(&config.fonts);
            let session = storage.load_session(canvas, Viewport::centered(width as f32, height as f32));
            let theme = if dark { Theme::Dark } else { Theme::Light };
            let pixmap = if transparent {
                export_content(&session.strokes, &fonts, config.export_padding)?
            } else {
                export_view(&session.strokes, session.view, width, height, theme, &fonts)?
            };
            write_file(&out, &encode_png(&pixmap)?)?;
            log::info!("rendered canvas {canvas} to {}", out.display());
        }
        CliCommand::Import { canvas, file } => {
            let raw = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let strokes = parse_strokes_file(&raw).with_context(|| format!("importing {}", file.display()))?;
            let count = strokes.len();

            let mut engine = Engine::new(config, Settings::default(), 1280, 800)?;
            engine.switch_canvas(canvas);
            engine.dispatch(Command::Import(strokes));
            // Land the fit-to-content animation so the view is stored too.
            engine.tick(Instant::now() + engine.config().view_animation());
            println!("imported {count} strokes into canvas {canvas}");
        }
        CliCommand::Export { canvas, out } => {
            let storage = open_storage(&config)?;
            let strokes = storage.load_strokes(canvas);
            let json = serde_json::to_string_pretty(&export_strokes_file(&strokes))?;
            write_file(&out, json.as_bytes())?;
            println!("exported {} strokes from canvas {canvas}", strokes.len());
        }
    }
    Ok(())
}
